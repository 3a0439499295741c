//! Flat 64KB address space with the program counter and the hardware stack.
//!
//! Every instruction byte is consumed through [`Memory::next`], and every
//! bus access (`read`, `write`, `next`, stack traffic) consults the device
//! map before touching RAM.

use std::fmt;
use std::ops::RangeInclusive;

use retrosim_common::Device;

use crate::error::{EmuError, Result};

/// Programs are loaded and start executing here.
pub const PROGRAM_OFFSET: u16 = 0x0600;
/// Physical base of the 256-byte stack page.
pub const STACK_OFFSET: u16 = 0x0100;
/// Initial (empty-stack) value of `sp`.
pub const STACK_ORIGIN: u8 = 0xff;

const MEMORY_SIZE: usize = 0x10000;

struct Mapping {
    range: RangeInclusive<u16>,
    device: Box<dyn Device>,
}

pub struct Memory {
    ram: Box<[u8]>,
    devices: Vec<Mapping>,
    /// program counter
    pub pc: u16,
    /// stack pointer, offset into the stack page
    pub sp: u8,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("pc", &format_args!("0x{:04X}", self.pc))
            .field("sp", &format_args!("0x{:02X}", self.sp))
            .field(
                "devices",
                &self.devices.iter().map(|m| &m.range).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            ram: vec![0; MEMORY_SIZE].into_boxed_slice(),
            devices: Vec::new(),
            pc: PROGRAM_OFFSET,
            sp: STACK_ORIGIN,
        }
    }

    /// Clear RAM and both cursors. Device mappings survive.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.pc = PROGRAM_OFFSET;
        self.sp = STACK_ORIGIN;
    }

    /// Route accesses to `range` through `device`.
    pub fn map_device(
        &mut self,
        range: RangeInclusive<u16>,
        device: Box<dyn Device>,
    ) -> Result<()> {
        let (start, end) = (*range.start(), *range.end());
        if let Some(existing) = self
            .devices
            .iter()
            .find(|m| start <= *m.range.end() && *m.range.start() <= end)
        {
            return Err(EmuError::DeviceOverlap {
                start,
                end,
                existing_start: *existing.range.start(),
                existing_end: *existing.range.end(),
            });
        }
        log::debug!("mapped device at 0x{:04X}-0x{:04X}", start, end);
        self.devices.push(Mapping { range, device });
        Ok(())
    }

    fn device_for(&mut self, addr: u16) -> Option<&mut Box<dyn Device>> {
        self.devices
            .iter_mut()
            .find(|m| m.range.contains(&addr))
            .map(|m| &mut m.device)
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match self.device_for(addr) {
            Some(device) => device.read(addr),
            None => self.ram[addr as usize],
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match self.device_for(addr) {
            Some(device) => device.write(addr, value),
            None => self.ram[addr as usize] = value,
        }
    }

    /// Raw RAM read, bypassing devices.
    pub fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    /// Raw RAM write, bypassing devices.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }

    /// Read the byte at `pc` and advance `pc`.
    pub fn next(&mut self) -> u8 {
        let b = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        b
    }

    /// Copy a program image to [`PROGRAM_OFFSET`] and point `pc` at it.
    ///
    /// No byte is fetched.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        let start = PROGRAM_OFFSET as usize;
        let capacity = MEMORY_SIZE - start;
        if program.len() > capacity {
            return Err(EmuError::ProgramTooLarge {
                len: program.len(),
                capacity,
            });
        }
        self.ram[start..start + program.len()].copy_from_slice(program);
        self.pc = PROGRAM_OFFSET;
        log::debug!("loaded {} bytes at 0x{:04X}", program.len(), PROGRAM_OFFSET);
        Ok(())
    }

    pub fn push(&mut self, value: u8) {
        self.write(STACK_OFFSET + self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_OFFSET + self.sp as u16)
    }

    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    pub fn branch(&mut self, cond: bool, addr: u16) {
        if cond {
            self.jump(addr);
        }
    }

    /// Push the return address (low byte first) and jump.
    pub fn jsr(&mut self, addr: u16) {
        let [low, high] = Self::bytes(self.pc);
        self.push(low);
        self.push(high);
        self.jump(addr);
    }

    pub fn rts(&mut self) {
        let high = self.pull();
        let low = self.pull();
        self.jump(Self::int16([low, high]));
    }

    #[inline]
    pub fn int16([low, high]: [u8; 2]) -> u16 {
        u16::from_le_bytes([low, high])
    }

    #[inline]
    pub fn bytes(addr: u16) -> [u8; 2] {
        addr.to_le_bytes()
    }
}
