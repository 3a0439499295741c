//! Processor state: the three 8-bit registers and the status flags.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::{EmuError, Result};

bitflags! {
    /// Status register bits as laid out when pushed to the stack.
    ///
    /// Bit 5 is unused and never stored.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const NEGATIVE = 1 << 7;
        const OVERFLOW = 1 << 6;
        const BREAK = 1 << 4;
        const DECIMAL = 1 << 3;
        const INTERRUPT_DISABLE = 1 << 2;
        const ZERO = 1 << 1;
        const CARRY = 1 << 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    X,
    Y,
}

impl FromStr for Register {
    type Err = EmuError;

    /// Only register names are accepted; flag names such as `c` or `z` are
    /// rejected like any other key.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(Register::A),
            "x" => Ok(Register::X),
            "y" => Ok(Register::Y),
            _ => Err(EmuError::InvalidRegisterAccess { key: s.to_string() }),
        }
    }
}

/// Registers A/X/Y and the flags.
///
/// Registers are only writable through [`Cpu::result`], so Z and N always
/// describe the last value stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    status: Status,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.a
    }

    #[inline]
    pub fn x(&self) -> u8 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn get(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
        }
    }

    /// Store `value` (wrapped to a byte) in `reg`, updating Z and N.
    pub fn set(&mut self, reg: Register, value: i32) -> u8 {
        let value = self.result(value);
        match reg {
            Register::A => self.a = value,
            Register::X => self.x = value,
            Register::Y => self.y = value,
        }
        value
    }

    /// [`Cpu::set`] keyed by name, for hosts that take register names as text.
    pub fn set_by_name(&mut self, key: &str, value: i32) -> Result<u8> {
        let reg = key.parse::<Register>()?;
        Ok(self.set(reg, value))
    }

    #[inline]
    pub fn set_a(&mut self, value: i32) -> u8 {
        self.set(Register::A, value)
    }

    #[inline]
    pub fn set_x(&mut self, value: i32) -> u8 {
        self.set(Register::X, value)
    }

    #[inline]
    pub fn set_y(&mut self, value: i32) -> u8 {
        self.set(Register::Y, value)
    }

    /// Wrap `value` to a byte and derive Z and N from it. Carry is untouched.
    pub fn result(&mut self, value: i32) -> u8 {
        let value = (value & 0xff) as u8;
        self.status.set(Status::ZERO, value == 0);
        self.status.set(Status::NEGATIVE, value & 0x80 != 0);
        value
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn flag(&self, flag: Status) -> bool {
        self.status.contains(flag)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Status, value: bool) {
        self.status.set(flag, value);
    }

    #[inline]
    pub fn carry(&self) -> bool {
        self.flag(Status::CARRY)
    }

    /// Carry as an addend for ADC/SBC.
    #[inline]
    pub fn carry_bit(&self) -> i32 {
        i32::from(self.carry())
    }

    pub fn set_carry(&mut self) {
        self.status.insert(Status::CARRY);
    }

    pub fn clear_carry(&mut self) {
        self.status.remove(Status::CARRY);
    }

    pub fn carry_if(&mut self, test: bool) {
        if test {
            self.set_carry()
        } else {
            self.clear_carry()
        }
    }

    pub fn set_overflow(&mut self) {
        self.status.insert(Status::OVERFLOW);
    }

    pub fn clear_overflow(&mut self) {
        self.status.remove(Status::OVERFLOW);
    }

    pub fn overflow_if(&mut self, test: bool) {
        if test {
            self.set_overflow()
        } else {
            self.clear_overflow()
        }
    }

    pub fn set_interrupt_disable(&mut self) {
        self.status.insert(Status::INTERRUPT_DISABLE);
    }

    pub fn clear_interrupt_disable(&mut self) {
        self.status.remove(Status::INTERRUPT_DISABLE);
    }

    pub fn pack_flags(&self) -> u8 {
        self.status.bits()
    }

    /// Restore every flag from its own bit of `value`.
    pub fn unpack_flags(&mut self, value: u8) {
        self.status = Status::from_bits_truncate(value);
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Status, char); 7] = [
            (Status::NEGATIVE, 'N'),
            (Status::OVERFLOW, 'V'),
            (Status::BREAK, 'B'),
            (Status::DECIMAL, 'D'),
            (Status::INTERRUPT_DISABLE, 'I'),
            (Status::ZERO, 'Z'),
            (Status::CARRY, 'C'),
        ];
        write!(f, "A=${:02X} X=${:02X} Y=${:02X} ", self.a, self.x, self.y)?;
        for (flag, name) in NAMES {
            let c = if self.flag(flag) { name } else { '-' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
