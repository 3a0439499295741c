//! Effective-address resolution.
//!
//! Operand bytes are always consumed through [`Memory::next`], so `pc` ends
//! up on the following instruction. Address arithmetic wraps at 64KB;
//! zero-page indexing does not wrap inside page zero.

use crate::memory::Memory;
use crate::opcodes::AddressingMode;

/// Consume the operand of an instruction in `mode` and return where it points.
///
/// `None` for implicit instructions. For immediate operands the result is
/// the address of the operand byte itself.
pub fn resolve(mode: AddressingMode, mem: &mut Memory, x: u8, y: u8) -> Option<u16> {
    let (x, y) = (x as u16, y as u16);
    let addr = match mode {
        AddressingMode::Implicit => return None,
        AddressingMode::Relative => {
            let offset = mem.next() as u16;
            if offset < 0x80 {
                mem.pc.wrapping_add(offset)
            } else {
                mem.pc.wrapping_sub(0x100 - offset)
            }
        }
        AddressingMode::Immediate => {
            let addr = mem.pc;
            mem.next();
            addr
        }
        AddressingMode::ZeroPage => mem.next() as u16,
        AddressingMode::ZeroPageX => mem.next() as u16 + x,
        AddressingMode::ZeroPageY => mem.next() as u16 + y,
        AddressingMode::Absolute => fetch_word(mem),
        AddressingMode::AbsoluteX => fetch_word(mem).wrapping_add(x),
        AddressingMode::AbsoluteY => fetch_word(mem).wrapping_add(y),
        AddressingMode::IndexedIndirect => {
            let e = mem.next() as u16;
            read_pointer(mem, e + x)
        }
        AddressingMode::IndirectIndexed => {
            let e = mem.next() as u16;
            read_pointer(mem, e).wrapping_add(y)
        }
        AddressingMode::Indirect => {
            let ptr = fetch_word(mem);
            read_pointer(mem, ptr)
        }
    };
    Some(addr)
}

fn fetch_word(mem: &mut Memory) -> u16 {
    let low = mem.next();
    let high = mem.next();
    Memory::int16([low, high])
}

fn read_pointer(mem: &mut Memory, addr: u16) -> u16 {
    let low = mem.read(addr);
    let high = mem.read(addr.wrapping_add(1));
    Memory::int16([low, high])
}
