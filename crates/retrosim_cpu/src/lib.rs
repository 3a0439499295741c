//! Instruction-level 6502 execution engine.
//!
//! ```
//! use retrosim_cpu::{Emulator, Step};
//!
//! let mut emu = Emulator::default();
//! emu.load(&[0xa9, 0xaa, 0x00]).unwrap(); // LDA #$AA; BRK
//! assert_eq!(emu.step(), Ok(Step::Continue));
//! assert_eq!(emu.cpu.a(), 0xaa);
//! assert_eq!(emu.step(), Ok(Step::Break));
//! ```

pub mod addressing;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod instructions;
pub mod memory;
pub mod opcodes;

pub use cpu::{Cpu, Register, Status};
pub use emulator::{Emulator, Halt, RunState, RunSummary, Step};
pub use error::{EmuError, Result};
pub use memory::{Memory, PROGRAM_OFFSET, STACK_OFFSET, STACK_ORIGIN};
pub use opcodes::{AddressingMode, Mnemonic, OpcodeEntry, OpcodeTable};
