use thiserror::Error;

use crate::opcodes::Mnemonic;

/// Everything that can stop a run other than `BRK`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmuError {
    #[error("no operation matches opcode 0x{opcode:02X} at 0x{pc:04X}")]
    UnknownOpcode { opcode: u8, pc: u16 },

    #[error("mnemonic {mnemonic} is recognised but not implemented")]
    UnimplementedMnemonic { mnemonic: Mnemonic },

    #[error("{mnemonic} needs an operand address but its addressing mode supplies none")]
    MissingOperand { mnemonic: Mnemonic },

    #[error("invalid addressing mode code {code:?}")]
    InvalidAddressingMode { code: String },

    #[error("{key:?} is not a register")]
    InvalidRegisterAccess { key: String },

    #[error("unknown mnemonic {name:?}")]
    UnknownMnemonic { name: String },

    #[error("opcode table line {line}: {message}")]
    InvalidTableEntry { line: usize, message: String },

    #[error(
        "device at 0x{start:04X}-0x{end:04X} overlaps 0x{existing_start:04X}-0x{existing_end:04X}"
    )]
    DeviceOverlap {
        start: u16,
        end: u16,
        existing_start: u16,
        existing_end: u16,
    },

    #[error("program of {len} bytes does not fit in {capacity} bytes above the load address")]
    ProgramTooLarge { len: usize, capacity: usize },

    #[error("step limit of {limit} instructions reached without BRK")]
    StepLimitExceeded { limit: u64 },
}

pub type Result<T> = std::result::Result<T, EmuError>;
