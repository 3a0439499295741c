//! Opcode decoding: mnemonic tags, addressing-mode tags and the
//! opcode-byte lookup table.
//!
//! The table is immutable once built. The built-in NMOS table is
//! materialised on first use; alternative tables come from the line format
//! understood by [`OpcodeTable::parse`]:
//!
//! ```text
//! ; comment
//! A9,LDA,IM
//! !02,KIL,#      <- excluded
//! ```

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

use crate::error::{EmuError, Result};

macro_rules! mnemonics {
    ($($name:ident),+ $(,)?) => {
        /// Instruction name tag.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Mnemonic {
            $($name),+
        }

        impl Mnemonic {
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$name),+];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Mnemonic::$name => stringify!($name)),+
                }
            }
        }
    };
}

mnemonics! {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
}

impl Mnemonic {
    pub const COUNT: usize = Mnemonic::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Mnemonic {
    type Err = EmuError;

    fn from_str(s: &str) -> Result<Self> {
        Mnemonic::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EmuError::UnknownMnemonic {
                name: s.to_string(),
            })
    }
}

/// How the bytes after an opcode turn into an effective address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand. Shift/rotate instructions then act on A.
    Implicit,
    /// Signed 8-bit branch offset from the following instruction.
    Relative,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `(zp,X)`
    IndexedIndirect,
    /// `(zp),Y`
    IndirectIndexed,
    /// `(abs)`, used by `JMP` only.
    Indirect,
}

impl AddressingMode {
    pub const ALL: [AddressingMode; 12] = [
        AddressingMode::Implicit,
        AddressingMode::Relative,
        AddressingMode::Immediate,
        AddressingMode::ZeroPage,
        AddressingMode::ZeroPageX,
        AddressingMode::ZeroPageY,
        AddressingMode::Absolute,
        AddressingMode::AbsoluteX,
        AddressingMode::AbsoluteY,
        AddressingMode::IndexedIndirect,
        AddressingMode::IndirectIndexed,
        AddressingMode::Indirect,
    ];

    /// Short code used in table files.
    pub const fn code(self) -> &'static str {
        match self {
            AddressingMode::Implicit => "#",
            AddressingMode::Relative => "@",
            AddressingMode::Immediate => "IM",
            AddressingMode::ZeroPage => "ZP",
            AddressingMode::ZeroPageX => "ZX",
            AddressingMode::ZeroPageY => "ZY",
            AddressingMode::Absolute => "AB",
            AddressingMode::AbsoluteX => "AX",
            AddressingMode::AbsoluteY => "AY",
            AddressingMode::IndexedIndirect => "IX",
            AddressingMode::IndirectIndexed => "IY",
            AddressingMode::Indirect => "IN",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        AddressingMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| EmuError::InvalidAddressingMode {
                code: code.to_string(),
            })
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpcodeEntry {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
}

/// Opcode byte to `(mnemonic, mode)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeTable {
    entries: [Option<OpcodeEntry>; 256],
}

lazy_static! {
    static ref BUILTIN_TABLE: OpcodeTable = OpcodeTable::from_static(BUILTIN_OPCODES);
}

impl Default for OpcodeTable {
    /// The documented NMOS instruction set.
    fn default() -> Self {
        *BUILTIN_TABLE
    }
}

impl OpcodeTable {
    pub fn empty() -> Self {
        Self {
            entries: [None; 256],
        }
    }

    fn from_static(list: &[(u8, Mnemonic, AddressingMode)]) -> Self {
        let mut table = Self::empty();
        for &(opcode, mnemonic, mode) in list {
            table.entries[opcode as usize] = Some(OpcodeEntry { mnemonic, mode });
        }
        table
    }

    /// Parse the line-oriented table format.
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::empty();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let entry = raw.trim();
            if entry.is_empty() || entry.starts_with('!') || entry.starts_with(';') {
                continue;
            }

            let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
            let &[opcode, mnemonic, mode] = fields.as_slice() else {
                return Err(EmuError::InvalidTableEntry {
                    line,
                    message: format!("expected `opcode,mnemonic,mode`, got {:?}", entry),
                });
            };

            let digits = opcode
                .trim_start_matches("0x")
                .trim_start_matches("0X")
                .trim_start_matches('$');
            let opcode = u8::from_str_radix(digits, 16).map_err(|e| EmuError::InvalidTableEntry {
                line,
                message: format!("bad opcode {:?}: {}", opcode, e),
            })?;
            let mnemonic = mnemonic.parse::<Mnemonic>()?;
            let mode = AddressingMode::from_code(mode)?;

            if let Some(previous) = table.insert(opcode, mnemonic, mode) {
                return Err(EmuError::InvalidTableEntry {
                    line,
                    message: format!(
                        "opcode 0x{:02X} already maps to {} {}",
                        opcode, previous.mnemonic, previous.mode
                    ),
                });
            }
        }
        log::debug!("parsed opcode table with {} entries", table.len());
        Ok(table)
    }

    /// Map `opcode`, returning the entry it replaced.
    pub fn insert(
        &mut self,
        opcode: u8,
        mnemonic: Mnemonic,
        mode: AddressingMode,
    ) -> Option<OpcodeEntry> {
        self.entries[opcode as usize].replace(OpcodeEntry { mnemonic, mode })
    }

    #[inline]
    pub fn get(&self, opcode: u8) -> Option<OpcodeEntry> {
        self.entries[opcode as usize]
    }

    /// Reverse lookup.
    pub fn opcode(&self, mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
        self.iter()
            .find(|(_, e)| e.mnemonic == mnemonic && e.mode == mode)
            .map(|(opcode, _)| opcode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, OpcodeEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|e| (i as u8, e)))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// The 151 documented NMOS opcodes. `data/6502.csv` is the same table in the
// text format, as a starting point for custom tables; `text_table_matches_builtin`
// keeps the two equal. Holding the default in code leaves it no load-time
// failure path.
const BUILTIN_OPCODES: &[(u8, Mnemonic, AddressingMode)] = {
    use AddressingMode::*;
    use Mnemonic::*;
    &[
        (0x00, BRK, Implicit),
        (0x01, ORA, IndexedIndirect),
        (0x05, ORA, ZeroPage),
        (0x06, ASL, ZeroPage),
        (0x08, PHP, Implicit),
        (0x09, ORA, Immediate),
        (0x0A, ASL, Implicit),
        (0x0D, ORA, Absolute),
        (0x0E, ASL, Absolute),
        (0x10, BPL, Relative),
        (0x11, ORA, IndirectIndexed),
        (0x15, ORA, ZeroPageX),
        (0x16, ASL, ZeroPageX),
        (0x18, CLC, Implicit),
        (0x19, ORA, AbsoluteY),
        (0x1D, ORA, AbsoluteX),
        (0x1E, ASL, AbsoluteX),
        (0x20, JSR, Absolute),
        (0x21, AND, IndexedIndirect),
        (0x24, BIT, ZeroPage),
        (0x25, AND, ZeroPage),
        (0x26, ROL, ZeroPage),
        (0x28, PLP, Implicit),
        (0x29, AND, Immediate),
        (0x2A, ROL, Implicit),
        (0x2C, BIT, Absolute),
        (0x2D, AND, Absolute),
        (0x2E, ROL, Absolute),
        (0x30, BMI, Relative),
        (0x31, AND, IndirectIndexed),
        (0x35, AND, ZeroPageX),
        (0x36, ROL, ZeroPageX),
        (0x38, SEC, Implicit),
        (0x39, AND, AbsoluteY),
        (0x3D, AND, AbsoluteX),
        (0x3E, ROL, AbsoluteX),
        (0x40, RTI, Implicit),
        (0x41, EOR, IndexedIndirect),
        (0x45, EOR, ZeroPage),
        (0x46, LSR, ZeroPage),
        (0x48, PHA, Implicit),
        (0x49, EOR, Immediate),
        (0x4A, LSR, Implicit),
        (0x4C, JMP, Absolute),
        (0x4D, EOR, Absolute),
        (0x4E, LSR, Absolute),
        (0x50, BVC, Relative),
        (0x51, EOR, IndirectIndexed),
        (0x55, EOR, ZeroPageX),
        (0x56, LSR, ZeroPageX),
        (0x58, CLI, Implicit),
        (0x59, EOR, AbsoluteY),
        (0x5D, EOR, AbsoluteX),
        (0x5E, LSR, AbsoluteX),
        (0x60, RTS, Implicit),
        (0x61, ADC, IndexedIndirect),
        (0x65, ADC, ZeroPage),
        (0x66, ROR, ZeroPage),
        (0x68, PLA, Implicit),
        (0x69, ADC, Immediate),
        (0x6A, ROR, Implicit),
        (0x6C, JMP, Indirect),
        (0x6D, ADC, Absolute),
        (0x6E, ROR, Absolute),
        (0x70, BVS, Relative),
        (0x71, ADC, IndirectIndexed),
        (0x75, ADC, ZeroPageX),
        (0x76, ROR, ZeroPageX),
        (0x78, SEI, Implicit),
        (0x79, ADC, AbsoluteY),
        (0x7D, ADC, AbsoluteX),
        (0x7E, ROR, AbsoluteX),
        (0x81, STA, IndexedIndirect),
        (0x84, STY, ZeroPage),
        (0x85, STA, ZeroPage),
        (0x86, STX, ZeroPage),
        (0x88, DEY, Implicit),
        (0x8A, TXA, Implicit),
        (0x8C, STY, Absolute),
        (0x8D, STA, Absolute),
        (0x8E, STX, Absolute),
        (0x90, BCC, Relative),
        (0x91, STA, IndirectIndexed),
        (0x94, STY, ZeroPageX),
        (0x95, STA, ZeroPageX),
        (0x96, STX, ZeroPageY),
        (0x98, TYA, Implicit),
        (0x99, STA, AbsoluteY),
        (0x9A, TXS, Implicit),
        (0x9D, STA, AbsoluteX),
        (0xA0, LDY, Immediate),
        (0xA1, LDA, IndexedIndirect),
        (0xA2, LDX, Immediate),
        (0xA4, LDY, ZeroPage),
        (0xA5, LDA, ZeroPage),
        (0xA6, LDX, ZeroPage),
        (0xA8, TAY, Implicit),
        (0xA9, LDA, Immediate),
        (0xAA, TAX, Implicit),
        (0xAC, LDY, Absolute),
        (0xAD, LDA, Absolute),
        (0xAE, LDX, Absolute),
        (0xB0, BCS, Relative),
        (0xB1, LDA, IndirectIndexed),
        (0xB4, LDY, ZeroPageX),
        (0xB5, LDA, ZeroPageX),
        (0xB6, LDX, ZeroPageY),
        (0xB8, CLV, Implicit),
        (0xB9, LDA, AbsoluteY),
        (0xBA, TSX, Implicit),
        (0xBC, LDY, AbsoluteX),
        (0xBD, LDA, AbsoluteX),
        (0xBE, LDX, AbsoluteY),
        (0xC0, CPY, Immediate),
        (0xC1, CMP, IndexedIndirect),
        (0xC4, CPY, ZeroPage),
        (0xC5, CMP, ZeroPage),
        (0xC6, DEC, ZeroPage),
        (0xC8, INY, Implicit),
        (0xC9, CMP, Immediate),
        (0xCA, DEX, Implicit),
        (0xCC, CPY, Absolute),
        (0xCD, CMP, Absolute),
        (0xCE, DEC, Absolute),
        (0xD0, BNE, Relative),
        (0xD1, CMP, IndirectIndexed),
        (0xD5, CMP, ZeroPageX),
        (0xD6, DEC, ZeroPageX),
        (0xD8, CLD, Implicit),
        (0xD9, CMP, AbsoluteY),
        (0xDD, CMP, AbsoluteX),
        (0xDE, DEC, AbsoluteX),
        (0xE0, CPX, Immediate),
        (0xE1, SBC, IndexedIndirect),
        (0xE4, CPX, ZeroPage),
        (0xE5, SBC, ZeroPage),
        (0xE6, INC, ZeroPage),
        (0xE8, INX, Implicit),
        (0xE9, SBC, Immediate),
        (0xEA, NOP, Implicit),
        (0xEC, CPX, Absolute),
        (0xED, SBC, Absolute),
        (0xEE, INC, Absolute),
        (0xF0, BEQ, Relative),
        (0xF1, SBC, IndirectIndexed),
        (0xF5, SBC, ZeroPageX),
        (0xF6, INC, ZeroPageX),
        (0xF8, SED, Implicit),
        (0xF9, SBC, AbsoluteY),
        (0xFD, SBC, AbsoluteX),
        (0xFE, INC, AbsoluteX),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTIN_TEXT: &str = include_str!("../data/6502.csv");

    #[test]
    fn builtin_table_covers_documented_set() {
        let table = OpcodeTable::default();
        assert_eq!(table.len(), 151);
        for m in Mnemonic::ALL {
            assert!(table.iter().any(|(_, e)| e.mnemonic == *m), "{} missing", m);
        }
        assert_eq!(
            table.get(0xa9),
            Some(OpcodeEntry {
                mnemonic: Mnemonic::LDA,
                mode: AddressingMode::Immediate
            })
        );
        assert_eq!(table.get(0x02), None);
        assert_eq!(table.get(0xff), None);
    }

    #[test]
    fn text_table_matches_builtin() {
        let parsed = OpcodeTable::parse(BUILTIN_TEXT).unwrap();
        assert_eq!(parsed, OpcodeTable::default());
    }

    #[test]
    fn excluded_and_comment_lines_are_skipped() {
        let text = "; header\n\n!A9,LDA,IM\n0xea,nop,#\n$4C, JMP , ab\n";
        let table = OpcodeTable::parse(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0xa9), None);
        assert_eq!(table.get(0xea).map(|e| e.mnemonic), Some(Mnemonic::NOP));
        assert_eq!(table.get(0x4c).map(|e| e.mode), Some(AddressingMode::Absolute));
    }

    #[test]
    fn invalid_mode_code_is_reported() {
        assert_eq!(
            OpcodeTable::parse("A9,LDA,QQ"),
            Err(EmuError::InvalidAddressingMode {
                code: "QQ".to_string()
            })
        );
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        assert_eq!(
            OpcodeTable::parse("02,KIL,#"),
            Err(EmuError::UnknownMnemonic {
                name: "KIL".to_string()
            })
        );
    }

    #[test]
    fn malformed_lines_are_reported_with_line_number() {
        let err = OpcodeTable::parse("EA,NOP,#\nA9,LDA").unwrap_err();
        assert!(matches!(err, EmuError::InvalidTableEntry { line: 2, .. }));

        let err = OpcodeTable::parse("ZZ,NOP,#").unwrap_err();
        assert!(matches!(err, EmuError::InvalidTableEntry { line: 1, .. }));
    }

    #[test]
    fn duplicate_opcodes_are_rejected() {
        let err = OpcodeTable::parse("EA,NOP,#\nEA,BRK,#").unwrap_err();
        assert!(matches!(err, EmuError::InvalidTableEntry { line: 2, .. }));
    }

    #[test]
    fn reverse_lookup() {
        let table = OpcodeTable::default();
        assert_eq!(table.opcode(Mnemonic::LDA, AddressingMode::Immediate), Some(0xa9));
        assert_eq!(table.opcode(Mnemonic::JMP, AddressingMode::Indirect), Some(0x6c));
        assert_eq!(table.opcode(Mnemonic::STA, AddressingMode::Immediate), None);
    }

    #[test]
    fn mode_codes_round_trip() {
        for mode in AddressingMode::ALL {
            assert_eq!(AddressingMode::from_code(mode.code()), Ok(mode));
        }
    }

    #[test]
    fn mnemonic_names() {
        assert_eq!(Mnemonic::COUNT, 56);
        assert_eq!("lda".parse::<Mnemonic>(), Ok(Mnemonic::LDA));
        assert_eq!(Mnemonic::TYA.to_string(), "TYA");
        for (i, m) in Mnemonic::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
    }
}
