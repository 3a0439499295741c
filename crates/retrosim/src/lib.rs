pub mod cli;

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;

use retrosim_common::{Framebuffer, KeyLatch, RandomByte};
use retrosim_cpu::{Cpu, Emulator, OpcodeTable, RunSummary};

pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

#[derive(TypedBuilder, Clone, Debug)]
pub struct RunConfig {
    /// `None` runs until `BRK` no matter how long it takes.
    #[builder(default = Some(DEFAULT_MAX_STEPS))]
    pub max_steps: Option<u64>,
    /// Map the random source, key latch and framebuffer.
    #[builder(default = true)]
    pub devices: bool,
    /// Initial register values, by register name.
    #[builder(default)]
    pub registers: Vec<(String, u8)>,
    /// Replaces the built-in opcode table.
    #[builder(default, setter(strip_option))]
    pub table: Option<OpcodeTable>,
    /// Key code waiting in the key latch when the program starts.
    #[builder(default, setter(strip_option))]
    pub key: Option<u8>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig::builder().build()
    }
}

/// Machine state after a program finished with `BRK`.
#[derive(Debug)]
pub struct Report {
    pub summary: RunSummary,
    pub cpu: Cpu,
    pub pc: u16,
    pub sp: u8,
    pub screen: Option<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} PC=${:04X} SP=${:02X} steps={}",
            self.cpu, self.pc, self.sp, self.summary.steps
        )?;
        if let Some(screen) = &self.screen {
            write!(f, "{}", screen)?;
        }
        Ok(())
    }
}

pub fn load_table(path: &Path) -> Result<OpcodeTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read opcode table {}", path.display()))?;
    let table = OpcodeTable::parse(&text)
        .with_context(|| format!("invalid opcode table {}", path.display()))?;
    log::info!("using opcode table {} ({} opcodes)", path.display(), table.len());
    Ok(table)
}

pub fn run(program: &[u8], config: RunConfig) -> Result<Report> {
    let RunConfig {
        max_steps,
        devices,
        registers,
        table,
        key,
    } = config;

    let mut emu = Emulator::new(table.unwrap_or_default());

    let screen = if devices {
        let screen = Rc::new(RefCell::new(Framebuffer::new()));
        emu.memory
            .map_device(RandomByte::ADDRESS..=RandomByte::ADDRESS, Box::new(RandomByte))?;
        let mut latch = KeyLatch::default();
        if let Some(key) = key {
            latch.press(key);
        }
        emu.memory
            .map_device(KeyLatch::ADDRESS..=KeyLatch::ADDRESS, Box::new(latch))?;
        emu.memory.map_device(
            Framebuffer::BASE..=Framebuffer::END,
            Box::new(screen.clone()),
        )?;
        Some(screen)
    } else {
        None
    };

    for (name, value) in &registers {
        emu.cpu
            .set_by_name(name, i32::from(*value))
            .with_context(|| format!("cannot preset {}", name))?;
    }

    emu.load(program).context("failed to load program")?;

    let outcome = match max_steps {
        Some(limit) => emu.run_for(limit),
        None => emu.run(),
    };
    let summary = outcome.with_context(|| {
        format!(
            "program stopped at pc=0x{:04X} after {} steps ({})",
            emu.memory.pc,
            emu.steps(),
            emu.cpu
        )
    })?;
    log::info!("program finished after {} steps", summary.steps);

    let screen = screen.and_then(|screen| {
        let mut fb = screen.borrow_mut();
        fb.take_dirty().then(|| fb.render_text())
    });

    Ok(Report {
        summary,
        cpu: emu.cpu,
        pc: emu.memory.pc,
        sp: emu.memory.sp,
        screen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrosim_cpu::{EmuError, Mnemonic};

    #[test]
    fn runs_to_break() {
        // LDA #$AA; BRK
        let report = run(&[0xa9, 0xaa, 0x00], RunConfig::default()).unwrap();
        assert_eq!(report.cpu.a(), 0xaa);
        assert_eq!(report.summary.steps, 2);
        assert_eq!(report.pc, 0x0603);
        assert!(report.screen.is_none());
        assert!(report.to_string().starts_with("A=$AA X=$00 Y=$00 N------ PC=$0603"));
    }

    #[test]
    fn report_debug_names_fields() {
        let report = run(&[0x00], RunConfig::default()).unwrap();
        let text = format!("{:?}", report);
        assert!(text.contains("steps: 1"));
        assert!(text.contains("screen: None"));
    }

    #[test]
    fn preset_key_is_readable_at_ff() {
        // LDA $FF; BRK
        let config = RunConfig::builder().key(b'w').build();
        let report = run(&[0xa5, 0xff, 0x00], config).unwrap();
        assert_eq!(report.cpu.a(), b'w');

        let report = run(&[0xa5, 0xff, 0x00], RunConfig::default()).unwrap();
        assert_eq!(report.cpu.a(), 0);
    }

    #[test]
    fn preset_registers() {
        // TXA; BRK
        let config = RunConfig::builder()
            .registers(vec![("x".to_string(), 0x42)])
            .build();
        let report = run(&[0x8a, 0x00], config).unwrap();
        assert_eq!(report.cpu.a(), 0x42);
    }

    #[test]
    fn flag_names_are_rejected_as_registers() {
        let config = RunConfig::builder()
            .registers(vec![("c".to_string(), 1)])
            .build();
        let err = run(&[0x00], config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EmuError>(),
            Some(&EmuError::InvalidRegisterAccess {
                key: "c".to_string()
            })
        );
    }

    #[test]
    fn step_limit_reports_position() {
        let config = RunConfig::builder().max_steps(Some(10)).build();
        let err = run(&[0x4c, 0x00, 0x06], config).unwrap_err();
        assert!(err.to_string().contains("pc=0x0600"));
        assert_eq!(
            err.downcast_ref::<EmuError>(),
            Some(&EmuError::StepLimitExceeded { limit: 10 })
        );
    }

    #[test]
    fn screen_is_reported_when_drawn() {
        // LDA #$01; STA $0200; BRK
        let report = run(&[0xa9, 0x01, 0x8d, 0x00, 0x02, 0x00], RunConfig::default()).unwrap();
        let screen = report.screen.unwrap();
        assert!(screen.starts_with("#..."));
    }

    #[test]
    fn without_devices_the_screen_is_plain_ram() {
        let config = RunConfig::builder().devices(false).build();
        let report = run(&[0xa9, 0x01, 0x8d, 0x00, 0x02, 0x00], config).unwrap();
        assert!(report.screen.is_none());
    }

    #[test]
    fn custom_table() {
        let table = OpcodeTable::parse("00,BRK,#\n01,INX,#\n").unwrap();
        let config = RunConfig::builder().table(table).build();
        let report = run(&[0x01, 0x01, 0x00], config).unwrap();
        assert_eq!(report.cpu.x(), 2);

        let table = OpcodeTable::parse("00,BRK,#\n01,RTI,#\n").unwrap();
        let config = RunConfig::builder().table(table).build();
        let err = run(&[0x01], config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EmuError>(),
            Some(&EmuError::UnimplementedMnemonic {
                mnemonic: Mnemonic::RTI
            })
        );
    }
}
