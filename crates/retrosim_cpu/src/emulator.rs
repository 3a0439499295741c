use crate::addressing;
use crate::cpu::Cpu;
use crate::error::{EmuError, Result};
use crate::instructions;
use crate::memory::Memory;
use crate::opcodes::{OpcodeEntry, OpcodeTable};

/// Why the engine stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Halt {
    /// `BRK` executed: normal end of program.
    Break,
    Fault(EmuError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted(Halt),
}

/// Outcome of a single successful step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Break,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed since the last load or reset, `BRK` included.
    pub steps: u64,
}

/// Fetch-decode-execute loop over one [`Memory`] and one [`Cpu`].
pub struct Emulator {
    pub memory: Memory,
    pub cpu: Cpu,
    table: OpcodeTable,
    state: RunState,
    steps: u64,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(OpcodeTable::default())
    }
}

impl Emulator {
    pub fn new(table: OpcodeTable) -> Self {
        Self {
            memory: Memory::new(),
            cpu: Cpu::new(),
            table,
            state: RunState::Running,
            steps: 0,
        }
    }

    /// Load a raw program image at the program offset and get ready to run it.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        self.memory.load(program)?;
        self.state = RunState::Running;
        self.steps = 0;
        Ok(())
    }

    /// Clear memory and registers. Mapped devices stay attached.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.cpu.reset();
        self.state = RunState::Running;
        self.steps = 0;
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, RunState::Halted(_))
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Execute one instruction.
    ///
    /// Once halted, further calls report the same halt without executing.
    pub fn step(&mut self) -> Result<Step> {
        match &self.state {
            RunState::Halted(Halt::Break) => return Ok(Step::Break),
            RunState::Halted(Halt::Fault(e)) => return Err(e.clone()),
            RunState::Running => {}
        }

        match self.execute() {
            Ok(Step::Continue) => {
                self.steps += 1;
                Ok(Step::Continue)
            }
            Ok(Step::Break) => {
                self.steps += 1;
                log::debug!(
                    "BRK at 0x{:04X} after {} steps",
                    self.memory.pc.wrapping_sub(1),
                    self.steps
                );
                self.state = RunState::Halted(Halt::Break);
                Ok(Step::Break)
            }
            Err(e) => {
                log::warn!("halted: {}", e);
                self.state = RunState::Halted(Halt::Fault(e.clone()));
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<Step> {
        let pc = self.memory.pc;
        let opcode = self.memory.next();
        let Some(OpcodeEntry { mnemonic, mode }) = self.table.get(opcode) else {
            self.memory.pc = pc;
            return Err(EmuError::UnknownOpcode { opcode, pc });
        };

        let e = addressing::resolve(mode, &mut self.memory, self.cpu.x(), self.cpu.y());
        log::trace!(
            "{:04X}  {:02X}  {} {:<2} {:>6}  {}",
            pc,
            opcode,
            mnemonic,
            mode,
            e.map(|a| format!("${:04X}", a)).unwrap_or_default(),
            self.cpu
        );

        let behavior = instructions::behavior(mnemonic);
        let Some(handler) = behavior.handler else {
            return Err(EmuError::UnimplementedMnemonic { mnemonic });
        };
        if behavior.needs_address && e.is_none() {
            return Err(EmuError::MissingOperand { mnemonic });
        }
        Ok(handler(&mut self.cpu, &mut self.memory, e))
    }

    /// Step until `BRK` or a fault.
    pub fn run(&mut self) -> Result<RunSummary> {
        loop {
            if self.step()? == Step::Break {
                return Ok(RunSummary { steps: self.steps });
            }
        }
    }

    /// Like [`Emulator::run`], giving up after `limit` instructions.
    ///
    /// Hitting the limit does not halt the engine; the caller may keep going.
    pub fn run_for(&mut self, limit: u64) -> Result<RunSummary> {
        for _ in 0..limit {
            if self.step()? == Step::Break {
                return Ok(RunSummary { steps: self.steps });
            }
        }
        log::warn!(
            "no BRK after {} instructions, pc=0x{:04X}",
            limit,
            self.memory.pc
        );
        Err(EmuError::StepLimitExceeded { limit })
    }
}

#[cfg(test)]
mod tests;
