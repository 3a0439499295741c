use std::cell::RefCell;
use std::rc::Rc;

use retrosim_common::{Color, Framebuffer};

use super::*;
use crate::cpu::Status;
use crate::memory::{PROGRAM_OFFSET, STACK_ORIGIN};
use crate::opcodes::{AddressingMode as Mode, Mnemonic};

fn op(mnemonic: Mnemonic, mode: Mode) -> u8 {
    OpcodeTable::default()
        .opcode(mnemonic, mode)
        .unwrap_or_else(|| panic!("no opcode for {} {}", mnemonic, mode))
}

fn emulator(program: &[u8]) -> Emulator {
    let mut emu = Emulator::default();
    emu.load(program).unwrap();
    emu
}

#[test]
fn immediate_load() {
    let mut emu = emulator(&[0xa9, 0xaa]);
    assert_eq!(emu.step(), Ok(Step::Continue));

    assert_eq!(emu.cpu.a(), 0xaa);
    assert!(!emu.cpu.flag(Status::ZERO));
    assert!(emu.cpu.flag(Status::NEGATIVE));
    assert_eq!(emu.memory.pc, 0x0602);
    assert_eq!(emu.steps(), 1);
}

#[test]
fn countdown_loop_branches_three_times() {
    // LDX #$04; loop: DEX; BNE loop; BRK
    let program = [
        op(Mnemonic::LDX, Mode::Immediate),
        0x04,
        op(Mnemonic::DEX, Mode::Implicit),
        op(Mnemonic::BNE, Mode::Relative),
        0xfd,
        op(Mnemonic::BRK, Mode::Implicit),
    ];
    let mut emu = emulator(&program);

    let mut taken = 0;
    loop {
        let is_branch = emu.memory.pc == 0x0603;
        match emu.step().unwrap() {
            Step::Break => break,
            Step::Continue if is_branch && emu.memory.pc == 0x0602 => taken += 1,
            Step::Continue => {}
        }
    }

    assert_eq!(taken, 3);
    assert_eq!(emu.cpu.x(), 0);
    assert!(emu.cpu.flag(Status::ZERO));
    assert_eq!(emu.steps(), 10);
    assert_eq!(emu.state(), &RunState::Halted(Halt::Break));
}

#[test]
fn unknown_opcode_leaves_state_untouched() {
    let mut emu = emulator(&[0xa2, 0x07, 0x02, 0xea]);
    emu.step().unwrap();
    let cpu = emu.cpu;
    let sp = emu.memory.sp;

    let err = emu.step().unwrap_err();
    assert_eq!(
        err,
        EmuError::UnknownOpcode {
            opcode: 0x02,
            pc: 0x0602
        }
    );
    assert_eq!(emu.cpu, cpu);
    assert_eq!(emu.memory.pc, 0x0602);
    assert_eq!(emu.memory.sp, sp);
    assert_eq!(emu.steps(), 1);
    assert_eq!(emu.state(), &RunState::Halted(Halt::Fault(err.clone())));

    // A halted engine keeps reporting the same fault.
    assert_eq!(emu.step(), Err(err));
    assert_eq!(emu.memory.pc, 0x0602);
}

#[test]
fn unimplemented_mnemonic_is_distinct() {
    let mut emu = emulator(&[op(Mnemonic::RTI, Mode::Implicit)]);
    assert_eq!(
        emu.run(),
        Err(EmuError::UnimplementedMnemonic {
            mnemonic: Mnemonic::RTI
        })
    );
    assert!(emu.is_halted());
}

#[test]
fn break_is_not_an_error() {
    let mut emu = emulator(&[0xea, 0xea, 0x00]);
    assert_eq!(emu.run(), Ok(RunSummary { steps: 3 }));
    assert_eq!(emu.memory.pc, 0x0603);
    assert_eq!(emu.step(), Ok(Step::Break));
    assert_eq!(emu.steps(), 3);
}

#[test]
fn subroutine_call_and_return() {
    let program = [
        0x20, 0x07, 0x06, // JSR $0607
        0x8d, 0x00, 0x02, // STA $0200
        0x00, // BRK
        0xa9, 0x07, // LDA #$07
        0x18, // CLC
        0x69, 0x03, // ADC #$03
        0x60, // RTS
    ];
    let mut emu = emulator(&program);
    assert_eq!(emu.run(), Ok(RunSummary { steps: 7 }));

    assert_eq!(emu.cpu.a(), 0x0a);
    assert_eq!(emu.memory.read(0x0200), 0x0a);
    assert_eq!(emu.memory.sp, STACK_ORIGIN);
    assert_eq!(emu.memory.pc, 0x0607);
}

#[test]
fn nested_subroutines_unwind_in_order() {
    let program = [
        0x20, 0x04, 0x06, // 0600 JSR a
        0x00, // 0603 BRK
        0xe8, // 0604 a: INX
        0x20, 0x0a, 0x06, // 0605 JSR b
        0xe8, // 0608 INX
        0x60, // 0609 RTS
        0xc8, // 060A b: INY
        0x60, // 060B RTS
    ];
    let mut emu = emulator(&program);
    let mut trail = Vec::new();
    while emu.step().unwrap() == Step::Continue {
        trail.push(emu.memory.pc);
    }

    assert_eq!(
        trail,
        vec![0x0604, 0x0605, 0x060a, 0x060b, 0x0608, 0x0609, 0x0603]
    );
    assert_eq!(emu.memory.sp, STACK_ORIGIN);
    assert_eq!((emu.cpu.x(), emu.cpu.y()), (2, 1));
}

#[test]
fn indirect_indexed_store_and_load() {
    let program = [
        0xa9, 0x00, // LDA #$00
        0x85, 0x10, // STA $10
        0xa9, 0x30, // LDA #$30
        0x85, 0x11, // STA $11
        0xa0, 0x05, // LDY #$05
        0xa9, 0x5a, // LDA #$5A
        0x91, 0x10, // STA ($10),Y
        0xa9, 0x00, // LDA #$00
        0xb1, 0x10, // LDA ($10),Y
        0x00,
    ];
    let mut emu = emulator(&program);
    emu.run().unwrap();
    assert_eq!(emu.memory.read(0x3005), 0x5a);
    assert_eq!(emu.cpu.a(), 0x5a);
}

#[test]
fn indirect_jump() {
    let program = [
        0x6c, 0x00, 0x30, // JMP ($3000)
        0xe8, // INX, skipped
        0x00, // BRK
    ];
    let mut emu = emulator(&program);
    emu.memory.write(0x3000, 0x04);
    emu.memory.write(0x3001, 0x06);
    emu.run().unwrap();
    assert_eq!(emu.cpu.x(), 0);
    assert_eq!(emu.memory.pc, 0x0605);
}

#[test]
fn step_limit_stops_runaway_programs() {
    // loop: JMP loop
    let mut emu = emulator(&[0x4c, 0x00, 0x06]);
    assert_eq!(
        emu.run_for(100),
        Err(EmuError::StepLimitExceeded { limit: 100 })
    );
    assert_eq!(emu.steps(), 100);
    assert!(!emu.is_halted());
    assert_eq!(emu.memory.pc, PROGRAM_OFFSET);
}

#[test]
fn custom_table_drives_decoding() {
    let table = OpcodeTable::parse("01,LDA,IM\n02,BRK,#\n03,LDX,#\n").unwrap();
    let mut emu = Emulator::new(table);
    emu.load(&[0x01, 0x33, 0x02]).unwrap();
    assert_eq!(emu.run(), Ok(RunSummary { steps: 2 }));
    assert_eq!(emu.cpu.a(), 0x33);

    emu.load(&[0xa9, 0x01]).unwrap();
    assert!(matches!(
        emu.step(),
        Err(EmuError::UnknownOpcode { opcode: 0xa9, .. })
    ));

    emu.load(&[0x03]).unwrap();
    assert_eq!(
        emu.step(),
        Err(EmuError::MissingOperand {
            mnemonic: Mnemonic::LDX
        })
    );
}

#[test]
fn framebuffer_device_sees_stores() {
    let screen = Rc::new(RefCell::new(Framebuffer::new()));
    let mut emu = Emulator::default();
    emu.memory
        .map_device(Framebuffer::BASE..=Framebuffer::END, Box::new(screen.clone()))
        .unwrap();

    // LDA #$05; STA $0200; LDX #$21; STA $0200,X; BRK
    emu.load(&[0xa9, 0x05, 0x8d, 0x00, 0x02, 0xa2, 0x21, 0x9d, 0x00, 0x02, 0x00]).unwrap();
    emu.run().unwrap();

    let screen = screen.borrow();
    assert_eq!(screen.pixel(0, 0), Color::GREEN);
    assert_eq!(screen.pixel(1, 1), Color::GREEN);
    assert_eq!(screen.pixel(2, 2), Color::BLACK);
    assert_eq!(emu.memory.peek(0x0200), 0);
}

#[test]
fn reset_returns_to_running() {
    let mut emu = emulator(&[0x02]);
    assert!(emu.step().is_err());

    emu.reset();
    assert_eq!(emu.state(), &RunState::Running);
    assert_eq!(emu.memory.pc, PROGRAM_OFFSET);
    assert_eq!(emu.cpu, Cpu::new());

    emu.load(&[0x00]).unwrap();
    assert_eq!(emu.step(), Ok(Step::Break));
}

#[test]
fn shifts_on_accumulator_and_memory() {
    let program = [
        0xa9, 0x81, // LDA #$81
        0x0a, // ASL A
        0x85, 0x20, // STA $20
        0x66, 0x20, // ROR $20 (carry in from ASL)
        0x4a, // LSR A
        0x00,
    ];
    let mut emu = emulator(&program);
    emu.run().unwrap();
    assert_eq!(emu.memory.read(0x20), 0x81);
    assert_eq!(emu.cpu.a(), 0x01);
    assert!(!emu.cpu.carry());
}
