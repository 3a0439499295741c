//! Instruction semantics, one plain function per mnemonic.
//!
//! Each handler receives the processor state, memory and the resolved
//! effective address explicitly and mutates them in place. The catalogue
//! maps every [`Mnemonic`] to its handler and is built once, on first use.

use lazy_static::lazy_static;

use crate::cpu::{Cpu, Status};
use crate::emulator::Step;
use crate::memory::Memory;
use crate::opcodes::Mnemonic;

pub(crate) type Handler = fn(&mut Cpu, &mut Memory, Option<u16>) -> Step;

#[derive(Clone, Copy)]
pub struct Behavior {
    pub mnemonic: Mnemonic,
    /// Flags the instruction may change. Informational only.
    pub affects: Status,
    /// The handler dereferences the effective address, so it must be present.
    pub needs_address: bool,
    /// `None` marks a recognised mnemonic that is not supported.
    pub(crate) handler: Option<Handler>,
}

impl Behavior {
    pub fn is_implemented(&self) -> bool {
        self.handler.is_some()
    }
}

lazy_static! {
    static ref CATALOGUE: [Behavior; Mnemonic::COUNT] =
        std::array::from_fn(|i| describe(Mnemonic::ALL[i]));
}

pub fn behavior(mnemonic: Mnemonic) -> &'static Behavior {
    &CATALOGUE[mnemonic.index()]
}

const NZ: Status = Status::NEGATIVE.union(Status::ZERO);
const NZC: Status = NZ.union(Status::CARRY);
const NVZC: Status = NZC.union(Status::OVERFLOW);
const NONE: Status = Status::empty();

fn describe(mnemonic: Mnemonic) -> Behavior {
    use Mnemonic::*;

    let (affects, needs_address, handler): (Status, bool, Option<Handler>) = match mnemonic {
        ADC => (NVZC, true, Some(adc)),
        SBC => (NVZC, true, Some(sbc)),
        AND => (NZ, true, Some(and)),
        ORA => (NZ, true, Some(ora)),
        EOR => (NZ, true, Some(eor)),
        BIT => (NZ.union(Status::OVERFLOW), true, Some(bit)),
        CMP => (NZC, true, Some(cmp)),
        CPX => (NZC, true, Some(cpx)),
        CPY => (NZC, true, Some(cpy)),

        ASL => (NZC, false, Some(asl)),
        LSR => (NZC, false, Some(lsr)),
        ROL => (NZC, false, Some(rol)),
        ROR => (NZC, false, Some(ror)),

        INC => (NZ, true, Some(inc)),
        DEC => (NZ, true, Some(dec)),
        INX => (NZ, false, Some(inx)),
        INY => (NZ, false, Some(iny)),
        DEX => (NZ, false, Some(dex)),
        DEY => (NZ, false, Some(dey)),

        LDA => (NZ, true, Some(lda)),
        LDX => (NZ, true, Some(ldx)),
        LDY => (NZ, true, Some(ldy)),
        STA => (NONE, true, Some(sta)),
        STX => (NONE, true, Some(stx)),
        STY => (NONE, true, Some(sty)),

        TAX => (NZ, false, Some(tax)),
        TAY => (NZ, false, Some(tay)),
        TXA => (NZ, false, Some(txa)),
        TYA => (NZ, false, Some(tya)),
        TSX => (NZ, false, Some(tsx)),
        TXS => (NONE, false, Some(txs)),

        PHA => (NONE, false, Some(pha)),
        PLA => (NZ, false, Some(pla)),
        PHP => (NONE, false, Some(php)),
        PLP => (Status::all(), false, Some(plp)),

        BCC => (NONE, true, Some(bcc)),
        BCS => (NONE, true, Some(bcs)),
        BEQ => (NONE, true, Some(beq)),
        BNE => (NONE, true, Some(bne)),
        BMI => (NONE, true, Some(bmi)),
        BPL => (NONE, true, Some(bpl)),
        BVC => (NONE, true, Some(bvc)),
        BVS => (NONE, true, Some(bvs)),

        JMP => (NONE, true, Some(jmp)),
        JSR => (NONE, true, Some(jsr)),
        RTS => (NONE, false, Some(rts)),
        // Interrupt return needs the vector machinery, which is not modelled.
        RTI => (Status::all(), false, None),

        CLC => (Status::CARRY, false, Some(clc)),
        SEC => (Status::CARRY, false, Some(sec)),
        CLD => (Status::DECIMAL, false, Some(cld)),
        SED => (Status::DECIMAL, false, Some(sed)),
        CLI => (Status::INTERRUPT_DISABLE, false, Some(cli)),
        SEI => (Status::INTERRUPT_DISABLE, false, Some(sei)),
        CLV => (Status::OVERFLOW, false, Some(clv)),

        NOP => (NONE, false, Some(nop)),
        BRK => (NONE, false, Some(brk)),
    };

    Behavior {
        mnemonic,
        affects,
        needs_address,
        handler,
    }
}

// The engine only calls `needs_address` handlers with `Some`.
#[inline]
fn addr(e: Option<u16>) -> u16 {
    debug_assert!(e.is_some(), "handler needs an effective address");
    e.unwrap_or_default()
}

#[inline]
fn operand(mem: &mut Memory, e: Option<u16>) -> i32 {
    i32::from(mem.read(addr(e)))
}

fn adc(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let a = i32::from(cpu.a());
    let m = operand(mem, e);
    let t = a + m + cpu.carry_bit();

    cpu.carry_if(t > 0xff);
    cpu.overflow_if(!(a ^ m) & (a ^ t) & 0x80 != 0);
    cpu.set_a(t);
    Step::Continue
}

fn sbc(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let a = i32::from(cpu.a());
    let m = operand(mem, e);
    let t = a - m - (1 - cpu.carry_bit());

    cpu.carry_if(t >= 0);
    cpu.overflow_if((a ^ m) & (a ^ t) & 0x80 != 0);
    cpu.set_a(t);
    Step::Continue
}

fn and(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_a(i32::from(cpu.a()) & m);
    Step::Continue
}

fn ora(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_a(i32::from(cpu.a()) | m);
    Step::Continue
}

fn eor(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_a(i32::from(cpu.a()) ^ m);
    Step::Continue
}

/// Z from `A & M`, N and V straight from bits 7 and 6 of M.
fn bit(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = mem.read(addr(e));
    cpu.set_flag(Status::ZERO, cpu.a() & m == 0);
    cpu.set_flag(Status::NEGATIVE, m & 0x80 != 0);
    cpu.set_flag(Status::OVERFLOW, m & 0x40 != 0);
    Step::Continue
}

/// Flags as for `reg - M`; the register keeps its value.
fn compare(cpu: &mut Cpu, reg: u8, m: i32) {
    let reg = i32::from(reg);
    cpu.carry_if(reg >= m);
    cpu.result(reg - m);
}

fn cmp(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    let reg = cpu.a();
    compare(cpu, reg, m);
    Step::Continue
}

fn cpx(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    let reg = cpu.x();
    compare(cpu, reg, m);
    Step::Continue
}

fn cpy(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    let reg = cpu.y();
    compare(cpu, reg, m);
    Step::Continue
}

/// Shared read-modify-write for shifts and rotates. Without an address the
/// accumulator is the target. `op` returns the unmasked result and carry-out.
fn shift(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>, op: fn(i32, i32) -> (i32, bool)) {
    let value = match e {
        Some(addr) => i32::from(mem.read(addr)),
        None => i32::from(cpu.a()),
    };
    let (t, carry) = op(value, cpu.carry_bit());
    cpu.carry_if(carry);
    match e {
        Some(addr) => {
            let t = cpu.result(t);
            mem.write(addr, t);
        }
        None => {
            cpu.set_a(t);
        }
    }
}

fn asl(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    shift(cpu, mem, e, |v, _| (v << 1, v > 0x7f));
    Step::Continue
}

fn lsr(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    shift(cpu, mem, e, |v, _| ((v >> 1) & 0x7f, v & 0x01 == 1));
    Step::Continue
}

fn rol(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    shift(cpu, mem, e, |v, c| ((v << 1) | c, v & 0x80 != 0));
    Step::Continue
}

fn ror(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    shift(cpu, mem, e, |v, c| ((v >> 1) | (c << 7), v & 0x01 == 1));
    Step::Continue
}

fn inc(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let addr = addr(e);
    let t = cpu.result(i32::from(mem.read(addr)) + 1);
    mem.write(addr, t);
    Step::Continue
}

fn dec(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let addr = addr(e);
    let t = cpu.result(i32::from(mem.read(addr)) - 1);
    mem.write(addr, t);
    Step::Continue
}

fn inx(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_x(i32::from(cpu.x()) + 1);
    Step::Continue
}

fn iny(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_y(i32::from(cpu.y()) + 1);
    Step::Continue
}

fn dex(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_x(i32::from(cpu.x()) - 1);
    Step::Continue
}

fn dey(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_y(i32::from(cpu.y()) - 1);
    Step::Continue
}

fn lda(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_a(m);
    Step::Continue
}

fn ldx(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_x(m);
    Step::Continue
}

fn ldy(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    let m = operand(mem, e);
    cpu.set_y(m);
    Step::Continue
}

fn sta(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.write(addr(e), cpu.a());
    Step::Continue
}

fn stx(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.write(addr(e), cpu.x());
    Step::Continue
}

fn sty(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.write(addr(e), cpu.y());
    Step::Continue
}

fn tax(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_x(i32::from(cpu.a()));
    Step::Continue
}

fn tay(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_y(i32::from(cpu.a()));
    Step::Continue
}

fn txa(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_a(i32::from(cpu.x()));
    Step::Continue
}

fn tya(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_a(i32::from(cpu.y()));
    Step::Continue
}

fn tsx(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_x(i32::from(mem.sp));
    Step::Continue
}

fn txs(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    mem.sp = cpu.x();
    Step::Continue
}

fn pha(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    mem.push(cpu.a());
    Step::Continue
}

fn pla(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    let v = mem.pull();
    cpu.set_a(i32::from(v));
    Step::Continue
}

/// The pushed copy always has B set.
fn php(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    mem.push(cpu.pack_flags() | Status::BREAK.bits());
    Step::Continue
}

fn plp(cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    let v = mem.pull();
    cpu.unpack_flags(v);
    cpu.set_flag(Status::BREAK, false);
    Step::Continue
}

fn bcc(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(!cpu.flag(Status::CARRY), addr(e));
    Step::Continue
}

fn bcs(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(cpu.flag(Status::CARRY), addr(e));
    Step::Continue
}

fn beq(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(cpu.flag(Status::ZERO), addr(e));
    Step::Continue
}

fn bne(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(!cpu.flag(Status::ZERO), addr(e));
    Step::Continue
}

fn bmi(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(cpu.flag(Status::NEGATIVE), addr(e));
    Step::Continue
}

fn bpl(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(!cpu.flag(Status::NEGATIVE), addr(e));
    Step::Continue
}

fn bvc(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(!cpu.flag(Status::OVERFLOW), addr(e));
    Step::Continue
}

fn bvs(cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.branch(cpu.flag(Status::OVERFLOW), addr(e));
    Step::Continue
}

fn jmp(_cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.jump(addr(e));
    Step::Continue
}

fn jsr(_cpu: &mut Cpu, mem: &mut Memory, e: Option<u16>) -> Step {
    mem.jsr(addr(e));
    Step::Continue
}

fn rts(_cpu: &mut Cpu, mem: &mut Memory, _e: Option<u16>) -> Step {
    mem.rts();
    Step::Continue
}

fn clc(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.clear_carry();
    Step::Continue
}

fn sec(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_carry();
    Step::Continue
}

// Decimal mode is tracked but never changes arithmetic.
fn cld(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_flag(Status::DECIMAL, false);
    Step::Continue
}

fn sed(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_flag(Status::DECIMAL, true);
    Step::Continue
}

fn cli(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.clear_interrupt_disable();
    Step::Continue
}

fn sei(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.set_interrupt_disable();
    Step::Continue
}

fn clv(cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    cpu.clear_overflow();
    Step::Continue
}

fn nop(_cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    Step::Continue
}

fn brk(_cpu: &mut Cpu, _mem: &mut Memory, _e: Option<u16>) -> Step {
    Step::Break
}
