//! The MCS-51 processor core: memory model, one-instruction-per-call
//! execution, interrupt dispatch, and the timer peripheral.

mod alu;
mod branch;
mod interrupt;
mod timer;

use crate::cpu::state::{CpuStateTrait, Mcs51State};
use crate::error::Diagnostic;
use crate::hex;
use crate::tables;

const A_ADDR: u8 = 0xE0;
const B_ADDR: u8 = 0xF0;
const PSW_ADDR: u8 = 0xD0;
const SP_ADDR: u8 = 0x81;
const DPL_ADDR: u8 = 0x82;
const DPH_ADDR: u8 = 0x83;
const PCON_ADDR: u8 = 0x87;
const TCON_ADDR: u8 = 0x88;
const P3_ADDR: u8 = 0xB0;

/// Individual PSW flag bit masks within the PSW byte itself (mirrors the
/// teacher's `PswFlag` pattern, generalized to all eight MCS-51 flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PswBit {
    Cy = 0x80,
    Ac = 0x40,
    F0 = 0x20,
    Rs1 = 0x10,
    Rs0 = 0x08,
    Ov = 0x04,
    Ud = 0x02,
    P = 0x01,
}

/// The full MCS-51 processor: code ROM, internal/external RAM, SFR file,
/// and the interrupt/timer bookkeeping the cycle step maintains between
/// calls.
pub struct Mcs51 {
    rom: Box<[u8; 0x10000]>,
    iram: [u8; 256],
    xram: Box<[u8; 0x10000]>,
    sfr: [u8; 128],
    pc: u16,
    cycle_count: u64,

    int0_latched: bool,
    int1_latched: bool,
    in_interrupt: bool,
    in_high_prio: bool,
    just_returned: bool,

    timer0_t_pin_latched: bool,
    timer1_t_pin_latched: bool,

    pub break_instruction: u8,
    pub break_addresses: Vec<u16>,
    break_callback: Option<Box<dyn FnMut(&mut Mcs51)>>,
    diagnostic_sink: Option<Box<dyn FnMut(&Diagnostic)>>,

    /// Backing store for invalid direct/bit accesses; writes here are lost.
    scratch: u8,
}

impl Default for Mcs51 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mcs51 {
    pub fn new() -> Self {
        let mut cpu = Self {
            rom: Box::new([0u8; 0x10000]),
            iram: [0u8; 256],
            xram: Box::new([0u8; 0x10000]),
            sfr: [0u8; 128],
            pc: 0,
            cycle_count: 0,
            int0_latched: false,
            int1_latched: false,
            in_interrupt: false,
            in_high_prio: false,
            just_returned: false,
            timer0_t_pin_latched: false,
            timer1_t_pin_latched: false,
            break_instruction: 0xA5,
            break_addresses: Vec::new(),
            break_callback: None,
            diagnostic_sink: None,
            scratch: 0,
        };
        cpu.reset();
        cpu
    }

    pub fn set_diagnostic_sink(&mut self, sink: Box<dyn FnMut(&Diagnostic)>) {
        self.diagnostic_sink = Some(sink);
    }

    pub fn set_break_callback(&mut self, callback: Box<dyn FnMut(&mut Mcs51)>) {
        self.break_callback = Some(callback);
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Overrides the program counter directly. Meant for a host resuming
    /// execution at a known address (a loader jumping to its entry point, a
    /// debugger moving the instruction pointer), not for normal stepping.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn iram(&self) -> &[u8; 256] {
        &self.iram
    }

    pub fn xram(&self) -> &[u8; 0x10000] {
        &self.xram
    }

    pub fn sfr(&self) -> &[u8; 128] {
        &self.sfr
    }

    pub fn rom(&self) -> &[u8; 0x10000] {
        &self.rom
    }

    fn diagnose(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(message);
        if let Some(mut sink) = self.diagnostic_sink.take() {
            sink(&diagnostic);
            self.diagnostic_sink = Some(sink);
        }
    }

    /// `direct_access`: reads a byte at a direct address. Addresses below
    /// `0x80` hit IRAM directly; addresses `0x80..=0xFF` must name one of
    /// the 24 valid SFRs or the access is invalid (diagnostic, scratch byte
    /// returned, write lost).
    pub(super) fn read_direct(&mut self, addr: u8) -> u8 {
        if addr < 0x80 {
            self.iram[addr as usize]
        } else if tables::sfr_name(addr).is_some() {
            self.sfr[(addr - 0x80) as usize]
        } else {
            self.diagnose(format!("invalid direct access at {addr:#04X}"));
            self.scratch
        }
    }

    pub(super) fn write_direct(&mut self, addr: u8, value: u8) {
        if addr < 0x80 {
            self.iram[addr as usize] = value;
        } else if tables::sfr_name(addr).is_some() {
            self.sfr[(addr - 0x80) as usize] = value;
            if addr == A_ADDR {
                self.update_parity();
            }
        } else {
            self.diagnose(format!("invalid direct access at {addr:#04X}"));
            self.scratch = value;
        }
    }

    fn update_parity(&mut self) {
        let a = self.sfr[(A_ADDR - 0x80) as usize];
        let p = alu::parity(a);
        let psw = self.sfr[(PSW_ADDR - 0x80) as usize];
        self.sfr[(PSW_ADDR - 0x80) as usize] = if p {
            psw | PswBit::P as u8
        } else {
            psw & !(PswBit::P as u8)
        };
    }

    fn resolve_bit(&mut self, bit_addr: u8) -> Option<(u8, u8)> {
        let bit = bit_addr & 0x07;
        if bit_addr < 0x80 {
            Some((0x20 + (bit_addr >> 3), bit))
        } else {
            let byte_addr = bit_addr & 0xF8;
            if tables::is_bit_addressable_sfr(byte_addr) {
                Some((byte_addr, bit))
            } else {
                self.diagnose(format!("invalid bit access at {bit_addr:#04X}"));
                None
            }
        }
    }

    pub fn is_bit_set(&mut self, bit_addr: u8) -> bool {
        match self.resolve_bit(bit_addr) {
            Some((byte_addr, bit)) => (self.read_direct(byte_addr) >> bit) & 1 != 0,
            None => false,
        }
    }

    pub fn set_bit(&mut self, bit_addr: u8, value: bool) {
        if let Some((byte_addr, bit)) = self.resolve_bit(bit_addr) {
            let current = self.read_direct(byte_addr);
            // The correct shift direction is left; a sibling revision of
            // this routine that used `1 >> bit` would silently no-op for
            // every bit past 0.
            let updated = if value {
                current | (1 << bit)
            } else {
                current & !(1 << bit)
            };
            self.write_direct(byte_addr, updated);
        }
    }

    fn a(&mut self) -> u8 {
        self.read_direct(A_ADDR)
    }

    fn set_a(&mut self, value: u8) {
        self.write_direct(A_ADDR, value);
    }

    fn b(&mut self) -> u8 {
        self.read_direct(B_ADDR)
    }

    fn set_b(&mut self, value: u8) {
        self.write_direct(B_ADDR, value);
    }

    fn psw(&mut self) -> u8 {
        self.read_direct(PSW_ADDR)
    }

    fn flag(&mut self, bit: PswBit) -> bool {
        self.psw() & bit as u8 != 0
    }

    fn set_flag(&mut self, bit: PswBit, value: bool) {
        let psw = self.psw();
        let updated = if value {
            psw | bit as u8
        } else {
            psw & !(bit as u8)
        };
        self.write_direct(PSW_ADDR, updated);
    }

    fn dptr(&mut self) -> u16 {
        let hi = self.read_direct(DPH_ADDR);
        let lo = self.read_direct(DPL_ADDR);
        ((hi as u16) << 8) | lo as u16
    }

    fn set_dptr(&mut self, value: u16) {
        self.write_direct(DPH_ADDR, (value >> 8) as u8);
        self.write_direct(DPL_ADDR, (value & 0xFF) as u8);
    }

    /// The currently selected register bank's offset into IRAM, derived
    /// from PSW bits RS1:RS0 and changing atomically with writes to PSW.
    fn reg_bank_offset(&mut self) -> u8 {
        let psw = self.psw();
        ((psw >> 3) & 0x03) * 8
    }

    fn get_reg(&mut self, n: u8) -> u8 {
        let offset = self.reg_bank_offset();
        self.iram[(offset + n) as usize]
    }

    fn set_reg(&mut self, n: u8, value: u8) {
        let offset = self.reg_bank_offset();
        self.iram[(offset + n) as usize] = value;
    }

    /// ROM populated once per program load; zeroed and re-populated on
    /// every call, even a failed one, so a partial HEX never lingers.
    pub fn load_hex(&mut self, text: &str) -> Result<(), crate::error::LoadError> {
        match hex::read_hex(text) {
            Ok(rom) => {
                self.rom = rom;
                Ok(())
            }
            Err(err) => {
                self.rom = Box::new([0u8; 0x10000]);
                self.diagnose(format!("HEX load failed: {err}"));
                Err(err)
            }
        }
    }

    /// Resets SFR/ports/PC/interrupt bookkeeping. IRAM, XRAM, and the cycle
    /// counter survive.
    pub fn reset(&mut self) {
        self.sfr = [0u8; 128];
        self.write_direct(0x80, 0xFF); // P0
        self.write_direct(0x90, 0xFF); // P1
        self.write_direct(0xA0, 0xFF); // P2
        self.write_direct(P3_ADDR, 0xFF); // P3
        self.write_direct(SP_ADDR, 0x07);
        self.pc = 0;
        self.int0_latched = false;
        self.int1_latched = false;
        self.in_interrupt = false;
        self.in_high_prio = false;
        self.just_returned = false;
        self.timer0_t_pin_latched = false;
        self.timer1_t_pin_latched = false;
    }

    /// Additionally zeroes IRAM, XRAM, and the cycle counter.
    pub fn full_reset(&mut self) {
        self.iram = [0u8; 256];
        self.xram = Box::new([0u8; 0x10000]);
        self.cycle_count = 0;
        self.reset();
    }

    /// Advances the simulation by exactly one instruction plus peripheral
    /// housekeeping: interrupt flag refresh, interrupt dispatch, idle wake,
    /// `just_returned` decay, instruction fetch/execute, timer tick, and
    /// the breakpoint check, in that order.
    pub fn do_cycle(&mut self) {
        if self.read_direct(PCON_ADDR) & 0x02 != 0 {
            return; // power-down
        }

        self.refresh_interrupt_flags();
        let dispatched = self.dispatch_interrupts();

        if dispatched && self.read_direct(PCON_ADDR) & 0x01 != 0 {
            let pcon = self.read_direct(PCON_ADDR);
            self.write_direct(PCON_ADDR, pcon & !0x01);
        }

        if self.just_returned {
            self.just_returned = false;
        }

        let idle = self.read_direct(PCON_ADDR) & 0x01 != 0;
        let cycles = if dispatched {
            2
        } else if idle {
            0
        } else {
            self.execute_instruction()
        };

        self.tick_timers(cycles);

        if self.read_direct(PCON_ADDR) & 0x02 == 0 {
            self.check_breakpoint();
        }

        self.cycle_count += cycles as u64;
    }

    fn check_breakpoint(&mut self) {
        let opcode_at_pc = self.rom[self.pc as usize];
        let hit = opcode_at_pc == self.break_instruction || self.break_addresses.contains(&self.pc);
        if hit {
            if let Some(mut callback) = self.break_callback.take() {
                callback(self);
                self.break_callback = Some(callback);
            }
        }
    }

    /// Reads the immediate source operand for the common "A, <source>"
    /// row shape where the low nibble selects `#immed` (4), `direct` (5),
    /// `@R0` (6), `@R1` (7), or `Rn` (8..=F).
    fn alu_row_source(&mut self, opcode: u8, byte1: u8) -> u8 {
        match opcode & 0x0F {
            0x4 => byte1,
            0x5 => self.read_direct(byte1),
            0x6 => {
                let addr = self.get_reg(0);
                self.iram[addr as usize]
            }
            0x7 => {
                let addr = self.get_reg(1);
                self.iram[addr as usize]
            }
            n if (0x8..=0xF).contains(&n) => self.get_reg(n - 0x8),
            _ => unreachable!(),
        }
    }

    /// Executes exactly one instruction at the current PC, updates PC, and
    /// returns the number of machine cycles it consumed.
    fn execute_instruction(&mut self) -> u8 {
        let pc = self.pc;
        let opcode = self.rom[pc as usize];
        let width = tables::OPCODE_WIDTHS[opcode as usize];
        let byte1 = if width >= 2 {
            self.rom[pc.wrapping_add(1) as usize]
        } else {
            0
        };
        let byte2 = if width >= 3 {
            self.rom[pc.wrapping_add(2) as usize]
        } else {
            0
        };
        let pc_after = pc.wrapping_add(width as u16);

        let mut next_pc = pc_after;
        let mut cycles: u8 = 1;

        // AJMP / ACALL: opcode & 0x1F distinguishes the two families; the
        // high 3 bits of the opcode supply the high bits of the target.
        if opcode & 0x1F == 0x01 {
            next_pc = Self::addr11_target(opcode, byte1, pc_after);
            cycles = 2;
        } else if opcode & 0x1F == 0x11 {
            let target = Self::addr11_target(opcode, byte1, pc_after);
            self.push16(pc_after);
            next_pc = target;
            cycles = 2;
        } else {
            match opcode {
                0x00 => {} // NOP

                // ===== Jumps and calls =====
                0x02 => {
                    next_pc = Self::addr16_target(byte1, byte2);
                    cycles = 2;
                }
                0x12 => {
                    next_pc = Self::addr16_target(byte1, byte2);
                    self.push16(pc_after);
                    cycles = 2;
                }
                0x22 => {
                    next_pc = self.pop16();
                    cycles = 2;
                }
                0x32 => {
                    next_pc = self.pop16();
                    self.in_interrupt = false;
                    self.in_high_prio = false;
                    self.just_returned = true;
                    cycles = 2;
                }
                0x80 => {
                    next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    cycles = 2;
                }
                0x73 => {
                    // JMP @A+DPTR
                    let a = self.a();
                    let dptr = self.dptr();
                    next_pc = dptr.wrapping_add(a as u16);
                }

                // ===== Conditional branches (single condition, offset) =====
                0x40 => {
                    if self.flag(PswBit::Cy) {
                        next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    }
                    cycles = 2;
                }
                0x50 => {
                    if !self.flag(PswBit::Cy) {
                        next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    }
                    cycles = 2;
                }
                0x60 => {
                    if self.a() == 0 {
                        next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    }
                    cycles = 2;
                }
                0x70 => {
                    if self.a() != 0 {
                        next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    }
                    cycles = 2;
                }

                // ===== Bit-test branches: JBC/JB/JNB (bit, offset) =====
                0x10 | 0x20 | 0x30 => {
                    let set = self.is_bit_set(byte1);
                    let take = match opcode {
                        0x10 | 0x20 => set,
                        _ => !set,
                    };
                    if opcode == 0x10 && set {
                        self.set_bit(byte1, false);
                    }
                    if take {
                        next_pc = Self::apply_offset(pc_after, byte2 as i8);
                    }
                    cycles = 2;
                }

                // ===== CJNE: three operand shapes, all (_, _, offset) =====
                0xB4..=0xBF => {
                    let (lhs, rhs) = match opcode {
                        0xB4 => (self.a(), byte1),
                        0xB5 => {
                            let rhs = self.read_direct(byte1);
                            (self.a(), rhs)
                        }
                        0xB6 => {
                            let addr = self.get_reg(0);
                            (self.iram[addr as usize], byte1)
                        }
                        0xB7 => {
                            let addr = self.get_reg(1);
                            (self.iram[addr as usize], byte1)
                        }
                        n => (self.get_reg(n - 0xB8), byte1),
                    };
                    if lhs != rhs {
                        next_pc = Self::apply_offset(pc_after, byte2 as i8);
                    }
                    self.set_flag(PswBit::Cy, lhs < rhs);
                    cycles = 2;
                }

                // ===== DJNZ: direct or Rn, then offset =====
                0xD5 => {
                    let value = self.read_direct(byte1).wrapping_sub(1);
                    self.write_direct(byte1, value);
                    if value != 0 {
                        next_pc = Self::apply_offset(pc_after, byte2 as i8);
                    }
                    cycles = 2;
                }
                0xD8..=0xDF => {
                    let n = opcode - 0xD8;
                    let value = self.get_reg(n).wrapping_sub(1);
                    self.set_reg(n, value);
                    if value != 0 {
                        next_pc = Self::apply_offset(pc_after, byte1 as i8);
                    }
                    cycles = 2;
                }

                // ===== Unary accumulator ops =====
                0x03 => self.set_a(alu::perform_rr(self.a())),
                0x13 => {
                    let (result, carry) = alu::perform_rrc(self.a(), self.flag(PswBit::Cy));
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, carry);
                }
                0x23 => self.set_a(alu::perform_rl(self.a())),
                0x33 => {
                    let (result, carry) = alu::perform_rlc(self.a(), self.flag(PswBit::Cy));
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, carry);
                }
                0xC4 => self.set_a(alu::perform_swap(self.a())),
                0xD4 => {
                    let (result, carry) = alu::perform_da(self.a(), self.flag(PswBit::Cy), self.flag(PswBit::Ac));
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, carry);
                }
                0xE4 => self.set_a(0),
                0xF4 => self.set_a(!self.a()),

                // ===== INC / DEC =====
                0x04 => self.set_a(self.a().wrapping_add(1)),
                0x14 => self.set_a(self.a().wrapping_sub(1)),
                0x05 => {
                    let v = self.read_direct(byte1).wrapping_add(1);
                    self.write_direct(byte1, v);
                }
                0x15 => {
                    let v = self.read_direct(byte1).wrapping_sub(1);
                    self.write_direct(byte1, v);
                }
                0x06 | 0x07 => {
                    let reg = opcode - 0x06;
                    let addr = self.get_reg(reg);
                    self.iram[addr as usize] = self.iram[addr as usize].wrapping_add(1);
                }
                0x16 | 0x17 => {
                    let reg = opcode - 0x16;
                    let addr = self.get_reg(reg);
                    self.iram[addr as usize] = self.iram[addr as usize].wrapping_sub(1);
                }
                0x08..=0x0F => {
                    let n = opcode - 0x08;
                    let v = self.get_reg(n).wrapping_add(1);
                    self.set_reg(n, v);
                }
                0x18..=0x1F => {
                    let n = opcode - 0x18;
                    let v = self.get_reg(n).wrapping_sub(1);
                    self.set_reg(n, v);
                }
                0xA3 => self.set_dptr(self.dptr().wrapping_add(1)),

                // ===== ADD / ADDC =====
                0x24..=0x2F => {
                    let src = self.alu_row_source(opcode, byte1);
                    let (result, carry, ac, ov) = alu::perform_add(self.a(), src, 0);
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, carry);
                    self.set_flag(PswBit::Ac, ac);
                    self.set_flag(PswBit::Ov, ov);
                }
                0x34..=0x3F => {
                    let src = self.alu_row_source(opcode, byte1);
                    let carry_in = self.flag(PswBit::Cy) as u8;
                    let (result, carry, ac, ov) = alu::perform_add(self.a(), src, carry_in);
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, carry);
                    self.set_flag(PswBit::Ac, ac);
                    self.set_flag(PswBit::Ov, ov);
                }
                0x94..=0x9F => {
                    let src = self.alu_row_source(opcode, byte1);
                    let carry_in = self.flag(PswBit::Cy) as u8;
                    let (result, borrow, ac, ov) = alu::perform_subb(self.a(), src, carry_in);
                    self.set_a(result);
                    self.set_flag(PswBit::Cy, borrow);
                    self.set_flag(PswBit::Ac, ac);
                    self.set_flag(PswBit::Ov, ov);
                }

                // ===== ORL / ANL / XRL: direct,A and direct,#immed =====
                0x42 => {
                    let v = self.read_direct(byte1) | self.a();
                    self.write_direct(byte1, v);
                }
                0x43 => {
                    let v = self.read_direct(byte1) | byte2;
                    self.write_direct(byte1, v);
                }
                0x52 => {
                    let v = self.read_direct(byte1) & self.a();
                    self.write_direct(byte1, v);
                }
                0x53 => {
                    let v = self.read_direct(byte1) & byte2;
                    self.write_direct(byte1, v);
                }
                0x62 => {
                    let v = self.read_direct(byte1) ^ self.a();
                    self.write_direct(byte1, v);
                }
                0x63 => {
                    let v = self.read_direct(byte1) ^ byte2;
                    self.write_direct(byte1, v);
                }
                // ===== ORL / ANL / XRL: A,<source> =====
                0x44..=0x4F => {
                    let src = self.alu_row_source(opcode, byte1);
                    self.set_a(self.a() | src);
                }
                0x54..=0x5F => {
                    let src = self.alu_row_source(opcode, byte1);
                    self.set_a(self.a() & src);
                }
                0x64..=0x6F => {
                    let src = self.alu_row_source(opcode, byte1);
                    self.set_a(self.a() ^ src);
                }

                // ===== Carry-bit logic =====
                0x72 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_flag(PswBit::Cy, self.flag(PswBit::Cy) || bit);
                }
                0x82 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_flag(PswBit::Cy, self.flag(PswBit::Cy) && bit);
                }
                0xA0 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_flag(PswBit::Cy, self.flag(PswBit::Cy) || !bit);
                }
                0xB0 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_flag(PswBit::Cy, self.flag(PswBit::Cy) && !bit);
                }
                0xA2 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_flag(PswBit::Cy, bit);
                }
                0x92 => {
                    let cy = self.flag(PswBit::Cy);
                    self.set_bit(byte1, cy);
                }
                0xB2 => {
                    let bit = self.is_bit_set(byte1);
                    self.set_bit(byte1, !bit);
                }
                0xB3 => {
                    let cy = self.flag(PswBit::Cy);
                    self.set_flag(PswBit::Cy, !cy);
                }
                0xC2 => self.set_bit(byte1, false),
                0xC3 => self.set_flag(PswBit::Cy, false),
                0xD2 => self.set_bit(byte1, true),
                0xD3 => self.set_flag(PswBit::Cy, true),

                // ===== MUL / DIV =====
                0x84 => {
                    match alu::perform_div(self.a(), self.b()) {
                        Some((q, r)) => {
                            self.set_a(q);
                            self.set_b(r);
                            self.set_flag(PswBit::Ov, false);
                        }
                        None => {
                            self.set_flag(PswBit::Ov, true);
                            self.diagnose("DIV AB: division by zero");
                        }
                    }
                    self.set_flag(PswBit::Cy, false);
                    cycles = 4;
                }
                0xA4 => {
                    let (low, high, ov) = alu::perform_mul(self.a(), self.b());
                    self.set_a(low);
                    self.set_b(high);
                    self.set_flag(PswBit::Ov, ov);
                    self.set_flag(PswBit::Cy, false);
                    cycles = 4;
                }

                // ===== MOV direct,direct: the one swapped-operand-order op =====
                0x85 => {
                    // Source byte precedes destination byte in the stream.
                    let src_addr = byte1;
                    let dest_addr = byte2;
                    let v = self.read_direct(src_addr);
                    self.write_direct(dest_addr, v);
                }
                // ===== MOV direct,<source> =====
                0x86 | 0x87 => {
                    let reg = opcode - 0x86;
                    let addr = self.get_reg(reg);
                    let v = self.iram[addr as usize];
                    self.write_direct(byte1, v);
                }
                0x88..=0x8F => {
                    let n = opcode - 0x88;
                    let v = self.get_reg(n);
                    self.write_direct(byte1, v);
                }
                // ===== MOV <dest>,#immed =====
                0x74 => self.set_a(byte1),
                0x75 => self.write_direct(byte1, byte2),
                0x76 | 0x77 => {
                    let reg = opcode - 0x76;
                    let addr = self.get_reg(reg);
                    self.iram[addr as usize] = byte1;
                }
                0x78..=0x7F => {
                    let n = opcode - 0x78;
                    self.set_reg(n, byte1);
                }
                0x90 => self.set_dptr(Self::addr16_target(byte1, byte2)),
                // ===== MOV <dest>,direct =====
                0xA6 | 0xA7 => {
                    let reg = opcode - 0xA6;
                    let addr = self.get_reg(reg);
                    let v = self.read_direct(byte1);
                    self.iram[addr as usize] = v;
                }
                0xA8..=0xAF => {
                    let n = opcode - 0xA8;
                    let v = self.read_direct(byte1);
                    self.set_reg(n, v);
                }
                // ===== MOV A,<source> =====
                0xE5..=0xEF => {
                    let src = self.alu_row_source(opcode, byte1);
                    self.set_a(src);
                }
                // ===== MOV <dest>,A =====
                0xF5 => {
                    let a = self.a();
                    self.write_direct(byte1, a);
                }
                0xF6 | 0xF7 => {
                    let reg = opcode - 0xF6;
                    let addr = self.get_reg(reg);
                    self.iram[addr as usize] = self.a();
                }
                0xF8..=0xFF => {
                    let n = opcode - 0xF8;
                    let a = self.a();
                    self.set_reg(n, a);
                }

                // ===== MOVC =====
                0x83 => {
                    // @A+PC: the "PC" read here is the address of the MOVC
                    // instruction itself plus one, not `pc_after`.
                    let a = self.a();
                    let target = pc.wrapping_add(1).wrapping_add(a as u16);
                    self.set_a(self.rom[target as usize]);
                    cycles = 2;
                }
                0x93 => {
                    let a = self.a();
                    let target = self.dptr().wrapping_add(a as u16);
                    self.set_a(self.rom[target as usize]);
                    cycles = 2;
                }

                // ===== MOVX =====
                0xE0 => {
                    let addr = self.dptr();
                    self.set_a(self.xram[addr as usize]);
                    cycles = 2;
                }
                0xE2 | 0xE3 => {
                    let reg = opcode - 0xE2;
                    let p2 = self.read_direct(0xA0);
                    let lo = self.get_reg(reg);
                    let addr = ((p2 as u16) << 8) | lo as u16;
                    self.set_a(self.xram[addr as usize]);
                    cycles = 2;
                }
                0xF0 => {
                    let addr = self.dptr();
                    let a = self.a();
                    self.xram[addr as usize] = a;
                    cycles = 2;
                }
                0xF2 | 0xF3 => {
                    let reg = opcode - 0xF2;
                    let p2 = self.read_direct(0xA0);
                    let lo = self.get_reg(reg);
                    let addr = ((p2 as u16) << 8) | lo as u16;
                    self.xram[addr as usize] = self.a();
                    cycles = 2;
                }

                // ===== XCH / XCHD =====
                0xC5 => {
                    let tmp = self.a();
                    let v = self.read_direct(byte1);
                    self.set_a(v);
                    self.write_direct(byte1, tmp);
                }
                0xC6 | 0xC7 => {
                    let reg = opcode - 0xC6;
                    let addr = self.get_reg(reg);
                    let tmp = self.a();
                    self.set_a(self.iram[addr as usize]);
                    self.iram[addr as usize] = tmp;
                }
                0xC8..=0xCF => {
                    let n = opcode - 0xC8;
                    let tmp = self.a();
                    self.set_a(self.get_reg(n));
                    self.set_reg(n, tmp);
                }
                0xD6 | 0xD7 => {
                    let reg = opcode - 0xD6;
                    let addr = self.get_reg(reg);
                    let a = self.a();
                    let mem = self.iram[addr as usize];
                    self.set_a((a & 0xF0) | (mem & 0x0F));
                    self.iram[addr as usize] = (mem & 0xF0) | (a & 0x0F);
                }

                // ===== PUSH / POP =====
                0xC0 => {
                    let v = self.read_direct(byte1);
                    let sp = self.read_direct(SP_ADDR).wrapping_add(1);
                    self.write_direct(SP_ADDR, sp);
                    self.iram[sp as usize] = v;
                    cycles = 2;
                }
                0xD0 => {
                    let sp = self.read_direct(SP_ADDR);
                    let v = self.iram[sp as usize];
                    self.write_direct(SP_ADDR, sp.wrapping_sub(1));
                    self.write_direct(byte1, v);
                    cycles = 2;
                }

                // ===== Bit-addressable direct destination (SETB/CLR/CPL bit covered above) =====
                _ => {
                    self.diagnose(format!("reserved or unimplemented opcode {opcode:#04X}"));
                }
            }
        }

        self.pc = next_pc;
        cycles
    }
}

impl CpuStateTrait for Mcs51 {
    type Snapshot = Mcs51State;

    fn snapshot(&self) -> Self::Snapshot {
        Mcs51State {
            a: self.sfr[(A_ADDR - 0x80) as usize],
            b: self.sfr[(B_ADDR - 0x80) as usize],
            psw: self.sfr[(PSW_ADDR - 0x80) as usize],
            sp: self.sfr[(SP_ADDR - 0x80) as usize],
            dptr: ((self.sfr[(DPH_ADDR - 0x80) as usize] as u16) << 8)
                | self.sfr[(DPL_ADDR - 0x80) as usize] as u16,
            pc: self.pc,
            cycle_count: self.cycle_count,
            in_interrupt: self.in_interrupt,
            in_high_prio: self.in_high_prio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_sets_ports_high_and_stack_pointer() {
        let cpu = Mcs51::new();
        assert_eq!(cpu.sfr[(0x80 - 0x80) as usize], 0xFF);
        assert_eq!(cpu.sfr[(SP_ADDR - 0x80) as usize], 0x07);
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn scenario_1_add_sets_parity_and_flags() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(A_ADDR, 0x0F);
        cpu.rom[0] = 0x24;
        cpu.rom[1] = 0x01;
        cpu.do_cycle();
        assert_eq!(cpu.a(), 0x10);
        assert!(!cpu.flag(PswBit::Cy));
        assert!(cpu.flag(PswBit::Ac));
        assert!(!cpu.flag(PswBit::Ov));
        assert!(cpu.flag(PswBit::P));
        assert_eq!(cpu.pc, 2);
        assert_eq!(cpu.cycle_count, 1);
    }

    #[test]
    fn scenario_2_ajmp_stays_in_page() {
        let mut cpu = Mcs51::new();
        cpu.pc = 0x0800;
        cpu.rom[0x0800] = 0x01;
        cpu.rom[0x0801] = 0x34;
        cpu.do_cycle();
        assert_eq!(cpu.pc, 0x0834);
    }

    #[test]
    fn scenario_3_lcall_ret_round_trip() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(SP_ADDR, 0x07);
        cpu.pc = 0x0100;
        cpu.rom[0x0100] = 0x12;
        cpu.rom[0x0101] = 0x02;
        cpu.rom[0x0102] = 0x00;
        cpu.rom[0x0200] = 0x22;
        cpu.do_cycle();
        assert_eq!(cpu.pc, 0x0200);
        cpu.do_cycle();
        assert_eq!(cpu.pc, 0x0103);
        assert_eq!(cpu.read_direct(SP_ADDR), 0x07);
        assert_eq!(cpu.iram[0x08], 0x03);
        assert_eq!(cpu.iram[0x09], 0x01);
    }

    #[test]
    fn scenario_5_interrupt_dispatch_preempts_fetch() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(0xA8, 0x81); // IE: EA | EX0
        cpu.write_direct(TCON_ADDR, 0x01); // IT0 edge-triggered
        cpu.write_direct(P3_ADDR, 0xFF); // INT0 pin high initially
        cpu.pc = 0x0000;
        cpu.rom[0x0000] = 0x00; // NOP
        cpu.do_cycle(); // latch high pin, nothing pending yet; pc -> 0x0001
        assert_eq!(cpu.pc, 0x0001);

        cpu.write_direct(P3_ADDR, cpu.read_direct(P3_ADDR) & !0x04); // INT0 1->0
        cpu.do_cycle(); // falling edge detected and dispatched in the same cycle
        assert_eq!(cpu.pc, 0x0003);
        assert!(cpu.in_interrupt);
        assert_eq!(cpu.iram[0x08], 0x01); // pushed return address low byte
        assert_eq!(cpu.iram[0x09], 0x00); // pushed return address high byte
    }
}
