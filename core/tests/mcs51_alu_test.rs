use mcs51_core::cpu::mcs51::{Mcs51, PswBit};
use mcs51_core::cpu::state::CpuStateTrait;

mod common;
use common::{load, run};

// =============================================================================
// ADD A,#data — carry, half-carry, parity
// =============================================================================

#[test]
fn add_immediate_sets_half_carry_and_parity() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0, &[0x74, 0x0F, 0x24, 0x01]); // MOV A,#0x0F; ADD A,#0x01
    run(&mut cpu, 2);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0x10);
    assert_eq!(snap.psw & PswBit::Cy as u8, 0);
    assert_ne!(snap.psw & PswBit::Ac as u8, 0);
    assert_eq!(snap.psw & PswBit::Ov as u8, 0);
    assert_ne!(snap.psw & PswBit::P as u8, 0); // 0x10 has one set bit
}

#[test]
fn add_overflow_wraps_and_sets_carry() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0, &[0x74, 0xFF, 0x24, 0x01]); // MOV A,#0xFF; ADD A,#0x01
    run(&mut cpu, 2);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0x00);
    assert_ne!(snap.psw & PswBit::Cy as u8, 0);
    assert_ne!(snap.psw & PswBit::Ac as u8, 0);
}

// =============================================================================
// SUBB A,Rn — borrow across a register bank
// =============================================================================

#[test]
fn subb_with_carry_in_borrows_correctly() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x00, // MOV A,#0x00
            0xD3, // SETB C
            0x78, 0x00, // MOV R0,#0x00
            0x98, // SUBB A,R0
        ],
    );
    run(&mut cpu, 4);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0xFF); // 0 - 0 - 1 = -1
    assert_ne!(snap.psw & PswBit::Cy as u8, 0);
}

// =============================================================================
// MUL AB / DIV AB
// =============================================================================

#[test]
fn mul_ab_sets_overflow_when_product_exceeds_a_byte() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x20, // MOV A,#0x20
            0x75, 0xF0, 0x0A, // MOV B,#0x0A (direct 0xF0 is B)
            0xA4, // MUL AB
        ],
    );
    run(&mut cpu, 3);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0x40); // low byte of 0x20*0x0A=0x140
    assert_eq!(snap.b, 0x01); // high byte
    assert_ne!(snap.psw & PswBit::Ov as u8, 0);
    assert_eq!(snap.psw & PswBit::Cy as u8, 0);
}

#[test]
fn div_ab_uses_remainder_not_quotient_subtraction() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x0B, // MOV A,#11
            0x75, 0xF0, 0x03, // MOV B,#3
            0x84, // DIV AB
        ],
    );
    run(&mut cpu, 3);
    let snap = cpu.snapshot();
    // 11 / 3 = 3 remainder 2. A naive `a - a/b` would have produced 8.
    assert_eq!(snap.a, 3);
    assert_eq!(snap.b, 2);
    assert_eq!(snap.psw & PswBit::Ov as u8, 0);
}

#[test]
fn div_by_zero_sets_overflow_without_diagnostic_panic() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x0B, // MOV A,#11
            0x75, 0xF0, 0x00, // MOV B,#0
            0x84, // DIV AB
        ],
    );
    run(&mut cpu, 3);
    let snap = cpu.snapshot();
    assert_ne!(snap.psw & PswBit::Ov as u8, 0);
}

// =============================================================================
// DA A — BCD adjust
// =============================================================================

#[test]
fn da_adjusts_bcd_addition_with_carry_out() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x99, // MOV A,#0x99
            0x78, 0x01, // MOV R0,#0x01
            0x28, // ADD A,R0
            0xD4, // DA A
        ],
    );
    run(&mut cpu, 4);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0x00);
    assert_ne!(snap.psw & PswBit::Cy as u8, 0);
}

// =============================================================================
// Rotates
// =============================================================================

#[test]
fn rlc_a_carries_bit7_out_and_old_carry_in() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x80, // MOV A,#0x80
            0x33, // RLC A
        ],
    );
    run(&mut cpu, 2);
    let snap = cpu.snapshot();
    assert_eq!(snap.a, 0x00);
    assert_ne!(snap.psw & PswBit::Cy as u8, 0);
}
