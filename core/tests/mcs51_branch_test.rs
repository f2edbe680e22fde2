use mcs51_core::cpu::mcs51::Mcs51;
use mcs51_core::cpu::state::CpuStateTrait;

mod common;
use common::{load, run};

// =============================================================================
// AJMP: target must stay in the instruction's own 2 KiB page
// =============================================================================

#[test]
fn ajmp_stays_within_current_page() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0x0800, &[0x01, 0x34]); // AJMP with page bits 0, low byte 0x34
    cpu.set_pc(0x0800);
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0834);
}

// =============================================================================
// LCALL / RET round trip
// =============================================================================

#[test]
fn lcall_ret_round_trip_restores_pc_and_stack() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0x0100, &[0x12, 0x02, 0x00]); // LCALL 0x0200
    load(&mut cpu, 0x0200, &[0x22]); // RET
    cpu.set_pc(0x0100);
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0200);
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0103);
    assert_eq!(cpu.snapshot().sp, 0x07);
    assert_eq!(cpu.iram()[0x08], 0x03); // pushed return address, low byte first
    assert_eq!(cpu.iram()[0x09], 0x01);
}

// =============================================================================
// ACALL pushes the correct return address (not the bugged high byte)
// =============================================================================

#[test]
fn acall_pushes_pc_after_the_two_byte_instruction() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0x0000, &[0x11, 0x10]); // ACALL page0, low 0x10 -> 0x0010
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0010);
    assert_eq!(cpu.iram()[0x08], 0x02); // pc_after = 0x0002
    assert_eq!(cpu.iram()[0x09], 0x00);
}

// =============================================================================
// SJMP / conditional branches
// =============================================================================

#[test]
fn sjmp_applies_signed_offset_from_pc_after() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0, &[0x80, 0xFE]); // SJMP -2: branches back to itself
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0000);
}

#[test]
fn jz_taken_when_accumulator_is_zero() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0, &[0x60, 0x02, 0x00, 0x00]); // JZ +2 (A is 0 at reset)
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0004);
}

#[test]
fn jnz_not_taken_when_accumulator_is_zero() {
    let mut cpu = Mcs51::new();
    load(&mut cpu, 0, &[0x70, 0x02, 0x00, 0x00]); // JNZ +2 (A is 0)
    run(&mut cpu, 1);
    assert_eq!(cpu.pc(), 0x0002);
}

// =============================================================================
// CJNE sets carry on less-than, regardless of branch direction
// =============================================================================

#[test]
fn cjne_sets_carry_when_accumulator_is_less() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x74, 0x01, // MOV A,#1
            0xB4, 0x05, 0x00, // CJNE A,#5,+0
        ],
    );
    run(&mut cpu, 2);
    assert_eq!(cpu.snapshot().psw & 0x80, 0x80); // Cy set: 1 < 5
    assert_eq!(cpu.pc(), 0x0005); // branch taken (operands differ)
}

// =============================================================================
// DJNZ loops until the counted register reaches zero
// =============================================================================

#[test]
fn djnz_rn_loops_the_expected_number_of_times() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0x78, 0x03, // MOV R0,#3
            0xD8, 0xFE, // DJNZ R0,-2 (loop on itself)
            0x00, // NOP (falls through once R0 hits 0)
        ],
    );
    run(&mut cpu, 1); // MOV
    run(&mut cpu, 3); // 3 DJNZ iterations: 3->2->1->0
    assert_eq!(cpu.pc(), 0x0004); // fell through to the NOP
}

// =============================================================================
// JBC clears the tested bit only when it was set
// =============================================================================

#[test]
fn jbc_clears_bit_and_branches_when_set() {
    let mut cpu = Mcs51::new();
    load(
        &mut cpu,
        0,
        &[
            0xD2, 0xD7, // SETB C (bit 0xD7 is PSW.CY)
            0x10, 0xD7, 0x01, // JBC C,+1
            0x00, // skipped
            0x00, // landing spot
        ],
    );
    run(&mut cpu, 2);
    assert_eq!(cpu.pc(), 0x0006);
    assert_eq!(cpu.snapshot().psw & 0x80, 0); // CY cleared by JBC
}
