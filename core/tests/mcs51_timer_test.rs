use mcs51_core::cpu::mcs51::Mcs51;

mod common;
use common::{load, run};

// SFR byte offsets within `sfr()` (address minus 0x80).
const TCON: usize = 0x88 - 0x80;
const TMOD: usize = 0x89 - 0x80;
const TL0: usize = 0x9A - 0x80;
const TH0: usize = 0x9C - 0x80;
const TL1: usize = 0x9B - 0x80;
const TH1: usize = 0x9D - 0x80;

fn program(tmod: u8, th0: u8, tl0: u8, tcon: u8) -> Vec<u8> {
    vec![
        0x75, 0x89, tmod, // MOV TMOD,#tmod
        0x75, 0x9C, th0, // MOV TH0,#th0
        0x75, 0x9A, tl0, // MOV TL0,#tl0
        0x75, 0x88, tcon, // MOV TCON,#tcon
    ]
}

// =============================================================================
// Mode 1 (16-bit): overflow sets TF0 and wraps to zero, not to the reload
// =============================================================================

#[test]
fn mode_1_overflow_sets_tf0_and_wraps_to_zero() {
    let mut cpu = Mcs51::new();
    let mut bytes = program(0x01, 0xFF, 0xFD, 0x10); // TR0=1
    bytes.push(0x00); // NOP x4, one tick per instruction
    bytes.push(0x00);
    bytes.push(0x00);
    bytes.push(0x00);
    load(&mut cpu, 0, &bytes);
    run(&mut cpu, 4); // the four MOVs set up TMOD/TH0/TL0/TCON
    run(&mut cpu, 4); // four NOPs: TL0 0xFD -> 0xFE -> 0xFF -> 0x00 (overflow) -> 0x01

    assert_eq!(cpu.sfr()[TH0], 0x00);
    assert_eq!(cpu.sfr()[TL0], 0x01);
    assert_eq!(cpu.sfr()[TCON] & 0x20, 0x20); // TF0 set
}

// =============================================================================
// Mode 2 (8-bit auto-reload): TL0 reloads from TH0 on overflow
// =============================================================================

#[test]
fn mode_2_auto_reload_restores_tl0_from_th0() {
    let mut cpu = Mcs51::new();
    let mut bytes = program(0x02, 0x80, 0xFE, 0x10);
    bytes.extend([0x00, 0x00]); // 2 NOPs: 0xFE -> 0xFF -> overflow -> reload to 0x80
    load(&mut cpu, 0, &bytes);
    run(&mut cpu, 4);
    run(&mut cpu, 2);

    assert_eq!(cpu.sfr()[TL0], 0x80);
    assert_eq!(cpu.sfr()[TCON] & 0x20, 0x20);
}

// =============================================================================
// Mode 3: Timer 0 splits into two flat 8-bit counters
// =============================================================================

#[test]
fn mode_3_splits_timer0_into_two_independent_counters() {
    let mut cpu = Mcs51::new();
    // TMOD: timer0 mode 3 (bits 0-1 = 11), timer1 mode 0 (irrelevant here).
    let mut bytes = program(0x03, 0xF0, 0xFE, 0x50); // TR0=1 (0x10), TR1=1 (0x40)
    bytes.extend([0x00, 0x00, 0x00]);
    load(&mut cpu, 0, &bytes);
    run(&mut cpu, 4);
    run(&mut cpu, 3);

    // TL0 counts 3 cycles from 0xFE: 0xFF, 0x00 (overflow, TF0), 0x01.
    assert_eq!(cpu.sfr()[TL0], 0x01);
    assert_eq!(cpu.sfr()[TCON] & 0x20, 0x20); // TF0

    // TH0 is clocked unconditionally by TR1 and shares TF1, independent of TL0.
    assert_eq!(cpu.sfr()[TH0], 0xF0u8.wrapping_add(3));
}

// =============================================================================
// Counter mode: counts P3.4/P3.5 falling edges, not raw cycles
// =============================================================================

#[test]
fn counter_mode_does_not_advance_without_cycles_consumed_as_pin_edges() {
    let mut cpu = Mcs51::new();
    // TMOD: C/T bit (0x04) set for timer0 -> counter mode.
    let bytes = program(0x05, 0x00, 0x00, 0x10); // mode 1, counter, TR0=1
    load(&mut cpu, 0, &bytes);
    run(&mut cpu, 4);
    run(&mut cpu, 4); // P3.4 (T0) pin never toggles in this test
    assert_eq!(cpu.sfr()[TL0], 0x00);
    assert_eq!(cpu.sfr()[TH0], 0x00);
    let _ = (TL1, TH1);
}
