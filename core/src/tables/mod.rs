//! Static encoding tables for the MCS-51 instruction set: opcode widths,
//! operand signatures, and the SFR/PSW-bit name maps used by both the
//! disassembler and the assembler.

/// One operand slot in an instruction signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
    C,
    Dptr,
    R(u8),
    IndR0,
    IndR1,
    IndDptr,
    IndAPlusDptr,
    IndAPlusPc,
    Direct,
    Immed,
    Addr11,
    Addr16,
    Offset,
    Bit,
    NotBit,
}

/// Mnemonic plus its ordered operand kinds, as found in the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub mnemonic: &'static str,
    pub operands: &'static [Operand],
}

const fn sig(mnemonic: &'static str, operands: &'static [Operand]) -> Signature {
    Signature { mnemonic, operands }
}

use Operand::*;

/// Instruction width in bytes, indexed by opcode.
pub static OPCODE_WIDTHS: [u8; 256] = [
    1, 2, 3, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x00-0x0F
    3, 2, 3, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x10-0x1F
    3, 2, 1, 1, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x20-0x2F
    3, 2, 1, 1, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x30-0x3F
    2, 2, 2, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x40-0x4F
    2, 2, 2, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x50-0x5F
    2, 2, 2, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x60-0x6F
    2, 2, 2, 1, 2, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, // 0x70-0x7F
    2, 2, 2, 1, 1, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, // 0x80-0x8F
    3, 2, 2, 1, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x90-0x9F
    2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, // 0xA0-0xAF
    2, 2, 2, 1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, // 0xB0-0xBF
    2, 2, 2, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0xC0-0xCF
    2, 2, 2, 1, 1, 3, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, // 0xD0-0xDF
    1, 2, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0xE0-0xEF
    1, 2, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0xF0-0xFF
];

/// Mnemonic plus operand signature, indexed by opcode. Opcode `0xA5` is
/// reserved (never emitted by the assembler, never disassembled as a real
/// instruction).
pub static OPCODE_SIGNATURES: [Signature; 256] = [
    sig("NOP", &[]),                             // 0x00
    sig("AJMP", &[Addr11]),                      // 0x01
    sig("LJMP", &[Addr16]),                      // 0x02
    sig("RR", &[A]),                             // 0x03
    sig("INC", &[A]),                            // 0x04
    sig("INC", &[Direct]),                       // 0x05
    sig("INC", &[IndR0]),                        // 0x06
    sig("INC", &[IndR1]),                        // 0x07
    sig("INC", &[R(0)]),                         // 0x08
    sig("INC", &[R(1)]),                         // 0x09
    sig("INC", &[R(2)]),                         // 0x0A
    sig("INC", &[R(3)]),                         // 0x0B
    sig("INC", &[R(4)]),                         // 0x0C
    sig("INC", &[R(5)]),                         // 0x0D
    sig("INC", &[R(6)]),                         // 0x0E
    sig("INC", &[R(7)]),                         // 0x0F
    sig("JBC", &[Bit, Offset]),                  // 0x10
    sig("ACALL", &[Addr11]),                     // 0x11
    sig("LCALL", &[Addr16]),                     // 0x12
    sig("RRC", &[A]),                            // 0x13
    sig("DEC", &[A]),                            // 0x14
    sig("DEC", &[Direct]),                       // 0x15
    sig("DEC", &[IndR0]),                        // 0x16
    sig("DEC", &[IndR1]),                        // 0x17
    sig("DEC", &[R(0)]),                         // 0x18
    sig("DEC", &[R(1)]),                         // 0x19
    sig("DEC", &[R(2)]),                         // 0x1A
    sig("DEC", &[R(3)]),                         // 0x1B
    sig("DEC", &[R(4)]),                         // 0x1C
    sig("DEC", &[R(5)]),                         // 0x1D
    sig("DEC", &[R(6)]),                         // 0x1E
    sig("DEC", &[R(7)]),                         // 0x1F
    sig("JB", &[Bit, Offset]),                   // 0x20
    sig("AJMP", &[Addr11]),                      // 0x21
    sig("RET", &[]),                             // 0x22
    sig("RL", &[A]),                             // 0x23
    sig("ADD", &[A, Immed]),                     // 0x24
    sig("ADD", &[A, Direct]),                    // 0x25
    sig("ADD", &[A, IndR0]),                     // 0x26
    sig("ADD", &[A, IndR1]),                     // 0x27
    sig("ADD", &[A, R(0)]),                      // 0x28
    sig("ADD", &[A, R(1)]),                      // 0x29
    sig("ADD", &[A, R(2)]),                      // 0x2A
    sig("ADD", &[A, R(3)]),                      // 0x2B
    sig("ADD", &[A, R(4)]),                      // 0x2C
    sig("ADD", &[A, R(5)]),                      // 0x2D
    sig("ADD", &[A, R(6)]),                      // 0x2E
    sig("ADD", &[A, R(7)]),                      // 0x2F
    sig("JNB", &[Bit, Offset]),                  // 0x30
    sig("ACALL", &[Addr11]),                     // 0x31
    sig("RETI", &[]),                            // 0x32
    sig("RLC", &[A]),                            // 0x33
    sig("ADDC", &[A, Immed]),                    // 0x34
    sig("ADDC", &[A, Direct]),                   // 0x35
    sig("ADDC", &[A, IndR0]),                    // 0x36
    sig("ADDC", &[A, IndR1]),                    // 0x37
    sig("ADDC", &[A, R(0)]),                     // 0x38
    sig("ADDC", &[A, R(1)]),                     // 0x39
    sig("ADDC", &[A, R(2)]),                     // 0x3A
    sig("ADDC", &[A, R(3)]),                     // 0x3B
    sig("ADDC", &[A, R(4)]),                     // 0x3C
    sig("ADDC", &[A, R(5)]),                     // 0x3D
    sig("ADDC", &[A, R(6)]),                     // 0x3E
    sig("ADDC", &[A, R(7)]),                     // 0x3F
    sig("JC", &[Offset]),                        // 0x40
    sig("AJMP", &[Addr11]),                      // 0x41
    sig("ORL", &[Direct, A]),                    // 0x42
    sig("ORL", &[Direct, Immed]),                // 0x43
    sig("ORL", &[A, Immed]),                     // 0x44
    sig("ORL", &[A, Direct]),                    // 0x45
    sig("ORL", &[A, IndR0]),                     // 0x46
    sig("ORL", &[A, IndR1]),                     // 0x47
    sig("ORL", &[A, R(0)]),                      // 0x48
    sig("ORL", &[A, R(1)]),                      // 0x49
    sig("ORL", &[A, R(2)]),                      // 0x4A
    sig("ORL", &[A, R(3)]),                      // 0x4B
    sig("ORL", &[A, R(4)]),                      // 0x4C
    sig("ORL", &[A, R(5)]),                      // 0x4D
    sig("ORL", &[A, R(6)]),                      // 0x4E
    sig("ORL", &[A, R(7)]),                      // 0x4F
    sig("JNC", &[Offset]),                       // 0x50
    sig("ACALL", &[Addr11]),                     // 0x51
    sig("ANL", &[Direct, A]),                    // 0x52
    sig("ANL", &[Direct, Immed]),                // 0x53
    sig("ANL", &[A, Immed]),                     // 0x54
    sig("ANL", &[A, Direct]),                    // 0x55
    sig("ANL", &[A, IndR0]),                     // 0x56
    sig("ANL", &[A, IndR1]),                     // 0x57
    sig("ANL", &[A, R(0)]),                      // 0x58
    sig("ANL", &[A, R(1)]),                      // 0x59
    sig("ANL", &[A, R(2)]),                      // 0x5A
    sig("ANL", &[A, R(3)]),                      // 0x5B
    sig("ANL", &[A, R(4)]),                      // 0x5C
    sig("ANL", &[A, R(5)]),                      // 0x5D
    sig("ANL", &[A, R(6)]),                      // 0x5E
    sig("ANL", &[A, R(7)]),                      // 0x5F
    sig("JZ", &[Offset]),                        // 0x60
    sig("AJMP", &[Addr11]),                      // 0x61
    sig("XRL", &[Direct, A]),                    // 0x62
    sig("XRL", &[Direct, Immed]),                // 0x63
    sig("XRL", &[A, Immed]),                     // 0x64
    sig("XRL", &[A, Direct]),                    // 0x65
    sig("XRL", &[A, IndR0]),                     // 0x66
    sig("XRL", &[A, IndR1]),                     // 0x67
    sig("XRL", &[A, R(0)]),                      // 0x68
    sig("XRL", &[A, R(1)]),                      // 0x69
    sig("XRL", &[A, R(2)]),                      // 0x6A
    sig("XRL", &[A, R(3)]),                      // 0x6B
    sig("XRL", &[A, R(4)]),                      // 0x6C
    sig("XRL", &[A, R(5)]),                      // 0x6D
    sig("XRL", &[A, R(6)]),                      // 0x6E
    sig("XRL", &[A, R(7)]),                      // 0x6F
    sig("JNZ", &[Offset]),                       // 0x70
    sig("ACALL", &[Addr11]),                     // 0x71
    sig("ORL", &[C, Bit]),                       // 0x72
    sig("JMP", &[IndAPlusDptr]),                 // 0x73
    sig("MOV", &[A, Immed]),                     // 0x74
    sig("MOV", &[Direct, Immed]),                // 0x75
    sig("MOV", &[IndR0, Immed]),                 // 0x76
    sig("MOV", &[IndR1, Immed]),                 // 0x77
    sig("MOV", &[R(0), Immed]),                  // 0x78
    sig("MOV", &[R(1), Immed]),                  // 0x79
    sig("MOV", &[R(2), Immed]),                  // 0x7A
    sig("MOV", &[R(3), Immed]),                  // 0x7B
    sig("MOV", &[R(4), Immed]),                  // 0x7C
    sig("MOV", &[R(5), Immed]),                  // 0x7D
    sig("MOV", &[R(6), Immed]),                  // 0x7E
    sig("MOV", &[R(7), Immed]),                  // 0x7F
    sig("SJMP", &[Offset]),                      // 0x80
    sig("AJMP", &[Addr11]),                      // 0x81
    sig("ANL", &[C, Bit]),                       // 0x82
    sig("MOVC", &[A, IndAPlusPc]),                // 0x83
    sig("DIV", &[A, B]),                         // 0x84
    sig("MOV", &[Direct, Direct]),               // 0x85
    sig("MOV", &[Direct, IndR0]),                // 0x86
    sig("MOV", &[Direct, IndR1]),                // 0x87
    sig("MOV", &[Direct, R(0)]),                 // 0x88
    sig("MOV", &[Direct, R(1)]),                 // 0x89
    sig("MOV", &[Direct, R(2)]),                 // 0x8A
    sig("MOV", &[Direct, R(3)]),                 // 0x8B
    sig("MOV", &[Direct, R(4)]),                 // 0x8C
    sig("MOV", &[Direct, R(5)]),                 // 0x8D
    sig("MOV", &[Direct, R(6)]),                 // 0x8E
    sig("MOV", &[Direct, R(7)]),                 // 0x8F
    sig("MOV", &[Dptr, Immed]),                  // 0x90
    sig("ACALL", &[Addr11]),                     // 0x91
    sig("MOV", &[Bit, C]),                       // 0x92
    sig("MOVC", &[A, IndAPlusDptr]),              // 0x93
    sig("SUBB", &[A, Immed]),                    // 0x94
    sig("SUBB", &[A, Direct]),                   // 0x95
    sig("SUBB", &[A, IndR0]),                    // 0x96
    sig("SUBB", &[A, IndR1]),                    // 0x97
    sig("SUBB", &[A, R(0)]),                     // 0x98
    sig("SUBB", &[A, R(1)]),                     // 0x99
    sig("SUBB", &[A, R(2)]),                     // 0x9A
    sig("SUBB", &[A, R(3)]),                     // 0x9B
    sig("SUBB", &[A, R(4)]),                     // 0x9C
    sig("SUBB", &[A, R(5)]),                     // 0x9D
    sig("SUBB", &[A, R(6)]),                     // 0x9E
    sig("SUBB", &[A, R(7)]),                     // 0x9F
    sig("ORL", &[C, NotBit]),                    // 0xA0
    sig("AJMP", &[Addr11]),                      // 0xA1
    sig("MOV", &[C, Bit]),                       // 0xA2
    sig("INC", &[Dptr]),                         // 0xA3
    sig("MUL", &[A, B]),                         // 0xA4
    sig("reserved", &[]),                        // 0xA5
    sig("MOV", &[IndR0, Direct]),                // 0xA6
    sig("MOV", &[IndR1, Direct]),                // 0xA7
    sig("MOV", &[R(0), Direct]),                 // 0xA8
    sig("MOV", &[R(1), Direct]),                 // 0xA9
    sig("MOV", &[R(2), Direct]),                 // 0xAA
    sig("MOV", &[R(3), Direct]),                 // 0xAB
    sig("MOV", &[R(4), Direct]),                 // 0xAC
    sig("MOV", &[R(5), Direct]),                 // 0xAD
    sig("MOV", &[R(6), Direct]),                 // 0xAE
    sig("MOV", &[R(7), Direct]),                 // 0xAF
    sig("ANL", &[C, NotBit]),                    // 0xB0
    sig("ACALL", &[Addr11]),                     // 0xB1
    sig("CPL", &[Bit]),                          // 0xB2
    sig("CPL", &[C]),                            // 0xB3
    sig("CJNE", &[A, Immed, Offset]),            // 0xB4
    sig("CJNE", &[A, Direct, Offset]),           // 0xB5
    sig("CJNE", &[IndR0, Immed, Offset]),        // 0xB6
    sig("CJNE", &[IndR1, Immed, Offset]),        // 0xB7
    sig("CJNE", &[R(0), Immed, Offset]),         // 0xB8
    sig("CJNE", &[R(1), Immed, Offset]),         // 0xB9
    sig("CJNE", &[R(2), Immed, Offset]),         // 0xBA
    sig("CJNE", &[R(3), Immed, Offset]),         // 0xBB
    sig("CJNE", &[R(4), Immed, Offset]),         // 0xBC
    sig("CJNE", &[R(5), Immed, Offset]),         // 0xBD
    sig("CJNE", &[R(6), Immed, Offset]),         // 0xBE
    sig("CJNE", &[R(7), Immed, Offset]),         // 0xBF
    sig("PUSH", &[Direct]),                      // 0xC0
    sig("AJMP", &[Addr11]),                      // 0xC1
    sig("CLR", &[Bit]),                          // 0xC2
    sig("CLR", &[C]),                            // 0xC3
    sig("SWAP", &[A]),                           // 0xC4
    sig("XCH", &[A, Direct]),                    // 0xC5
    sig("XCH", &[A, IndR0]),                     // 0xC6
    sig("XCH", &[A, IndR1]),                     // 0xC7
    sig("XCH", &[A, R(0)]),                      // 0xC8
    sig("XCH", &[A, R(1)]),                      // 0xC9
    sig("XCH", &[A, R(2)]),                      // 0xCA
    sig("XCH", &[A, R(3)]),                      // 0xCB
    sig("XCH", &[A, R(4)]),                      // 0xCC
    sig("XCH", &[A, R(5)]),                      // 0xCD
    sig("XCH", &[A, R(6)]),                      // 0xCE
    sig("XCH", &[A, R(7)]),                      // 0xCF
    sig("POP", &[Direct]),                       // 0xD0
    sig("ACALL", &[Addr11]),                     // 0xD1
    sig("SETB", &[Bit]),                         // 0xD2
    sig("SETB", &[C]),                           // 0xD3
    sig("DA", &[A]),                             // 0xD4
    sig("DJNZ", &[Direct, Offset]),              // 0xD5
    sig("XCHD", &[A, IndR0]),                    // 0xD6
    sig("XCHD", &[A, IndR1]),                    // 0xD7
    sig("DJNZ", &[R(0), Offset]),                // 0xD8
    sig("DJNZ", &[R(1), Offset]),                // 0xD9
    sig("DJNZ", &[R(2), Offset]),                // 0xDA
    sig("DJNZ", &[R(3), Offset]),                // 0xDB
    sig("DJNZ", &[R(4), Offset]),                // 0xDC
    sig("DJNZ", &[R(5), Offset]),                // 0xDD
    sig("DJNZ", &[R(6), Offset]),                // 0xDE
    sig("DJNZ", &[R(7), Offset]),                // 0xDF
    sig("MOVX", &[A, IndDptr]),                  // 0xE0
    sig("AJMP", &[Addr11]),                      // 0xE1
    sig("MOVX", &[A, IndR0]),                    // 0xE2
    sig("MOVX", &[A, IndR1]),                    // 0xE3
    sig("CLR", &[A]),                            // 0xE4
    sig("MOV", &[A, Direct]),                    // 0xE5
    sig("MOV", &[A, IndR0]),                     // 0xE6
    sig("MOV", &[A, IndR1]),                     // 0xE7
    sig("MOV", &[A, R(0)]),                      // 0xE8
    sig("MOV", &[A, R(1)]),                      // 0xE9
    sig("MOV", &[A, R(2)]),                      // 0xEA
    sig("MOV", &[A, R(3)]),                      // 0xEB
    sig("MOV", &[A, R(4)]),                      // 0xEC
    sig("MOV", &[A, R(5)]),                      // 0xED
    sig("MOV", &[A, R(6)]),                      // 0xEE
    sig("MOV", &[A, R(7)]),                      // 0xEF
    sig("MOVX", &[IndDptr, A]),                  // 0xF0
    sig("ACALL", &[Addr11]),                     // 0xF1
    sig("MOVX", &[IndR0, A]),                    // 0xF2
    sig("MOVX", &[IndR1, A]),                    // 0xF3
    sig("CPL", &[A]),                            // 0xF4
    sig("MOV", &[Direct, A]),                    // 0xF5
    sig("MOV", &[IndR0, A]),                     // 0xF6
    sig("MOV", &[IndR1, A]),                     // 0xF7
    sig("MOV", &[R(0), A]),                      // 0xF8
    sig("MOV", &[R(1), A]),                      // 0xF9
    sig("MOV", &[R(2), A]),                      // 0xFA
    sig("MOV", &[R(3), A]),                      // 0xFB
    sig("MOV", &[R(4), A]),                      // 0xFC
    sig("MOV", &[R(5), A]),                      // 0xFD
    sig("MOV", &[R(6), A]),                      // 0xFE
    sig("MOV", &[R(7), A]),                      // 0xFF
];

/// Every valid SFR byte address and its canonical name.
pub static SFR_NAMES: &[(u8, &str)] = &[
    (0x80, "P0"),
    (0x81, "SP"),
    (0x82, "DPL"),
    (0x83, "DPH"),
    (0x87, "PCON"),
    (0x88, "TCON"),
    (0x89, "TMOD"),
    (0x90, "P1"),
    (0x98, "SCON"),
    (0x99, "SBUF"),
    (0x9A, "TL0"),
    (0x9B, "TL1"),
    (0x9C, "TH0"),
    (0x9D, "TH1"),
    (0xA0, "P2"),
    (0xA8, "IE"),
    (0xB0, "P3"),
    (0xB8, "IP"),
    (0xC8, "T2CON"),
    (0xCC, "TL2"),
    (0xCD, "TH2"),
    (0xD0, "PSW"),
    (0xE0, "A"),
    (0xF0, "B"),
];

/// Bit-addressable SFRs: only these may be targeted by a `bit`/`/bit` operand
/// at an address `>= 0x80`.
pub fn is_bit_addressable_sfr(byte_addr: u8) -> bool {
    matches!(
        byte_addr,
        0x80 | 0x88 | 0x90 | 0x98 | 0xA0 | 0xA8 | 0xB0 | 0xB8 | 0xD0 | 0xE0 | 0xF0
    )
}

/// Looks up the canonical name for an SFR byte address, if valid.
pub fn sfr_name(addr: u8) -> Option<&'static str> {
    SFR_NAMES.iter().find(|&&(a, _)| a == addr).map(|&(_, n)| n)
}

/// Looks up the byte address for an SFR name (case-insensitive).
pub fn sfr_addr(name: &str) -> Option<u8> {
    let upper = name.to_ascii_uppercase();
    SFR_NAMES
        .iter()
        .find(|&&(_, n)| n == upper)
        .map(|&(a, _)| a)
}

/// Individual PSW flag bit addresses and their special disassembly names.
pub static PSW_BIT_NAMES: &[(u8, &str)] = &[
    (0xD0, "P"),
    (0xD1, "UD"),
    (0xD2, "OV"),
    (0xD3, "RS0"),
    (0xD4, "RS1"),
    (0xD5, "F0"),
    (0xD6, "AC"),
    (0xD7, "C"),
];

/// Looks up the special single-bit name for a PSW bit address, if any.
pub fn psw_bit_name(bit_addr: u8) -> Option<&'static str> {
    PSW_BIT_NAMES
        .iter()
        .find(|&&(a, _)| a == bit_addr)
        .map(|&(_, n)| n)
}

/// Looks up the bit address for a PSW flag name (case-insensitive), plus the
/// handful of other reserved symbolic bit/SFR names the assembler accepts
/// directly (`c`, `p`, `ov`, `ac`, `f0`, `rs1`, `rs0`, `ud`).
pub fn psw_bit_addr(name: &str) -> Option<u8> {
    let upper = name.to_ascii_uppercase();
    PSW_BIT_NAMES
        .iter()
        .find(|&&(_, n)| n == upper)
        .map(|&(a, _)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_signature_operand_counts_for_regular_opcodes() {
        // MOV direct,direct (0x85) is the well-known exception: 3 bytes but
        // its signature's two Direct operands only account for the general
        // shape, not the swap - still width 3 as expected.
        assert_eq!(OPCODE_WIDTHS[0x85], 3);
        assert_eq!(OPCODE_SIGNATURES[0x85].mnemonic, "MOV");
    }

    #[test]
    fn reserved_opcode_is_a5() {
        assert_eq!(OPCODE_SIGNATURES[0xA5].mnemonic, "reserved");
    }

    #[test]
    fn ajmp_acall_family_uses_addr11() {
        for op in [0x01, 0x11, 0x21, 0x31, 0x41, 0x51, 0x61, 0x71, 0x81, 0x91, 0xA1, 0xB1, 0xC1, 0xD1, 0xE1, 0xF1] {
            assert_eq!(OPCODE_SIGNATURES[op].operands, &[Addr11]);
        }
    }

    #[test]
    fn sfr_name_round_trips() {
        assert_eq!(sfr_name(0xE0), Some("A"));
        assert_eq!(sfr_addr("a"), Some(0xE0));
        assert_eq!(sfr_name(0x84), None);
    }

    #[test]
    fn psw_bit_names_cover_all_flags() {
        assert_eq!(psw_bit_name(0xD7), Some("C"));
        assert_eq!(psw_bit_addr("ac"), Some(0xD6));
    }
}
