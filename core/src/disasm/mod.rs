//! Single-instruction disassembler. Renders the instruction at an address as
//! assembler-style text: raw bytes, mnemonic, then each operand in both its
//! symbolic form and its live value, sampled from a processor snapshot —
//! what a debugger's disassembly pane actually needs, as opposed to a bare
//! textual decode of the byte stream.

use crate::cpu::mcs51::Mcs51;
use crate::tables::{self, Operand};

/// Disassembles exactly one instruction at `pc`, sampling operand values
/// from `cpu`'s current state. Returns the rendered line and the
/// instruction's width in bytes (how far to advance `pc` for the next call).
pub fn disassemble_line(cpu: &Mcs51, pc: u16) -> (String, u8) {
    let rom = cpu.rom();
    let opcode = rom[pc as usize];
    let width = tables::OPCODE_WIDTHS[opcode as usize];
    let sig = &tables::OPCODE_SIGNATURES[opcode as usize];
    let pc_after = pc.wrapping_add(width as u16);

    let mut raw = [0u8; 3];
    for (i, slot) in raw.iter_mut().enumerate().take(width as usize) {
        *slot = rom[pc.wrapping_add(i as u16) as usize];
    }
    let byte_column = format_byte_column(&raw, width);

    if sig.mnemonic == "reserved" {
        return (format!("{byte_column} DB {opcode:#04X}h ; reserved opcode"), width);
    }

    // MOV direct,direct is the one instruction whose operand order in the
    // byte stream (source, then destination) is reversed from how it reads.
    if opcode == 0x85 {
        let src = rom[pc.wrapping_add(1) as usize];
        let dest = rom[pc.wrapping_add(2) as usize];
        return (
            format!(
                "{byte_column} MOV {}, {}",
                direct_operand(cpu, dest),
                direct_operand(cpu, src)
            ),
            width,
        );
    }

    let mut cursor: u16 = 1;
    let mut parts = Vec::with_capacity(sig.operands.len());
    for operand in sig.operands {
        let text = match *operand {
            Operand::A => format!("A ({:#04X})", accumulator(cpu)),
            Operand::B => format!("B ({:#04X})", b_register(cpu)),
            Operand::C => format!("C ({})", carry(cpu) as u8),
            Operand::Dptr => format!("DPTR ({:#06X})", dptr(cpu)),
            Operand::R(n) => format!("R{n} ({:#04X})", register(cpu, n)),
            Operand::IndR0 => indirect_reg_operand(cpu, sig.mnemonic, 0),
            Operand::IndR1 => indirect_reg_operand(cpu, sig.mnemonic, 1),
            Operand::IndDptr => {
                format!("@DPTR ({:#04X})", cpu.xram()[dptr(cpu) as usize])
            }
            Operand::IndAPlusDptr => {
                let target = dptr(cpu).wrapping_add(accumulator(cpu) as u16);
                if sig.mnemonic == "JMP" {
                    format!("@A+DPTR (target {target:#06X})")
                } else {
                    format!("@A+DPTR ({:#04X})", rom[target as usize])
                }
            }
            Operand::IndAPlusPc => {
                let target = pc_after.wrapping_add(accumulator(cpu) as u16);
                format!("@A+PC ({:#04X})", rom[target as usize])
            }
            Operand::Direct => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                direct_operand(cpu, addr)
            }
            Operand::Immed => {
                let v = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                format!("#{v:#04X}")
            }
            Operand::Addr11 => {
                let arg = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                let target = (pc_after & 0xF800) | (((opcode & 0xE0) as u16) << 3) | arg as u16;
                format!("{target:#06X}")
            }
            Operand::Addr16 => {
                let hi = rom[pc.wrapping_add(cursor) as usize];
                let lo = rom[pc.wrapping_add(cursor + 1) as usize];
                cursor += 2;
                format!("{:#06X}", ((hi as u16) << 8) | lo as u16)
            }
            Operand::Offset => {
                let off = rom[pc.wrapping_add(cursor) as usize] as i8;
                cursor += 1;
                let target = pc_after.wrapping_add(off as i16 as u16);
                format!("{target:#06X}")
            }
            Operand::Bit => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                bit_operand(cpu, addr, false)
            }
            Operand::NotBit => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                bit_operand(cpu, addr, true)
            }
        };
        parts.push(text);
    }

    let rendered = if parts.is_empty() {
        format!("{byte_column} {}", sig.mnemonic)
    } else {
        format!("{byte_column} {} {}", sig.mnemonic, parts.join(", "))
    };
    (rendered, width)
}

/// The §9 static variant: a textual decode of the byte stream alone, with no
/// processor to sample live operand values from. Symbolic forms only.
pub fn disassemble_static_line(rom: &[u8], pc: u16) -> (String, u8) {
    let opcode = rom[pc as usize];
    let width = tables::OPCODE_WIDTHS[opcode as usize];
    let sig = &tables::OPCODE_SIGNATURES[opcode as usize];
    let pc_after = pc.wrapping_add(width as u16);

    if sig.mnemonic == "reserved" {
        return (format!("DB {opcode:#04X}h ; reserved opcode"), width);
    }

    if opcode == 0x85 {
        let src = rom[pc.wrapping_add(1) as usize];
        let dest = rom[pc.wrapping_add(2) as usize];
        return (format!("MOV {}, {}", static_direct_name(dest), static_direct_name(src)), width);
    }

    let mut cursor: u16 = 1;
    let mut parts = Vec::with_capacity(sig.operands.len());
    for operand in sig.operands {
        let text = match *operand {
            Operand::A => "A".to_string(),
            Operand::B => "B".to_string(),
            Operand::C => "C".to_string(),
            Operand::Dptr => "DPTR".to_string(),
            Operand::R(n) => format!("R{n}"),
            Operand::IndR0 => "@R0".to_string(),
            Operand::IndR1 => "@R1".to_string(),
            Operand::IndDptr => "@DPTR".to_string(),
            Operand::IndAPlusDptr => "@A+DPTR".to_string(),
            Operand::IndAPlusPc => "@A+PC".to_string(),
            Operand::Direct => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                static_direct_name(addr)
            }
            Operand::Immed => {
                let v = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                format!("#{v:#04X}")
            }
            Operand::Addr11 => {
                let arg = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                let target = (pc_after & 0xF800) | (((opcode & 0xE0) as u16) << 3) | arg as u16;
                format!("{target:#06X}")
            }
            Operand::Addr16 => {
                let hi = rom[pc.wrapping_add(cursor) as usize];
                let lo = rom[pc.wrapping_add(cursor + 1) as usize];
                cursor += 2;
                format!("{:#06X}", ((hi as u16) << 8) | lo as u16)
            }
            Operand::Offset => {
                let off = rom[pc.wrapping_add(cursor) as usize] as i8;
                cursor += 1;
                let target = pc_after.wrapping_add(off as i16 as u16);
                format!("{target:#06X}")
            }
            Operand::Bit => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                static_bit_name(addr)
            }
            Operand::NotBit => {
                let addr = rom[pc.wrapping_add(cursor) as usize];
                cursor += 1;
                format!("/{}", static_bit_name(addr))
            }
        };
        parts.push(text);
    }

    let rendered = if parts.is_empty() {
        sig.mnemonic.to_string()
    } else {
        format!("{} {}", sig.mnemonic, parts.join(", "))
    };
    (rendered, width)
}

fn format_byte_column(raw: &[u8; 3], width: u8) -> String {
    let mut cols = String::new();
    for (i, byte) in raw.iter().enumerate() {
        if i > 0 {
            cols.push(' ');
        }
        if (i as u8) < width {
            cols.push_str(&format!("{byte:02X}"));
        } else {
            cols.push_str("  ");
        }
    }
    cols
}

fn accumulator(cpu: &Mcs51) -> u8 {
    sfr_byte(cpu, "A")
}

fn b_register(cpu: &Mcs51) -> u8 {
    sfr_byte(cpu, "B")
}

fn carry(cpu: &Mcs51) -> bool {
    sfr_byte(cpu, "PSW") & 0x80 != 0
}

fn dptr(cpu: &Mcs51) -> u16 {
    ((sfr_byte(cpu, "DPH") as u16) << 8) | sfr_byte(cpu, "DPL") as u16
}

fn register(cpu: &Mcs51, n: u8) -> u8 {
    let psw = sfr_byte(cpu, "PSW");
    let bank_offset = ((psw >> 3) & 0x03) * 8;
    cpu.iram()[(bank_offset + n) as usize]
}

fn sfr_byte(cpu: &Mcs51, name: &str) -> u8 {
    let addr = tables::sfr_addr(name).expect("well-known SFR name");
    cpu.sfr()[(addr - 0x80) as usize]
}

fn indirect_reg_operand(cpu: &Mcs51, mnemonic: &str, n: u8) -> String {
    let rx = register(cpu, n);
    if mnemonic == "MOVX" {
        let p2 = sfr_byte(cpu, "P2");
        let addr = ((p2 as u16) << 8) | rx as u16;
        format!("@R{n} ({:#04X})", cpu.xram()[addr as usize])
    } else {
        format!("@R{n} ({:#04X})", cpu.iram()[rx as usize])
    }
}

/// `direct`: `&NAME` for a known SFR, else `&hh`; followed by the live byte.
fn direct_operand(cpu: &Mcs51, addr: u8) -> String {
    let value = if addr < 0x80 {
        cpu.iram()[addr as usize]
    } else {
        sfr_byte_if_valid(cpu, addr).unwrap_or(0)
    };
    match tables::sfr_name(addr) {
        Some(name) => format!("&{name} ({value:#04X})"),
        None => format!("&{addr:#04X} ({value:#04X})"),
    }
}

fn sfr_byte_if_valid(cpu: &Mcs51, addr: u8) -> Option<u8> {
    tables::sfr_name(addr).map(|_| cpu.sfr()[(addr - 0x80) as usize])
}

/// `bit`/`/bit`: `IRAM bb.n` for an IRAM bit, else a symbolic PSW flag name
/// or `NAME.n`; `not` prefixes a `/` for the complemented form. Always
/// followed by the live bit value (`1`/`0`).
fn bit_operand(cpu: &Mcs51, bit_addr: u8, not: bool) -> String {
    let prefix = if not { "/" } else { "" };
    let bit = bit_addr & 0x07;
    if bit_addr < 0x80 {
        let iram_addr = 0x20 + (bit_addr >> 3);
        let value = (cpu.iram()[iram_addr as usize] >> bit) & 1;
        return format!("{prefix}IRAM {iram_addr:02X}.{bit} ({value})");
    }
    let byte_addr = bit_addr & 0xF8;
    if !tables::is_bit_addressable_sfr(byte_addr) {
        return format!("{prefix}{bit_addr:#04X}");
    }
    let byte = cpu.sfr()[(byte_addr - 0x80) as usize];
    let value = (byte >> bit) & 1;
    match tables::psw_bit_name(bit_addr) {
        Some(name) => format!("{prefix}{name} ({value})"),
        None => {
            let name = tables::sfr_name(byte_addr).unwrap_or("");
            format!("{prefix}{name}.{bit} ({value})")
        }
    }
}

fn static_direct_name(addr: u8) -> String {
    match tables::sfr_name(addr) {
        Some(name) => name.to_string(),
        None => format!("{addr:#04X}"),
    }
}

fn static_bit_name(addr: u8) -> String {
    match tables::psw_bit_name(addr) {
        Some(name) => name.to_string(),
        None => format!("{addr:#04X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_with(bytes: &[u8]) -> Mcs51 {
        let mut cpu = Mcs51::new();
        let mut hex = String::new();
        let len = bytes.len();
        let mut sum: u32 = len as u32;
        hex.push_str(&format!(":{len:02x}000000"));
        for b in bytes {
            sum += *b as u32;
            hex.push_str(&format!("{b:02x}"));
        }
        let checksum = (!(sum as u8)).wrapping_add(1);
        hex.push_str(&format!("{checksum:02x}\n:00000001FF\n"));
        cpu.load_hex(&hex).expect("well-formed HEX from test helper");
        cpu
    }

    #[test]
    fn renders_add_immediate_with_byte_column() {
        let cpu = cpu_with(&[0x24, 0x01]);
        let (text, width) = disassemble_line(&cpu, 0);
        assert_eq!(text, "24 01    ADD A (0x00), #0x01");
        assert_eq!(width, 2);
    }

    #[test]
    fn renders_ajmp_with_resolved_target() {
        let mut cpu = Mcs51::new();
        let mut hex = String::new();
        let bytes = [0x01u8, 0x34];
        let addr: u16 = 0x0800;
        let mut sum: u32 = 2 + (addr >> 8) as u32 + (addr & 0xFF) as u32;
        hex.push_str(&format!(":02{addr:04x}00"));
        for b in bytes {
            sum += b as u32;
            hex.push_str(&format!("{b:02x}"));
        }
        let checksum = (!(sum as u8)).wrapping_add(1);
        hex.push_str(&format!("{checksum:02x}\n:00000001FF\n"));
        cpu.load_hex(&hex).unwrap();
        let (text, width) = disassemble_line(&cpu, 0x0800);
        assert_eq!(text, "01 34    AJMP 0x0834");
        assert_eq!(width, 2);
    }

    #[test]
    fn renders_mov_direct_direct_swapped_with_live_values() {
        // MOV 0x20, 0xE0 (src=A at 0xE0, dest=0x20): `85 E0 20` in the byte
        // stream, but reads as "MOV 0x20, A".
        let cpu = cpu_with(&[0x85, 0xE0, 0x20]);
        let (text, width) = disassemble_line(&cpu, 0);
        assert_eq!(text, "85 E0 20 MOV &0x20 (0x00), &A (0x00)");
        assert_eq!(width, 3);
    }

    #[test]
    fn renders_bit_op_with_psw_flag_name_and_live_value() {
        let cpu = cpu_with(&[0xD3]); // SETB C: not yet executed, so C reads 0
        let (text, _) = disassemble_line(&cpu, 0);
        assert_eq!(text, "D3       SETB C (0)");
    }

    #[test]
    fn reserved_opcode_renders_as_data_byte() {
        let cpu = cpu_with(&[0xA5]);
        let (text, width) = disassemble_line(&cpu, 0);
        assert!(text.contains("reserved"));
        assert_eq!(width, 1);
    }

    #[test]
    fn static_variant_has_no_live_values() {
        let rom = {
            let mut r = vec![0u8; 0x10000];
            r[0] = 0x24;
            r[1] = 0x01;
            r
        };
        let (text, width) = disassemble_static_line(&rom, 0);
        assert_eq!(text, "ADD A, #0x01");
        assert_eq!(width, 2);
    }
}
