//! Matches a mnemonic plus classified operands against the opcode table and
//! emits the instruction's bytes, deferring any operand that names a label
//! to a [`Fixup`](super::fixup::Fixup).

use crate::asm::fixup::{Fixup, FixupKind};
use crate::asm::parser::ParsedOperand;
use crate::error::AsmError;
use crate::tables::{self, Operand};

pub struct Encoded {
    pub bytes: Vec<u8>,
    pub fixup: Option<Fixup>,
}

/// Finds the one opcode whose mnemonic and operand shapes match, and
/// encodes it. `addr` is the address the instruction will be placed at
/// (needed only to stamp into any resulting fixup).
pub fn encode_instruction(
    mnemonic: &str,
    operands: &[ParsedOperand],
    addr: u16,
    line: usize,
) -> Result<Encoded, AsmError> {
    let mnemonic_upper = mnemonic.to_ascii_uppercase();
    let opcode = tables::OPCODE_SIGNATURES
        .iter()
        .enumerate()
        .find(|(_, sig)| {
            sig.mnemonic.eq_ignore_ascii_case(&mnemonic_upper)
                && sig.operands.len() == operands.len()
                && sig
                    .operands
                    .iter()
                    .zip(operands.iter())
                    .all(|(expected, got)| operand_matches(expected, got))
        })
        .map(|(op, _)| op as u8);

    let Some(opcode) = opcode else {
        return Err(AsmError::UnknownInstruction {
            line,
            text: render_attempt(mnemonic, operands),
        });
    };

    let sig = &tables::OPCODE_SIGNATURES[opcode as usize];
    let width = tables::OPCODE_WIDTHS[opcode as usize];

    // AJMP/ACALL bake the target's page bits into the opcode itself; a
    // label target means the final opcode byte isn't known until the fixup
    // pass, so emit a placeholder tagged with the family's low 5 bits.
    if matches!(sig.operands, [Operand::Addr11]) {
        let label = match &operands[0] {
            ParsedOperand::Label(name) => Some(name.clone()),
            _ => None,
        };
        let base_tag = opcode & 0x1F;
        if let Some(label) = label {
            return Ok(Encoded {
                bytes: vec![base_tag, 0],
                fixup: Some(Fixup {
                    kind: FixupKind::Addr11 { base_tag },
                    label,
                    line,
                    instr_addr: addr,
                    width,
                }),
            });
        } else if let ParsedOperand::Numeric(target) = operands[0] {
            let pc_after = addr.wrapping_add(2);
            if (target & 0xF800) != (pc_after & 0xF800) {
                return Err(AsmError::PageCrossing {
                    line,
                    label: format!("{target:#06X}"),
                });
            }
            let byte = opcode | (((target >> 8) as u8 & 0x07) << 5);
            return Ok(Encoded {
                bytes: vec![byte, (target & 0xFF) as u8],
                fixup: None,
            });
        }
    }

    let mut bytes = vec![opcode];
    let mut fixup = None;

    for (expected, got) in sig.operands.iter().zip(operands.iter()) {
        match (expected, got) {
            (Operand::Immed, ParsedOperand::Immediate(v)) => bytes.push(*v),
            (Operand::Direct, ParsedOperand::Numeric(v))
            | (Operand::Bit, ParsedOperand::Numeric(v)) => bytes.push(*v as u8),
            (Operand::NotBit, ParsedOperand::NotNumeric(v)) => bytes.push(*v as u8),
            (Operand::Addr16, ParsedOperand::Numeric(v)) => {
                bytes.push((*v >> 8) as u8);
                bytes.push((*v & 0xFF) as u8);
            }
            (Operand::Addr16, ParsedOperand::Label(name)) => {
                let operand_offset = addr + bytes.len() as u16;
                fixup = Some(Fixup {
                    kind: FixupKind::Addr16,
                    label: name.clone(),
                    line,
                    instr_addr: addr,
                    width,
                });
                let _ = operand_offset;
                bytes.push(0);
                bytes.push(0);
            }
            (Operand::Offset, ParsedOperand::Numeric(v)) => {
                // An absolute literal target: resolved relative to this
                // instruction's own end, same as a label would be.
                let pc_after = addr.wrapping_add(width as u16);
                let delta = *v as i32 - pc_after as i32;
                if !(-128..=127).contains(&delta) {
                    return Err(AsmError::RelativeOffsetOutOfRange {
                        line,
                        label: format!("{v:#06X}"),
                        offset: delta,
                    });
                }
                bytes.push(delta as i8 as u8);
            }
            (Operand::Offset, ParsedOperand::Label(name)) => {
                fixup = Some(Fixup {
                    kind: FixupKind::Offset,
                    label: name.clone(),
                    line,
                    instr_addr: addr,
                    width,
                });
                bytes.push(0);
            }
            (Operand::Direct, ParsedOperand::Label(name)) | (Operand::Bit, ParsedOperand::Label(name)) => {
                fixup = Some(Fixup {
                    kind: FixupKind::DirectLow,
                    label: name.clone(),
                    line,
                    instr_addr: addr,
                    width,
                });
                bytes.push(0);
            }
            // Register-coded, implicit-address, and keyword operands (A, B,
            // C, DPTR, Rn, @Rn, @DPTR, @A+DPTR, @A+PC) contribute no bytes
            // of their own; the opcode already selected the right variant.
            _ => {}
        }
    }

    debug_assert_eq!(bytes.len(), width as usize, "encoded width mismatch for {mnemonic_upper}");
    Ok(Encoded { bytes, fixup })
}

fn operand_matches(expected: &Operand, got: &ParsedOperand) -> bool {
    match (expected, got) {
        (Operand::A, ParsedOperand::A) => true,
        (Operand::B, ParsedOperand::B) => true,
        (Operand::C, ParsedOperand::C) => true,
        (Operand::Dptr, ParsedOperand::Dptr) => true,
        (Operand::R(n), ParsedOperand::Reg(m)) => n == m,
        (Operand::IndR0, ParsedOperand::IndR0) => true,
        (Operand::IndR1, ParsedOperand::IndR1) => true,
        (Operand::IndDptr, ParsedOperand::IndDptr) => true,
        (Operand::IndAPlusDptr, ParsedOperand::IndAPlusDptr) => true,
        (Operand::IndAPlusPc, ParsedOperand::IndAPlusPc) => true,
        (Operand::Immed, ParsedOperand::Immediate(_)) => true,
        (Operand::Direct, ParsedOperand::Numeric(v)) => *v <= 0xFF,
        (Operand::Direct, ParsedOperand::Label(_)) => true,
        (Operand::Bit, ParsedOperand::Numeric(v)) => *v <= 0xFF,
        (Operand::Bit, ParsedOperand::Label(_)) => true,
        (Operand::NotBit, ParsedOperand::NotNumeric(_)) => true,
        (Operand::Addr11, ParsedOperand::Label(_)) => true,
        (Operand::Addr11, ParsedOperand::Numeric(_)) => true,
        (Operand::Addr16, ParsedOperand::Numeric(_)) => true,
        (Operand::Addr16, ParsedOperand::Label(_)) => true,
        (Operand::Offset, ParsedOperand::Numeric(_)) => true,
        (Operand::Offset, ParsedOperand::Label(_)) => true,
        _ => false,
    }
}

fn render_attempt(mnemonic: &str, operands: &[ParsedOperand]) -> String {
    if operands.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{mnemonic} <{} operand(s)>", operands.len())
    }
}
