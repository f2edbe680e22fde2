//! Two-pass-via-fixups assembler: pass one classifies every line, resolves
//! each instruction to its exact opcode and width from operand syntax
//! alone, and records a deferred [`fixup`] for any operand that names a
//! label; pass two resolves every label and patches the fixups in.

mod encode;
mod fixup;
mod parser;

use std::collections::HashMap;

use crate::error::{AsmError, AsmWarning};
use fixup::{apply_fixup, Fixup};
use parser::{classify_line, classify_operand, literal_misreads, Line};

/// The result of a successful assembly.
pub struct AssembledProgram {
    pub bytes: Vec<u8>,
    pub warnings: Vec<AsmWarning>,
}

/// Assembles source text starting at a fixed base address. Stateless today
/// (the base address is the only configurable knob) but kept as a struct,
/// matching the rest of this crate's entry points, so a future option
/// (alternate code-space base, macro tables) doesn't need a signature
/// change.
pub struct Assembler {
    base_address: u16,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self { base_address: 0 }
    }

    pub fn with_base_address(base_address: u16) -> Self {
        Self { base_address }
    }

    pub fn assemble(&self, source: &str) -> Result<AssembledProgram, Vec<AsmError>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut symbols: HashMap<String, u16> = HashMap::new();
        let mut output: Vec<u8> = Vec::new();
        let mut fixups: Vec<Fixup> = Vec::new();
        let mut address = self.base_address;

        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            match classify_line(raw_line) {
                Line::Blank => {}
                Line::BadLabel => errors.push(AsmError::InvalidLabelSyntax { line: line_no }),
                Line::Label(name) => {
                    if symbols.insert(name.to_string(), address).is_some() {
                        errors.push(AsmError::DuplicateLabel {
                            line: line_no,
                            label: name.to_string(),
                        });
                    }
                }
                Line::Data { bytes, warn } => {
                    if warn {
                        warnings.push(AsmWarning {
                            line: line_no,
                            message: "possible misinterpretation of a .data literal".to_string(),
                        });
                    }
                    address = address.wrapping_add(bytes.len() as u16);
                    output.extend(bytes);
                }
                Line::Str(bytes) => {
                    address = address.wrapping_add(bytes.len() as u16);
                    output.extend(bytes);
                }
                Line::Instruction { mnemonic, operands } => {
                    let parsed: Vec<_> = operands.iter().map(|op| classify_operand(op)).collect();
                    for (token, operand) in operands.iter().zip(parsed.iter()) {
                        if literal_misreads(token, operand) {
                            warnings.push(AsmWarning {
                                line: line_no,
                                message: format!("possible misinterpretation of literal '{token}'"),
                            });
                        }
                    }
                    match encode::encode_instruction(mnemonic, &parsed, address, line_no) {
                        Ok(encoded) => {
                            address = address.wrapping_add(encoded.bytes.len() as u16);
                            output.extend(encoded.bytes);
                            if let Some(fixup) = encoded.fixup {
                                fixups.push(fixup);
                            }
                        }
                        Err(err) => errors.push(err),
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        for fixup in &fixups {
            match symbols.get(&fixup.label) {
                Some(&target) => {
                    if let Err(err) = apply_fixup(&mut output, self.base_address, fixup, target) {
                        errors.push(err);
                    }
                }
                None => errors.push(AsmError::UndefinedLabel {
                    line: fixup.line,
                    label: fixup.label.clone(),
                }),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        if output.len() > 0x10000 {
            warnings.push(AsmWarning {
                line: 0,
                message: format!("program is {} bytes, exceeds the 64 KiB code space", output.len()),
            });
        }

        Ok(AssembledProgram { bytes: output, warnings })
    }
}

/// Assembles `source` at base address 0 with a fresh [`Assembler`].
pub fn assemble(source: &str) -> Result<AssembledProgram, Vec<AsmError>> {
    Assembler::new().assemble(source)
}
