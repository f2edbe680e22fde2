//! Error and diagnostic types for HEX loading, assembly, and execution.
//!
//! All errors are plain enums with a manual `Display` impl (no host surface
//! here pulls in a formatting crate). Execution-time problems that the 8051
//! itself tolerates (invalid SFR access, division by zero) are not errors at
//! all; they are reported as [`Diagnostic`]s through the host-supplied sink
//! and otherwise do not interrupt the simulation.

/// Failure loading an Intel HEX file into ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A data line was missing its leading `:` or had a malformed field.
    MalformedRecord { line: usize },

    /// The record's checksum byte did not match the computed checksum.
    ChecksumMismatch { line: usize, expected: u8, actual: u8 },

    /// The file ended without a `:00000001FF` EOF record.
    MissingEof,

    /// A data record would write past the 64 KiB code space.
    AddressOutOfRange { line: usize, address: u32 },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord { line } => write!(f, "line {line}: malformed HEX record"),
            Self::ChecksumMismatch {
                line,
                expected,
                actual,
            } => write!(
                f,
                "line {line}: checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})"
            ),
            Self::MissingEof => write!(f, "HEX file missing :00000001FF EOF record"),
            Self::AddressOutOfRange { line, address } => {
                write!(f, "line {line}: address 0x{address:04X} out of range")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Failure compiling assembly source into machine code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// `label:` with anything after the colon on the line.
    InvalidLabelSyntax { line: usize },

    /// The same label defined more than once.
    DuplicateLabel { line: usize, label: String },

    /// No opcode signature matched the line, even after substitution.
    UnknownInstruction { line: usize, text: String },

    /// An 8-bit relative branch's resolved offset didn't fit in `[-128, 127]`.
    RelativeOffsetOutOfRange { line: usize, label: String, offset: i32 },

    /// An `AJMP`/`ACALL` target landed in a different 2 KiB page than the
    /// instruction that referenced it.
    PageCrossing { line: usize, label: String },

    /// A fix-up referenced a label that was never defined.
    UndefinedLabel { line: usize, label: String },
}

impl std::fmt::Display for AsmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLabelSyntax { line } => write!(f, "line {line}: invalid label syntax"),
            Self::DuplicateLabel { line, label } => {
                write!(f, "line {line}: duplicate label '{label}'")
            }
            Self::UnknownInstruction { line, text } => {
                write!(f, "line {line}: unknown instruction/syntax: '{text}'")
            }
            Self::RelativeOffsetOutOfRange {
                line,
                label,
                offset,
            } => write!(
                f,
                "line {line}: relative jump to '{label}' is too far ({offset})"
            ),
            Self::PageCrossing { line, label } => write!(
                f,
                "line {line}: jump to '{label}' crosses a 2 KiB page boundary"
            ),
            Self::UndefinedLabel { line, label } => {
                write!(f, "line {line}: undefined label '{label}'")
            }
        }
    }
}

impl std::error::Error for AsmError {}

/// A non-fatal condition raised during assembly; does not suppress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmWarning {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for AsmWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// A one-line diagnostic raised by the processor at run time: invalid SFR
/// access, division by zero, or an invalid HEX load. Never fatal; surfaced
/// through the host-supplied sink (see `Mcs51::diagnostic_sink`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
