//! Line and operand tokenizing: turns one line of source into either a
//! label definition, a directive, or a mnemonic plus a list of classified
//! operand tokens. Classification is syntactic only — it never needs a
//! label's resolved address, which is what lets the encoder pick the exact
//! opcode (and therefore instruction width) in a single forward pass.

use crate::tables;

/// A line's shape, after comments are stripped and whitespace trimmed.
pub enum Line<'a> {
    Blank,
    Label(&'a str),
    /// `warn` is set when some byte group didn't round-trip through hex
    /// formatting (see [`literal_round_trips`]).
    Data { bytes: Vec<u8>, warn: bool },
    Str(Vec<u8>),
    Instruction { mnemonic: &'a str, operands: Vec<&'a str> },
    /// Looked like a label but had trailing content after the colon.
    BadLabel,
}

/// Strips a `;` comment (no string-literal awareness needed: `.str` directives
/// are handled before this, by locating the balanced quotes first) and
/// trims whitespace.
pub fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

pub fn classify_line(raw: &str) -> Line<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') {
        return Line::Blank;
    }

    if let Some(rest) = trimmed.strip_prefix(".str") {
        return Line::Str(parse_str_directive(rest));
    }
    if let Some(rest) = trimmed.strip_prefix(".data") {
        let (bytes, warn) = parse_data_directive(rest);
        return Line::Data { bytes, warn };
    }

    if let Some(colon) = trimmed.find(':') {
        let name = trimmed[..colon].trim();
        let rest = strip_comment(&trimmed[colon + 1..]);
        if is_identifier(name) {
            return if rest.is_empty() {
                Line::Label(name)
            } else {
                Line::BadLabel
            };
        }
    }

    let line = strip_comment(trimmed);
    if line.is_empty() {
        return Line::Blank;
    }
    let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
        Some((m, r)) => (m, r.trim()),
        None => (line, ""),
    };
    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };
    Line::Instruction { mnemonic, operands }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_str_directive(rest: &str) -> Vec<u8> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(rest);
    inner.bytes().collect()
}

/// Returns the pushed bytes and whether any group failed to round-trip
/// through its own hex formatting (see [`literal_round_trips`]).
fn parse_data_directive(rest: &str) -> (Vec<u8>, bool) {
    let mut bytes = Vec::new();
    let mut warn = false;
    for tok in rest.split_whitespace() {
        if let Some(v) = parse_number(tok) {
            let byte = v as u8;
            if !literal_round_trips(tok, byte as u32) {
                warn = true;
            }
            bytes.push(byte);
        }
    }
    (bytes, warn)
}

/// Parses a literal. All numeric literals are plain hex digits with no
/// prefix; `0x1F` / `$1F` / `1Fh` are also accepted for tolerance, but the
/// canonical, unprefixed form is read as hex too, not decimal.
pub fn parse_number(token: &str) -> Option<u32> {
    let t = token.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = t.strip_prefix('$') {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = t.strip_suffix('h').or_else(|| t.strip_suffix('H')) {
        return u32::from_str_radix(hex, 16).ok();
    }
    u32::from_str_radix(t, 16).ok()
}

/// True if `digits` consists solely of hex-digit characters. Prefixed forms
/// (`0x1F`, `$1F`, `1Fh`) and symbolic names are exempt from the round-trip
/// check below; only a bare literal can misread as the wrong value.
fn is_bare_hex_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Spec: warn when a literal doesn't round-trip through its own hex
/// formatting — e.g. `10` meant as decimal ten lands as 0x10 silently.
/// Checked by re-formatting the parsed value as lowercase hex padded to the
/// literal's own digit width and comparing back against the literal.
pub fn literal_round_trips(digits: &str, value: u32) -> bool {
    if !is_bare_hex_digits(digits) {
        return true;
    }
    let width = digits.len();
    let formatted = format!("{value:0width$x}");
    digits.eq_ignore_ascii_case(&formatted)
}

/// Whether `token`'s classified form is a bare hex literal that should be
/// checked for round-trip misinterpretation, and if so, whether it fails.
pub fn literal_misreads(token: &str, operand: &ParsedOperand) -> bool {
    let (digits, value) = match operand {
        ParsedOperand::Immediate(v) => (token.trim_start_matches('#'), *v as u32),
        ParsedOperand::NotNumeric(v) => (token.trim_start_matches('/'), *v as u32),
        ParsedOperand::Numeric(v) => (token, *v as u32),
        _ => return false,
    };
    !literal_round_trips(digits, value)
}

/// A syntactically classified operand. Numeric values are fully resolved;
/// `Label` defers resolution to the fixup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOperand {
    A,
    B,
    C,
    Dptr,
    Reg(u8),
    IndR0,
    IndR1,
    IndDptr,
    IndAPlusDptr,
    IndAPlusPc,
    Immediate(u8),
    Numeric(u16),
    NotNumeric(u16),
    Label(String),
}

pub fn classify_operand(token: &str) -> ParsedOperand {
    let t = token.trim();
    let upper = t.to_ascii_uppercase();

    match upper.as_str() {
        "A" => return ParsedOperand::A,
        "B" => return ParsedOperand::B,
        "C" => return ParsedOperand::C,
        "DPTR" => return ParsedOperand::Dptr,
        "@DPTR" => return ParsedOperand::IndDptr,
        "@A+DPTR" => return ParsedOperand::IndAPlusDptr,
        "@A+PC" => return ParsedOperand::IndAPlusPc,
        "@R0" => return ParsedOperand::IndR0,
        "@R1" => return ParsedOperand::IndR1,
        _ => {}
    }

    if let Some(reg) = upper.strip_prefix('R') {
        if let Ok(n @ 0..=7) = reg.parse::<u8>() {
            return ParsedOperand::Reg(n);
        }
    }

    if let Some(imm) = t.strip_prefix('#') {
        if let Some(v) = parse_number(imm) {
            return ParsedOperand::Immediate(v as u8);
        }
    }

    if let Some(bit) = t.strip_prefix('/') {
        if let Some(v) = resolve_bit_token(bit) {
            return ParsedOperand::NotNumeric(v);
        }
    }

    if let Some(v) = resolve_bit_token(t) {
        return ParsedOperand::Numeric(v);
    }

    if let Some(v) = parse_number(t) {
        return ParsedOperand::Numeric(v as u16);
    }

    ParsedOperand::Label(t.to_string())
}

/// Resolves `PORT.n` bit syntax, a bare PSW flag name (`C`, `AC`, `OV`, ...),
/// or a bare SFR name used where a direct-byte value is expected.
fn resolve_bit_token(token: &str) -> Option<u16> {
    if let Some((port, bit)) = token.split_once('.') {
        let base = tables::sfr_addr(port)?;
        let bit: u8 = bit.parse().ok()?;
        if bit > 7 {
            return None;
        }
        return Some((base + bit) as u16);
    }
    if let Some(addr) = tables::psw_bit_addr(token) {
        return Some(addr as u16);
    }
    if let Some(addr) = tables::sfr_addr(token) {
        return Some(addr as u16);
    }
    None
}
