use serde::{Deserialize, Serialize};

/// One program slot. The slot index inside a [`crate::Program`] is the
/// instruction's address for control-transfer purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Instruction {
    Write { address: u32, value: u32 },
    Read { address: u32 },
    Branch { target: String, compare: u32 },
    Goto { target: String },
    /// Marker slot; never executed, only fetched through.
    Label { name: String },
    /// Unparseable line retained for diagnostics.
    Invalid { raw: String },
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Read { .. } => "read",
            Self::Branch { .. } => "branch",
            Self::Goto { .. } => "goto",
            Self::Label { .. } => "label",
            Self::Invalid { .. } => "invalid",
        }
    }
}

/// Numeric operands are hexadecimal; the `0x` prefix is optional.
pub fn parse_value(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

fn is_ident(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';') || line.starts_with("//")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedLine {
    /// One slot, or two when a label prefixes an instruction.
    pub slots: Vec<Instruction>,
    pub malformed: bool,
}

impl ParsedLine {
    fn slot(instr: Instruction) -> Self {
        Self {
            slots: vec![instr],
            malformed: false,
        }
    }

    fn invalid(raw: &str) -> Self {
        Self {
            slots: vec![Instruction::Invalid {
                raw: raw.to_string(),
            }],
            malformed: true,
        }
    }
}

/// Tokenizes one logical line. Returns `None` for blank and comment lines.
///
/// Grammar: `[label ':'] opcode operand*` with opcodes matched
/// case-insensitively; a bare `label:` declares a label with no instruction.
/// Surplus trailing operand tokens are ignored.
pub(crate) fn parse_line(raw: &str) -> Option<ParsedLine> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_comment(trimmed) {
        return None;
    }
    let mut tokens = trimmed.split_whitespace();
    let first = tokens.next()?;

    if let Some(stem) = first.strip_suffix(':') {
        if !is_ident(stem) {
            return Some(ParsedLine::invalid(trimmed));
        }
        let label = Instruction::Label {
            name: stem.to_string(),
        };
        let rest: Vec<&str> = tokens.collect();
        if rest.is_empty() {
            return Some(ParsedLine::slot(label));
        }
        let mut parsed = match parse_statement(&rest) {
            Some(instr) => ParsedLine::slot(instr),
            None => ParsedLine::invalid(trimmed),
        };
        parsed.slots.insert(0, label);
        return Some(parsed);
    }

    let mut all = vec![first];
    all.extend(tokens);
    Some(match parse_statement(&all) {
        Some(instr) => ParsedLine::slot(instr),
        None => ParsedLine::invalid(trimmed),
    })
}

fn parse_statement(tokens: &[&str]) -> Option<Instruction> {
    let opcode = tokens.first()?.to_ascii_lowercase();
    match opcode.as_str() {
        "write" => Some(Instruction::Write {
            address: parse_value(tokens.get(1)?)?,
            value: parse_value(tokens.get(2)?)?,
        }),
        "read" => Some(Instruction::Read {
            address: parse_value(tokens.get(1)?)?,
        }),
        "branch" => {
            let target = *tokens.get(1)?;
            if !is_ident(target) {
                return None;
            }
            Some(Instruction::Branch {
                target: target.to_string(),
                compare: parse_value(tokens.get(2)?)?,
            })
        }
        "goto" => {
            let target = *tokens.get(1)?;
            if !is_ident(target) {
                return None;
            }
            Some(Instruction::Goto {
                target: target.to_string(),
            })
        }
        _ => None,
    }
}
