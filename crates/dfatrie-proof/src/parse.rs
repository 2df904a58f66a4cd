use crate::error::{ProofError, Result};

/// One AT&T-syntax instruction split into its textual parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    pub prefixes: Vec<String>,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

impl ParsedInstruction {
    /// `prefixes + [mnemonic] + operands`, the form compared between tries.
    pub fn into_tokens(self) -> Vec<String> {
        let mut tokens = self.prefixes;
        tokens.push(self.mnemonic);
        tokens.extend(self.operands);
        tokens
    }
}

const PREFIXES: &[&str] = &[
    "addr16", "addr32", "bnd", "cs", "data16", "data32", "ds", "es", "fs", "gs", "lock",
    "notrack", "rep", "repe", "repne", "repnz", "repz", "ss", "xacquire", "xrelease",
];

fn is_prefix(token: &str) -> bool {
    PREFIXES.contains(&token) || token.starts_with("rex")
}

/// Splits disassembly such as `lock xadd %eax,(%ebx)` into prefixes, mnemonic and operands.
///
/// Operands are separated by commas outside parentheses, so `0x0(%r15,%r11,8)` stays whole.
pub fn parse_instruction(text: &str) -> Result<ParsedInstruction> {
    let unparsable = || ProofError::UnparsableInstruction(text.to_string());

    let mut rest = text.trim();
    let mut prefixes = Vec::new();
    let mnemonic = loop {
        let (token, tail) = match rest.split_once(char::is_whitespace) {
            Some((token, tail)) => (token, tail.trim_start()),
            None => (rest, ""),
        };
        if token.is_empty() {
            return Err(unparsable());
        }
        rest = tail;
        // A lone prefix (`lock` with nothing after it) is itself the mnemonic.
        if is_prefix(token) && !rest.is_empty() {
            prefixes.push(token.to_string());
        } else {
            break token.to_string();
        }
    };

    let mut operands = Vec::new();
    if !rest.is_empty() {
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.checked_sub(1).ok_or_else(unparsable)?,
                ',' if depth == 0 => {
                    operands.push(rest[start..i].trim().to_string());
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(unparsable());
        }
        operands.push(rest[start..].trim().to_string());
        if operands.iter().any(String::is_empty) {
            return Err(unparsable());
        }
    }

    Ok(ParsedInstruction {
        prefixes,
        mnemonic,
        operands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_operands_outside_parentheses() {
        let parsed = parse_instruction("vaddpd 0x0(%r15,%r11,8),%ymm3,%ymm2").unwrap();
        assert!(parsed.prefixes.is_empty());
        assert_eq!(parsed.mnemonic, "vaddpd");
        assert_eq!(parsed.operands, vec!["0x0(%r15,%r11,8)", "%ymm3", "%ymm2"]);
    }

    #[test]
    fn leading_prefixes_are_separated() {
        let parsed = parse_instruction("lock xadd %eax,(%ebx)").unwrap();
        assert_eq!(parsed.prefixes, vec!["lock"]);
        assert_eq!(parsed.mnemonic, "xadd");
        assert_eq!(
            parsed.into_tokens(),
            vec!["lock", "xadd", "%eax", "(%ebx)"]
        );

        let parsed = parse_instruction("rep stos %al,%es:(%rdi)").unwrap();
        assert_eq!(parsed.prefixes, vec!["rep"]);
        assert_eq!(parsed.operands, vec!["%al", "%es:(%rdi)"]);
    }

    #[test]
    fn bare_mnemonics_have_no_operands() {
        let parsed = parse_instruction("nop").unwrap();
        assert_eq!(parsed.mnemonic, "nop");
        assert!(parsed.operands.is_empty());
        assert_eq!(parse_instruction("lock").unwrap().mnemonic, "lock");
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(parse_instruction("").is_err());
        assert!(parse_instruction("mov (%eax,%ebx").is_err());
        assert!(parse_instruction("mov %eax,,%ebx").is_err());
        assert!(parse_instruction("mov %eax)").is_err());
    }
}
