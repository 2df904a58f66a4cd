//! Shared vocabulary for the dfatrie crates.
//!
//! Register naming follows AT&T syntax (`%rax`), which is also how the validator library and the
//! disassembler spell registers, so trie files and proof output can be compared textually.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed alignment unit the validator enforces instruction boundaries against.
pub const BUNDLE_SIZE: usize = 32;

/// Single-byte NOP used to pad candidate instructions up to [`BUNDLE_SIZE`].
pub const NOP: u8 = 0x90;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unsupported bitness {0} (expected 32 or 64)")]
    UnsupportedBitness(u32),

    #[error("unknown general purpose register {0:?}")]
    UnknownRegister(String),

    #[error("invalid input restricted register {0:?}")]
    InvalidInputRr(String),

    #[error("x86-32 accept info must be empty, found {0}")]
    NonEmptyAcceptInfo32(AcceptInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bitness {
    X86_32,
    X86_64,
}

impl Bitness {
    pub const fn bits(self) -> u32 {
        match self {
            Bitness::X86_32 => 32,
            Bitness::X86_64 => 64,
        }
    }

    /// Number of XMM/YMM registers addressable in this mode.
    pub const fn vector_registers(self) -> u8 {
        match self {
            Bitness::X86_32 => 8,
            Bitness::X86_64 => 16,
        }
    }
}

impl TryFrom<u32> for Bitness {
    type Error = TypeError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Bitness::X86_32),
            64 => Ok(Bitness::X86_64),
            other => Err(TypeError::UnsupportedBitness(other)),
        }
    }
}

impl FromStr for Bitness {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .parse::<u32>()
            .map_err(|_| TypeError::UnsupportedBitness(0))?;
        Bitness::try_from(bits)
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x86-{}", self.bits())
    }
}

/// 64-bit general purpose registers in hardware encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gpr {
    #[serde(rename = "%rax")]
    Rax = 0,
    #[serde(rename = "%rcx")]
    Rcx = 1,
    #[serde(rename = "%rdx")]
    Rdx = 2,
    #[serde(rename = "%rbx")]
    Rbx = 3,
    #[serde(rename = "%rsp")]
    Rsp = 4,
    #[serde(rename = "%rbp")]
    Rbp = 5,
    #[serde(rename = "%rsi")]
    Rsi = 6,
    #[serde(rename = "%rdi")]
    Rdi = 7,
    #[serde(rename = "%r8")]
    R8 = 8,
    #[serde(rename = "%r9")]
    R9 = 9,
    #[serde(rename = "%r10")]
    R10 = 10,
    #[serde(rename = "%r11")]
    R11 = 11,
    #[serde(rename = "%r12")]
    R12 = 12,
    #[serde(rename = "%r13")]
    R13 = 13,
    #[serde(rename = "%r14")]
    R14 = 14,
    #[serde(rename = "%r15")]
    R15 = 15,
}

impl Gpr {
    pub const ALL: [Gpr; 16] = [
        Gpr::Rax,
        Gpr::Rcx,
        Gpr::Rdx,
        Gpr::Rbx,
        Gpr::Rsp,
        Gpr::Rbp,
        Gpr::Rsi,
        Gpr::Rdi,
        Gpr::R8,
        Gpr::R9,
        Gpr::R10,
        Gpr::R11,
        Gpr::R12,
        Gpr::R13,
        Gpr::R14,
        Gpr::R15,
    ];

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Gpr> {
        Gpr::ALL.get(usize::from(index)).copied()
    }

    /// Stack and frame pointers. The sandbox never lets either be restricted.
    pub const fn is_special(self) -> bool {
        matches!(self, Gpr::Rsp | Gpr::Rbp)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Gpr::Rax => "%rax",
            Gpr::Rcx => "%rcx",
            Gpr::Rdx => "%rdx",
            Gpr::Rbx => "%rbx",
            Gpr::Rsp => "%rsp",
            Gpr::Rbp => "%rbp",
            Gpr::Rsi => "%rsi",
            Gpr::Rdi => "%rdi",
            Gpr::R8 => "%r8",
            Gpr::R9 => "%r9",
            Gpr::R10 => "%r10",
            Gpr::R11 => "%r11",
            Gpr::R12 => "%r12",
            Gpr::R13 => "%r13",
            Gpr::R14 => "%r14",
            Gpr::R15 => "%r15",
        }
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gpr {
    type Err = TypeError;

    /// Accepts both `%rax` and `rax`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix('%').unwrap_or(s);
        Gpr::ALL
            .into_iter()
            .find(|reg| &reg.name()[1..] == bare)
            .ok_or_else(|| TypeError::UnknownRegister(s.to_string()))
    }
}

/// Restricted-register precondition an accepted instruction imposes on its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputRr {
    /// Valid only when nothing is restricted coming in (always the case on x86-32).
    #[default]
    Unrestricted,
    /// Valid whatever non-special register (or none) is restricted coming in.
    AnyNonSpecial,
    /// Valid only when this register is restricted coming in.
    Register(Gpr),
}

impl InputRr {
    const UNRESTRICTED: &'static str = "unrestricted";
    const ANY_NONSPECIAL: &'static str = "any_nonspecial";
}

impl fmt::Display for InputRr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRr::Unrestricted => f.write_str(Self::UNRESTRICTED),
            InputRr::AnyNonSpecial => f.write_str(Self::ANY_NONSPECIAL),
            InputRr::Register(reg) => fmt::Display::fmt(reg, f),
        }
    }
}

impl From<InputRr> for String {
    fn from(value: InputRr) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for InputRr {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            InputRr::UNRESTRICTED => Ok(InputRr::Unrestricted),
            InputRr::ANY_NONSPECIAL => Ok(InputRr::AnyNonSpecial),
            other if other.starts_with('%') => other
                .parse::<Gpr>()
                .map(InputRr::Register)
                .map_err(|_| TypeError::InvalidInputRr(value.clone())),
            _ => Err(TypeError::InvalidInputRr(value)),
        }
    }
}

/// Annotation stored on trie nodes that terminate an accepted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AcceptInfo {
    pub input_rr: InputRr,
    pub output_rr: Option<Gpr>,
}

impl AcceptInfo {
    /// The only accept info an x86-32 instruction can carry.
    pub const EMPTY: AcceptInfo = AcceptInfo {
        input_rr: InputRr::Unrestricted,
        output_rr: None,
    };

    pub const fn new(input_rr: InputRr, output_rr: Option<Gpr>) -> Self {
        Self {
            input_rr,
            output_rr,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == AcceptInfo::EMPTY
    }

    pub fn check(&self, bitness: Bitness) -> Result<(), TypeError> {
        if bitness == Bitness::X86_32 && !self.is_empty() {
            return Err(TypeError::NonEmptyAcceptInfo32(*self));
        }
        Ok(())
    }
}

impl fmt::Display for AcceptInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input_rr={} output_rr=", self.input_rr)?;
        match self.output_rr {
            Some(reg) => write!(f, "{reg}"),
            None => f.write_str("none"),
        }
    }
}

/// Lowercase hex rendering used in diagnostics (`0f 1f 00`).
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr_names_round_trip() {
        for reg in Gpr::ALL {
            assert_eq!(reg.name().parse::<Gpr>().unwrap(), reg);
            assert_eq!(reg.name()[1..].parse::<Gpr>().unwrap(), reg);
            assert_eq!(Gpr::from_index(reg.index()), Some(reg));
        }
        assert!("%riz".parse::<Gpr>().is_err());
        assert_eq!(Gpr::from_index(16), None);
    }

    #[test]
    fn bitness_parses_only_32_and_64() {
        assert_eq!("32".parse::<Bitness>().unwrap(), Bitness::X86_32);
        assert_eq!("64".parse::<Bitness>().unwrap(), Bitness::X86_64);
        assert!("16".parse::<Bitness>().is_err());
        assert!(Bitness::try_from(128).is_err());
    }

    #[test]
    fn accept_info_serializes_with_sentinels() {
        let info = AcceptInfo::new(InputRr::Register(Gpr::R11), None);
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"input_rr":"%r11","output_rr":null}"#);
        let back: AcceptInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);

        let any = AcceptInfo::new(InputRr::AnyNonSpecial, Some(Gpr::Rax));
        let json = serde_json::to_string(&any).unwrap();
        assert_eq!(json, r#"{"input_rr":"any_nonspecial","output_rr":"%rax"}"#);

        assert!(serde_json::from_str::<AcceptInfo>(r#"{"input_rr":"None","output_rr":null}"#).is_err());
    }

    #[test]
    fn x86_32_accept_info_must_be_empty() {
        assert!(AcceptInfo::EMPTY.check(Bitness::X86_32).is_ok());
        let restricted = AcceptInfo::new(InputRr::Register(Gpr::Rax), None);
        assert!(restricted.check(Bitness::X86_32).is_err());
        assert!(restricted.check(Bitness::X86_64).is_ok());
    }

    #[test]
    fn hex_bytes_is_space_separated() {
        assert_eq!(hex_bytes(&[0x0f, 0x1f, 0x00]), "0f 1f 00");
        assert_eq!(hex_bytes(&[]), "");
    }
}
