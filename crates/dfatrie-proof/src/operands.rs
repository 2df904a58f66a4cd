//! Textual operand sets used to state what a trie accepts in disassembler terms.
//!
//! An [`Operands`] value is either a whole instruction (`("vaddpd", "0x0(%r15,%r11,8)",
//! "%ymm3", "%ymm2")` plus its restricted register requirements) or a fragment of one while a
//! set of expected instructions is being assembled with [`ops_prod`].

use std::collections::BTreeSet;
use std::fmt;

use dfatrie_types::{Bitness, Gpr};
use serde::Serialize;

use crate::error::{ProofError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Operands {
    pub disasms: Vec<String>,
    /// Register that must already be restricted before the instruction runs.
    pub input_rr: Option<Gpr>,
    /// Register the instruction leaves restricted.
    pub output_rr: Option<Gpr>,
}

impl Operands {
    pub fn new<I, S>(disasms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disasms: disasms.into_iter().map(Into::into).collect(),
            input_rr: None,
            output_rr: None,
        }
    }

    pub fn with_input_rr(mut self, input_rr: Option<Gpr>) -> Self {
        self.input_rr = input_rr;
        self
    }

    pub fn with_output_rr(mut self, output_rr: Option<Gpr>) -> Self {
        self.output_rr = output_rr;
        self
    }
}

impl fmt::Display for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disasms.join(" "))?;
        if let Some(reg) = self.input_rr {
            write!(f, " [input_rr={reg}]")?;
        }
        if let Some(reg) = self.output_rr {
            write!(f, " [output_rr={reg}]")?;
        }
        Ok(())
    }
}

/// Concatenates two fragments. At most one side may carry each kind of restricted register.
pub fn merge_operands(a: &Operands, b: &Operands) -> Result<Operands> {
    if let (Some(left), Some(right)) = (a.input_rr, b.input_rr) {
        return Err(ProofError::DuplicateInputRr { left, right });
    }
    if let (Some(left), Some(right)) = (a.output_rr, b.output_rr) {
        return Err(ProofError::DuplicateOutputRr { left, right });
    }
    let mut disasms = Vec::with_capacity(a.disasms.len() + b.disasms.len());
    disasms.extend_from_slice(&a.disasms);
    disasms.extend_from_slice(&b.disasms);
    Ok(Operands {
        disasms,
        input_rr: a.input_rr.or(b.input_rr),
        output_rr: a.output_rr.or(b.output_rr),
    })
}

fn vector_operands(prefix: &str, bitness: Bitness) -> BTreeSet<Operands> {
    (0..bitness.vector_registers())
        .map(|i| Operands::new([format!("%{prefix}{i}")]))
        .collect()
}

pub fn all_xmm_operands(bitness: Bitness) -> BTreeSet<Operands> {
    vector_operands("xmm", bitness)
}

pub fn all_ymm_operands(bitness: Bitness) -> BTreeSet<Operands> {
    vector_operands("ymm", bitness)
}

/// Every way `disp`, `base`, `index` and `scale` can be spelled as one memory operand.
///
/// Forms are returned in this order, filtered by what the mode can encode: base only,
/// displacement only, base + index * scale, displacement + index * scale, displacement + base,
/// and the full form. In x86-64 the base is mandatory, `%rip` only combines with a
/// displacement, and every form that uses a real index register requires it as `input_rr`.
pub fn memory_operands_template(
    disp: &str,
    base: &str,
    index: &str,
    scale: u8,
    bitness: Bitness,
) -> Result<Vec<Operands>> {
    // %riz always reads as zero, so it never needs restricting.
    let input_rr = match bitness {
        Bitness::X86_64 if index != "%riz" => Some(
            index
                .parse::<Gpr>()
                .map_err(|_| ProofError::UnknownRegister(index.to_string()))?,
        ),
        _ => None,
    };

    // No scale-1 SIB form exists with a zero index and %esp/%rsp base.
    if matches!(base, "%esp" | "%rsp") && matches!(index, "%eiz" | "%riz") && scale == 1 {
        return Ok(Vec::new());
    }

    let disp_plus_base = Operands::new([format!("{disp}({base})")]);
    if base == "%rip" {
        return Ok(match bitness {
            Bitness::X86_64 => vec![disp_plus_base],
            Bitness::X86_32 => Vec::new(),
        });
    }

    // %ebp/%rbp as a base always needs a displacement.
    let frame_base = matches!(base, "%ebp" | "%rbp");
    let base_only = (!frame_base).then(|| Operands::new([format!("({base})")]));
    let base_plus_index = (!frame_base).then(|| {
        Operands::new([format!("({base},{index},{scale})")]).with_input_rr(input_rr)
    });
    let disp_only = Operands::new([disp]);
    let disp_plus_index =
        Operands::new([format!("{disp}(,{index},{scale})")]).with_input_rr(input_rr);
    let full = Operands::new([format!("{disp}({base},{index},{scale})")]).with_input_rr(input_rr);

    let mut forms = Vec::with_capacity(6);
    match bitness {
        Bitness::X86_32 => {
            forms.extend(base_only);
            forms.push(disp_only);
            forms.extend(base_plus_index);
            forms.push(disp_plus_index);
            forms.push(disp_plus_base);
            forms.push(full);
        }
        Bitness::X86_64 => {
            forms.extend(base_only);
            forms.push(disp_plus_base);
            forms.extend(base_plus_index);
            forms.push(full);
        }
    }
    Ok(forms)
}

const DISPLACEMENTS: [&str; 1] = ["0x0"];
const SCALES: [u8; 4] = [1, 2, 4, 8];

const BASES_32: [&str; 8] = [
    "%eax", "%ebp", "%ebx", "%ecx", "%edi", "%edx", "%esi", "%esp",
];
const INDEXES_32: [&str; 8] = [
    "%eax", "%ebp", "%ebx", "%ecx", "%edi", "%edx", "%esi", "%eiz",
];

const BASES_64: [&str; 4] = ["%rsp", "%rbp", "%r15", "%rip"];
const INDEXES_64: [&str; 15] = [
    "%rax", "%rbx", "%rcx", "%rdi", "%rdx", "%rsi", "%r8", "%r9", "%r10", "%r11", "%r12",
    "%r13", "%r14", "%r15", "%riz",
];

/// Every memory operand the sandbox permits, one [`Operands`] each.
pub fn all_memory_operands(bitness: Bitness) -> Result<BTreeSet<Operands>> {
    let (bases, indexes): (&[&str], &[&str]) = match bitness {
        Bitness::X86_32 => (&BASES_32, &INDEXES_32),
        Bitness::X86_64 => (&BASES_64, &INDEXES_64),
    };
    let mut result = BTreeSet::new();
    for disp in DISPLACEMENTS {
        for base in bases {
            for index in indexes {
                for scale in SCALES {
                    result.extend(memory_operands_template(disp, base, index, scale, bitness)?);
                }
            }
        }
    }
    Ok(result)
}

/// Cross product of operand pools, each combination concatenated with [`merge_operands`].
///
/// With no pools the result is the single empty [`Operands`].
pub fn ops_prod<'a, I, P>(pools: I) -> Result<BTreeSet<Operands>>
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = &'a Operands>,
{
    let mut result = BTreeSet::from([Operands::default()]);
    for pool in pools {
        let pool: Vec<&Operands> = pool.into_iter().collect();
        let mut next = BTreeSet::new();
        for prefix in &result {
            for ops in &pool {
                next.insert(merge_operands(prefix, ops)?);
            }
        }
        result = next;
    }
    Ok(result)
}
