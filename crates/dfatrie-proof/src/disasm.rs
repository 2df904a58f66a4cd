use dfatrie_types::Bitness;
use iced_x86::{Decoder, DecoderOptions, Formatter, GasFormatter, Instruction};

use crate::error::{ProofError, Result};

/// Turns machine code into AT&T-syntax text, one string per instruction.
pub trait Disassembler {
    fn disassemble(&self, bytes: &[u8], bitness: Bitness) -> Result<Vec<String>>;
}

/// [`Disassembler`] backed by iced-x86's GNU assembler formatter.
///
/// Numbers are printed objdump style (`0x0`, lowercase hex) and every encoded displacement is
/// shown, so `0x0(%r15,%r11,8)` (disp8) and `(%r15,%r11,8)` stay distinct. RIP-relative operands
/// are printed as `disp(%rip)` rather than as absolute addresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcedDisassembler;

impl Disassembler for IcedDisassembler {
    fn disassemble(&self, bytes: &[u8], bitness: Bitness) -> Result<Vec<String>> {
        let mut decoder = Decoder::with_ip(bitness.bits(), bytes, 0, DecoderOptions::NONE);
        let mut formatter = formatter();
        let mut instruction = Instruction::default();
        let mut out = Vec::new();
        while decoder.can_decode() {
            decoder.decode_out(&mut instruction);
            if instruction.is_invalid() {
                return Err(ProofError::InvalidEncoding {
                    sequence: bytes.to_vec(),
                });
            }
            let mut text = String::new();
            formatter.format(&instruction, &mut text);
            out.push(text);
        }
        Ok(out)
    }
}

fn formatter() -> GasFormatter {
    let mut formatter = GasFormatter::new();
    let options = formatter.options_mut();
    options.set_show_zero_displacements(true);
    options.set_rip_relative_addresses(true);
    options.set_small_hex_numbers_in_decimal(false);
    options.set_hex_prefix("0x");
    options.set_hex_suffix("");
    options.set_uppercase_hex(false);
    options.set_leading_zeros(false);
    formatter
}
