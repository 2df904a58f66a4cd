//! Binding to the validator shared library.
//!
//! The library exports two C entry points:
//!
//! ```c
//! int ValidateChunk(const uint8_t *data, uint32_t size, int bitness);
//! int ValidateAndGetFinalRestrictedRegister(const uint8_t *data, uint32_t size,
//!                                           uint32_t actual_size, int initial_rr,
//!                                           int *resulting_rr);
//! ```
//!
//! Registers are numbered in hardware order (`0` = `%rax` .. `15` = `%r15`), with
//! [`NC_NO_REG`] meaning "no restricted register". Both functions are pure with respect to their
//! arguments, so one loaded library is shared by every worker.

use std::ffi::c_int;
use std::path::Path;

use dfatrie_types::{Bitness, Gpr};
use libloading::Library;

use crate::error::{OracleError, Result};
use crate::{RrOutcome, ValidatorOracle};

/// "No register" in the validator's register numbering.
pub const NC_NO_REG: c_int = 0x19;

const VALIDATE_CHUNK: &[u8] = b"ValidateChunk\0";
const VALIDATE_RR: &[u8] = b"ValidateAndGetFinalRestrictedRegister\0";

type ValidateChunkFn = unsafe extern "C" fn(data: *const u8, size: u32, bitness: c_int) -> c_int;
type ValidateRrFn = unsafe extern "C" fn(
    data: *const u8,
    size: u32,
    actual_size: u32,
    initial_rr: c_int,
    resulting_rr: *mut c_int,
) -> c_int;

pub struct NativeValidator {
    validate_chunk: ValidateChunkFn,
    validate_rr: ValidateRrFn,
    // Keeps the function pointers above valid; must be dropped last.
    _library: Library,
}

impl std::fmt::Debug for NativeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeValidator").finish_non_exhaustive()
    }
}

impl NativeValidator {
    pub fn load(path: &Path) -> Result<Self> {
        // Safety: loading runs the library's initializers; the caller vouches for the library.
        let library = unsafe { Library::new(path) }.map_err(|e| OracleError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Safety: the signatures match the exported C declarations documented above, and the
        // copied function pointers never outlive `library`, which is stored alongside them.
        let (validate_chunk, validate_rr) = unsafe {
            let chunk = *library
                .get::<ValidateChunkFn>(VALIDATE_CHUNK)
                .map_err(|_| symbol_not_found(VALIDATE_CHUNK))?;
            let rr = *library
                .get::<ValidateRrFn>(VALIDATE_RR)
                .map_err(|_| symbol_not_found(VALIDATE_RR))?;
            (chunk, rr)
        };

        tracing::info!(path = %path.display(), "loaded validator library");
        Ok(Self {
            validate_chunk,
            validate_rr,
            _library: library,
        })
    }
}

fn symbol_not_found(symbol: &[u8]) -> OracleError {
    OracleError::SymbolNotFound {
        symbol: String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned(),
    }
}

fn size_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| OracleError::LengthOutOfRange { len })
}

fn encode_rr(rr: Option<Gpr>) -> c_int {
    rr.map_or(NC_NO_REG, |reg| c_int::from(reg.index()))
}

fn decode_rr(value: c_int) -> Result<Option<Gpr>> {
    if value == NC_NO_REG {
        return Ok(None);
    }
    u8::try_from(value)
        .ok()
        .and_then(Gpr::from_index)
        .map(Some)
        .ok_or(OracleError::UnknownRegister(value))
}

impl ValidatorOracle for NativeValidator {
    fn validate_chunk(&self, bundle: &[u8], bitness: Bitness) -> Result<bool> {
        let size = size_u32(bundle.len())?;
        // Safety: `bundle` is valid for `size` bytes for the duration of the call.
        let valid = unsafe { (self.validate_chunk)(bundle.as_ptr(), size, bitness.bits() as c_int) };
        Ok(valid != 0)
    }

    fn validate_with_rr(
        &self,
        bundle: &[u8],
        instruction_len: usize,
        initial_rr: Option<Gpr>,
    ) -> Result<RrOutcome> {
        let size = size_u32(bundle.len())?;
        let actual_size = size_u32(instruction_len)?;
        if instruction_len > bundle.len() {
            return Err(OracleError::LengthOutOfRange {
                len: instruction_len,
            });
        }
        let mut resulting_rr: c_int = NC_NO_REG;
        // Safety: `bundle` is valid for `size` bytes and `resulting_rr` is a live local.
        let valid = unsafe {
            (self.validate_rr)(
                bundle.as_ptr(),
                size,
                actual_size,
                encode_rr(initial_rr),
                &mut resulting_rr,
            )
        };
        if valid == 0 {
            return Ok(RrOutcome::Invalid);
        }
        Ok(RrOutcome::Valid {
            final_rr: decode_rr(resulting_rr)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_numbering_round_trips() {
        assert_eq!(encode_rr(None), NC_NO_REG);
        assert_eq!(decode_rr(NC_NO_REG).unwrap(), None);
        for reg in Gpr::ALL {
            assert_eq!(decode_rr(encode_rr(Some(reg))).unwrap(), Some(reg));
        }
        assert!(matches!(decode_rr(16), Err(OracleError::UnknownRegister(16))));
        assert!(matches!(decode_rr(-1), Err(OracleError::UnknownRegister(-1))));
    }

    #[test]
    fn load_reports_missing_library() {
        let err = NativeValidator::load(Path::new("/nonexistent/libvalidator.so")).unwrap_err();
        match err {
            OracleError::Load { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/libvalidator.so"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn symbol_names_drop_the_terminator() {
        match symbol_not_found(VALIDATE_RR) {
            OracleError::SymbolNotFound { symbol } => {
                assert_eq!(symbol, "ValidateAndGetFinalRestrictedRegister")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
