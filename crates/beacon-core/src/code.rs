//! Session-code generation
//!
//! Codes are 6-digit numeric strings in the range 100000-999999, short
//! enough to read over the phone. Allocation resamples until the candidate
//! is not already in use, with a hard attempt cap so a pathologically full
//! registry surfaces as an error instead of a spin loop.

use crate::error::CodeError;

/// Lowest valid session code
pub const CODE_MIN: u32 = 100_000;

/// Number of distinct session codes
pub const CODE_SPAN: u32 = 900_000;

/// Resampling cap before allocation is declared exhausted
pub const MAX_CODE_ATTEMPTS: u32 = 1_000;

/// Generate a session code not currently in use.
///
/// `in_use` is the registry membership test; this function never mutates
/// registry state itself. Returns `CodeError::SpaceExhausted` once the
/// attempt cap is hit.
pub fn generate_code<F>(in_use: F) -> Result<String, CodeError>
where
    F: Fn(&str) -> bool,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = sample_code()?;
        if !in_use(&code) {
            return Ok(code);
        }
    }
    Err(CodeError::SpaceExhausted(MAX_CODE_ATTEMPTS))
}

/// Largest multiple of `CODE_SPAN` representable in the draw width;
/// draws at or above it come from the truncated tail and are rejected
const REJECT_LIMIT: u32 = ((1u64 << 32) / CODE_SPAN as u64 * CODE_SPAN as u64) as u32;

/// Sample one uniformly random code from the range.
///
/// Rejection sampling: 2^32 is not a multiple of the code span, so raw
/// modulo would skew low codes. Tail draws are resampled.
fn sample_code() -> Result<String, CodeError> {
    loop {
        let mut bytes = [0u8; 4];
        getrandom::getrandom(&mut bytes).map_err(|_| CodeError::RngFailure)?;
        let draw = u32::from_le_bytes(bytes);
        if draw < REJECT_LIMIT {
            return Ok((CODE_MIN + draw % CODE_SPAN).to_string());
        }
    }
}

/// Check the session-code format (6 ASCII digits, no leading zero)
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) && !code.starts_with('0')
}
