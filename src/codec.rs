//! Count encoding for reply payloads.
//!
//! A reply's data is the decimal count followed by a newline, wrapped in
//! standard (padded) base64 so it survives any text transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors that can occur when decoding a reply payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not valid base64.
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8 text.
    #[error("payload is not utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Decoded text does not end with a newline.
    #[error("payload is missing its trailing newline")]
    MissingNewline,

    /// Decoded text contains something other than ASCII digits.
    #[error("count is not a decimal number: {0:?}")]
    NotDecimal(String),

    /// Decoded digits do not fit a count.
    #[error("invalid count {text:?}: {source}")]
    InvalidCount {
        text: String,
        source: std::num::ParseIntError,
    },

    /// Replies are only emitted for non-zero tallies.
    #[error("count must be positive")]
    ZeroCount,
}

/// Encode a tally as reply data.
pub fn encode_count(count: u64) -> String {
    STANDARD.encode(format!("{}\n", count))
}

/// Decode reply data back into its count.
pub fn decode_count(data: &str) -> Result<u64, CodecError> {
    let bytes = STANDARD.decode(data)?;
    let text = String::from_utf8(bytes)?;
    let digits = text.strip_suffix('\n').ok_or(CodecError::MissingNewline)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::NotDecimal(digits.to_string()));
    }

    let count: u64 = digits.parse().map_err(|source| CodecError::InvalidCount {
        text: digits.to_string(),
        source,
    })?;

    if count == 0 {
        return Err(CodecError::ZeroCount);
    }

    Ok(count)
}
