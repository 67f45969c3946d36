//! Document-key codec for logical row ids.
//!
//! Logical row ids may contain characters that are forbidden in remote
//! document keys (most importantly `/`). The codec percent-encodes ids on
//! write and on lookup, and decodes document keys back to logical ids on
//! read. The unreserved set matches the JavaScript `encodeURIComponent`
//! function, which the wire format was born with.

use thiserror::Error;

/// Errors that can occur while decoding a document key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdCodecError {
    /// A `%` escape was cut short by the end of the key.
    #[error("truncated percent escape in key {key:?}")]
    TruncatedEscape {
        /// The offending key.
        key: String,
    },

    /// A `%` escape contained non-hex characters.
    #[error("invalid percent escape in key {key:?}")]
    InvalidEscape {
        /// The offending key.
        key: String,
    },

    /// The decoded bytes are not valid UTF-8.
    #[error("decoded key {key:?} is not valid UTF-8")]
    InvalidUtf8 {
        /// The offending key.
        key: String,
    },
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')'
        )
}

fn hex_digit(value: u8) -> char {
    char::from_digit(u32::from(value), 16)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Percent-encodes a logical row id into a legal document key.
#[must_use]
pub fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if is_unreserved(byte) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0F));
        }
    }
    out
}

/// Decodes a document key back into the logical row id.
///
/// # Errors
///
/// Returns an [`IdCodecError`] on malformed escapes or invalid UTF-8.
pub fn decode_id(key: &str) -> Result<String, IdCodecError> {
    let bytes = key.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return Err(IdCodecError::TruncatedEscape {
                    key: key.to_string(),
                });
            }
            let hi = hex_value(bytes[i + 1]);
            let lo = hex_value(bytes[i + 2]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                _ => {
                    return Err(IdCodecError::InvalidEscape {
                        key: key.to_string(),
                    })
                }
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| IdCodecError::InvalidUtf8 {
        key: key.to_string(),
    })
}
