//! Payload encoding and decoding utilities.
//!
//! Supports Base64 framing and RFC 3986 percent-encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Standard padded alphabet that tolerates non-zero trailing bits on decode.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// Line breaks (`\r`, `\n`) are skipped, so wrapped payloads decode.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Cow<'_, [u8]> = if data.iter().any(|b| matches!(b, b'\r' | b'\n')) {
        Cow::Owned(
            data.iter()
                .copied()
                .filter(|b| !matches!(b, b'\r' | b'\n'))
                .collect(),
        )
    } else {
        Cow::Borrowed(data)
    };

    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Checks if a byte may appear unescaped in a data URL payload.
///
/// Unreserved bytes are `0-9`, `A-Z`, `a-z` and `'()*-.!_~`.
#[must_use]
pub const fn is_unreserved(byte: u8) -> bool {
    matches!(
        byte,
        b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
            | b'\''..=b'*'
            | b'-'..=b'.'
            | b'!'
            | b'_'
            | b'~'
    )
}

/// Percent-encodes every byte outside the unreserved set.
///
/// Escapes use two uppercase hexadecimal digits (`%2C`).
#[must_use]
pub fn escape(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len());

    for &byte in data {
        if is_unreserved(byte) {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "%{byte:02X}");
        }
    }

    result
}

/// Percent-encodes the characters of `text` selected by `needs_escape`.
///
/// A selected character is written as one escape per UTF-8 byte.
pub(crate) fn escape_where(text: &str, needs_escape: impl Fn(char) -> bool) -> String {
    let mut result = String::with_capacity(text.len());
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        if needs_escape(ch) {
            for byte in ch.encode_utf8(&mut buf).bytes() {
                let _ = write!(result, "%{byte:02X}");
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Decodes percent-encoded data.
///
/// In `strict` mode every byte that is neither part of an escape nor
/// unreserved is rejected. Otherwise such bytes pass through verbatim.
///
/// # Errors
///
/// Returns [`Error::InvalidEscape`] when a `%` is not followed by two
/// hexadecimal digits, and [`Error::ReservedCharacter`] for a reserved
/// byte in strict mode.
pub fn unescape(data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];

        if byte == b'%' {
            let decoded = data
                .get(i + 1..i + 3)
                .and_then(|hex| Some((hex_value(hex[0])? << 4) | hex_value(hex[1])?))
                .ok_or(Error::InvalidEscape { position: i })?;
            result.push(decoded);
            i += 3;
            continue;
        }

        if strict && !is_unreserved(byte) {
            return Err(Error::ReservedCharacter { byte, position: i });
        }

        result.push(byte);
        i += 1;
    }

    Ok(result)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
