//! Data URL structure and parsing.

use crate::encode::assemble;
use crate::encoding::{decode_base64, unescape};
use crate::error::{Error, Result};
use crate::media_type::MediaType;
use std::fmt;
use std::str::FromStr;

/// URL scheme prefix.
pub(crate) const SCHEME: &str = "data:";

/// Marker selecting base64 payload framing.
pub(crate) const BASE64_MARKER: &str = ";base64";

/// Decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataUrl {
    /// Declared media type, or the RFC 2397 default when omitted.
    pub media_type: MediaType,
    /// Decoded payload.
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Creates a data URL from a media type and payload.
    #[must_use]
    pub const fn new(media_type: MediaType, data: Vec<u8>) -> Self {
        Self { media_type, data }
    }

    /// Parses a data URL.
    ///
    /// Format: `data:[<mediatype>][;base64],<data>`
    ///
    /// # Errors
    ///
    /// Returns the most specific error for the first structural problem
    /// found: scheme, media type, base64 marker, separator, then payload.
    /// Payload positions are offsets into `input`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let rest = input
            .strip_prefix(SCHEME.as_bytes())
            .ok_or(Error::InvalidScheme)?;

        match rest.first() {
            None => Err(Error::MissingData),
            // data:,xxxx
            Some(b',') => Self::parse_data(MediaType::default(), false, rest, input.len()),
            // data:;base64,xxxx
            Some(b';') => Self::parse_base64_marker(MediaType::default(), rest, input.len()),
            // data:type/subtype;foo=bar[;base64],xxxx
            Some(_) => {
                let comma = rest.iter().position(|&b| b == b',');
                let header = &rest[..comma.unwrap_or(rest.len())];

                let (boundary, is_base64) = match find(header, BASE64_MARKER.as_bytes()) {
                    Some(marker) => (marker, true),
                    None => (comma.ok_or(Error::MissingDataSeparator)?, false),
                };

                let media_type = parse_media_type(&rest[..boundary])?;
                tracing::trace!(%media_type, is_base64, "parsed data URL header");

                let rest = &rest[boundary..];
                if is_base64 {
                    Self::parse_base64_marker(media_type, rest, input.len())
                } else {
                    Self::parse_data(media_type, false, rest, input.len())
                }
            }
        }
    }

    /// Parses a data URL from a string.
    ///
    /// # Errors
    ///
    /// See [`DataUrl::parse`].
    pub fn parse_str(input: &str) -> Result<Self> {
        Self::parse(input.as_bytes())
    }

    /// Returns the media type essence, e.g. `image/png`.
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.media_type.essence()
    }

    /// Returns the decoded payload as text if it is valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Encodes the data URL in its canonical form.
    ///
    /// Same bytes as the [`Display`](fmt::Display) output.
    #[must_use]
    pub fn to_encoded(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Consumes the data URL, returning the payload.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn parse_base64_marker(media_type: MediaType, rest: &[u8], input_len: usize) -> Result<Self> {
        let rest = rest
            .strip_prefix(BASE64_MARKER.as_bytes())
            .ok_or(Error::InvalidBase64Marker)?;
        Self::parse_data(media_type, true, rest, input_len)
    }

    fn parse_data(
        media_type: MediaType,
        is_base64: bool,
        rest: &[u8],
        input_len: usize,
    ) -> Result<Self> {
        let payload = rest.strip_prefix(b",").ok_or(Error::MissingDataSeparator)?;

        let data = if is_base64 {
            decode_base64(payload)?
        } else {
            // The payload always runs to the end of the input.
            let start = input_len - payload.len();
            unescape(payload, true).map_err(|err| err.offset_by(start))?
        };

        Ok(Self::new(media_type, data))
    }
}

impl FromStr for DataUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for DataUrl {
    /// Writes the canonical form: literal for `text/*`, base64 otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let media_type = self.media_type.to_string();
        let is_base64 = !media_type.starts_with("text");
        f.write_str(&assemble(&media_type, is_base64, &self.data))
    }
}

fn parse_media_type(segment: &[u8]) -> Result<MediaType> {
    let segment = std::str::from_utf8(segment)
        .map_err(|_| Error::InvalidMediaType(String::from_utf8_lossy(segment).into_owned()))?;
    MediaType::parse(segment)
}

/// Finds the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
