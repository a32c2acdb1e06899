//! Data URL encoding.

use crate::encoding::{encode_base64, escape};
use crate::error::{Error, Result};
use crate::media_type::MediaType;
use crate::sniff::detect_content_type;
use crate::url::{BASE64_MARKER, SCHEME};
use std::collections::BTreeMap;

/// Options for [`encode`].
///
/// Every field defaults to unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodeOptions {
    /// Explicit media type, optionally with `;key=value` parameters.
    ///
    /// When unset (or empty) the type is sniffed from the payload.
    pub media_type: Option<String>,
    /// Extra parameters; these win over parameters already in `media_type`.
    pub media_type_params: BTreeMap<String, String>,
    /// Forces base64 (`true`) or literal (`false`) framing.
    ///
    /// When unset, base64 is used unless the media type is `text/*`.
    pub base64: Option<bool>,
}

impl EncodeOptions {
    /// Creates options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Adds one media type parameter.
    #[must_use]
    pub fn with_media_type_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.media_type_params.insert(key.into(), value.into());
        self
    }

    /// Adds several media type parameters.
    #[must_use]
    pub fn with_media_type_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.media_type_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Forces or disables base64 framing.
    #[must_use]
    pub const fn with_base64(mut self, base64: bool) -> Self {
        self.base64 = Some(base64);
        self
    }
}

/// Encodes `data` as a data URL.
///
/// # Errors
///
/// Returns an error if the explicit media type cannot be parsed or a
/// parameter name is empty. Payload encoding never fails.
pub fn encode(data: &[u8], options: &EncodeOptions) -> Result<Vec<u8>> {
    encode_to_string(data, options).map(String::into_bytes)
}

/// Encodes `data` as a data URL string.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_to_string(data: &[u8], options: &EncodeOptions) -> Result<String> {
    let media_type = resolve_media_type(data, options)?;
    let is_base64 = options
        .base64
        .unwrap_or_else(|| !media_type.starts_with("text"));

    tracing::debug!(%media_type, is_base64, len = data.len(), "encoding data URL");

    Ok(assemble(&media_type, is_base64, data))
}

/// Picks the explicit or sniffed type, overlays extra parameters and
/// returns the canonical form.
fn resolve_media_type(data: &[u8], options: &EncodeOptions) -> Result<String> {
    let raw = match options.media_type.as_deref().filter(|mt| !mt.is_empty()) {
        Some(explicit) => explicit,
        None => {
            let sniffed = detect_content_type(data);
            tracing::trace!(sniffed, "sniffed media type");
            sniffed
        }
    };

    let mut media_type = MediaType::parse(raw)?;

    for (key, value) in &options.media_type_params {
        if key.is_empty() {
            return Err(Error::InvalidMediaType(format!(
                "empty parameter name for value {value:?}"
            )));
        }
        media_type
            .parameters
            .insert(key.to_lowercase(), value.clone());
    }

    Ok(media_type.to_string())
}

/// Writes `data:<media type>[;base64],<payload>`.
pub(crate) fn assemble(media_type: &str, is_base64: bool, data: &[u8]) -> String {
    let payload = if is_base64 {
        encode_base64(data)
    } else {
        escape(data)
    };

    let mut result =
        String::with_capacity(SCHEME.len() + media_type.len() + BASE64_MARKER.len() + 1 + payload.len());
    result.push_str(SCHEME);
    result.push_str(media_type);
    if is_base64 {
        result.push_str(BASE64_MARKER);
    }
    result.push(',');
    result.push_str(&payload);
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sniffed_text_is_literal() {
        let encoded = encode_to_string(b"hello, world!", &EncodeOptions::new()).unwrap();
        assert_eq!(encoded, "data:text/plain;charset=utf-8,hello%2C%20world!");
    }

    #[test]
    fn test_encode_sniffed_binary_is_base64() {
        let encoded = encode_to_string(&[0x00, 0x01, 0x02], &EncodeOptions::new()).unwrap();
        assert_eq!(encoded, "data:application/octet-stream;base64,AAEC");
    }

    #[test]
    fn test_encode_explicit_non_text_is_base64() {
        let options = EncodeOptions::new().with_media_type("application/json");
        let encoded = encode_to_string(br#"{"hello":"world"}"#, &options).unwrap();
        assert_eq!(encoded, "data:application/json;base64,eyJoZWxsbyI6IndvcmxkIn0=");
    }

    #[test]
    fn test_encode_params_override_embedded() {
        let options = EncodeOptions::new()
            .with_media_type("application/json; charset=US-ASCII")
            .with_media_type_param("charset", "utf-8");
        let encoded = encode_to_string(br#"{"hello":"world"}"#, &options).unwrap();
        assert_eq!(
            encoded,
            "data:application/json;charset=utf-8;base64,eyJoZWxsbyI6IndvcmxkIn0="
        );
    }

    #[test]
    fn test_encode_params_on_sniffed_type() {
        let options = EncodeOptions::new().with_media_type_params([("format", "flowed")]);
        let encoded = encode_to_string(b"hi", &options).unwrap();
        assert_eq!(encoded, "data:text/plain;charset=utf-8;format=flowed,hi");
    }

    #[test]
    fn test_encode_caller_param_key_is_lowercased() {
        let options = EncodeOptions::new()
            .with_media_type("text/plain;charset=US-ASCII")
            .with_media_type_param("Charset", "utf-8");
        let encoded = encode_to_string(b"hi", &options).unwrap();
        assert_eq!(encoded, "data:text/plain;charset=utf-8,hi");
    }

    #[test]
    fn test_encode_forced_framing() {
        let options = EncodeOptions::new()
            .with_media_type("text/plain")
            .with_base64(true);
        assert_eq!(
            encode_to_string(b"hi", &options).unwrap(),
            "data:text/plain;base64,aGk="
        );

        let options = EncodeOptions::new()
            .with_media_type("image/png")
            .with_base64(false);
        assert_eq!(
            encode_to_string(b"\x89PNG", &options).unwrap(),
            "data:image/png,%89PNG"
        );
    }

    #[test]
    fn test_encode_empty_media_type_is_sniffed() {
        let options = EncodeOptions::new().with_media_type("");
        let encoded = encode_to_string(b"hi", &options).unwrap();
        assert_eq!(encoded, "data:text/plain;charset=utf-8,hi");
    }

    #[test]
    fn test_encode_invalid_media_type() {
        let options = EncodeOptions::new().with_media_type("not a type");
        assert!(matches!(
            encode(b"hi", &options),
            Err(Error::InvalidMediaType(_))
        ));

        let options = EncodeOptions::new()
            .with_media_type("text/plain")
            .with_media_type_param("", "x");
        assert!(matches!(
            encode(b"hi", &options),
            Err(Error::InvalidMediaType(_))
        ));
    }
}
