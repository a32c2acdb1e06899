//! MIME media type handling.

use crate::encoding::{escape_where, unescape};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// MIME media type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaType {
    /// Main type (e.g., "text", "image", "application").
    pub main_type: String,
    /// Subtype (e.g., "plain", "gif", "json").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8), ordered by key.
    pub parameters: BTreeMap<String, String>,
}

impl MediaType {
    /// Creates a new media type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain media type with a utf-8 charset.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Adds a parameter.
    ///
    /// The key is lowercased, replacing any parameter with the same name.
    /// An empty key is ignored.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        if !key.is_empty() {
            self.parameters.insert(key, value.into());
        }
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Checks if this is a text media type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a media type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="quoted \"value\""`
    ///
    /// Type, subtype and parameter names are lowercased. Parameter names
    /// and values containing `%` are percent-decoded afterwards; a name
    /// that changes is re-keyed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if the grammar is violated, if
    /// a parameter cannot be percent-decoded, or if two parameters share a
    /// name before or after decoding.
    pub fn parse(s: &str) -> Result<Self> {
        let split = s.find(';').unwrap_or(s.len());
        let essence = s[..split].trim().to_lowercase();

        let (main_type, sub_type) = essence
            .split_once('/')
            .filter(|(main, sub)| is_token(main) && is_token(sub))
            .ok_or_else(|| Error::InvalidMediaType(s[..split].to_string()))?;

        let mut media_type = Self::new(main_type, sub_type);

        let mut rest = &s[split..];
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            let Some((key, value, remaining)) = consume_parameter(rest) else {
                // A lone trailing semicolon is tolerated.
                if rest.trim() == ";" {
                    break;
                }
                return Err(Error::InvalidMediaType(rest.to_string()));
            };

            match media_type.parameters.entry(key) {
                Entry::Occupied(entry) => return Err(duplicate_parameter(entry.key())),
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
            rest = remaining;
        }

        media_type.unescape_parameters()?;
        Ok(media_type)
    }

    /// Percent-decodes parameter names and values that contain `%`.
    fn unescape_parameters(&mut self) -> Result<()> {
        if !self
            .parameters
            .iter()
            .any(|(key, value)| key.contains('%') || value.contains('%'))
        {
            return Ok(());
        }

        let mut unescaped = BTreeMap::new();
        for (key, value) in std::mem::take(&mut self.parameters) {
            let (Some(new_key), Some(new_value)) = (unescape_text(&key), unescape_text(&value))
            else {
                return Err(Error::InvalidMediaType(format!(
                    "cannot percent-decode parameter {key}={value}"
                )));
            };

            match unescaped.entry(new_key.to_lowercase()) {
                Entry::Occupied(entry) => return Err(duplicate_parameter(entry.key())),
                Entry::Vacant(entry) => {
                    entry.insert(new_value);
                }
            }
        }

        self.parameters = unescaped;
        Ok(())
    }
}

impl Default for MediaType {
    /// The RFC 2397 default, `text/plain;charset=US-ASCII`.
    fn default() -> Self {
        Self::new("text", "plain").with_parameter("charset", "US-ASCII")
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MediaType {
    /// Writes `type/subtype;key=value...` with lowercased keys.
    ///
    /// Empty keys are skipped. When keys differ only in case, the first in
    /// key order is written.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        let mut written = Vec::with_capacity(self.parameters.len());
        for (key, value) in &self.parameters {
            let key = key.to_lowercase();
            if key.is_empty() || written.contains(&key) {
                continue;
            }
            let mut escaped_key = escape_where(&key, |c| c == '%' || !is_token_char(c));
            written.push(key);
            // ";base64" would be read as the payload marker.
            if escaped_key.starts_with("base64") {
                escaped_key.replace_range(..1, "%62");
            }
            // ',' and ';' would be mistaken for the data URL delimiters.
            let value = escape_where(value, |c| matches!(c, '%' | ',' | ';') || c.is_ascii_control());

            if !value.is_empty() && is_token(&value) {
                write!(f, ";{escaped_key}={value}")?;
            } else {
                write!(f, ";{escaped_key}=\"")?;
                for c in value.chars() {
                    if c == '"' || c == '\\' {
                        f.write_char('\\')?;
                    }
                    f.write_char(c)?;
                }
                f.write_char('"')?;
            }
        }

        Ok(())
    }
}

/// Characters that terminate a token (RFC 2045 `tspecials`).
const fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

const fn is_token_char(c: char) -> bool {
    c > ' ' && c < '\u{7f}' && !is_tspecial(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Splits `s` into its leading token and the remainder.
fn consume_token(s: &str) -> (&str, &str) {
    let end = s.find(|c| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Consumes a token or quoted-string value.
fn consume_value(s: &str) -> Option<(String, &str)> {
    let Some(quoted) = s.strip_prefix('"') else {
        let (token, rest) = consume_token(s);
        return (!token.is_empty()).then(|| (token.to_string(), rest));
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &quoted[i + 1..])),
            '\\' => match chars.peek() {
                Some(&(_, next)) if is_tspecial(next) => {
                    value.push(next);
                    chars.next();
                }
                _ => value.push(c),
            },
            '\r' | '\n' => return None,
            _ => value.push(c),
        }
    }

    // Unterminated quoted string.
    None
}

/// Consumes `;key=value`, returning the lowercased key, the value and the rest.
fn consume_parameter(s: &str) -> Option<(String, String, &str)> {
    let rest = s.strip_prefix(';')?.trim_start();

    let (key, rest) = consume_token(rest);
    if key.is_empty() {
        return None;
    }

    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let (value, rest) = consume_value(rest)?;

    Some((key.to_lowercase(), value, rest))
}

/// Percent-decodes `text`, or `None` if an escape is malformed or the
/// result is not UTF-8.
fn unescape_text(text: &str) -> Option<String> {
    if !text.contains('%') {
        return Some(text.to_string());
    }

    let bytes = unescape(text.as_bytes(), false).ok()?;
    String::from_utf8(bytes).ok()
}

fn duplicate_parameter(key: &str) -> Error {
    Error::InvalidMediaType(format!("duplicate parameter {key:?}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_media_type_new() {
        let mt = MediaType::new("text", "plain");
        assert_eq!(mt.main_type, "text");
        assert_eq!(mt.sub_type, "plain");
        assert!(mt.parameters.is_empty());
    }

    #[test]
    fn test_default() {
        let mt = MediaType::default();
        assert_eq!(mt.essence(), "text/plain");
        assert_eq!(mt.charset(), Some("US-ASCII"));
        assert_eq!(mt.to_string(), "text/plain;charset=US-ASCII");
    }

    #[test]
    fn test_text_plain() {
        let mt = MediaType::text_plain();
        assert!(mt.is_text());
        assert_eq!(mt.charset(), Some("utf-8"));
    }

    #[test]
    fn test_media_type_parse() {
        let mt = MediaType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(mt.main_type, "text");
        assert_eq!(mt.sub_type, "plain");
        assert_eq!(mt.charset(), Some("utf-8"));
    }

    #[test]
    fn test_media_type_parse_lowercases_names() {
        let mt = MediaType::parse("Application/JSON; CharSet=UTF-8").unwrap();
        assert_eq!(mt.essence(), "application/json");
        assert_eq!(mt.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_media_type_parse_quoted() {
        let mt = MediaType::parse(r#"application/json;oddParam1="a\"<@>\"z""#).unwrap();
        assert_eq!(mt.parameters.get("oddparam1").unwrap(), r#"a"<@>"z"#);

        let mt = MediaType::parse(r#"text/plain; name="" ; x="a\b""#).unwrap();
        assert_eq!(mt.parameters.get("name").unwrap(), "");
        assert_eq!(mt.parameters.get("x").unwrap(), r"a\b");
    }

    #[test]
    fn test_media_type_parse_trailing_semicolon() {
        let mt = MediaType::parse("text/plain;charset=utf-8; ").unwrap();
        assert_eq!(mt.to_string(), "text/plain;charset=utf-8");
        assert!(MediaType::parse("text/plain;").is_ok());
    }

    #[test]
    fn test_media_type_parse_rekeys_escaped_name() {
        let mt = MediaType::parse("text/plain;odd%20param2=hello%20world").unwrap();
        assert!(!mt.parameters.contains_key("odd%20param2"));
        assert_eq!(mt.parameters.get("odd param2").unwrap(), "hello world");
    }

    #[test]
    fn test_media_type_parse_unescapes_value() {
        let mt = MediaType::parse("text/plain;title=50%25%20off").unwrap();
        assert_eq!(mt.parameters.get("title").unwrap(), "50% off");
    }

    #[test]
    fn test_media_type_parse_errors() {
        for input in [
            "",
            "text",
            "text/",
            "/plain",
            "text/plain/extra",
            "te xt/plain",
            "text/plain;charset",
            "text/plain;=utf-8",
            "text/plain;charset=",
            "text/plain;charset=utf-8 junk",
            "text/plain;a=1;a=2",
            "text/plain;;",
        ] {
            assert!(
                matches!(MediaType::parse(input), Err(Error::InvalidMediaType(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_media_type_parse_unterminated_quote() {
        let err = MediaType::parse(r#"text/plain;name="abc"#).unwrap_err();
        assert!(matches!(err, Error::InvalidMediaType(ref text) if text.contains("abc")));

        assert!(MediaType::parse("text/plain;name=\"a\nb\"").is_err());
    }

    #[test]
    fn test_media_type_parse_bad_escape() {
        let err = MediaType::parse("text/plain;charset=utf-8;name=100%").unwrap_err();
        assert!(matches!(err, Error::InvalidMediaType(ref text) if text.contains("name=100%")));

        let err = MediaType::parse("text/plain;%zz=1").unwrap_err();
        assert!(matches!(err, Error::InvalidMediaType(ref text) if text.contains("%zz=1")));

        // %FF alone is not UTF-8.
        assert!(matches!(
            MediaType::parse("text/plain;name=%FF"),
            Err(Error::InvalidMediaType(_))
        ));
    }

    #[test]
    fn test_media_type_parse_rekey_collision() {
        for input in [
            "text/plain;a=1;%61=2",
            "text/plain;%61=1;%2561=2;a=3",
            "text/plain;%41=1;a=2",
        ] {
            let err = MediaType::parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidMediaType(ref text) if text.contains("duplicate")),
                "{input:?} should be rejected"
            );
        }

        // A name that decodes to a distinct key is fine.
        let mt = MediaType::parse("text/plain;%2561=1;a=2").unwrap();
        assert_eq!(mt.parameters.get("%61").unwrap(), "1");
        assert_eq!(mt.parameters.get("a").unwrap(), "2");
    }

    #[test]
    fn test_media_type_display() {
        let mt = MediaType::new("application", "json")
            .with_parameter("charset", "utf-8")
            .with_parameter("a", "x y");
        assert_eq!(mt.to_string(), r#"application/json;a="x y";charset=utf-8"#);
    }

    #[test]
    fn test_media_type_display_escapes() {
        let mt = MediaType::new("text", "plain")
            .with_parameter("Odd Key", "say \"hi\"")
            .with_parameter("list", "a,b;base64")
            .with_parameter("empty", "");
        assert_eq!(
            mt.to_string(),
            r#"text/plain;odd%20key="say \"hi\"";empty="";list=a%2Cb%3Bbase64"#
        );
    }

    #[test]
    fn test_media_type_display_hides_marker_like_key() {
        let mt = MediaType::new("text", "plain").with_parameter("base64", "no");
        assert_eq!(mt.to_string(), "text/plain;%62ase64=no");
        assert_eq!(MediaType::parse(&mt.to_string()).unwrap(), mt);
    }

    #[test]
    fn test_media_type_display_skips_unrepresentable_keys() {
        let mut mt = MediaType::new("text", "plain");
        mt.parameters.insert("A".to_string(), "1".to_string());
        mt.parameters.insert("a".to_string(), "2".to_string());
        mt.parameters.insert(String::new(), "3".to_string());

        assert_eq!(mt.to_string(), "text/plain;a=1");
        let parsed = MediaType::parse(&mt.to_string()).unwrap();
        assert_eq!(parsed, MediaType::new("text", "plain").with_parameter("a", "1"));
    }

    #[test]
    fn test_media_type_with_parameter_normalizes_key() {
        let mt = MediaType::new("text", "plain")
            .with_parameter("CharSet", "utf-8")
            .with_parameter("charset", "latin1")
            .with_parameter("", "ignored");

        assert_eq!(mt.parameters.len(), 1);
        assert_eq!(mt.charset(), Some("latin1"));
    }

    #[test]
    fn test_media_type_with_parameter() {
        let mt = MediaType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");

        assert_eq!(mt.charset(), Some("iso-8859-1"));
        assert_eq!(mt.parameters.get("format"), Some(&"flowed".to_string()));
    }

    fn token() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9.+-]{0,10}"
    }

    proptest! {
        #[test]
        fn display_then_parse_round_trips(
            main in token(),
            sub in token(),
            params in proptest::collection::vec(("[a-zA-Z0-9 %,;\"é-]{0,8}", "\\PC{0,12}"), 0..4),
        ) {
            let mt = params
                .into_iter()
                .fold(MediaType::new(main, sub), |mt, (key, value)| mt.with_parameter(key, value));
            let parsed = MediaType::parse(&mt.to_string()).unwrap();
            prop_assert_eq!(parsed, mt);
        }
    }
}
