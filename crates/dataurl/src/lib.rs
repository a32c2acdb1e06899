//! # dataurl
//!
//! RFC 2397 `data:` URL parsing and encoding.
//!
//! ## Features
//!
//! - **Parsing**: Split a data URL into its media type and decoded payload
//! - **Encoding**: Build canonical data URLs, sniffing the media type if needed
//! - **Media types**: Full `type/subtype;key=value` grammar with quoted values
//! - **Encoding primitives**: Base64 and RFC 3986 percent-encoding
//!
//! ## Quick Start
//!
//! ### Parsing Data URLs
//!
//! ```ignore
//! use dataurl::DataUrl;
//!
//! let url = DataUrl::parse(b"data:application/json;charset=utf-8;base64,eyJIZWxsbyI6IldvcmxkISJ9")?;
//!
//! println!("media type: {}", url.mime_type());
//! for (key, value) in &url.media_type.parameters {
//!     println!("  {key}: {value}");
//! }
//! println!("data: {}", url.text().unwrap_or("(binary)"));
//! ```
//!
//! ### Encoding Data URLs
//!
//! ```ignore
//! use dataurl::{encode, EncodeOptions};
//!
//! // Sniffed as text/plain, so the payload is percent-encoded.
//! let url = encode(b"hello, world!", &EncodeOptions::new())?;
//! assert_eq!(url, b"data:text/plain;charset=utf-8,hello%2C%20world!");
//!
//! // Anything that is not text/* is base64 encoded.
//! let options = EncodeOptions::new()
//!     .with_media_type("application/json")
//!     .with_media_type_param("charset", "utf-8");
//! let url = encode(br#"{"hello":"world"}"#, &options)?;
//! ```
//!
//! ### Media Types
//!
//! ```ignore
//! use dataurl::MediaType;
//!
//! let mt = MediaType::parse(r#"text/plain; charset=utf-8; name="a \"quoted\" value""#)?;
//! assert_eq!(mt.charset(), Some("utf-8"));
//! println!("{mt}"); // text/plain;charset=utf-8;name="a \"quoted\" value"
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod encode;
mod error;
mod media_type;
mod url;

pub mod encoding;
pub mod sniff;

pub use encode::{EncodeOptions, encode, encode_to_string};
pub use error::{Error, Result};
pub use media_type::MediaType;
pub use url::DataUrl;
