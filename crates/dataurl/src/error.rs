//! Error types for data URL operations.

/// Result type alias for data URL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Data URL error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input does not start with `data:`.
    #[error("Invalid scheme: data URL must start with \"data:\"")]
    InvalidScheme,

    /// Nothing follows the scheme.
    #[error("Invalid data URL: no data after scheme")]
    MissingData,

    /// Media type or parameter grammar violation.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// Expected `;base64` marker is absent.
    #[error("Invalid data URL: expected \";base64\" marker")]
    InvalidBase64Marker,

    /// No comma separates the header from the payload.
    #[error("Invalid data URL: missing ',' before data")]
    MissingDataSeparator,

    /// Malformed `%XX` escape sequence.
    #[error("Invalid escape sequence at byte {position}")]
    InvalidEscape {
        /// Offset of the offending `%` in the parsed input.
        position: usize,
    },

    /// Reserved byte found unescaped where escaping is required.
    #[error("Reserved character 0x{byte:02X} at byte {position}")]
    ReservedCharacter {
        /// The offending byte.
        byte: u8,
        /// Offset of the offending byte in the parsed input.
        position: usize,
    },

    /// Base64 payload could not be decoded.
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64Payload(#[from] base64::DecodeError),
}

impl Error {
    /// Shifts a reported position by `offset` bytes.
    pub(crate) fn offset_by(self, offset: usize) -> Self {
        match self {
            Self::InvalidEscape { position } => Self::InvalidEscape {
                position: position + offset,
            },
            Self::ReservedCharacter { byte, position } => Self::ReservedCharacter {
                byte,
                position: position + offset,
            },
            other => other,
        }
    }
}
