//! Errors surfaced by codec sessions

use std::fmt;

/// Failure of a decode or encode session
///
/// Each variant carries the diagnostic text the caller sees, bounded to the
/// error channel's capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The codec could not open the stream
    Open(String),
    /// The raster could not be decoded
    Decode(String),
    /// A scanline or the directory could not be written
    Encode(String),
    /// The caller passed unusable arguments
    Argument(String),
}

impl SessionError {
    /// The diagnostic text
    pub fn message(&self) -> &str {
        match self {
            SessionError::Open(message)
            | SessionError::Decode(message)
            | SessionError::Encode(message)
            | SessionError::Argument(message) => message,
        }
    }

    /// Whether this is an argument error rather than a codec failure
    pub fn is_argument(&self) -> bool {
        matches!(self, SessionError::Argument(_))
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SessionError {}
