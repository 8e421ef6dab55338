//! Error types for layer-entities.
//!
//! Every error here is a client input error: the text or the entities handed
//! in cannot be turned into a valid [`crate::FormattedText`]. Repairable
//! problems (overlaps, bad nesting, rejected URL candidates) never surface as
//! errors, they are fixed silently.

use std::fmt;

// ─── Error ────────────────────────────────────────────────────────────────────

/// Rejection of a text or of one of its entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The text is not valid UTF-8.
    InvalidUtf8,
    /// An entity offset is negative or absurdly large.
    InvalidOffset { value: i32 },
    /// An entity length is negative or absurdly large.
    InvalidLength { value: i32 },
    /// The resulting text is empty and empty text is not allowed.
    EmptyText,
    /// An entity boundary falls into the middle of a character.
    SplitSymbol { offset: i32, byte: usize, at_end: bool },
    /// An entity starts or ends after the end of the text.
    OutOfText { offset: i32, end: Option<i32> },
    /// Markup could not be parsed.
    Parse { message: String },
    /// A link or identifier was refused by a collaborator.
    Rejected { message: String },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// HTTP-like status code the error maps to.
    pub fn code(&self) -> i32 {
        400
    }

    /// Human-readable message, identical to the `Display` output.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 => write!(f, "Strings must be encoded in UTF-8"),
            Self::InvalidOffset { value } => write!(f, "Receive an entity with incorrect offset {value}"),
            Self::InvalidLength { value } => write!(f, "Receive an entity with incorrect length {value}"),
            Self::EmptyText => write!(f, "Text must be non-empty"),
            Self::SplitSymbol { offset, byte, at_end: true } => write!(
                f,
                "Entity beginning at UTF-16 offset {offset} ends in a middle of a UTF-16 symbol at byte offset {byte}"
            ),
            Self::SplitSymbol { byte, at_end: false, .. } => {
                write!(f, "Entity begins in a middle of a UTF-16 symbol at byte offset {byte}")
            }
            Self::OutOfText { offset, end: None } => {
                write!(f, "Entity begins after the end of the text at UTF-16 offset {offset}")
            }
            Self::OutOfText { offset, end: Some(end) } => write!(
                f,
                "Entity beginning at UTF-16 offset {offset} ends after the end of the text at UTF-16 offset {end}"
            ),
            Self::Parse { message } | Self::Rejected { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for entity operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(Error::InvalidUtf8.to_string(), "Strings must be encoded in UTF-8");
        assert_eq!(
            Error::InvalidLength { value: -1 }.to_string(),
            "Receive an entity with incorrect length -1"
        );
        assert_eq!(
            Error::OutOfText { offset: 3, end: Some(9) }.to_string(),
            "Entity beginning at UTF-16 offset 3 ends after the end of the text at UTF-16 offset 9"
        );
        assert_eq!(Error::parse("boom").message(), "boom");
        assert_eq!(Error::EmptyText.code(), 400);
    }
}
