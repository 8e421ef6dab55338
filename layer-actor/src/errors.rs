//! Error status carried through promises.

use std::fmt;

/// Code of the error a future receives when its promise side disappears.
pub const HANGUP_ERROR_CODE: i32 = 426487;

// ─── Error ────────────────────────────────────────────────────────────────────

/// A failed result: numeric code plus message.
///
/// Cloneable so one failure can be delivered to many promises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub code:    i32,
    pub message: String,
}

impl Error {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// The pseudo-error of a hung up promise/future pair.
    ///
    /// Terminal: the producer must not retry after seeing it.
    pub fn hangup() -> Self {
        Self::new(HANGUP_ERROR_CODE, "Hangup")
    }

    /// Delivered to result handlers of promises dropped without a result.
    pub fn lost_promise() -> Self {
        Self::new(0, "Lost promise")
    }

    pub fn is_hangup(&self) -> bool {
        self.code == HANGUP_ERROR_CODE
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Error : {} : {}]", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for promise values.
pub type Result<T> = std::result::Result<T, Error>;
