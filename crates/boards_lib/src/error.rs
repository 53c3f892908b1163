//! A module containing the [`BoardsError`] struct, which contains various basic error types.

/// Represents any type of error that could happen when using this crate.
#[derive(thiserror::Error, Debug)]
#[rustfmt::skip]
pub enum BoardsError {
    // --------
    // --- Internal server errors
    // --------

    /// An error that happened when interacting with the MySQL/MariaDB database.
    #[error(transparent)]
    MySql(#[from] sqlx::Error),
    /// An internal error.
    #[error("internal error: {0}")]
    Internal(String),

    // --------
    // --- Logical errors
    // --------

    /// A request option that must hold a boolean literal held something else.
    ///
    /// This is the single parsing failure that is surfaced to the caller. Every other
    /// malformed option value silently falls back to its default.
    #[error("option `{option}` expects a boolean, got `{value}`")]
    InvalidBoolean {
        /// The wire name of the option.
        option: &'static str,
        /// The rejected literal.
        value: String,
    },
}

impl AsRef<BoardsError> for BoardsError {
    fn as_ref(&self) -> &BoardsError {
        self
    }
}

/// Shortcut for creating an internal error, by formatting a message.
///
/// See [`BoardsError::Internal`].
#[macro_export]
macro_rules! internal {
    ($($t:tt)*) => {{
        $crate::error::BoardsError::Internal($crate::error::__private::format!($($t)*))
    }};
}

#[doc(hidden)]
pub mod __private {
    pub use std::format;
}

/// Represents the result of a computation that could return a [`BoardsError`].
pub type BoardsResult<T = ()> = Result<T, BoardsError>;
