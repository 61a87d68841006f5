//! Error types.

use std::fmt;

/// Error returned when parsing an unknown [`Strategy`](crate::Strategy) name.
///
/// The rejected input is embedded within the error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseStrategyError(pub(crate) String);

impl ParseStrategyError {
    /// Returns the input whose parsing has failed.
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown buffer strategy `{}`, expected one of: mutex, spin-lock, swap, guarded-swap",
            self.0
        )
    }
}

impl std::error::Error for ParseStrategyError {}
