//! Validated tail-line count for log reads

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a tail-line count is out of range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tail_lines must be between {} and {}, got {}", TailLines::MIN, TailLines::MAX, .value)]
pub struct TailLinesError {
    /// The rejected value
    pub value: u32,
}

/// Number of trailing log lines to read per container.
///
/// Always within `TailLines::MIN..=TailLines::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TailLines(u32);

impl TailLines {
    /// Smallest accepted value
    pub const MIN: u32 = 10;
    /// Largest accepted value
    pub const MAX: u32 = 5000;
    /// Default used when nothing is configured
    pub const DEFAULT: TailLines = TailLines(100);

    /// Validates and wraps a tail-line count.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::logs::TailLines;
    ///
    /// assert_eq!(TailLines::new(250).unwrap().get(), 250);
    /// assert!(TailLines::new(5).is_err());
    /// assert!(TailLines::new(10_000).is_err());
    /// ```
    pub fn new(value: u32) -> Result<Self, TailLinesError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TailLinesError { value })
        }
    }

    /// Returns the raw count.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TailLines {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for TailLines {
    type Error = TailLinesError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TailLines> for u32 {
    fn from(value: TailLines) -> Self {
        value.0
    }
}

impl fmt::Display for TailLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
