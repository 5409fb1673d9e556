//! CAS registry number value type.
//!
//! A [`CasNumber`] is the lookup key for every provider and for the artifact
//! store. The format (`digits-digits-digit`) is deliberately *not* validated:
//! a malformed number is a legal input that simply fails resolution. The only
//! construction-time rule is that the value is non-empty.

use std::fmt;

use thiserror::Error;

/// Error returned when a CAS number cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CasError {
    /// The input was the empty string.
    #[error("CAS number must not be empty")]
    Empty,
}

/// An immutable CAS registry number.
///
/// Equality, ordering and hashing use the raw string exactly as supplied:
/// comparison is case- and whitespace-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CasNumber(String);

impl CasNumber {
    /// Wraps a raw CAS string.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::Empty`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, CasError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CasError::Empty);
        }
        Ok(Self(value))
    }

    /// Returns the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CasNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CasNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CasNumber {
    type Error = CasError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for CasNumber {
    type Error = CasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
