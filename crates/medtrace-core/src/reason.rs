//! Validated free-text reasons for reversals and disposal.
//!
//! Recall, return, and disposal all require a justification that ends up
//! in the permanent ledger. [`Reason`] enforces the validation rules once
//! at construction so downstream code can carry it without re-checking.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::limits::REASON_MAX_LEN;

/// Why constructing a [`Reason`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReasonError {
    /// The text was empty or whitespace-only.
    #[error("a reason is required")]
    Required,
    /// The text exceeded the maximum length.
    #[error("reason is {len} characters, maximum is {max}")]
    TooLong {
        /// Length of the rejected text, in characters.
        len: usize,
        /// The enforced maximum.
        max: usize,
    },
}

/// A validated free-text reason.
///
/// Guaranteed non-blank and at most [`REASON_MAX_LEN`] characters.
/// Surrounding whitespace is trimmed at construction.
///
/// # Examples
///
/// ```
/// use medtrace_core::{Reason, ReasonError};
///
/// let reason = Reason::new("patient reported adverse reaction").unwrap();
/// assert_eq!(reason.as_str(), "patient reported adverse reaction");
///
/// assert_eq!(Reason::new("   "), Err(ReasonError::Required));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reason(String);

impl Reason {
    /// Validate and construct a reason.
    pub fn new(text: impl Into<String>) -> Result<Self, ReasonError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ReasonError::Required);
        }
        let len = trimmed.chars().count();
        if len > REASON_MAX_LEN {
            return Err(ReasonError::TooLong {
                len,
                max: REASON_MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The validated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Reason {
    type Error = ReasonError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl From<Reason> for String {
    fn from(reason: Reason) -> Self {
        reason.0
    }
}

/// Why a unit was disposed of.
///
/// Free text is carried only by the `Other` variant; the named variants
/// are self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisposalReason {
    /// The unit was lost.
    Loss,
    /// The unit passed its expiry date.
    Expired,
    /// The unit was found defective.
    Defective,
    /// Any other reason, with mandatory free text.
    Other(Reason),
}

impl DisposalReason {
    /// The free text, if this is an `Other` disposal.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Other(reason) => Some(reason.as_str()),
            Self::Loss | Self::Expired | Self::Defective => None,
        }
    }
}

impl fmt::Display for DisposalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loss => write!(f, "LOSS"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Defective => write!(f, "DEFECTIVE"),
            Self::Other(reason) => write!(f, "OTHER: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let reason = Reason::new("  damaged in transit  ").unwrap();
        assert_eq!(reason.as_str(), "damaged in transit");
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(Reason::new(""), Err(ReasonError::Required));
        assert_eq!(Reason::new(" \t\n"), Err(ReasonError::Required));
    }

    #[test]
    fn accepts_exactly_max_len() {
        let text = "x".repeat(REASON_MAX_LEN);
        assert!(Reason::new(text).is_ok());
    }

    #[test]
    fn rejects_over_max_len() {
        let text = "x".repeat(REASON_MAX_LEN + 1);
        assert_eq!(
            Reason::new(text),
            Err(ReasonError::TooLong {
                len: REASON_MAX_LEN + 1,
                max: REASON_MAX_LEN,
            })
        );
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        // 500 multibyte characters are within the limit
        let text = "가".repeat(REASON_MAX_LEN);
        assert!(Reason::new(text).is_ok());
    }

    #[test]
    fn serde_rejects_invalid() {
        let json = "\"\"";
        assert!(serde_json::from_str::<Reason>(json).is_err());
    }

    #[test]
    fn disposal_reason_detail() {
        assert_eq!(DisposalReason::Loss.detail(), None);
        let other = DisposalReason::Other(Reason::new("water damage").unwrap());
        assert_eq!(other.detail(), Some("water damage"));
        assert_eq!(other.to_string(), "OTHER: water damage");
    }
}
