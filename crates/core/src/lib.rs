//! Shared primitives for all Rust crates in rolegate.

#![forbid(unsafe_code)]

/// Principal identity carried through sessions and checks.
pub mod principal;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use principal::Principal;

/// Result type used across rolegate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated, URL-safe identity key for roles and permissions.
///
/// Slugs are the stable cross-reference key between declarative
/// configuration and persisted rows; generated numeric ids never cross
/// that boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Creates a validated slug.
    ///
    /// Accepts ASCII alphanumerics plus `-` and `_`; rejects empty input
    /// and anything containing whitespace or other separators.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "slug must not be empty or whitespace".to_owned(),
            ));
        }

        if !trimmed
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || matches!(character, '-' | '_'))
        {
            return Err(AppError::Validation(format!(
                "slug '{trimmed}' may only contain ASCII alphanumerics, '-' and '_'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Derives a cosmetic display name from the slug.
    ///
    /// Separators become spaces and the first letter is capitalised
    /// ("edit-posts" becomes "Edit posts"). Never used for identity
    /// comparison.
    #[must_use]
    pub fn derive_display_name(&self) -> String {
        let spaced = self.0.replace(['-', '_'], " ");
        let mut characters = spaced.chars();

        match characters.next() {
            Some(first) => first.to_uppercase().collect::<String>() + characters.as_str(),
            None => spaced,
        }
    }
}

impl TryFrom<String> for Slug {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

impl Display for Slug {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
