use serde::{Deserialize, Serialize};

/// Principal information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    display_name: String,
    email: Option<String>,
}

impl Principal {
    /// Creates a principal from authentication data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
        }
    }

    /// Returns the stable subject identifier from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current principal.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
