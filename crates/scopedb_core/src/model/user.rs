//! Users and their addresses (one-to-many).
//!
//! # Invariants
//! - An address belongs to at most one user; deleting the user deletes it.
//! - `email_address` is never empty and has a `local@domain` shape.

use super::{require_non_empty, ModelValidationError, OptionalText, QuotedText};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type UserId = i64;
pub type AddressId = i64;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Persisted `users` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub fullname: Option<String>,
    pub nickname: Option<String>,
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<User(name={}, fullname={}, nickname={})>",
            QuotedText(&self.name),
            OptionalText(&self.fullname),
            OptionalText(&self.nickname)
        )
    }
}

/// Persisted `addresses` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub email_address: String,
    pub user_id: Option<UserId>,
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Address(email_address={})>",
            QuotedText(&self.email_address)
        )
    }
}

/// Insert input for a user together with the addresses saved alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub fullname: Option<String>,
    pub nickname: Option<String>,
    pub addresses: Vec<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn fullname(mut self, fullname: impl Into<String>) -> Self {
        self.fullname = Some(fullname.into());
        self
    }

    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn address(mut self, email_address: impl Into<String>) -> Self {
        self.addresses.push(email_address.into());
        self
    }

    /// Validates the user and every attached address.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("users.name", &self.name)?;
        for email in &self.addresses {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// Checks the `addresses.email_address` contract.
pub fn validate_email(value: &str) -> Result<(), ModelValidationError> {
    require_non_empty("addresses.email_address", value)?;
    if !EMAIL_RE.is_match(value) {
        return Err(ModelValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}
