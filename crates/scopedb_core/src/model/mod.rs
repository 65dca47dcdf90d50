//! Example blog schema model.
//!
//! # Responsibility
//! - Define row shapes for users, addresses, posts and keywords.
//! - Validate write inputs before they reach SQL.
//!
//! # Invariants
//! - Every persisted row is identified by its SQLite integer primary key.
//! - `New*` inputs carry no id; ids are assigned by the store on insert.

use std::error::Error;
use std::fmt::{Display, Formatter, Write};

pub mod post;
pub mod user;

/// Field-level validation failure for model inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    EmptyField(&'static str),
    TooLong {
        field: &'static str,
        max_chars: usize,
        actual_chars: usize,
    },
    InvalidEmail(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} cannot be empty"),
            Self::TooLong {
                field,
                max_chars,
                actual_chars,
            } => write!(
                f,
                "{field} exceeds {max_chars} characters (got {actual_chars})"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_non_empty(
    field: &'static str,
    value: &str,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_max_chars(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ModelValidationError> {
    let actual_chars = value.chars().count();
    if actual_chars > max_chars {
        return Err(ModelValidationError::TooLong {
            field,
            max_chars,
            actual_chars,
        });
    }
    Ok(())
}

/// Quotes text for debug output: single quotes unless the text contains a
/// single quote and no double quote.
pub(crate) struct QuotedText<'a>(pub &'a str);

impl Display for QuotedText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let quote = if self.0.contains('\'') && !self.0.contains('"') {
            '"'
        } else {
            '\''
        };
        f.write_char(quote)?;
        for ch in self.0.chars() {
            match ch {
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                ch if ch == quote => write!(f, "\\{ch}")?,
                ch => f.write_char(ch)?,
            }
        }
        f.write_char(quote)
    }
}

/// Renders an optional column the way debug output shows missing values.
pub(crate) struct OptionalText<'a>(pub &'a Option<String>);

impl Display for OptionalText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => QuotedText(value.as_str()).fmt(f),
            None => f.write_str("None"),
        }
    }
}
