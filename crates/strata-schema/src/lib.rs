//! # strata-schema: Attribute schema & validation
//!
//! Declares the shape of custom identity attributes (name, type, length
//! bounds, mutability, required-at-signup flag) and validates proposed
//! values at record-creation and update time.
//!
//! An attribute value is later substituted verbatim into a resource path
//! pattern, so this boundary is the *only* place that can stop
//! path-breaking characters or degenerate values (empty strings, over-length
//! strings) from reaching the policy evaluator. The policy here is strict:
//! reject, never truncate or escape -- truncation could collide two distinct
//! tenants into the same partition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Error raised when a proposed attribute value fails validation.
///
/// Validation errors are handled at the point of attribute intake
/// (user-visible, recoverable by resubmission) and never reach the
/// credential broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Value is shorter than the declared minimum.
    #[error("attribute '{name}' is too short: {len} < {min} characters")]
    TooShort { name: String, len: usize, min: usize },

    /// Value exceeds the declared maximum.
    #[error("attribute '{name}' is too long: {len} > {max} characters")]
    TooLong { name: String, len: usize, max: usize },

    /// Value contains a character that cannot appear in a path segment.
    #[error("attribute '{name}' contains forbidden character {ch:?}")]
    ForbiddenCharacter { name: String, ch: char },

    /// Value does not parse as the declared primitive type.
    #[error("attribute '{name}' is not a valid {expected}")]
    WrongType { name: String, expected: AttributeType },

    /// Attempted to change an attribute declared immutable.
    #[error("attribute '{name}' is immutable and cannot be updated")]
    Immutable { name: String },
}

// ============================================================================
// Attribute type
// ============================================================================

/// Primitive type of a custom attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeType {
    /// UTF-8 string, bounded by the schema's length limits.
    String,
    /// Decimal integer.
    Number,
    /// `true` or `false`.
    Boolean,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Number => write!(f, "number"),
            AttributeType::Boolean => write!(f, "boolean"),
        }
    }
}

// ============================================================================
// Attribute schema
// ============================================================================

/// Declared shape of one custom identity attribute.
///
/// The schema is static configuration: read-only at request time, mutated
/// only through the administrative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    /// Attribute name as it appears in identity records and token claims.
    pub name: String,
    /// Primitive type of the value.
    pub attr_type: AttributeType,
    /// Minimum value length, inclusive.
    pub min_len: usize,
    /// Maximum value length, inclusive.
    pub max_len: usize,
    /// Whether the value may change after sign-up.
    pub mutable: bool,
    /// Whether the value must be supplied at sign-up.
    pub required: bool,
}

impl AttributeSchema {
    /// Creates a string attribute schema with the given length bounds.
    pub fn string(name: impl Into<String>, min_len: usize, max_len: usize) -> Self {
        Self {
            name: name.into(),
            attr_type: AttributeType::String,
            min_len,
            max_len,
            mutable: true,
            required: false,
        }
    }

    /// Marks the attribute immutable after sign-up.
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.mutable = false;
        self
    }

    /// Marks the attribute required at sign-up.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The well-known `client` attribute: the partition-scoping tag source.
    ///
    /// String, 3–60 characters, mutable (re-setting changes future scope,
    /// not credentials already issued), required at sign-up.
    pub fn client() -> Self {
        Self::string("client", 3, 60).required()
    }

    /// Validates a proposed value against this schema.
    ///
    /// Checks type, length bounds, and the path-safe character set. Out of
    /// bounds means reject: no truncation, no escaping, no normalization.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first check that failed.
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        let len = value.chars().count();
        if len < self.min_len {
            return Err(ValidationError::TooShort {
                name: self.name.clone(),
                len,
                min: self.min_len,
            });
        }
        if len > self.max_len {
            return Err(ValidationError::TooLong {
                name: self.name.clone(),
                len,
                max: self.max_len,
            });
        }

        match self.attr_type {
            AttributeType::String => {
                if let Some(ch) = value.chars().find(|c| !is_path_safe(*c)) {
                    return Err(ValidationError::ForbiddenCharacter {
                        name: self.name.clone(),
                        ch,
                    });
                }
            }
            AttributeType::Number => {
                if value.parse::<i64>().is_err() {
                    return Err(ValidationError::WrongType {
                        name: self.name.clone(),
                        expected: AttributeType::Number,
                    });
                }
            }
            AttributeType::Boolean => {
                if value != "true" && value != "false" {
                    return Err(ValidationError::WrongType {
                        name: self.name.clone(),
                        expected: AttributeType::Boolean,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validates an update to an existing value.
    ///
    /// Same checks as [`validate`](Self::validate) plus the mutability rule.
    pub fn validate_update(&self, value: &str) -> Result<(), ValidationError> {
        if !self.mutable {
            return Err(ValidationError::Immutable {
                name: self.name.clone(),
            });
        }
        self.validate(value)
    }
}

/// Returns whether a character may appear in a tag value used as a path
/// segment.
///
/// Accepts ASCII alphanumerics plus `-`, `_`, and `.`. Everything else --
/// separators, wildcards, substitution syntax, whitespace, control
/// characters -- is rejected so no value can break out of its partition
/// prefix or collide with another tenant's.
fn is_path_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn in_bounds_safe_values_accepted(value in "[a-zA-Z0-9._-]{3,60}") {
            prop_assert!(AttributeSchema::client().validate(&value).is_ok());
        }

        #[test]
        fn short_values_rejected(value in "[a-zA-Z0-9._-]{0,2}") {
            prop_assert!(AttributeSchema::client().validate(&value).is_err());
        }

        #[test]
        fn long_values_rejected(value in "[a-zA-Z0-9._-]{61,80}") {
            prop_assert!(AttributeSchema::client().validate(&value).is_err());
        }

        #[test]
        fn values_with_separator_rejected(
            prefix in "[a-z]{1,20}",
            suffix in "[a-z]{1,20}",
        ) {
            let value = format!("{prefix}/{suffix}");
            prop_assert!(AttributeSchema::client().validate(&value).is_err());
        }
    }
}
