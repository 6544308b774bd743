//! Identity record shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_types::RecordId;

/// One identity record.
///
/// The identifier is immutable and assigned at sign-up; every other field is
/// mutable through the store's administrative path. Custom attributes are
/// never silently defaulted -- a record either carries a validated value or
/// no value at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Immutable unique identifier.
    pub id: RecordId,
    /// Login name; also where the confirmation message is delivered
    /// (delivery itself is outside this crate).
    pub email: String,
    /// Standard field, required, mutable.
    pub given_name: String,
    /// Standard field, required, mutable.
    pub family_name: String,
    /// Whether the identity completed verification.
    pub confirmed: bool,
    /// Schema-validated custom attributes, keyed by attribute name.
    pub attributes: HashMap<String, String>,
    /// Salted password digest; never the password itself.
    #[serde(skip_serializing, default)]
    pub(crate) password_digest: String,
}

impl IdentityRecord {
    /// Looks up a custom attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
