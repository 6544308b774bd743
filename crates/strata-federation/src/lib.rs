//! # strata-federation: Attribute-to-tag federation mapping
//!
//! The configuration link telling the credential broker which attribute on a
//! verified token becomes which session tag, per trust audience. Three
//! independently operated trust boundaries -- identity store, broker, resource
//! policy engine -- agree on a single tag value only through this table.
//!
//! The mapping is inherently **operator-applied, out-of-band configuration**:
//! it is applied once, after the identity and broker resources exist, and no
//! automated provisioning step can guarantee its presence. The table is
//! therefore explicit and inspectable (never implicit or derived), versioned,
//! and loadable from a TOML artifact; its absence fails every exchange
//! closed with [`FederationError::UnmappedAttribute`] -- there is no fallback
//! to an unscoped or default tag. The companion health check lives with the
//! broker, which asserts that freshly exchanged credentials actually carry a
//! non-empty tag.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_identity::VerifiedToken;
use strata_types::{Audience, SessionTag};
use thiserror::Error;
use tracing::info;

// ============================================================================
// Errors
// ============================================================================

/// Error raised while building, loading, or resolving the federation table.
#[derive(Debug, Error)]
pub enum FederationError {
    /// No mapping entry exists for the audience. The exchange must fail
    /// closed: no credential is issued, and the condition is not retryable
    /// without operator action.
    #[error("no federation mapping for audience '{audience}'")]
    UnmappedAttribute { audience: Audience },

    /// The verified token does not carry the mapped source attribute, or
    /// carries it empty.
    #[error("verified token lacks attribute '{attribute}'")]
    AttributeMissing { attribute: String },

    /// The token was verified for a different audience than the exchange
    /// names.
    #[error("token audience '{actual}' does not match exchange audience '{expected}'")]
    AudienceMismatch { expected: Audience, actual: Audience },

    /// A second mapping was declared for an audience already mapped.
    #[error("duplicate federation mapping for audience '{audience}'")]
    DuplicateMapping { audience: Audience },

    /// Failed to read the mapping artifact.
    #[error("failed to read federation table at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the mapping artifact.
    #[error("failed to parse federation table at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ============================================================================
// Entries
// ============================================================================

/// One federation mapping: which verified-token attribute becomes which
/// session tag for a given trust audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FederationEntry {
    /// Attribute name on the verified token.
    pub source_attribute: String,
    /// Session tag key the attribute value is exposed under.
    pub tag_key: String,
    /// Trust audience this mapping applies to.
    pub audience: Audience,
}

impl FederationEntry {
    pub fn new(
        source_attribute: impl Into<String>,
        tag_key: impl Into<String>,
        audience: Audience,
    ) -> Self {
        Self {
            source_attribute: source_attribute.into(),
            tag_key: tag_key.into(),
            audience,
        }
    }
}

// ============================================================================
// Table
// ============================================================================

/// The federation mapping table: a versioned, inspectable set of entries.
///
/// Exactly one mapping per audience -- the partition scheme is single-tag, so
/// a second mapping on the same audience is a configuration defect, rejected
/// at insertion and at load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationTable {
    /// Artifact version, bumped by the operator on every change.
    #[serde(default)]
    pub version: u32,
    #[serde(default, rename = "mapping")]
    entries: Vec<FederationEntry>,
}

impl FederationTable {
    /// Creates an empty table. Every resolution fails until entries are
    /// applied -- absent configuration fails closed, loudly.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            entries: Vec::new(),
        }
    }

    /// Adds a mapping entry.
    ///
    /// # Errors
    ///
    /// [`FederationError::DuplicateMapping`] if the audience is already
    /// mapped.
    pub fn with_entry(mut self, entry: FederationEntry) -> Result<Self, FederationError> {
        if self.entries.iter().any(|e| e.audience == entry.audience) {
            return Err(FederationError::DuplicateMapping {
                audience: entry.audience,
            });
        }
        self.entries.push(entry);
        Ok(self)
    }

    /// The mapping entries, for inspection and diagnostics.
    pub fn entries(&self) -> &[FederationEntry] {
        &self.entries
    }

    /// Resolves the session tag for a verified token under an audience.
    ///
    /// Fails closed on every missing link: unmapped audience, audience
    /// mismatch, missing or empty source attribute. An unmapped attribute is
    /// never exposed as a tag, and no default tag exists.
    pub fn resolve_tag(
        &self,
        token: &VerifiedToken,
        audience: &Audience,
    ) -> Result<SessionTag, FederationError> {
        if token.audience != *audience {
            return Err(FederationError::AudienceMismatch {
                expected: audience.clone(),
                actual: token.audience.clone(),
            });
        }

        let entry = self
            .entries
            .iter()
            .find(|e| e.audience == *audience)
            .ok_or_else(|| FederationError::UnmappedAttribute {
                audience: audience.clone(),
            })?;

        let value = token
            .attribute(&entry.source_attribute)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FederationError::AttributeMissing {
                attribute: entry.source_attribute.clone(),
            })?;

        Ok(SessionTag::new(entry.tag_key.clone(), value))
    }

    /// Checks table invariants after deserialization.
    pub fn validate(&self) -> Result<(), FederationError> {
        for (i, entry) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|e| e.audience == entry.audience) {
                return Err(FederationError::DuplicateMapping {
                    audience: entry.audience.clone(),
                });
            }
        }
        Ok(())
    }

    /// Loads the table from its TOML artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FederationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FederationError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Self = toml::from_str(&raw).map_err(|source| FederationError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        table.validate()?;

        info!(
            path = %path.display(),
            version = table.version,
            mappings = table.entries.len(),
            "federation table loaded"
        );
        Ok(table)
    }

    /// Renders the table as its TOML artifact form.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn token(attrs: &[(&str, &str)], audience: &str) -> VerifiedToken {
        VerifiedToken {
            subject: "record-1".to_string(),
            audience: Audience::new(audience),
            attributes: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn table() -> FederationTable {
        FederationTable::new(1)
            .with_entry(FederationEntry::new(
                "client",
                "client",
                Audience::new("client-app-1234"),
            ))
            .expect("add entry")
    }

    #[test]
    fn test_resolve_maps_attribute_to_tag() {
        let tag = table()
            .resolve_tag(
                &token(&[("client", "acme")], "client-app-1234"),
                &Audience::new("client-app-1234"),
            )
            .expect("resolve tag");
        assert_eq!(tag, SessionTag::new("client", "acme"));
    }

    #[test]
    fn test_unmapped_audience_fails_closed() {
        let err = table()
            .resolve_tag(
                &token(&[("client", "acme")], "other-app"),
                &Audience::new("other-app"),
            )
            .expect_err("must fail");
        assert!(matches!(err, FederationError::UnmappedAttribute { .. }));
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let empty = FederationTable::new(0);
        let err = empty
            .resolve_tag(
                &token(&[("client", "acme")], "client-app-1234"),
                &Audience::new("client-app-1234"),
            )
            .expect_err("must fail");
        assert!(matches!(err, FederationError::UnmappedAttribute { .. }));
    }

    #[test]
    fn test_missing_attribute_fails_closed() {
        let err = table()
            .resolve_tag(&token(&[], "client-app-1234"), &Audience::new("client-app-1234"))
            .expect_err("must fail");
        assert!(matches!(
            err,
            FederationError::AttributeMissing { attribute } if attribute == "client"
        ));
    }

    #[test]
    fn test_empty_attribute_value_fails_closed() {
        let err = table()
            .resolve_tag(
                &token(&[("client", "")], "client-app-1234"),
                &Audience::new("client-app-1234"),
            )
            .expect_err("must fail");
        assert!(matches!(err, FederationError::AttributeMissing { .. }));
    }

    #[test]
    fn test_audience_mismatch_fails_closed() {
        let err = table()
            .resolve_tag(
                &token(&[("client", "acme")], "other-app"),
                &Audience::new("client-app-1234"),
            )
            .expect_err("must fail");
        assert!(matches!(err, FederationError::AudienceMismatch { .. }));
    }

    #[test]
    fn test_duplicate_audience_rejected() {
        let err = table()
            .with_entry(FederationEntry::new(
                "department",
                "department",
                Audience::new("client-app-1234"),
            ))
            .expect_err("must reject");
        assert!(matches!(err, FederationError::DuplicateMapping { .. }));
    }

    #[test]
    fn test_unmapped_attributes_never_become_tags() {
        // The token carries extra attributes; only the mapped one surfaces.
        let tag = table()
            .resolve_tag(
                &token(
                    &[("client", "acme"), ("department", "sales")],
                    "client-app-1234",
                ),
                &Audience::new("client-app-1234"),
            )
            .expect("resolve tag");
        assert_eq!(tag.key, "client");
        assert_eq!(tag.value, "acme");
    }

    #[test]
    fn test_toml_artifact_round_trip() {
        let table = table();
        let rendered = table.to_toml_string();
        let parsed: FederationTable = toml::from_str(&rendered).expect("parse artifact");
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"
version = 7

[[mapping]]
source-attribute = "client"
tag-key = "client"
audience = "client-app-1234"
"#
        )
        .expect("write artifact");

        let table = FederationTable::load(file.path()).expect("load table");
        assert_eq!(table.version, 7);
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.entries()[0].tag_key, "client");
    }

    #[test]
    fn test_load_rejects_duplicate_mappings() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"
version = 2

[[mapping]]
source-attribute = "client"
tag-key = "client"
audience = "client-app-1234"

[[mapping]]
source-attribute = "department"
tag-key = "department"
audience = "client-app-1234"
"#
        )
        .expect("write artifact");

        let err = FederationTable::load(file.path()).expect_err("must reject");
        assert!(matches!(err, FederationError::DuplicateMapping { .. }));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = FederationTable::load("/nonexistent/federation.toml").expect_err("must fail");
        assert!(matches!(err, FederationError::ReadError { .. }));
    }
}
