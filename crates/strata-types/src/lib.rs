//! # strata-types: Core types for Strata
//!
//! This crate contains shared types used across the Strata system:
//! - Entity IDs ([`RecordId`], [`Audience`], [`ResourceId`], [`RoleId`])
//! - Authentication state ([`AuthState`])
//! - Session tagging ([`SessionTag`])
//! - Action vocabularies ([`BrokerAction`], [`StorageAction`])

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Immutable unique identifier for an identity record.
///
/// Assigned at sign-up and never reused; all other record fields may change
/// over the record's lifecycle, this one cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a fresh random record identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<RecordId> for Uuid {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Trust audience identifier: the client/application id a verified token is
/// issued to and a federation mapping is keyed on.
///
/// The identity store, the federation table, and the trust policy must all
/// agree on this value; an audience mismatch anywhere fails the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Audience(String);

impl Audience {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the audience as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the audience identifier is empty.
    ///
    /// An empty audience in a trust condition is a configuration defect;
    /// policy construction checks this.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the shared storage resource being partitioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a trust role the broker can attach to an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Authentication state
// ============================================================================

/// Authentication state of a credential exchange.
///
/// A closed two-variant enum with no transitions: each exchange is evaluated
/// independently, so this is not a state machine across requests. Both
/// variants always get explicit trust statements -- there is no implicit
/// fallback for the unauthenticated side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthState {
    /// The exchange presented a verified identity token.
    Authenticated,
    /// The exchange presented no verified identity.
    Unauthenticated,
}

impl Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

// ============================================================================
// Session tag
// ============================================================================

/// A key/value pair attached to a temporary credential at exchange time.
///
/// Visible to policy evaluation as request context; the value is treated as
/// an opaque path segment and is never normalized after validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionTag {
    pub key: String,
    pub value: String,
}

impl SessionTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Display for SessionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ============================================================================
// Action vocabularies
// ============================================================================

/// Actions a trust policy can grant on the credential broker itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerAction {
    /// Exchange a verified identity token for scoped credentials.
    ExchangeCredentials,
    /// Attach a session tag to the credentials being issued.
    TagSession,
}

impl Display for BrokerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerAction::ExchangeCredentials => write!(f, "broker:ExchangeCredentials"),
            BrokerAction::TagSession => write!(f, "broker:TagSession"),
        }
    }
}

/// Actions a resource access policy can grant on the storage resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageAction {
    /// Read an object.
    GetObject,
    /// Write an object.
    PutObject,
    /// Delete an object.
    DeleteObject,
    /// Enumerate objects under the resource (discovery).
    ListBucket,
}

impl StorageAction {
    /// Returns whether this action reads or writes partitioned data.
    ///
    /// Every statement granting such an action must scope its resource
    /// pattern with the session-tag substitution point; `ListBucket` is the
    /// one discovery action that stays unscoped.
    pub fn touches_partition(self) -> bool {
        match self {
            StorageAction::GetObject | StorageAction::PutObject | StorageAction::DeleteObject => {
                true
            }
            StorageAction::ListBucket => false,
        }
    }
}

impl Display for StorageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageAction::GetObject => write!(f, "storage:GetObject"),
            StorageAction::PutObject => write!(f, "storage:PutObject"),
            StorageAction::DeleteObject => write!(f, "storage:DeleteObject"),
            StorageAction::ListBucket => write!(f, "storage:ListBucket"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_record_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_audience_round_trip() {
        let aud = Audience::new("client-app-1234");
        let json = serde_json::to_string(&aud).expect("serialize audience");
        let back: Audience = serde_json::from_str(&json).expect("deserialize audience");
        assert_eq!(aud, back);
        assert_eq!(aud.as_str(), "client-app-1234");
    }

    #[test]
    fn test_empty_audience_detected() {
        assert!(Audience::new("").is_empty());
        assert!(!Audience::new("x").is_empty());
    }

    #[test]
    fn test_auth_state_display() {
        assert_eq!(AuthState::Authenticated.to_string(), "authenticated");
        assert_eq!(AuthState::Unauthenticated.to_string(), "unauthenticated");
    }

    #[test]
    fn test_session_tag_display() {
        let tag = SessionTag::new("client", "acme");
        assert_eq!(tag.to_string(), "client=acme");
    }

    #[test_case(StorageAction::GetObject => true)]
    #[test_case(StorageAction::PutObject => true)]
    #[test_case(StorageAction::DeleteObject => true)]
    #[test_case(StorageAction::ListBucket => false)]
    fn test_touches_partition(action: StorageAction) -> bool {
        action.touches_partition()
    }

    #[test]
    fn test_action_serialization_is_kebab_case() {
        let json = serde_json::to_string(&BrokerAction::ExchangeCredentials)
            .expect("serialize broker action");
        assert_eq!(json, "\"exchange-credentials\"");

        let json = serde_json::to_string(&StorageAction::ListBucket).expect("serialize action");
        assert_eq!(json, "\"list-bucket\"");
    }
}
