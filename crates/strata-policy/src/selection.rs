//! Role selection for credential exchange.
//!
//! Maps an exchange outcome to exactly one trust role. There are two
//! outcomes that select directly -- authenticated and unauthenticated -- and
//! an ambiguous outcome (an identity plausibly satisfying multiple role
//! mappings, e.g. several identity providers configured under one audience)
//! resolved by a configured tie-break. The rule never defers to the caller
//! and there is no implicit default role: an outcome with no mapped role
//! fails the exchange.

use serde::{Deserialize, Serialize};
use strata_types::{AuthState, RoleId};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Error raised during role selection.
///
/// Both variants are fatal configuration defects: surfaced as 5xx-class
/// failures and never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No role is mapped for the exchange outcome.
    #[error("no role matched exchange outcome '{outcome}'")]
    NoRoleMatched { outcome: ExchangeOutcome },

    /// The outcome was ambiguous and the rule is configured to deny.
    #[error("ambiguous role resolution denied by configuration")]
    AmbiguousDenied,
}

// ============================================================================
// Outcome
// ============================================================================

/// The outcome of evaluating an exchange against the trust policy.
///
/// Exactly two direct states, no transitions: each exchange is evaluated
/// independently, so this is not a state machine across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeOutcome {
    /// The exchange presented a verified identity token.
    Authenticated,
    /// The exchange presented no verified identity.
    Unauthenticated,
    /// More than one role mapping could plausibly apply.
    Ambiguous,
}

impl std::fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeOutcome::Authenticated => write!(f, "authenticated"),
            ExchangeOutcome::Unauthenticated => write!(f, "unauthenticated"),
            ExchangeOutcome::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

impl From<AuthState> for ExchangeOutcome {
    fn from(state: AuthState) -> Self {
        match state {
            AuthState::Authenticated => ExchangeOutcome::Authenticated,
            AuthState::Unauthenticated => ExchangeOutcome::Unauthenticated,
        }
    }
}

// ============================================================================
// Tie-break
// ============================================================================

/// Tie-break applied when an exchange outcome is ambiguous.
///
/// The choice is configuration, made once, and deterministic thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguousRoleResolution {
    /// Prefer the authenticated role; fall back to the unauthenticated role
    /// if no authenticated role is mapped.
    PreferAuthenticated,
    /// Fail the exchange outright.
    Deny,
}

impl Default for AmbiguousRoleResolution {
    fn default() -> Self {
        Self::PreferAuthenticated
    }
}

// ============================================================================
// Selection rule
// ============================================================================

/// The rule choosing which trust role applies to an exchange outcome.
///
/// Static configuration, read-only at request time. Selection is a pure
/// lookup plus the tie-break -- exactly one role per exchange, or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSelectionRule {
    /// Role attached to authenticated exchanges, if mapped.
    pub authenticated_role: Option<RoleId>,
    /// Role attached to unauthenticated exchanges, if mapped.
    pub unauthenticated_role: Option<RoleId>,
    /// Tie-break for ambiguous outcomes.
    #[serde(default)]
    pub resolution: AmbiguousRoleResolution,
}

impl RoleSelectionRule {
    /// Creates an empty rule: every selection fails until roles are mapped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the authenticated outcome to a role.
    #[must_use]
    pub fn with_authenticated(mut self, role: RoleId) -> Self {
        self.authenticated_role = Some(role);
        self
    }

    /// Maps the unauthenticated outcome to a role.
    #[must_use]
    pub fn with_unauthenticated(mut self, role: RoleId) -> Self {
        self.unauthenticated_role = Some(role);
        self
    }

    /// Sets the ambiguity tie-break.
    #[must_use]
    pub fn with_resolution(mut self, resolution: AmbiguousRoleResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Selects the single role for an exchange outcome.
    ///
    /// # Errors
    ///
    /// [`SelectionError::NoRoleMatched`] when the outcome has no mapped
    /// role; [`SelectionError::AmbiguousDenied`] when the outcome is
    /// ambiguous and the rule is configured to deny.
    pub fn select_role(&self, outcome: ExchangeOutcome) -> Result<RoleId, SelectionError> {
        match outcome {
            ExchangeOutcome::Authenticated => self
                .authenticated_role
                .clone()
                .ok_or(SelectionError::NoRoleMatched { outcome }),
            ExchangeOutcome::Unauthenticated => self
                .unauthenticated_role
                .clone()
                .ok_or(SelectionError::NoRoleMatched { outcome }),
            ExchangeOutcome::Ambiguous => match self.resolution {
                AmbiguousRoleResolution::Deny => Err(SelectionError::AmbiguousDenied),
                AmbiguousRoleResolution::PreferAuthenticated => self
                    .authenticated_role
                    .clone()
                    .or_else(|| self.unauthenticated_role.clone())
                    .ok_or(SelectionError::NoRoleMatched { outcome }),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> RoleSelectionRule {
        RoleSelectionRule::new()
            .with_authenticated(RoleId::new("tenant-access"))
            .with_unauthenticated(RoleId::new("guest-denied"))
    }

    #[test]
    fn test_direct_outcomes_select_their_role() {
        let rule = rule();
        assert_eq!(
            rule.select_role(ExchangeOutcome::Authenticated),
            Ok(RoleId::new("tenant-access"))
        );
        assert_eq!(
            rule.select_role(ExchangeOutcome::Unauthenticated),
            Ok(RoleId::new("guest-denied"))
        );
    }

    #[test]
    fn test_unmapped_outcome_fails_without_default() {
        let rule = RoleSelectionRule::new().with_authenticated(RoleId::new("tenant-access"));
        assert_eq!(
            rule.select_role(ExchangeOutcome::Unauthenticated),
            Err(SelectionError::NoRoleMatched {
                outcome: ExchangeOutcome::Unauthenticated,
            })
        );
    }

    #[test]
    fn test_ambiguous_prefers_authenticated() {
        let rule = rule();
        assert_eq!(
            rule.select_role(ExchangeOutcome::Ambiguous),
            Ok(RoleId::new("tenant-access"))
        );
    }

    #[test]
    fn test_ambiguous_falls_back_when_authenticated_unmapped() {
        let rule = RoleSelectionRule::new().with_unauthenticated(RoleId::new("guest-denied"));
        assert_eq!(
            rule.select_role(ExchangeOutcome::Ambiguous),
            Ok(RoleId::new("guest-denied"))
        );
    }

    #[test]
    fn test_ambiguous_deny_configuration() {
        let rule = rule().with_resolution(AmbiguousRoleResolution::Deny);
        assert_eq!(
            rule.select_role(ExchangeOutcome::Ambiguous),
            Err(SelectionError::AmbiguousDenied)
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let rule = rule();
        let first = rule.select_role(ExchangeOutcome::Ambiguous);
        for _ in 0..10 {
            assert_eq!(rule.select_role(ExchangeOutcome::Ambiguous), first);
        }
    }

    #[test]
    fn test_empty_rule_fails_every_outcome() {
        let rule = RoleSelectionRule::new();
        assert!(rule.select_role(ExchangeOutcome::Authenticated).is_err());
        assert!(rule.select_role(ExchangeOutcome::Unauthenticated).is_err());
        assert!(rule.select_role(ExchangeOutcome::Ambiguous).is_err());
    }

    #[test]
    fn test_rule_serialization_roundtrip() {
        let rule = rule().with_resolution(AmbiguousRoleResolution::Deny);
        let json = serde_json::to_string(&rule).expect("serialize rule");
        let back: RoleSelectionRule = serde_json::from_str(&json).expect("deserialize rule");
        assert_eq!(rule, back);
    }
}
