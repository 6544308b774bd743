//! Role trust policy construction.
//!
//! A trust statement declares the conditions under which the broker's
//! exchange role may be assumed: an exact audience match and an
//! authentication-state match. Two statements always coexist -- one per
//! authentication state -- because the broker requires a non-ambiguous trust
//! entry for unauthenticated flows even when unauthenticated access is not
//! feature-enabled; an undefined-role condition in role attachment is worse
//! than an explicit statement that nothing selects.

use serde::{Deserialize, Serialize};
use strata_types::{Audience, AuthState, BrokerAction};

use crate::{Effect, PolicyBuildError};

// ============================================================================
// Conditions
// ============================================================================

/// A predicate a credential exchange must satisfy for a trust statement to
/// apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustCondition {
    /// The exchange's audience must equal the specified value exactly.
    AudienceEquals(Audience),
    /// The exchange's authentication state must match.
    AuthStateEquals(AuthState),
}

// ============================================================================
// Statement
// ============================================================================

/// A single trust policy statement.
///
/// Grants exactly the two broker actions (credential exchange, session
/// tagging); the audience condition is mandatory and checked at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicyStatement {
    /// Statement identifier, for audit logging and diagnostics.
    pub sid: String,
    /// The effect when this statement applies.
    pub effect: Effect,
    /// Broker actions granted by this statement.
    pub actions: Vec<BrokerAction>,
    /// All conditions must hold for the statement to apply.
    pub conditions: Vec<TrustCondition>,
}

impl TrustPolicyStatement {
    /// Returns whether this statement permits an exchange with the given
    /// audience and authentication state.
    pub fn permits(&self, audience: &Audience, auth_state: AuthState) -> bool {
        self.effect == Effect::Allow
            && self.conditions.iter().all(|cond| match cond {
                TrustCondition::AudienceEquals(expected) => expected == audience,
                TrustCondition::AuthStateEquals(expected) => *expected == auth_state,
            })
    }

    /// Checks the statement's structural invariant: an audience condition
    /// must be present.
    ///
    /// Deserialized statements bypass [`build_trust_policy`], so callers
    /// loading trust policy from storage revalidate here.
    pub fn validate(&self) -> Result<(), PolicyBuildError> {
        let has_audience = self
            .conditions
            .iter()
            .any(|c| matches!(c, TrustCondition::AudienceEquals(a) if !a.is_empty()));
        if has_audience {
            Ok(())
        } else {
            Err(PolicyBuildError::MissingAudience)
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Builds the trust statement for one authentication state.
///
/// The statement allows exactly [`BrokerAction::ExchangeCredentials`] and
/// [`BrokerAction::TagSession`], conditioned on exact audience equality and
/// the given authentication state.
///
/// # Errors
///
/// [`PolicyBuildError::MissingAudience`] if the audience is empty -- a trust
/// statement without an audience condition is a privilege-escalation hazard
/// and must never be constructed.
pub fn build_trust_policy(
    audience: &Audience,
    auth_state: AuthState,
) -> Result<TrustPolicyStatement, PolicyBuildError> {
    if audience.is_empty() {
        return Err(PolicyBuildError::MissingAudience);
    }

    Ok(TrustPolicyStatement {
        sid: format!("allow-exchange-{auth_state}"),
        effect: Effect::Allow,
        actions: vec![BrokerAction::ExchangeCredentials, BrokerAction::TagSession],
        conditions: vec![
            TrustCondition::AudienceEquals(audience.clone()),
            TrustCondition::AuthStateEquals(auth_state),
        ],
    })
}

/// Builds the mandatory statement pair: one per authentication state.
///
/// Authenticated first. The two statements differ only in their
/// authentication-state condition; action sets are identical.
pub fn build_trust_policy_pair(
    audience: &Audience,
) -> Result<[TrustPolicyStatement; 2], PolicyBuildError> {
    Ok([
        build_trust_policy(audience, AuthState::Authenticated)?,
        build_trust_policy(audience, AuthState::Unauthenticated)?,
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn audience() -> Audience {
        Audience::new("client-app-1234")
    }

    #[test]
    fn test_statement_grants_exactly_two_actions() {
        let stmt = build_trust_policy(&audience(), AuthState::Authenticated)
            .expect("build trust statement");
        assert_eq!(stmt.effect, Effect::Allow);
        assert_eq!(
            stmt.actions,
            vec![BrokerAction::ExchangeCredentials, BrokerAction::TagSession]
        );
    }

    #[test]
    fn test_empty_audience_is_a_construction_error() {
        let result = build_trust_policy(&Audience::new(""), AuthState::Authenticated);
        assert_eq!(result, Err(PolicyBuildError::MissingAudience));
    }

    #[test]
    fn test_pair_differs_only_in_auth_state() {
        let [authed, unauthed] = build_trust_policy_pair(&audience()).expect("build pair");

        assert_eq!(authed.actions, unauthed.actions);
        assert_eq!(authed.effect, unauthed.effect);

        // Audience condition is shared; the auth-state condition differs.
        assert!(
            authed
                .conditions
                .contains(&TrustCondition::AudienceEquals(audience()))
        );
        assert!(
            unauthed
                .conditions
                .contains(&TrustCondition::AudienceEquals(audience()))
        );
        assert!(
            authed
                .conditions
                .contains(&TrustCondition::AuthStateEquals(AuthState::Authenticated))
        );
        assert!(
            unauthed
                .conditions
                .contains(&TrustCondition::AuthStateEquals(AuthState::Unauthenticated))
        );
    }

    #[test]
    fn test_pair_construction_is_idempotent() {
        let first = build_trust_policy_pair(&audience()).expect("first pair");
        let second = build_trust_policy_pair(&audience()).expect("second pair");
        assert_eq!(first, second);
    }

    #[test]
    fn test_permits_requires_both_conditions() {
        let stmt = build_trust_policy(&audience(), AuthState::Authenticated)
            .expect("build trust statement");

        assert!(stmt.permits(&audience(), AuthState::Authenticated));
        assert!(!stmt.permits(&audience(), AuthState::Unauthenticated));
        assert!(!stmt.permits(&Audience::new("other-app"), AuthState::Authenticated));
    }

    #[test]
    fn test_deny_statement_never_permits() {
        let mut stmt = build_trust_policy(&audience(), AuthState::Authenticated)
            .expect("build trust statement");
        stmt.effect = Effect::Deny;
        assert!(!stmt.permits(&audience(), AuthState::Authenticated));
    }

    #[test]
    fn test_validate_catches_missing_audience_after_deserialization() {
        // A hand-written statement with no audience condition must be
        // rejected when revalidated.
        let stmt = TrustPolicyStatement {
            sid: "allow-exchange-authenticated".to_string(),
            effect: Effect::Allow,
            actions: vec![BrokerAction::ExchangeCredentials, BrokerAction::TagSession],
            conditions: vec![TrustCondition::AuthStateEquals(AuthState::Authenticated)],
        };
        assert_eq!(stmt.validate(), Err(PolicyBuildError::MissingAudience));

        let good = build_trust_policy(&audience(), AuthState::Authenticated)
            .expect("build trust statement");
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_statement_serialization_roundtrip() {
        let stmt = build_trust_policy(&audience(), AuthState::Unauthenticated)
            .expect("build trust statement");
        let json = serde_json::to_string(&stmt).expect("serialize statement");
        let back: TrustPolicyStatement = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(stmt, back);
    }
}
