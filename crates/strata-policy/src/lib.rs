//! # strata-policy: Policy construction and evaluation
//!
//! The policy half of the identity-to-permission binding pipeline:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Trust Policy                                │
//! │  (who may exchange + tag, per audience and   │
//! │   authentication state)                      │
//! └─────────────────┬───────────────────────────┘
//!                   │ exchange permitted
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Role Selection                              │
//! │  (exactly one role per exchange outcome,     │
//! │   deterministic ambiguity tie-break)         │
//! └─────────────────┬───────────────────────────┘
//!                   │ credentials issued, tag attached
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Access Policy Evaluation                    │
//! │  (session tag substituted into the resource  │
//! │   pattern at request time; deny by default)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Construction is fallible where a malformed policy would be a security
//! defect (missing audience condition, missing substitution point) -- those
//! are configuration errors caught here, never runtime errors. Evaluation is
//! pure, synchronous data substitution with no suspension points; denial is
//! the steady-state enforcement mechanism, not an anomaly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod access;
pub mod eval;
pub mod selection;
pub mod trust;

pub use access::{AccessPolicyStatement, build_access_policy, substitution_point};
pub use eval::{
    Decision, EvalError, PatternResolver, RequestContext, StandardResolver, evaluate,
    evaluate_with,
};
pub use selection::{AmbiguousRoleResolution, ExchangeOutcome, RoleSelectionRule, SelectionError};
pub use trust::{TrustCondition, TrustPolicyStatement, build_trust_policy, build_trust_policy_pair};

// ============================================================================
// Effect
// ============================================================================

/// The effect of a policy statement: allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the statement's actions.
    Allow,
    /// Refuse the statement's actions.
    Deny,
}

impl Default for Effect {
    /// Defaults to `Deny` (safe default: deny unless explicitly allowed).
    fn default() -> Self {
        Self::Deny
    }
}

// ============================================================================
// Construction errors
// ============================================================================

/// Error raised while constructing a policy statement.
///
/// These are configuration-class failures: they surface to operators at
/// provisioning time and are never retried by the request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyBuildError {
    /// A trust statement was built without an audience condition.
    ///
    /// Such a statement would let any client exchange tokens through the
    /// broker -- a privilege-escalation hazard, rejected at construction.
    #[error("trust statement has no audience condition")]
    MissingAudience,

    /// An access statement was requested with an empty session-tag key.
    #[error("access policy requires a non-empty session tag key")]
    MissingTagKey,

    /// A statement grants partition data actions but its resource pattern
    /// carries no substitution point -- it would grant cross-tenant access.
    #[error("statement '{sid}' reads or writes partition data without a tag substitution point")]
    MissingSubstitution { sid: String },

    /// A resource pattern carries more than one substitution point.
    #[error("statement '{sid}' has {count} substitution points, expected exactly one")]
    MultipleSubstitutions { sid: String, count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_effect_is_deny() {
        assert_eq!(Effect::default(), Effect::Deny);
    }

    #[test]
    fn test_effect_serialization_roundtrip() {
        let json = serde_json::to_string(&Effect::Allow).expect("serialize effect");
        let back: Effect = serde_json::from_str(&json).expect("deserialize effect");
        assert_eq!(back, Effect::Allow);
    }
}
