//! Access policy evaluation.
//!
//! Models the resource policy engine's variable-substitution mechanism as a
//! pure function interface so policy construction can be unit-tested without
//! the real engine: [`PatternResolver`] turns a pattern plus request context
//! into a concrete path, and [`evaluate`] matches the result against the
//! request. Supplying a fake resolver decouples construction correctness
//! from the production engine's behavior.
//!
//! Evaluation order follows the enforcement convention: deny statements are
//! checked first, then allow statements; if nothing matches, the request is
//! denied. A statement whose pattern cannot resolve (missing session tag --
//! the visible symptom of an unapplied federation mapping) never matches,
//! and the failure is logged loudly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_types::{SessionTag, StorageAction};
use thiserror::Error;
use tracing::{info, warn};

use crate::Effect;
use crate::access::AccessPolicyStatement;

// ============================================================================
// Request context
// ============================================================================

/// Ambient request context visible to policy evaluation.
///
/// Carries the session tags attached to the caller's credentials as opaque
/// key/value pairs; no other request state participates in substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    session_tags: HashMap<String, String>,
}

impl RequestContext {
    /// Creates an empty context (no session tags).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session tag to the context.
    #[must_use]
    pub fn with_tag(mut self, tag: SessionTag) -> Self {
        self.session_tags.insert(tag.key, tag.value);
        self
    }

    /// Looks up a session tag value by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.session_tags.get(key).map(String::as_str)
    }

    /// Returns whether the context carries no tags at all.
    ///
    /// An empty context on an exchanged credential is the diagnostic
    /// signature of a missing federation mapping.
    pub fn is_untagged(&self) -> bool {
        self.session_tags.is_empty()
    }
}

impl From<SessionTag> for RequestContext {
    fn from(tag: SessionTag) -> Self {
        Self::new().with_tag(tag)
    }
}

// ============================================================================
// Pattern resolution
// ============================================================================

/// Error raised while resolving a resource pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The pattern references a session tag the request context lacks.
    #[error("no session tag bound for substitution key '{key}'")]
    UnboundVariable { key: String },

    /// A substitution point is malformed (unterminated delimiter).
    #[error("malformed substitution point in pattern '{pattern}'")]
    MalformedPattern { pattern: String },
}

/// The policy engine's substitution mechanism, as a pure function.
///
/// Production evaluation uses [`StandardResolver`]; tests exercising policy
/// construction in isolation supply their own implementation.
pub trait PatternResolver {
    /// Resolves every substitution point in `pattern` against `ctx`,
    /// returning the concrete path pattern.
    fn resolve(&self, pattern: &str, ctx: &RequestContext) -> Result<String, EvalError>;
}

/// Default resolver: replaces `${strata:PrincipalTag/<key>}` with the
/// context's tag value for `<key>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResolver;

impl PatternResolver for StandardResolver {
    fn resolve(&self, pattern: &str, ctx: &RequestContext) -> Result<String, EvalError> {
        const PREFIX: &str = "${strata:PrincipalTag/";

        let mut resolved = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(start) = rest.find(PREFIX) {
            resolved.push_str(&rest[..start]);
            let after_prefix = &rest[start + PREFIX.len()..];
            let Some(end) = after_prefix.find('}') else {
                return Err(EvalError::MalformedPattern {
                    pattern: pattern.to_string(),
                });
            };
            let key = &after_prefix[..end];
            let value = ctx.tag(key).ok_or_else(|| EvalError::UnboundVariable {
                key: key.to_string(),
            })?;
            resolved.push_str(value);
            rest = &after_prefix[end + 1..];
        }
        resolved.push_str(rest);

        Ok(resolved)
    }
}

// ============================================================================
// Decision
// ============================================================================

/// The result of evaluating a request against the access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is allowed or denied.
    pub effect: Effect,
    /// The statement that matched, or `None` for the default deny.
    pub matched_sid: Option<String>,
    /// Human-readable explanation of the decision.
    pub reason: String,
}

impl Decision {
    /// Returns whether the request is allowed.
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluates a request against the policy with the standard resolver.
pub fn evaluate(
    statements: &[AccessPolicyStatement],
    action: StorageAction,
    path: &str,
    ctx: &RequestContext,
) -> Decision {
    evaluate_with(&StandardResolver, statements, action, path, ctx)
}

/// Evaluates a request against the policy with a caller-supplied resolver.
///
/// Deny statements are evaluated first; the first matching statement of each
/// effect class determines the outcome; no match means deny.
///
/// # Postcondition
///
/// Always returns a `Decision` -- never panics on valid input.
pub fn evaluate_with(
    resolver: &dyn PatternResolver,
    statements: &[AccessPolicyStatement],
    action: StorageAction,
    path: &str,
    ctx: &RequestContext,
) -> Decision {
    for effect in [Effect::Deny, Effect::Allow] {
        for stmt in statements.iter().filter(|s| s.effect == effect) {
            if statement_matches(resolver, stmt, action, path, ctx) {
                let decision = Decision {
                    effect,
                    matched_sid: Some(stmt.sid.clone()),
                    reason: format!("matched statement '{}'", stmt.sid),
                };
                log_decision(&decision, action, path);
                return decision;
            }
        }
    }

    let decision = Decision {
        effect: Effect::Deny,
        matched_sid: None,
        reason: "no statement matched; default deny".to_string(),
    };
    log_decision(&decision, action, path);
    decision
}

/// Returns whether a single statement matches the request.
fn statement_matches(
    resolver: &dyn PatternResolver,
    stmt: &AccessPolicyStatement,
    action: StorageAction,
    path: &str,
    ctx: &RequestContext,
) -> bool {
    if !stmt.actions.contains(&action) {
        return false;
    }

    match resolver.resolve(&stmt.resource_pattern, ctx) {
        Ok(resolved) => glob_matches(&resolved, path),
        Err(err) => {
            // Unresolvable pattern: the statement cannot apply. Seen when a
            // credential carries no session tag because the federation
            // mapping was never applied.
            warn!(
                sid = %stmt.sid,
                pattern = %stmt.resource_pattern,
                error = %err,
                "resource pattern did not resolve; statement skipped"
            );
            false
        }
    }
}

fn log_decision(decision: &Decision, action: StorageAction, path: &str) {
    match decision.effect {
        Effect::Allow => info!(
            action = %action,
            path = %path,
            sid = decision.matched_sid.as_deref().unwrap_or("-"),
            "access granted"
        ),
        // Denial is steady-state enforcement, logged for audit, not as an
        // anomaly.
        Effect::Deny => info!(
            action = %action,
            path = %path,
            sid = decision.matched_sid.as_deref().unwrap_or("-"),
            "access denied"
        ),
    }
}

// ============================================================================
// Glob matching
// ============================================================================

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
fn glob_matches(pattern: &str, value: &str) -> bool {
    glob_match_recursive(pattern.as_bytes(), value.as_bytes())
}

/// Recursive glob matcher operating on byte slices.
///
/// Bounded recursion proportional to pattern length.
fn glob_match_recursive(pattern: &[u8], value: &[u8]) -> bool {
    match (pattern.first(), value.first()) {
        (None, None) => true,
        (Some(b'*'), _) if pattern.len() == 1 => true,
        (Some(b'*'), _) => {
            glob_match_recursive(&pattern[1..], value)
                || (!value.is_empty() && glob_match_recursive(pattern, &value[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match_recursive(&pattern[1..], &value[1..]),
        (Some(p), Some(v)) if p == v => glob_match_recursive(&pattern[1..], &value[1..]),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property-Based Tests
// ============================================================================
