//! Resource access policy construction.
//!
//! Emits the static policy document enforced by the storage resource's
//! policy engine. Two statements cover the partition scheme: an unscoped
//! listing statement (discovery must enumerate before it can read or write)
//! and a data statement whose resource pattern embeds the session-tag
//! substitution point. The substitution is evaluated by the policy engine at
//! request time -- this module only emits the pattern string -- so one policy
//! document serves all tenants with no per-tenant statements.

use serde::{Deserialize, Serialize};
use strata_types::{ResourceId, StorageAction};

use crate::{Effect, PolicyBuildError};

/// Opening delimiter of a session-tag substitution point.
const SUBSTITUTION_PREFIX: &str = "${strata:PrincipalTag/";

/// Closing delimiter of a substitution point.
const SUBSTITUTION_SUFFIX: &str = "}";

/// Renders the substitution point for a session-tag key.
///
/// The resulting token is resolved with the live tag value by the policy
/// engine at request time; see [`crate::eval`].
pub fn substitution_point(tag_key: &str) -> String {
    format!("{SUBSTITUTION_PREFIX}{tag_key}{SUBSTITUTION_SUFFIX}")
}

/// Counts substitution points in a resource pattern.
pub(crate) fn count_substitution_points(pattern: &str) -> usize {
    pattern.matches(SUBSTITUTION_PREFIX).count()
}

// ============================================================================
// Statement
// ============================================================================

/// A single statement of the resource access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicyStatement {
    /// Statement identifier, for audit logging and diagnostics.
    pub sid: String,
    /// The effect when this statement matches a request.
    pub effect: Effect,
    /// Storage actions granted (or refused) by this statement.
    pub actions: Vec<StorageAction>,
    /// Resource pattern the request path must match. May contain exactly one
    /// substitution point when the statement grants partition data actions.
    pub resource_pattern: String,
}

impl AccessPolicyStatement {
    /// Checks the statement's structural invariant.
    ///
    /// Every statement granting an action that reads or writes partitioned
    /// data must carry exactly one substitution point; a statement lacking
    /// it would grant cross-tenant access.
    pub fn validate(&self) -> Result<(), PolicyBuildError> {
        let points = count_substitution_points(&self.resource_pattern);
        let scoped = self.actions.iter().any(|a| a.touches_partition());

        if scoped && points == 0 {
            return Err(PolicyBuildError::MissingSubstitution {
                sid: self.sid.clone(),
            });
        }
        if points > 1 {
            return Err(PolicyBuildError::MultipleSubstitutions {
                sid: self.sid.clone(),
                count: points,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Builds the resource access policy for one storage resource and one
/// session-tag key.
///
/// Produces two statements:
/// 1. `allow-partition-discovery` -- `ListBucket` on the bare resource,
///    unscoped by tag.
/// 2. `allow-partition-data` -- read/write/delete on
///    `<resource>/${strata:PrincipalTag/<tag_key>}/*`.
///
/// The tag value is treated as an opaque path segment: no case folding or
/// trimming happens here. Normalization, if any, belongs to attribute
/// validation so there is a single source of truth.
///
/// # Errors
///
/// [`PolicyBuildError::MissingTagKey`] if `tag_key` is empty; an empty key
/// would render a substitution point that can never resolve.
pub fn build_access_policy(
    resource: &ResourceId,
    tag_key: &str,
) -> Result<Vec<AccessPolicyStatement>, PolicyBuildError> {
    if tag_key.is_empty() {
        return Err(PolicyBuildError::MissingTagKey);
    }

    let listing = AccessPolicyStatement {
        sid: "allow-partition-discovery".to_string(),
        effect: Effect::Allow,
        actions: vec![StorageAction::ListBucket],
        resource_pattern: resource.as_str().to_string(),
    };

    let data = AccessPolicyStatement {
        sid: "allow-partition-data".to_string(),
        effect: Effect::Allow,
        actions: vec![
            StorageAction::GetObject,
            StorageAction::PutObject,
            StorageAction::DeleteObject,
        ],
        resource_pattern: format!("{}/{}/*", resource.as_str(), substitution_point(tag_key)),
    };

    listing.validate()?;
    data.validate()?;

    Ok(vec![listing, data])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> ResourceId {
        ResourceId::new("bucket")
    }

    #[test]
    fn test_policy_has_discovery_and_data_statements() {
        let policy = build_access_policy(&bucket(), "client").expect("build access policy");
        assert_eq!(policy.len(), 2);

        assert_eq!(policy[0].sid, "allow-partition-discovery");
        assert_eq!(policy[0].actions, vec![StorageAction::ListBucket]);
        assert_eq!(policy[0].resource_pattern, "bucket");

        assert_eq!(policy[1].sid, "allow-partition-data");
        assert_eq!(
            policy[1].resource_pattern,
            "bucket/${strata:PrincipalTag/client}/*"
        );
    }

    #[test]
    fn test_data_statement_carries_exactly_one_substitution() {
        let policy = build_access_policy(&bucket(), "client").expect("build access policy");
        assert_eq!(count_substitution_points(&policy[1].resource_pattern), 1);
        assert_eq!(count_substitution_points(&policy[0].resource_pattern), 0);
    }

    #[test]
    fn test_empty_tag_key_rejected() {
        assert_eq!(
            build_access_policy(&bucket(), ""),
            Err(PolicyBuildError::MissingTagKey)
        );
    }

    #[test]
    fn test_unscoped_data_statement_rejected() {
        // A statement granting GetObject on the bare resource would hand out
        // cross-tenant reads.
        let stmt = AccessPolicyStatement {
            sid: "bad-unscoped".to_string(),
            effect: Effect::Allow,
            actions: vec![StorageAction::GetObject],
            resource_pattern: "bucket/*".to_string(),
        };
        assert_eq!(
            stmt.validate(),
            Err(PolicyBuildError::MissingSubstitution {
                sid: "bad-unscoped".to_string(),
            })
        );
    }

    #[test]
    fn test_double_substitution_rejected() {
        let stmt = AccessPolicyStatement {
            sid: "bad-double".to_string(),
            effect: Effect::Allow,
            actions: vec![StorageAction::GetObject],
            resource_pattern: format!(
                "bucket/{}/{}/*",
                substitution_point("client"),
                substitution_point("client")
            ),
        };
        assert_eq!(
            stmt.validate(),
            Err(PolicyBuildError::MultipleSubstitutions {
                sid: "bad-double".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_listing_statement_needs_no_substitution() {
        let stmt = AccessPolicyStatement {
            sid: "allow-partition-discovery".to_string(),
            effect: Effect::Allow,
            actions: vec![StorageAction::ListBucket],
            resource_pattern: "bucket".to_string(),
        };
        assert!(stmt.validate().is_ok());
    }

    #[test]
    fn test_policy_serialization_roundtrip() {
        let policy = build_access_policy(&bucket(), "client").expect("build access policy");
        let json = serde_json::to_string(&policy).expect("serialize policy");
        let back: Vec<AccessPolicyStatement> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(policy, back);
    }
}
