//! # strata-broker: Credential exchange
//!
//! The middle trust boundary: exchanges a verified identity token for
//! short-lived, scoped credentials carrying the session tag resolved through
//! the federation table.
//!
//! ```text
//! verified token ──► trust gate ──► tag resolution ──► role selection ──► credentials
//!                    (audience +    (fail closed on     (exactly one        (random id/secret,
//!                     auth state)    missing mapping)    role, or error)     tag, expiry)
//! ```
//!
//! Exchange is stateless and independently retryable: each call reads the
//! caller's token and the static configuration (federation table, trust
//! statements, selection rule) and mutates nothing shared, so concurrent
//! exchanges -- for different or the same identity -- never interfere and
//! need no locking.
//!
//! The broker owns the session tag value's lifetime: it is fixed into the
//! credential at exchange time and lives until the credential expires. There
//! is no live revocation; credentials issued before an attribute update keep
//! the old tag value for their full lifetime, so scoping can lag an
//! attribute change by up to the expiry window.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use strata_federation::{FederationError, FederationTable};
use strata_identity::{IdentityError, TokenIssuer};
use strata_policy::{
    PolicyBuildError, RequestContext, RoleSelectionRule, SelectionError, TrustPolicyStatement,
    build_trust_policy_pair,
};
use strata_types::{Audience, AuthState, RoleId, SessionTag};
use thiserror::Error;
use tracing::{info, warn};

pub mod diagnostics;

// ============================================================================
// Errors
// ============================================================================

/// Error raised during credential exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Token verification failed; surfaced as an authorization failure.
    #[error("token rejected: {0}")]
    Token(#[from] IdentityError),

    /// No trust statement permits this exchange.
    #[error("trust policy denies exchange for audience '{audience}' ({auth_state})")]
    TrustDenied {
        audience: Audience,
        auth_state: AuthState,
    },

    /// Tag resolution failed. Configuration-class: surfaced to operators,
    /// never retried by the system itself.
    #[error(transparent)]
    Federation(#[from] FederationError),

    /// Role selection failed. Fatal configuration defect, 5xx-class.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

// ============================================================================
// Credentials
// ============================================================================

/// Short-lived credentials scoped by a session tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedCredentials {
    /// Opaque credential identifier.
    pub credential_id: String,
    /// Credential secret, presented to the storage resource.
    pub secret: String,
    /// Record the credentials were exchanged for.
    pub subject: String,
    /// Role attached by the selection rule.
    pub role: RoleId,
    /// The session tag fixed into these credentials at exchange time.
    pub session_tag: SessionTag,
    /// Exchange timestamp.
    pub issued_at: DateTime<Utc>,
    /// Natural expiry; the tag value lives exactly this long.
    pub expires_at: DateTime<Utc>,
}

impl ScopedCredentials {
    /// Returns whether the credentials have expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The request context policy evaluation sees for calls made with these
    /// credentials.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::from(self.session_tag.clone())
    }
}

// ============================================================================
// Broker
// ============================================================================

/// The credential broker.
///
/// Holds only static configuration; every field is read-only on the exchange
/// path. Mutation (a new federation table, a changed selection rule) happens
/// by constructing a new broker through the administrative path.
#[derive(Debug)]
pub struct Broker {
    verifier: TokenIssuer,
    federation: FederationTable,
    trust: [TrustPolicyStatement; 2],
    selection: RoleSelectionRule,
    credential_ttl: Duration,
}

impl Broker {
    /// Creates a broker for the verifier's audience.
    ///
    /// The trust statement pair is built here, one statement per
    /// authentication state, so a malformed trust configuration (empty
    /// audience) is caught at construction -- a configuration error, never a
    /// runtime error.
    pub fn new(
        verifier: TokenIssuer,
        federation: FederationTable,
        selection: RoleSelectionRule,
    ) -> Result<Self, PolicyBuildError> {
        let trust = build_trust_policy_pair(&verifier.audience)?;
        Ok(Self {
            verifier,
            federation,
            trust,
            selection,
            credential_ttl: Duration::from_secs(3600),
        })
    }

    /// Sets the issued-credential lifetime.
    #[must_use]
    pub fn with_credential_ttl(mut self, ttl: Duration) -> Self {
        self.credential_ttl = ttl;
        self
    }

    /// The trust statements guarding this broker, for inspection.
    pub fn trust_statements(&self) -> &[TrustPolicyStatement] {
        &self.trust
    }

    /// The federation table in effect, for inspection.
    pub fn federation(&self) -> &FederationTable {
        &self.federation
    }

    /// Exchanges a verified identity token for scoped credentials.
    ///
    /// # Errors
    ///
    /// Fails closed at every step: an unverifiable token, a trust denial, a
    /// missing federation mapping, or an unmatched role each abort the
    /// exchange with no credential issued.
    pub fn exchange(
        &self,
        token_jwt: &str,
        audience: &Audience,
    ) -> Result<ScopedCredentials, ExchangeError> {
        let token = self.verifier.verify(token_jwt)?;
        let auth_state = token.auth_state();

        if !self
            .trust
            .iter()
            .any(|stmt| stmt.permits(audience, auth_state))
        {
            warn!(audience = %audience, %auth_state, "trust policy denied exchange");
            return Err(ExchangeError::TrustDenied {
                audience: audience.clone(),
                auth_state,
            });
        }

        let session_tag = self.federation.resolve_tag(&token, audience)?;
        let role = self.selection.select_role(auth_state.into())?;

        let issued_at = Utc::now();
        let expires_at = issued_at
            + chrono::Duration::from_std(self.credential_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(3600));

        let credentials = ScopedCredentials {
            credential_id: generate_token(12),
            secret: generate_token(32),
            subject: token.subject,
            role,
            session_tag,
            issued_at,
            expires_at,
        };

        info!(
            subject = %credentials.subject,
            tag = %credentials.session_tag,
            role = %credentials.role,
            expires_at = %credentials.expires_at,
            "credentials exchanged"
        );
        Ok(credentials)
    }
}

/// Random URL-safe token of `bytes` random bytes.
fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

// ============================================================================
// Tests
// ============================================================================
