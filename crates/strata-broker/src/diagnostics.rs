//! Federation health check.
//!
//! The federation mapping is applied by an operator, out of band, after the
//! identity and broker resources exist -- nothing in automated provisioning
//! can guarantee it happened. Its absence has a precise symptom: exchanged
//! credentials carry an empty or missing session tag, and every partition
//! becomes unreachable (fail closed). This module turns that symptom into a
//! deployment precondition: run the check at startup or as a smoke test
//! before declaring the stack healthy.

use strata_types::Audience;
use thiserror::Error;
use tracing::{error, info};

use crate::{Broker, ExchangeError};

/// Error raised by the federation health check.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// The probe exchange itself failed -- most commonly
    /// [`strata_federation::FederationError::UnmappedAttribute`], the direct
    /// signature of a mapping that was never applied.
    #[error("probe exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    /// The exchange succeeded but the credentials carry an empty tag value.
    /// The mapping exists but points at a degenerate attribute.
    #[error("exchanged credentials carry an empty session tag '{key}'")]
    EmptySessionTag { key: String },
}

/// Asserts that credentials exchanged through `broker` carry a non-empty
/// session tag.
///
/// `probe_token` must be a valid token for a known probe identity -- a
/// record whose scoping attribute is set. The check performs one real
/// exchange and inspects the result; it mutates nothing.
///
/// # Errors
///
/// [`DiagnosticError::Exchange`] when the exchange fails (unapplied mapping,
/// bad probe token); [`DiagnosticError::EmptySessionTag`] when credentials
/// come back untagged.
pub fn check_exchange_tagging(
    broker: &Broker,
    probe_token: &str,
    audience: &Audience,
) -> Result<(), DiagnosticError> {
    let credentials = match broker.exchange(probe_token, audience) {
        Ok(credentials) => credentials,
        Err(err) => {
            error!(audience = %audience, error = %err, "federation health check failed");
            return Err(err.into());
        }
    };

    if credentials.session_tag.value.is_empty() {
        error!(
            audience = %audience,
            key = %credentials.session_tag.key,
            "federation health check: credentials are untagged"
        );
        return Err(DiagnosticError::EmptySessionTag {
            key: credentials.session_tag.key,
        });
    }

    info!(
        audience = %audience,
        tag = %credentials.session_tag,
        "federation health check passed"
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
