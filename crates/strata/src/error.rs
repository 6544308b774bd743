//! Top-level error type.

use strata_broker::ExchangeError;
use strata_broker::diagnostics::DiagnosticError;
use strata_config::ConfigError;
use strata_federation::FederationError;
use strata_identity::IdentityError;
use strata_policy::PolicyBuildError;
use thiserror::Error;

/// Unified error for the deployment facade.
///
/// Each variant keeps its source taxonomy: validation failures stay
/// user-recoverable, federation and selection failures stay
/// configuration-class. Policy denial is *not* here -- denial is a
/// [`strata_policy::Decision`], the steady-state enforcement outcome, not an
/// error.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Federation(#[from] FederationError),

    #[error(transparent)]
    PolicyBuild(#[from] PolicyBuildError),

    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for the facade.
pub type Result<T> = std::result::Result<T, StrataError>;
