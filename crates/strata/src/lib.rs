//! # Strata
//!
//! Attribute-scoped credential provisioning for multi-tenant storage.
//!
//! Access scope is derived at runtime from a verified identity attribute,
//! not from static per-user policy entries: each authenticated identity can
//! read and write only the storage partition matching its own verified
//! `client` attribute, and no user-to-path mapping exists anywhere.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────────┐
//! │  Identity    │ →  │  Credential   │ →  │  Resource Policy │
//! │  Store       │    │  Broker       │    │  Evaluation      │
//! │ (attributes, │    │ (federation,  │    │ (tag substituted │
//! │  tokens)     │    │  tagging)     │    │  into path)      │
//! └──────────────┘    └───────────────┘    └──────────────────┘
//! ```
//!
//! Three independently operated trust boundaries agree on a single tag value
//! through the operator-applied federation table; each crate owns one
//! boundary and [`Deployment`] wires them together.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata::{Deployment, SignUpRequest, StorageAction};
//!
//! let deployment = Deployment::from_config(&config, "signing-secret", selection)?;
//!
//! let id = deployment.sign_up(/* email, password, names, client attribute */)?;
//! deployment.confirm(id)?;
//!
//! let token = deployment.authenticate("u1@example.com", "password")?;
//! let credentials = deployment.exchange(&token)?;
//!
//! let decision = deployment.authorize(&credentials, StorageAction::GetObject,
//!     "tenant-data/acme/report.csv");
//! assert!(decision.is_allowed());
//! ```

mod deployment;
mod error;

pub use deployment::Deployment;
pub use error::{Result, StrataError};

// Re-export the pipeline vocabulary at the crate root.
pub use strata_broker::{Broker, ExchangeError, ScopedCredentials, diagnostics};
pub use strata_config::{ConfigLoader, StrataConfig};
pub use strata_federation::{FederationEntry, FederationError, FederationTable};
pub use strata_identity::{
    IdentityError, IdentityRecord, IdentityStore, SignUpRequest, TokenIssuer, VerifiedToken,
};
pub use strata_policy::{
    AccessPolicyStatement, AmbiguousRoleResolution, Decision, Effect, PolicyBuildError,
    RequestContext, RoleSelectionRule, SelectionError, TrustPolicyStatement, build_access_policy,
    build_trust_policy, build_trust_policy_pair, evaluate,
};
pub use strata_schema::{AttributeSchema, ValidationError};
pub use strata_types::{
    Audience, AuthState, BrokerAction, RecordId, ResourceId, RoleId, SessionTag, StorageAction,
};
