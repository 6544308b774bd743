//! # strata-identity: Identity record store & verified tokens
//!
//! The first trust boundary of the pipeline. Holds identity records with
//! standard fields plus schema-validated custom attributes, and issues
//! verified tokens -- JWTs whose claims carry the custom attributes -- after
//! successful authentication.
//!
//! Validation happens here, at attribute intake, and nowhere downstream: a
//! value that passes the schema is the value the federation step will tag a
//! credential with and the policy engine will substitute into a path.
//! Rejected values never reach the broker.
//!
//! Record mutation is an administrative-path concern; the exchange path only
//! ever reads. The store therefore guards its map with a plain `RwLock` and
//! the token path takes no locks at all.

mod error;
mod record;
mod store;
mod token;

pub use error::IdentityError;
pub use record::IdentityRecord;
pub use store::{IdentityStore, SignUpRequest};
pub use token::{AttributeClaims, TokenIssuer, VerifiedToken};
