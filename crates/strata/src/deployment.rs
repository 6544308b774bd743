//! Deployment wiring: the three trust boundaries assembled.

use std::collections::HashMap;
use std::time::Duration;

use strata_broker::{Broker, ScopedCredentials, diagnostics};
use strata_config::StrataConfig;
use strata_federation::FederationTable;
use strata_identity::{IdentityStore, SignUpRequest, TokenIssuer};
use strata_policy::{AccessPolicyStatement, Decision, RoleSelectionRule, build_access_policy, evaluate};
use strata_schema::AttributeSchema;
use strata_types::{Audience, RecordId, ResourceId, StorageAction};
use tracing::info;

use crate::error::Result;

/// One provisioned Strata deployment: identity store, broker, and the access
/// policy document for a single storage resource.
///
/// Everything the request path touches is read-only; record mutation goes
/// through the store's administrative methods.
#[derive(Debug)]
pub struct Deployment {
    store: IdentityStore,
    broker: Broker,
    access_policy: Vec<AccessPolicyStatement>,
    audience: Audience,
    resource: ResourceId,
}

impl Deployment {
    /// Assembles a deployment from its parts.
    ///
    /// The access policy document is built here, so a malformed policy
    /// (empty tag key, missing substitution point) fails provisioning, not
    /// some later request.
    pub fn new(
        store: IdentityStore,
        broker: Broker,
        resource: ResourceId,
        tag_key: &str,
    ) -> Result<Self> {
        let access_policy = build_access_policy(&resource, tag_key)?;
        let audience = store.issuer().audience.clone();

        info!(
            audience = %audience,
            resource = %resource,
            tag_key = %tag_key,
            "deployment provisioned"
        );
        Ok(Self {
            store,
            broker,
            access_policy,
            audience,
            resource,
        })
    }

    /// Assembles a deployment from validated configuration.
    ///
    /// Loads the federation table from the configured artifact path -- the
    /// one piece an operator must have applied out of band. A missing or
    /// malformed artifact fails provisioning here, loudly.
    pub fn from_config(
        config: &StrataConfig,
        token_secret: &str,
        selection: RoleSelectionRule,
    ) -> Result<Self> {
        config.validate()?;

        let audience = Audience::new(config.identity.audience.clone());
        let issuer = TokenIssuer::new(token_secret, audience)
            .with_expiration(Duration::from_secs(config.identity.token_ttl_secs));

        let federation = FederationTable::load(&config.broker.federation_table)?;

        let store = IdentityStore::new(issuer.clone()).with_schema(AttributeSchema::client());
        let broker = Broker::new(issuer, federation, selection)?
            .with_credential_ttl(Duration::from_secs(config.broker.credential_ttl_secs));

        Self::new(
            store,
            broker,
            ResourceId::new(config.storage.resource_id.clone()),
            &config.storage.tag_key,
        )
    }

    /// The access policy document, for inspection and external enforcement.
    pub fn access_policy(&self) -> &[AccessPolicyStatement] {
        &self.access_policy
    }

    /// The identity store.
    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    /// The storage resource this deployment partitions.
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// Creates an identity record with the given `client` attribute.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        given_name: &str,
        family_name: &str,
        client: &str,
    ) -> Result<RecordId> {
        Ok(self.store.sign_up(SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            attributes: HashMap::from([("client".to_string(), client.to_string())]),
        })?)
    }

    /// Confirms a record (verification delivery happens outside the core).
    pub fn confirm(&self, id: RecordId) -> Result<()> {
        Ok(self.store.confirm(id)?)
    }

    /// Authenticates and returns a verified token.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        Ok(self.store.authenticate(email, password)?)
    }

    /// Exchanges a verified token for tag-scoped credentials.
    pub fn exchange(&self, token: &str) -> Result<ScopedCredentials> {
        Ok(self.broker.exchange(token, &self.audience)?)
    }

    /// Evaluates a storage request made with the given credentials.
    ///
    /// Pure, synchronous substitution and matching; denial is the expected
    /// steady-state outcome for out-of-partition paths, not a fault.
    pub fn authorize(
        &self,
        credentials: &ScopedCredentials,
        action: StorageAction,
        path: &str,
    ) -> Decision {
        evaluate(
            &self.access_policy,
            action,
            path,
            &credentials.request_context(),
        )
    }

    /// Runs the federation health check with a probe identity's token.
    ///
    /// Intended as a deployment precondition: call at startup or from a
    /// smoke test, before the deployment serves real exchanges.
    pub fn health_check(&self, probe_token: &str) -> Result<()> {
        Ok(diagnostics::check_exchange_tagging(
            &self.broker,
            probe_token,
            &self.audience,
        )?)
    }
}
