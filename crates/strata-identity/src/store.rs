//! In-memory identity record store.
//!
//! Record creation and mutation run on the administrative path; the
//! request-serving path (authenticate, token issue) only reads. Concurrent
//! exchanges therefore never contend with each other, only with the rare
//! admin write.

use std::collections::HashMap;
use std::sync::RwLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use strata_schema::AttributeSchema;
use strata_types::RecordId;
use tracing::info;

use crate::error::IdentityError;
use crate::record::IdentityRecord;
use crate::token::TokenIssuer;

/// Sign-up input: standard fields plus the custom attributes collected by
/// the front-end.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub given_name: String,
    pub family_name: String,
    pub attributes: HashMap<String, String>,
}

/// The identity record store.
///
/// Owns the attribute value across the record lifecycle, independent of any
/// credential derived from it: updating an attribute changes future scope
/// only, never credentials already issued.
#[derive(Debug)]
pub struct IdentityStore {
    schemas: HashMap<String, AttributeSchema>,
    issuer: TokenIssuer,
    records: RwLock<HashMap<RecordId, IdentityRecord>>,
    email_index: RwLock<HashMap<String, RecordId>>,
}

impl IdentityStore {
    /// Creates an empty store issuing tokens through `issuer`.
    pub fn new(issuer: TokenIssuer) -> Self {
        Self {
            schemas: HashMap::new(),
            issuer,
            records: RwLock::new(HashMap::new()),
            email_index: RwLock::new(HashMap::new()),
        }
    }

    /// Declares a custom attribute schema.
    #[must_use]
    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// The token issuer configuration, shared with whoever verifies.
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Creates an identity record.
    ///
    /// Every supplied attribute must be declared and must validate; every
    /// required attribute must be supplied. Rejection happens before
    /// anything is persisted.
    pub fn sign_up(&self, req: SignUpRequest) -> Result<RecordId, IdentityError> {
        let email = req.email.to_lowercase();

        for schema in self.schemas.values() {
            if schema.required && !req.attributes.contains_key(&schema.name) {
                return Err(IdentityError::MissingAttribute {
                    name: schema.name.clone(),
                });
            }
        }
        for (name, value) in &req.attributes {
            let schema = self
                .schemas
                .get(name)
                .ok_or_else(|| IdentityError::UnknownAttribute { name: name.clone() })?;
            schema.validate(value)?;
        }

        let mut index = self
            .email_index
            .write()
            .map_err(|_| IdentityError::LockPoisoned)?;
        if index.contains_key(&email) {
            return Err(IdentityError::DuplicateEmail { email });
        }

        let id = RecordId::generate();
        let record = IdentityRecord {
            id,
            email: email.clone(),
            given_name: req.given_name,
            family_name: req.family_name,
            confirmed: false,
            attributes: req.attributes,
            password_digest: hash_password(&req.password),
        };

        self.records
            .write()
            .map_err(|_| IdentityError::LockPoisoned)?
            .insert(id, record);
        index.insert(email, id);

        info!(record = %id, "identity record created");
        Ok(id)
    }

    /// Marks a record as confirmed (verification completed out of band).
    pub fn confirm(&self, id: RecordId) -> Result<(), IdentityError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| IdentityError::LockPoisoned)?;
        let record = records.get_mut(&id).ok_or(IdentityError::RecordNotFound)?;
        record.confirmed = true;
        info!(record = %id, "identity record confirmed");
        Ok(())
    }

    /// Updates the standard name fields.
    pub fn update_names(
        &self,
        id: RecordId,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
    ) -> Result<(), IdentityError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| IdentityError::LockPoisoned)?;
        let record = records.get_mut(&id).ok_or(IdentityError::RecordNotFound)?;
        record.given_name = given_name.into();
        record.family_name = family_name.into();
        Ok(())
    }

    /// Updates a custom attribute through its schema.
    ///
    /// Re-setting a scoping attribute changes future scope only: credentials
    /// already issued keep their original tag until natural expiry.
    pub fn update_attribute(
        &self,
        id: RecordId,
        name: &str,
        value: &str,
    ) -> Result<(), IdentityError> {
        let schema = self
            .schemas
            .get(name)
            .ok_or_else(|| IdentityError::UnknownAttribute {
                name: name.to_string(),
            })?;
        schema.validate_update(value)?;

        let mut records = self
            .records
            .write()
            .map_err(|_| IdentityError::LockPoisoned)?;
        let record = records.get_mut(&id).ok_or(IdentityError::RecordNotFound)?;
        record
            .attributes
            .insert(name.to_string(), value.to_string());

        info!(record = %id, attribute = %name, "attribute updated");
        Ok(())
    }

    /// Authenticates by email and password, returning a verified token.
    ///
    /// Only confirmed records authenticate. The returned token's claims
    /// carry the record's attributes as of this moment.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let email = email.to_lowercase();
        let id = {
            let index = self
                .email_index
                .read()
                .map_err(|_| IdentityError::LockPoisoned)?;
            index
                .get(&email)
                .copied()
                .ok_or(IdentityError::InvalidCredentials)?
        };

        let record = self.record(id)?;
        if !verify_password(&record.password_digest, password) {
            return Err(IdentityError::InvalidCredentials);
        }
        if !record.confirmed {
            return Err(IdentityError::NotConfirmed);
        }

        let token = self.issuer.issue(&record)?;
        info!(record = %id, "authenticated, token issued");
        Ok(token)
    }

    /// Fetches a snapshot of a record.
    pub fn record(&self, id: RecordId) -> Result<IdentityRecord, IdentityError> {
        let records = self
            .records
            .read()
            .map_err(|_| IdentityError::LockPoisoned)?;
        records
            .get(&id)
            .cloned()
            .ok_or(IdentityError::RecordNotFound)
    }
}

// ============================================================================
// Password digests
// ============================================================================

/// Hashes a password with a fresh random salt.
///
/// Stored form: `<salt-b64>$<sha256(salt || password)-b64>`.
fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

/// Verifies a password against its stored digest.
fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    let recomputed = Sha256::new()
        .chain_update(&salt)
        .chain_update(password.as_bytes())
        .finalize();
    URL_SAFE_NO_PAD.encode(recomputed) == digest_b64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use strata_types::Audience;

    use super::*;

    fn store() -> IdentityStore {
        let issuer = TokenIssuer::new("test-secret-key", Audience::new("client-app-1234"));
        IdentityStore::new(issuer).with_schema(AttributeSchema::client())
    }

    fn sign_up_req(email: &str, client: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            attributes: HashMap::from([("client".to_string(), client.to_string())]),
        }
    }

    #[test]
    fn test_sign_up_confirm_authenticate() {
        let store = store();
        let id = store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        store.confirm(id).expect("confirm");

        let token = store
            .authenticate("u1@example.com", "hunter2hunter2")
            .expect("authenticate");

        let verified = store.issuer().verify(&token).expect("verify token");
        assert_eq!(verified.attribute("client"), Some("acme"));
        assert_eq!(verified.subject, id.to_string());
    }

    #[test]
    fn test_sign_up_rejects_invalid_attribute() {
        let store = store();
        // Too short for the client schema.
        let err = store
            .sign_up(sign_up_req("u1@example.com", "ab"))
            .expect_err("must reject");
        assert!(matches!(err, IdentityError::Validation(_)));
        // Nothing persisted.
        assert!(
            store
                .authenticate("u1@example.com", "hunter2hunter2")
                .is_err()
        );
    }

    #[test]
    fn test_sign_up_requires_client_attribute() {
        let store = store();
        let mut req = sign_up_req("u1@example.com", "acme");
        req.attributes.clear();
        let err = store.sign_up(req).expect_err("must reject");
        assert!(matches!(err, IdentityError::MissingAttribute { .. }));
    }

    #[test]
    fn test_sign_up_rejects_undeclared_attribute() {
        let store = store();
        let mut req = sign_up_req("u1@example.com", "acme");
        req.attributes
            .insert("favorite_color".to_string(), "teal".to_string());
        let err = store.sign_up(req).expect_err("must reject");
        assert!(matches!(err, IdentityError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = store();
        store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("first sign up");
        let err = store
            .sign_up(sign_up_req("U1@Example.com", "globex"))
            .expect_err("must reject");
        assert!(matches!(err, IdentityError::DuplicateEmail { .. }));
    }

    #[test]
    fn test_unconfirmed_record_cannot_authenticate() {
        let store = store();
        store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        let err = store
            .authenticate("u1@example.com", "hunter2hunter2")
            .expect_err("must reject");
        assert!(matches!(err, IdentityError::NotConfirmed));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let store = store();
        let id = store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        store.confirm(id).expect("confirm");
        let err = store
            .authenticate("u1@example.com", "wrong")
            .expect_err("must reject");
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[test]
    fn test_attribute_update_changes_future_tokens_only() {
        let store = store();
        let id = store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        store.confirm(id).expect("confirm");

        let before = store
            .authenticate("u1@example.com", "hunter2hunter2")
            .expect("authenticate");

        store
            .update_attribute(id, "client", "globex")
            .expect("update attribute");

        let after = store
            .authenticate("u1@example.com", "hunter2hunter2")
            .expect("authenticate again");

        let issuer = store.issuer();
        // The earlier token still carries the old value for its lifetime.
        assert_eq!(
            issuer.verify(&before).expect("verify").attribute("client"),
            Some("acme")
        );
        assert_eq!(
            issuer.verify(&after).expect("verify").attribute("client"),
            Some("globex")
        );
    }

    #[test]
    fn test_attribute_update_validates() {
        let store = store();
        let id = store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        let err = store
            .update_attribute(id, "client", "a/b")
            .expect_err("must reject");
        assert!(matches!(err, IdentityError::Validation(_)));
        // Old value intact.
        assert_eq!(
            store.record(id).expect("record").attribute("client"),
            Some("acme")
        );
    }

    #[test]
    fn test_update_names() {
        let store = store();
        let id = store
            .sign_up(sign_up_req("u1@example.com", "acme"))
            .expect("sign up");
        store
            .update_names(id, "Augusta", "King")
            .expect("update names");
        let record = store.record(id).expect("record");
        assert_eq!(record.given_name, "Augusta");
        assert_eq!(record.family_name, "King");
    }

    #[test]
    fn test_password_digest_round_trip() {
        let stored = hash_password("correct horse");
        assert!(verify_password(&stored, "correct horse"));
        assert!(!verify_password(&stored, "battery staple"));

        // Fresh salt every time: two digests of the same password differ.
        assert_ne!(stored, hash_password("correct horse"));
    }
}
