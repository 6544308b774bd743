//! Verified token issuance and validation.
//!
//! Tokens are JWTs signed with the store's secret. The claims carry the
//! record's custom attributes verbatim, which is what makes the downstream
//! federation step possible: the broker reads the attribute from a token it
//! has verified, not from anything the caller asserts.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strata_types::{Audience, AuthState};

use crate::error::IdentityError;
use crate::record::IdentityRecord;

/// Claims carried by a verified identity token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttributeClaims {
    /// Subject (record ID).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience (client/application id the token was issued to).
    pub aud: String,
    /// Issued at (seconds since epoch).
    pub iat: u64,
    /// Expiration (seconds since epoch).
    pub exp: u64,
    /// Custom attributes, copied from the record at issuance.
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

/// Issues and validates verified identity tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    /// Secret key for signing/verifying tokens.
    secret: String,
    /// Issuer claim.
    pub issuer: String,
    /// Audience the tokens are issued to.
    pub audience: Audience,
    /// Token lifetime.
    pub expiration: Duration,
}

impl TokenIssuer {
    /// Creates a token issuer for one audience.
    pub fn new(secret: impl Into<String>, audience: Audience) -> Self {
        Self {
            secret: secret.into(),
            issuer: "strata-identity".to_string(),
            audience,
            expiration: Duration::from_secs(3600),
        }
    }

    /// Sets the token lifetime.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Issues a signed token for a record.
    ///
    /// The record's custom attributes are copied into the claims; nothing is
    /// recomputed or defaulted at issuance.
    pub fn issue(&self, record: &IdentityRecord) -> Result<String, IdentityError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs();

        let claims = AttributeClaims {
            sub: record.id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.as_str().to_string(),
            iat: now,
            exp: now + self.expiration.as_secs(),
            attrs: record.attributes.clone(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Validates a token string and returns the verified view of it.
    ///
    /// Checks signature, issuer, audience, and expiry. A token that fails
    /// any check yields [`IdentityError::Token`]; there is no partially
    /// verified state.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[self.audience.as_str()]);

        let data = decode::<AttributeClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(VerifiedToken {
            subject: data.claims.sub,
            audience: Audience::new(data.claims.aud),
            attributes: data.claims.attrs,
        })
    }
}

/// A token that passed verification.
///
/// Constructed only by [`TokenIssuer::verify`]; holding one means signature,
/// issuer, audience, and expiry all checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Record identifier the token was issued for.
    pub subject: String,
    /// Audience the token was issued to.
    pub audience: Audience,
    /// Custom attributes carried as claims.
    pub attributes: HashMap<String, String>,
}

impl VerifiedToken {
    /// Looks up an attribute claim.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The authentication state a verified token certifies.
    pub fn auth_state(&self) -> AuthState {
        AuthState::Authenticated
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use strata_types::RecordId;

    use super::*;

    fn record() -> IdentityRecord {
        IdentityRecord {
            id: RecordId::generate(),
            email: "u1@example.com".to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            confirmed: true,
            attributes: HashMap::from([("client".to_string(), "acme".to_string())]),
            password_digest: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = TokenIssuer::new("test-secret-key", Audience::new("client-app-1234"));
        let record = record();

        let token = issuer.issue(&record).expect("issue token");
        let verified = issuer.verify(&token).expect("verify token");

        assert_eq!(verified.subject, record.id.to_string());
        assert_eq!(verified.audience, Audience::new("client-app-1234"));
        assert_eq!(verified.attribute("client"), Some("acme"));
        assert_eq!(verified.auth_state(), AuthState::Authenticated);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenIssuer::new("secret-a", Audience::new("client-app-1234"));
        let other = TokenIssuer::new("secret-b", Audience::new("client-app-1234"));

        let token = issuer.issue(&record()).expect("issue token");
        assert!(matches!(
            other.verify(&token),
            Err(IdentityError::Token(_))
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = TokenIssuer::new("test-secret-key", Audience::new("client-app-1234"));
        let other = TokenIssuer::new("test-secret-key", Audience::new("other-app"));

        let token = issuer.issue(&record()).expect("issue token");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer = TokenIssuer::new("test-secret-key", Audience::new("client-app-1234"));
        let other = issuer.clone().with_issuer("someone-else");

        let token = issuer.issue(&record()).expect("issue token");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_token_without_attribute_verifies() {
        // Verification is about authenticity; a record with no custom
        // attribute still gets a valid token. The federation step is what
        // fails later, closed.
        let issuer = TokenIssuer::new("test-secret-key", Audience::new("client-app-1234"));
        let mut rec = record();
        rec.attributes.clear();

        let token = issuer.issue(&rec).expect("issue token");
        let verified = issuer.verify(&token).expect("verify token");
        assert_eq!(verified.attribute("client"), None);
    }
}
