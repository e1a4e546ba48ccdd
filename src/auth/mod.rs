pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_JWT_EXPIRY_HOURS};
use password::PasswordHashing;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Token lifetime out of range: {0} hours")]
    InvalidExpiry(u64),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: Uuid,
    /// Unique per issued token, so two logins in the same second never collide
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.min(MAX_JWT_EXPIRY_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            sub: user_id,
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Password hashing plus stateless session tokens.
///
/// The signing secret is handed in at construction and never read from the
/// environment afterwards. Revocation is not tracked here; the
/// authentication gate checks each token against the identity's active
/// sessions.
#[derive(Clone)]
pub struct CredentialStore {
    hashing: PasswordHashing,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
    /// Hash of a throwaway password under the configured work factor.
    placeholder_hash: Arc<str>,
}

impl CredentialStore {
    pub fn new(security: &SecurityConfig) -> Result<Self, CredentialError> {
        if security.jwt_secret.is_empty() {
            return Err(CredentialError::InvalidSecret);
        }
        if security.jwt_expiry_hours == 0 || security.jwt_expiry_hours > MAX_JWT_EXPIRY_HOURS {
            return Err(CredentialError::InvalidExpiry(security.jwt_expiry_hours));
        }

        let hashing = PasswordHashing::new(security)?;
        let placeholder_hash = hashing.hash(&Uuid::new_v4().to_string())?.into();

        Ok(Self {
            hashing,
            encoding_key: EncodingKey::from_secret(security.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(security.jwt_secret.as_bytes()),
            expiry_hours: security.jwt_expiry_hours,
            placeholder_hash,
        })
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        self.hashing.hash(plaintext)
    }

    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        self.hashing.verify(plaintext, hashed)
    }

    /// Pays the same Argon2 cost as [`verify`](Self::verify) when there is no
    /// stored hash to check against. Always false.
    pub fn verify_absent(&self, plaintext: &str) -> bool {
        let _ = self.hashing.verify(plaintext, &self.placeholder_hash);
        false
    }

    #[cfg(test)]
    pub fn verifications(&self) -> usize {
        self.hashing.verifications()
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, CredentialError> {
        let claims = Claims::new(user_id, self.expiry_hours);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::TokenGeneration(e.to_string()))
    }

    /// Signature and expiry check only.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, CredentialError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims.sub)
    }

    /// True once a token can no longer pass [`validate_token`](Self::validate_token).
    pub fn is_stale(&self, token: &str) -> bool {
        self.validate_token(token).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn store() -> CredentialStore {
        CredentialStore::new(&AppConfig::for_tests().security).unwrap()
    }

    #[test]
    fn hash_is_salted_and_verifies() {
        let credentials = store();
        let first = credentials.hash("correct horse").unwrap();
        let second = credentials.hash("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(credentials.verify("correct horse", &first));
        assert!(credentials.verify("correct horse", &second));
        assert!(!credentials.verify("wrong horse", &first));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!store().verify("anything", "not-a-phc-string"));
    }

    #[test]
    fn tokens_round_trip_identity_and_are_unique() {
        let credentials = store();
        let user_id = Uuid::new_v4();
        let a = credentials.issue_token(user_id).unwrap();
        let b = credentials.issue_token(user_id).unwrap();

        assert_ne!(a, b);
        assert_eq!(credentials.validate_token(&a).unwrap(), user_id);
        assert_eq!(credentials.validate_token(&b).unwrap(), user_id);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let mut security = AppConfig::for_tests().security;
        security.jwt_secret = "someone-else".to_string();
        let foreign = CredentialStore::new(&security).unwrap();

        let token = foreign.issue_token(Uuid::new_v4()).unwrap();
        assert!(store().validate_token(&token).is_err());
        assert!(store().validate_token("garbage").is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut security = AppConfig::for_tests().security;
        security.jwt_secret = String::new();
        assert!(matches!(CredentialStore::new(&security), Err(CredentialError::InvalidSecret)));
    }

    #[test]
    fn expiry_outside_bounds_is_refused() {
        for hours in [0, MAX_JWT_EXPIRY_HOURS + 1, u64::MAX] {
            let mut security = AppConfig::for_tests().security;
            security.jwt_expiry_hours = hours;
            assert!(matches!(
                CredentialStore::new(&security),
                Err(CredentialError::InvalidExpiry(h)) if h == hours
            ));
        }
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let claims = Claims::new(Uuid::new_v4(), u64::MAX);
        let ceiling = Utc::now() + Duration::hours(MAX_JWT_EXPIRY_HOURS as i64);
        assert!(claims.exp <= ceiling.timestamp());
    }

    #[test]
    fn verify_absent_costs_one_verification() {
        let credentials = store();
        let before = credentials.verifications();
        assert!(!credentials.verify_absent("correct horse"));
        assert_eq!(credentials.verifications(), before + 1);
    }

    #[test]
    fn expired_and_foreign_tokens_are_stale() {
        let credentials = store();
        let fresh = credentials.issue_token(Uuid::new_v4()).unwrap();
        assert!(!credentials.is_stale(&fresh));

        let now = Utc::now().timestamp();
        let expired = Claims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            exp: now - 3600,
            iat: now - 7200,
        };
        let expired = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(b"test-signing-secret"),
        )
        .unwrap();
        assert!(credentials.is_stale(&expired));
        assert!(credentials.is_stale("garbage"));
    }
}
