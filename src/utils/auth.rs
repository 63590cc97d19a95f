use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::models::user::Claims;

/// How long an issued token stays valid.
pub const TOKEN_TTL_HOURS: i64 = 10;

/// Drift tolerance applied when checking `exp`.
pub const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Ok(false) means the password is wrong; Err means the stored hash itself
/// is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// HS256 key pair derived once from JWT_SECRET and carried in the app state,
/// so handlers never re-read the environment.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `user_id`. The embedded username is display-only;
    /// every protected request re-resolves the subject from storage.
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;

        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn keys() -> AuthKeys {
        AuthKeys::from_secret("unit-test-secret")
    }

    fn sign(keys: &AuthKeys, claims: &Claims) -> String {
        encode(&Header::default(), claims, &keys.encoding).unwrap()
    }

    #[test]
    fn hashed_password_verifies_and_wrong_password_does_not() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn two_hashes_of_the_same_password_differ() {
        let a = hash_password("segredo1").unwrap();
        let b = hash_password("segredo1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unusable_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn issued_token_round_trips_with_ttl() {
        let keys = keys();
        let id = Uuid::new_v4();

        let token = keys.issue(id, "joana").unwrap();
        let claims = keys.decode(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "joana");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn expiry_within_leeway_is_tolerated() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "joana".to_string(),
            iat: now - 3600,
            exp: now - 30,
        };

        assert!(keys.decode(&sign(&keys, &claims)).is_ok());
    }

    #[test]
    fn expiry_beyond_leeway_is_rejected() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "joana".to_string(),
            iat: now - 3600,
            exp: now - 300,
        };

        let err = keys.decode(&sign(&keys, &claims)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = AuthKeys::from_secret("other-secret")
            .issue(Uuid::new_v4(), "joana")
            .unwrap();
        assert!(keys().decode(&token).is_err());
    }
}
