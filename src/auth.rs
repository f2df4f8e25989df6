//! Bearer-token verification for the authenticated API routes.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::OwnerId};

/// The claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The owner the token authenticates as.
    pub sub: OwnerId,
    /// The expiry of the token as a POSIX timestamp.
    pub exp: usize,
}

/// Verifies a bearer token and yields the owner it authenticates.
///
/// A trait seam so handlers can be tested with a stub verifier instead of
/// minting real tokens.
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token` and return the authenticated owner.
    ///
    /// # Errors
    /// Returns [Error::InvalidToken] when the token is expired, tampered
    /// with, or otherwise unreadable.
    fn verify(&self, token: &str) -> Result<OwnerId, Error>;
}

/// Verifies HS256-signed JSON web tokens against a shared secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<OwnerId, Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|_| Error::InvalidToken)
    }
}

#[cfg(test)]
mod jwt_verifier_tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::Error;

    use super::{Claims, IdentityVerifier, JwtVerifier};

    fn mint_token(secret: &str, sub: i64, offset_seconds: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            sub,
            exp: (now + offset_seconds) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_a_valid_token() {
        let verifier = JwtVerifier::new("test-secret");

        let owner_id = verifier.verify(&mint_token("test-secret", 42, 3600)).unwrap();

        assert_eq!(owner_id, 42);
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let verifier = JwtVerifier::new("test-secret");

        let result = verifier.verify(&mint_token("other-secret", 42, 3600));

        assert_eq!(result, Err(Error::InvalidToken));
    }

    #[test]
    fn rejects_an_expired_token() {
        let verifier = JwtVerifier::new("test-secret");

        let result = verifier.verify(&mint_token("test-secret", 42, -3600));

        assert_eq!(result, Err(Error::InvalidToken));
    }

    #[test]
    fn rejects_garbage() {
        let verifier = JwtVerifier::new("test-secret");

        assert_eq!(verifier.verify("not-a-token"), Err(Error::InvalidToken));
    }
}
