//! JWT utilities for the signed session.
//!
//! Tokens are HS256-signed with the configured session secret and must carry
//! an `exp` claim, which is validated on decode.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::AuthError;

/// JWT token utility for creating and validating signed sessions
#[derive(Clone)]
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtUtils {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtUtils {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::session(format!("Token generation failed: {e}")))
    }

    /// Validates signature and expiry, returning the claims.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::session(format!("Token validation failed: {e}")))
    }
}

impl std::fmt::Debug for JwtUtils {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtUtils").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        sub: String,
        exp: i64,
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_signed_claims_decode() {
        let jwt = JwtUtils::new("secret");
        let claims = Probe {
            sub: "u-1".to_string(),
            exp: in_an_hour(),
        };
        let token = jwt.encode(&claims).unwrap();
        assert_eq!(jwt.decode::<Probe>(&token).unwrap(), claims);
    }

    #[test]
    fn test_foreign_and_expired_tokens_are_rejected() {
        let token = JwtUtils::new("other")
            .encode(&Probe {
                sub: "u-1".to_string(),
                exp: in_an_hour(),
            })
            .unwrap();
        assert!(JwtUtils::new("secret").decode::<Probe>(&token).is_err());

        let jwt = JwtUtils::new("secret");
        let expired = jwt
            .encode(&Probe {
                sub: "u-1".to_string(),
                exp: chrono::Utc::now().timestamp() - 10,
            })
            .unwrap();
        assert!(jwt.decode::<Probe>(&expired).is_err());
    }
}
