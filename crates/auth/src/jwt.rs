//! HS256 signing and verification of [`TokenClaims`].
//!
//! Verification here is stateless: signature, format and time window only.
//! Whether a token is still active is a store question answered by
//! [`crate::credentials::CredentialService`].

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use authgate_core::{AuthError, AuthResult};

use crate::claims::{TokenClaims, validate_claims};

#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
    }

    /// Verify signature and format, then the time window at `now`.
    ///
    /// Every failure collapses to [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(reason = %e, "token failed signature/format check");
                AuthError::InvalidToken
            })?;

        validate_claims(&data.claims, now).map_err(|e| {
            tracing::debug!(reason = %e, "token failed time window check");
            AuthError::InvalidToken
        })?;

        Ok(data.claims)
    }
}
