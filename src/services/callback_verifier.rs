//! Verification of the `Authorization` header PhonePe attaches to callbacks.
//!
//! PhonePe sends `SHA256(username:password)` as a hex digest, using the
//! credentials configured on the merchant dashboard.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct CallbackVerifier {
    expected_digest: Option<Vec<u8>>,
}

impl CallbackVerifier {
    pub fn new(username: Option<&str>, password: Option<&str>) -> Self {
        let expected_digest = match (username, password) {
            (Some(username), Some(password)) => {
                Some(Sha256::digest(format!("{}:{}", username, password)).to_vec())
            }
            _ => None,
        };
        CallbackVerifier { expected_digest }
    }

    /// Accepts everything when no credentials are configured.
    pub fn disabled() -> Self {
        CallbackVerifier::default()
    }

    pub fn verify(&self, authorization: Option<&str>) -> Result<()> {
        let Some(expected) = &self.expected_digest else {
            return Ok(());
        };

        let header = authorization.ok_or(AppError::Unauthorized)?.trim();
        let digest_hex = header
            .strip_prefix("SHA256 ")
            .or_else(|| header.strip_prefix("sha256 "))
            .unwrap_or(header)
            .trim();
        let provided = hex::decode(digest_hex.to_ascii_lowercase()).map_err(|_| AppError::Unauthorized)?;

        if provided.len() == expected.len() && bool::from(provided.as_slice().ct_eq(expected.as_slice())) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}
