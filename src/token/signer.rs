use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, io::Read, path::Path};

use crate::error::ApnsError;

/// Claims of an APNs provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub iss: String,
    pub iat: i64,
}

/// PEM encoded PKCS#8 private key (the `.p8` file downloaded from Apple).
#[derive(Clone)]
pub struct SigningKey {
    pem: Vec<u8>,
}

impl SigningKey {
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Self {
        Self { pem: pem.into() }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ApnsError> {
        let mut pem = Vec::new();
        File::open(&path)
            .map_err(|err| {
                ApnsError::Configuration(format!(
                    "failed to open signing key {}: {err}",
                    path.as_ref().display()
                ))
            })?
            .read_to_end(&mut pem)
            .map_err(|err| ApnsError::Configuration(format!("failed to read signing key: {err}")))?;

        Ok(Self::from_pem(pem))
    }

    pub fn as_pem(&self) -> &[u8] {
        &self.pem
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenSigner: Send + Sync {
    /// Signs `claims` into a compact JWT carrying `key_id` as its `kid` header.
    fn sign(
        &self,
        claims: &ProviderClaims,
        key: &SigningKey,
        algorithm: Algorithm,
        key_id: &str,
    ) -> Result<String, ApnsError>;
}

/// Signs provider tokens with an EC P-256 key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Es256Signer;

impl TokenSigner for Es256Signer {
    fn sign(
        &self,
        claims: &ProviderClaims,
        key: &SigningKey,
        algorithm: Algorithm,
        key_id: &str,
    ) -> Result<String, ApnsError> {
        let encoding_key = EncodingKey::from_ec_pem(key.as_pem())
            .map_err(|err| ApnsError::Configuration(format!("invalid signing key: {err}")))?;

        let mut header = Header::new(algorithm);
        header.kid = Some(key_id.to_string());

        encode(&header, claims, &encoding_key)
            .map_err(|err| ApnsError::Configuration(format!("failed to sign provider token: {err}")))
    }
}
