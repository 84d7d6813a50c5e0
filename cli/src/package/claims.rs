//! Release signature claims

use std::path::{Path, PathBuf};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::filesys::file::File;

/// Claim format version written into every signature
pub const CURRENT_CLAIM_VERSION: &str = "1.0.0";

/// Hidden file at the package root holding the signed claims
pub const CLAIMS_FILE_NAME: &str = ".appsyncrelease";

/// Claims asserted by a release signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedClaims {
    pub claim_version: String,

    /// Lowercase hex content hash of the package
    pub content_hash: String,
}

impl SignedClaims {
    pub fn new(content_hash: String) -> Self {
        Self {
            claim_version: CURRENT_CLAIM_VERSION.to_string(),
            content_hash,
        }
    }

    /// Sign the claims with an RSA private key (PEM), producing a compact
    /// RS256 token
    pub fn sign(&self, private_key_pem: &[u8]) -> Result<String, AppError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)?;
        Ok(encode(&Header::new(Algorithm::RS256), self, &key)?)
    }

    /// Decode a token and check its signature against an RSA public key
    pub fn verify(token: &str, public_key_pem: &[u8]) -> Result<Self, AppError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Ok(decode::<SignedClaims>(token, &key, &validation)?.claims)
    }

    /// Decode a token without checking the signature
    pub fn decode_unverified(token: &str) -> Result<Self, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let token_data = decode::<SignedClaims>(token, &DecodingKey::from_secret(b""), &validation)?;
        Ok(token_data.claims)
    }
}

/// Location of the claims file inside a package directory
pub fn claims_file_path(package_dir: &Path) -> PathBuf {
    package_dir.join(CLAIMS_FILE_NAME)
}

/// Read and decode the claims file of a package directory, if present
pub async fn read_claims(package_dir: &Path) -> Result<Option<SignedClaims>, AppError> {
    let file = File::new(claims_file_path(package_dir));
    if !file.exists().await {
        return Ok(None);
    }
    let token = file.read_string().await?;
    SignedClaims::decode_unverified(token.trim()).map(Some)
}
