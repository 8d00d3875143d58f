//! Handshake signature: sha1 over the sorted concatenation of token, timestamp and nonce.

use serde::Deserialize;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("missing query parameter: {0}")]
    MissingParam(&'static str),
    #[error("signature mismatch")]
    Mismatch,
}

/// Query parameters WeChat sends on the GET handshake (and on message POSTs, minus echostr).
#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub echostr: Option<String>,
}

/// A complete handshake request. All four fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: String,
}

impl TryFrom<VerificationQuery> for VerificationRequest {
    type Error = VerifyError;

    fn try_from(q: VerificationQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            signature: q.signature.ok_or(VerifyError::MissingParam("signature"))?,
            timestamp: q.timestamp.ok_or(VerifyError::MissingParam("timestamp"))?,
            nonce: q.nonce.ok_or(VerifyError::MissingParam("nonce"))?,
            echostr: q.echostr.ok_or(VerifyError::MissingParam("echostr"))?,
        })
    }
}

impl VerificationRequest {
    /// Check the signature against `token`; on success the caller echoes `echostr` back.
    pub fn verify(&self, token: &str) -> Result<(), VerifyError> {
        verify_signature(token, &self.timestamp, &self.nonce, &self.signature)
    }
}

/// Lowercase hex sha1 of `token`, `timestamp`, `nonce` sorted byte-wise and joined without separator.
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();
    let mut hasher = Sha1::new();
    for p in parts {
        hasher.update(p.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of the expected signature with the one supplied.
pub fn verify_signature(
    token: &str,
    timestamp: &str,
    nonce: &str,
    signature: &str,
) -> Result<(), VerifyError> {
    let expected = compute_signature(token, timestamp, nonce);
    let expected = expected.as_bytes();
    let provided = signature.as_bytes();
    if expected.len() == provided.len() && bool::from(expected.ct_eq(provided)) {
        Ok(())
    } else {
        Err(VerifyError::Mismatch)
    }
}
