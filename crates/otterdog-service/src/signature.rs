//! Inbound webhook signature verification: `X-Hub-Signature-256` over the
//! raw request body, keyed by the installation's webhook secret. Symmetric
//! with the teacher's own outbound HMAC-SHA256 signing, but the inbound
//! side must compare in constant time rather than round-trip through
//! `hex::encode` and `==`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("missing X-Hub-Signature-256 header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

/// `header` is the raw `X-Hub-Signature-256` value, e.g. `sha256=<hex>`.
pub fn verify(secret: &str, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let hex_digest = header.strip_prefix("sha256=").ok_or(SignatureError::Malformed)?;
    let expected = hex::decode(hex_digest).map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn matching_signature_verifies() {
        let body = br#"{"action":"opened"}"#;
        let header = sign("s3cr3t", body);
        assert!(verify("s3cr3t", Some(&header), body).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"action":"opened"}"#;
        let header = sign("s3cr3t", body);
        assert!(matches!(
            verify("other", Some(&header), body),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(verify("s3cr3t", None, b"{}"), Err(SignatureError::Missing)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(matches!(
            verify("s3cr3t", Some("not-a-signature"), b"{}"),
            Err(SignatureError::Malformed)
        ));
    }
}
