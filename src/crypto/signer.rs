use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies short messages with HMAC-SHA256.
///
/// One signer instance covers both signed asset URLs and bearer tokens;
/// the key is shared with the identity provider that mints tokens.
#[derive(Clone)]
pub struct Signer {
    key: Zeroizing<Vec<u8>>,
}

impl Signer {
    /// Creates a new `Signer` from a raw key.
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
        }
    }

    /// Signs a message.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sign.
    ///
    /// # Returns
    ///
    /// A URL-safe base64-encoded signature.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Verifies a message against a URL-safe base64-encoded signature.
    ///
    /// Comparison happens in constant time inside the MAC verifier.
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let Ok(raw) = general_purpose::URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        mac.verify_slice(&raw).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let signer = Signer::new(b"0123456789abcdef0123456789abcdef");
        let sig = signer.sign("alpha/beta.png:1700000000");
        assert!(signer.verify("alpha/beta.png:1700000000", &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let signer = Signer::new(b"0123456789abcdef0123456789abcdef");
        let sig = signer.sign("alpha/beta.png:1700000000");
        assert!(!signer.verify("alpha/beta.png:1700000001", &sig));
    }

    #[test]
    fn different_key_fails() {
        let signer = Signer::new(b"0123456789abcdef0123456789abcdef");
        let other = Signer::new(b"fedcba9876543210fedcba9876543210");
        let sig = signer.sign("message");
        assert!(!other.verify("message", &sig));
    }

    #[test]
    fn garbage_signature_fails() {
        let signer = Signer::new(b"0123456789abcdef0123456789abcdef");
        assert!(!signer.verify("message", "not base64 ???"));
    }
}
