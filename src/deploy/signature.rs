use super::DeployError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature, in the `sha256=<hex>` form GitHub sends.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";
const MAX_SIGNATURE_LEN: usize = 128;

/// Checks webhook bodies against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha256,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, DeployError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(DeployError::InvalidSecret("secret must not be empty".to_string()));
        }
        let keyed = HmacSha256::new_from_slice(secret)
            .map_err(|e| DeployError::InvalidSecret(e.to_string()))?;
        Ok(Self { keyed })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Header value a sender would attach to `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of the signature header against `body`.
    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<(), DeployError> {
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(DeployError::MissingSignature)?;
        if header.len() > MAX_SIGNATURE_LEN {
            return Err(DeployError::InvalidSignature);
        }

        let expected = header
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|digest| hex::decode(digest).ok())
            .ok_or(DeployError::InvalidSignature)?;

        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| DeployError::InvalidSignature)
    }
}
