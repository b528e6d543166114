//! Web Push transport (RFC 8030 delivery, RFC 8291 encryption, RFC 8292 VAPID).
//!
//! The endpoint descriptor is the browser's `PushSubscription` JSON:
//!
//! ```json
//! { "endpoint": "https://push.example/abc", "keys": { "p256dh": "...", "auth": "..." } }
//! ```
//!
//! Each send encrypts the payload for that subscription (`aes128gcm`), signs a
//! short-lived VAPID token for the push service's origin and POSTs the result.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use agrosense_common::config::AppConfig;

use super::{PushError, PushTransport};

/// VAPID tokens are valid for 12 hours (RFC 8292 caps them at 24).
const VAPID_TOKEN_LIFETIME_HOURS: i64 = 12;

/// Uncompressed P-256 point length.
const P256_POINT_LEN: usize = 65;

/// PKCS#8 wrapper for a P-256 `ECPrivateKey`, up to the 32-byte scalar.
const P256_PKCS8_PREFIX: [u8; 36] = [
    0x30, 0x81, 0x87, 0x02, 0x01, 0x00, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d,
    0x02, 0x01, 0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x04, 0x6d, 0x30,
    0x6b, 0x02, 0x01, 0x01, 0x04, 0x20,
];

/// `[1] publicKey BIT STRING` header preceding the uncompressed point.
const P256_PKCS8_PUBLIC_KEY_TAG: [u8; 5] = [0xa1, 0x44, 0x03, 0x42, 0x00];

/// P-256 private scalar length.
const P256_SCALAR_LEN: usize = 32;

/// VAPID signing key as it was configured.
#[derive(Debug, Clone)]
pub enum VapidPrivateKey {
    /// PKCS#8 PEM text.
    Pem(String),
    /// base64url private scalar, the format `web-push generate-vapid-keys` emits.
    Raw(String),
}

/// Application server identity presented to push services.
#[derive(Debug, Clone)]
pub struct VapidCredentials {
    /// base64url uncompressed P-256 public key
    pub public_key: String,
    pub private_key: VapidPrivateKey,
    /// Contact URI (`mailto:` / `https:`)
    pub subject: String,
}

impl VapidCredentials {
    /// Read credentials from configuration. The private key may be PEM text,
    /// a raw base64url scalar, or a path to a PEM file.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let public_key = config
            .vapid_public_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("VAPID_PUBLIC_KEY environment variable is required"))?;
        let raw_private = config.vapid_private_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("VAPID_PRIVATE_KEY_PEM or VAPID_PRIVATE_KEY environment variable is required")
        })?;

        let private_key = if raw_private.trim_start().starts_with("-----BEGIN") {
            VapidPrivateKey::Pem(raw_private.replace("\\n", "\n"))
        } else if decode_key(raw_private).is_ok_and(|key| key.len() == P256_SCALAR_LEN) {
            VapidPrivateKey::Raw(raw_private.trim().to_string())
        } else {
            let pem = std::fs::read_to_string(raw_private).map_err(|e| {
                anyhow::anyhow!("Failed to read VAPID private key from {}: {}", raw_private, e)
            })?;
            VapidPrivateKey::Pem(pem)
        };

        Ok(Self {
            public_key,
            private_key,
            subject: config.vapid_subject.clone(),
        })
    }
}

/// Delivery knobs for [`WebPushTransport`].
#[derive(Debug, Clone)]
pub struct WebPushOptions {
    /// How long the push service may hold an undelivered message.
    pub ttl_seconds: u64,
    /// Upper bound for a single HTTP exchange. `None` leaves it to the client.
    pub request_timeout: Option<Duration>,
}

impl Default for WebPushOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: 2_419_200,
            request_timeout: None,
        }
    }
}

impl WebPushOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl_seconds: config.push_ttl_seconds,
            request_timeout: config.push_request_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionInfo {
    endpoint: String,
    keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize)]
struct SubscriptionKeys {
    p256dh: String,
    auth: String,
}

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: String,
    exp: i64,
    sub: &'a str,
}

/// [`PushTransport`] speaking the Web Push protocol over `reqwest`.
pub struct WebPushTransport {
    client: reqwest::Client,
    signing_key: EncodingKey,
    public_key: String,
    subject: String,
    ttl_seconds: u64,
}

impl WebPushTransport {
    pub fn new(credentials: VapidCredentials, options: WebPushOptions) -> Result<Self, PushError> {
        let decoded = decode_key(&credentials.public_key)
            .map_err(|e| PushError::Signing(format!("VAPID public key: {}", e)))?;
        if decoded.len() != P256_POINT_LEN {
            return Err(PushError::Signing(format!(
                "VAPID public key must be a {}-byte uncompressed point, got {} bytes",
                P256_POINT_LEN,
                decoded.len()
            )));
        }

        let signing_key = match &credentials.private_key {
            VapidPrivateKey::Pem(pem) => EncodingKey::from_ec_pem(pem.as_bytes())
                .map_err(|e| PushError::Signing(format!("VAPID private key: {}", e)))?,
            VapidPrivateKey::Raw(raw) => {
                let scalar = decode_key(raw)
                    .map_err(|e| PushError::Signing(format!("VAPID private key: {}", e)))?;
                if scalar.len() != P256_SCALAR_LEN {
                    return Err(PushError::Signing(format!(
                        "VAPID private key must be a {}-byte scalar, got {} bytes",
                        P256_SCALAR_LEN,
                        scalar.len()
                    )));
                }
                EncodingKey::from_ec_der(&p256_pkcs8_der(&scalar, &decoded))
            }
        };

        // DER keys are only parsed on first use; reject a bad pair at startup.
        jsonwebtoken::encode(
            &Header::new(Algorithm::ES256),
            &VapidClaims {
                aud: String::new(),
                exp: 0,
                sub: &credentials.subject,
            },
            &signing_key,
        )
        .map_err(|e| PushError::Signing(format!("VAPID private key: {}", e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            signing_key,
            public_key: URL_SAFE_NO_PAD.encode(decoded),
            subject: credentials.subject,
            ttl_seconds: options.ttl_seconds,
        })
    }

    fn vapid_authorization(&self, endpoint: &Url) -> Result<String, PushError> {
        let claims = VapidClaims {
            aud: endpoint.origin().ascii_serialization(),
            exp: (Utc::now() + chrono::Duration::hours(VAPID_TOKEN_LIFETIME_HOURS)).timestamp(),
            sub: &self.subject,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &self.signing_key)
            .map_err(|e| PushError::Signing(e.to_string()))?;

        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, descriptor: &str, payload: &[u8]) -> Result<(), PushError> {
        let subscription: SubscriptionInfo = serde_json::from_str(descriptor)
            .map_err(|e| PushError::InvalidDescriptor(e.to_string()))?;
        let endpoint = Url::parse(&subscription.endpoint)
            .map_err(|e| PushError::InvalidDescriptor(format!("endpoint URL: {}", e)))?;

        let p256dh = decode_key(&subscription.keys.p256dh)
            .map_err(|e| PushError::InvalidDescriptor(format!("p256dh: {}", e)))?;
        let auth = decode_key(&subscription.keys.auth)
            .map_err(|e| PushError::InvalidDescriptor(format!("auth: {}", e)))?;

        let body = ece::encrypt(&p256dh, &auth, payload)
            .map_err(|e| PushError::Encryption(e.to_string()))?;
        let authorization = self.vapid_authorization(&endpoint)?;

        let response = self
            .client
            .post(endpoint)
            .header("TTL", self.ttl_seconds.to_string())
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Wrap a raw P-256 scalar and its public point into PKCS#8 DER.
fn p256_pkcs8_der(scalar: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut der = Vec::with_capacity(
        P256_PKCS8_PREFIX.len() + scalar.len() + P256_PKCS8_PUBLIC_KEY_TAG.len() + public_key.len(),
    );
    der.extend_from_slice(&P256_PKCS8_PREFIX);
    der.extend_from_slice(scalar);
    der.extend_from_slice(&P256_PKCS8_PUBLIC_KEY_TAG);
    der.extend_from_slice(public_key);
    der
}

/// Browsers hand out url-safe keys, some still padded or in the standard
/// alphabet; accept all of them.
fn decode_key(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = raw
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD.decode(normalized)
}
