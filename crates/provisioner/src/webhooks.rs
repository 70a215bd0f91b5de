//! Webhook payload parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Verify a webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Lowercase hex digest from the `X-Signature` header
/// * `secret` - Shared webhook secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Compared as hex text, so a case change in the header is a mismatch
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Change notification sent by the tracking list's subscription.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// Subscription that fired.
    #[serde(alias = "subscription_id")]
    pub subscription_id: String,
    /// Resource path of the changed list.
    pub resource: String,
    #[serde(default, alias = "client_state")]
    pub client_state: Option<String>,
    #[serde(default, alias = "tenant_id")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "site_url")]
    pub site_url: Option<String>,
    #[serde(default, alias = "web_id")]
    pub web_id: Option<String>,
    #[serde(default, alias = "expiration_date_time")]
    pub expiration_date_time: Option<String>,
}

/// Handshake payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationHandshake {
    #[serde(rename = "validationToken", alias = "validation_token")]
    pub validation_token: String,
}

/// Envelope wrapping a batch of notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationBatch {
    pub value: Vec<ChangeNotification>,
}

/// Classified webhook body.
#[derive(Debug, Clone)]
pub enum WebhookMessage {
    /// Subscription validation; the token must be echoed back.
    Handshake(String),
    /// One or more change notifications.
    Notifications(Vec<ChangeNotification>),
}

/// The body is neither a handshake nor a change notification.
#[derive(Debug, thiserror::Error)]
#[error("malformed webhook payload: {0}")]
pub struct MalformedPayload(String);

impl WebhookMessage {
    /// Classify a raw JSON body.
    pub fn parse(body: &[u8]) -> Result<Self, MalformedPayload> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| MalformedPayload(e.to_string()))?;

        if let Ok(handshake) = ValidationHandshake::deserialize(&value) {
            return Ok(Self::Handshake(handshake.validation_token));
        }
        if value.get("value").is_some() {
            return NotificationBatch::deserialize(&value)
                .map(|batch| Self::Notifications(batch.value))
                .map_err(|e| MalformedPayload(e.to_string()));
        }
        ChangeNotification::deserialize(&value)
            .map(|n| Self::Notifications(vec![n]))
            .map_err(|e| MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let body = br#"{"subscriptionId":"s","resource":"r"}"#;
        let signature = sign(body, "test-secret");
        assert!(verify_webhook_signature(body, &signature, "test-secret"));
    }

    #[test]
    fn test_verify_webhook_signature_invalid() {
        let body = br#"{"subscriptionId":"s","resource":"r"}"#;
        assert!(!verify_webhook_signature(body, &sign(body, "other"), "test-secret"));
        assert!(!verify_webhook_signature(body, "not-hex", "test-secret"));
        assert!(!verify_webhook_signature(body, "", "test-secret"));
    }

    #[test]
    fn test_single_bit_mutation_is_rejected() {
        let body = br#"{"subscriptionId":"s","resource":"r"}"#;
        let signature = sign(body, "test-secret");

        let mut mutated_body = body.to_vec();
        mutated_body[2] ^= 0x01;
        assert!(!verify_webhook_signature(&mutated_body, &signature, "test-secret"));

        let mut mutated_sig = signature.into_bytes();
        mutated_sig[0] ^= 0x01;
        let mutated_sig = String::from_utf8(mutated_sig).unwrap();
        assert!(!verify_webhook_signature(body, &mutated_sig, "test-secret"));
    }

    #[test]
    fn test_uppercase_digest_is_rejected() {
        let body = b"{}";
        let signature = sign(body, "test-secret").to_uppercase();
        assert!(!verify_webhook_signature(body, &signature, "test-secret"));
    }

    #[test]
    fn test_parse_handshake() {
        let message = WebhookMessage::parse(br#"{"validationToken": "abc123"}"#).unwrap();
        assert!(matches!(message, WebhookMessage::Handshake(t) if t == "abc123"));
    }

    #[test]
    fn test_parse_single_and_batch_notifications() {
        let single = WebhookMessage::parse(
            br#"{"subscription_id": "sub-1", "resource": "lists/abc", "tenant_id": "t"}"#,
        )
        .unwrap();
        let WebhookMessage::Notifications(list) = single else {
            panic!("expected notifications");
        };
        assert_eq!(list[0].subscription_id, "sub-1");
        assert_eq!(list[0].tenant_id.as_deref(), Some("t"));

        let batch = WebhookMessage::parse(
            br#"{"value": [
                {"subscriptionId": "sub-1", "resource": "lists/abc", "clientState": "x"},
                {"subscriptionId": "sub-2", "resource": "lists/def"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(batch, WebhookMessage::Notifications(ref l) if l.len() == 2));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(WebhookMessage::parse(b"not json").is_err());
        assert!(WebhookMessage::parse(br#"{"hello": "world"}"#).is_err());
        assert!(WebhookMessage::parse(br#"{"value": "nope"}"#).is_err());
        assert!(WebhookMessage::parse(br"[]").is_err());
    }
}
