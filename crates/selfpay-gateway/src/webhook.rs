//! Signed asynchronous notifications from the processor.
//!
//! The processor delivers charge outcomes out-of-band so local state can be
//! reconciled even when the cardholder's browser never comes back after
//! confirmation. Every delivery carries a signature header of the form
//! `t=<unix seconds>,v1=<hex hmac>` where the MAC is HMAC-SHA256 over
//! `"{t}.{payload}"` with a shared secret. Unverifiable deliveries must be
//! rejected before any state is touched.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Default acceptance window for the signature timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Webhook verification and parsing errors.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Signature timestamp outside tolerance ({age_secs}s old)")]
    StaleTimestamp { age_secs: i64 },

    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Kind of charge outcome the processor is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventKind {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentSucceeded,
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentFailed,
}

/// A verified asynchronous notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: WebhookEventKind,
    /// Processor intent identifier this event is about.
    pub intent_id: String,
    /// Patient the intent was created for (from intent metadata).
    pub patient_id: Option<String>,
    /// Charge amount in cents.
    pub amount_cents: i64,
    /// Processor-side failure message, for failed charges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

/// Verifies webhook signatures and parses event payloads.
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Create a verifier with the shared endpoint secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Override the timestamp acceptance window.
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify the signature header against `payload` and parse the event.
    ///
    /// `now_epoch_secs` is passed in rather than read from the clock so the
    /// tolerance check is deterministic under test.
    pub fn verify_and_parse(
        &self,
        payload: &str,
        signature_header: Option<&str>,
        now_epoch_secs: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        let header = signature_header.ok_or(WebhookError::MissingSignature)?;
        let (timestamp, signature_hex) = parse_header(header)?;

        let age_secs = (now_epoch_secs - timestamp).abs();
        if age_secs > self.tolerance_secs {
            warn!(age_secs, "rejected webhook with stale timestamp");
            return Err(WebhookError::StaleTimestamp { age_secs });
        }

        let signature = hex::decode(signature_hex).map_err(|_| WebhookError::MalformedHeader)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| WebhookError::InvalidSignature)?;

        Ok(serde_json::from_str(payload)?)
    }

    /// Produce a signature header for `payload` at `timestamp`.
    ///
    /// This is the sending side of the scheme; the in-memory processor and the
    /// test suite use it to build deliveries the verifier will accept.
    pub fn sign(&self, payload: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, signature)
    }
}

/// Parse `t=<secs>,v1=<hex>` into its parts.
fn parse_header(header: &str) -> Result<(i64, &str), WebhookError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?);
            }
            Some(("v1", value)) => signature = Some(value),
            _ => {} // Unknown scheme versions are ignored.
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(WebhookError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sample_payload() -> String {
        serde_json::to_string(&WebhookEvent {
            kind: WebhookEventKind::PaymentSucceeded,
            intent_id: "pi_abc123".to_string(),
            patient_id: Some("patient-1".to_string()),
            amount_cents: 20500,
            failure_message: None,
        })
        .unwrap()
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = sample_payload();
        let header = verifier.sign(&payload, 1_700_000_000);

        let event = verifier
            .verify_and_parse(&payload, Some(&header), 1_700_000_000)
            .unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentSucceeded);
        assert_eq!(event.intent_id, "pi_abc123");
        assert_eq!(event.amount_cents, 20500);
    }

    #[test]
    fn test_missing_signature() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(matches!(
            verifier.verify_and_parse(&sample_payload(), None, 1_700_000_000),
            Err(WebhookError::MissingSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = sample_payload();
        let header = verifier.sign(&payload, 1_700_000_000);

        let tampered = payload.replace("20500", "100");
        assert!(matches!(
            verifier.verify_and_parse(&tampered, Some(&header), 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = sample_payload();
        let header = WebhookVerifier::new("whsec_other").sign(&payload, 1_700_000_000);

        let verifier = WebhookVerifier::new(SECRET);
        assert!(matches!(
            verifier.verify_and_parse(&payload, Some(&header), 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = sample_payload();
        let header = verifier.sign(&payload, 1_700_000_000);

        let result = verifier.verify_and_parse(&payload, Some(&header), 1_700_000_000 + 301);
        assert!(matches!(
            result,
            Err(WebhookError::StaleTimestamp { age_secs: 301 })
        ));

        // Within a widened tolerance the same delivery is fine.
        let lenient = WebhookVerifier::new(SECRET).with_tolerance(600);
        assert!(lenient
            .verify_and_parse(&payload, Some(&header), 1_700_000_000 + 301)
            .is_ok());
    }

    #[test]
    fn test_malformed_header() {
        let verifier = WebhookVerifier::new(SECRET);
        for header in ["", "t=abc,v1=00", "v1=00", "t=123"] {
            assert!(matches!(
                verifier.verify_and_parse(&sample_payload(), Some(header), 1_700_000_000),
                Err(WebhookError::MalformedHeader)
            ));
        }
    }

    #[test]
    fn test_failed_event_parses() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = serde_json::json!({
            "type": "payment_intent.payment_failed",
            "intent_id": "pi_x",
            "patient_id": "patient-2",
            "amount_cents": 4250,
            "failure_message": "card_declined",
        })
        .to_string();
        let header = verifier.sign(&payload, 42);

        let event = verifier.verify_and_parse(&payload, Some(&header), 42).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentFailed);
        assert_eq!(event.failure_message.as_deref(), Some("card_declined"));
    }
}
