//! Charge-intent types.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a charge intent, as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    /// Created but not yet confirmed by the cardholder.
    Pending,
    /// The charge settled; money moved.
    Succeeded,
    /// The charge was declined or errored.
    Failed,
    /// The intent was canceled before settlement.
    Canceled,
}

impl ChargeStatus {
    /// Canonical string form (matches the processor's wire format).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Succeeded => "succeeded",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Canceled => "canceled",
        }
    }
}

/// Metadata attached to an intent at creation time.
///
/// This is the only link from the processor's record back to domain state:
/// the confirmation path re-reads it to check that the intent belongs to the
/// authenticated patient, and the webhook path uses it for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    /// Patient the intent was created for.
    pub patient_id: String,
    /// Services the intent covers.
    pub service_ids: Vec<String>,
}

/// A charge intent as known to the external processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeIntent {
    /// Processor-assigned intent identifier (globally unique).
    pub intent_id: String,
    /// Client-side confirmation secret, present while the intent is pending.
    pub client_secret: Option<String>,
    /// Charge amount in minor currency units (cents).
    pub amount_cents: i64,
    /// ISO currency code, lowercase (e.g. "usd").
    pub currency: String,
    /// Current lifecycle state.
    pub status: ChargeStatus,
    /// Domain metadata attached at creation.
    pub metadata: IntentMetadata,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}
