//! Payment transaction models.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "canceled" => Some(PaymentStatus::Canceled),
            _ => None,
        }
    }
}

/// One completed or attempted payment transaction.
///
/// Created once when the client-driven confirmation path applies; after that,
/// the only allowed mutation is a status correction keyed by
/// `processor_intent_id` from the asynchronous webhook channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    /// UUID, generated at creation
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// External processor's intent identifier (unique across payments)
    pub processor_intent_id: String,
    /// Amount charged, in cents
    pub amount_cents: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Current status
    pub status: PaymentStatus,
    /// Services this payment covers
    pub service_ids: Vec<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Payment {
    /// Create a new payment record.
    pub fn new(
        patient_id: String,
        processor_intent_id: String,
        amount_cents: i64,
        currency: String,
        status: PaymentStatus,
        service_ids: Vec<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            processor_intent_id,
            amount_cents,
            currency,
            status,
            service_ids,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
