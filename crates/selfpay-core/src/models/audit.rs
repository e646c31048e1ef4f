//! Audit-trail models.

use serde::{Deserialize, Serialize};

/// Kind of patient-visible action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PaymentIntentCreated,
    PaymentCompleted,
    PaymentWebhookReceived,
    InsuranceUpdated,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PaymentIntentCreated => "payment_intent_created",
            ActionKind::PaymentCompleted => "payment_completed",
            ActionKind::PaymentWebhookReceived => "payment_webhook_received",
            ActionKind::InsuranceUpdated => "insurance_updated",
        }
    }
}

/// One append-only audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientAction {
    /// UUID, generated at creation
    pub id: String,
    /// Patient the action concerns
    pub patient_id: String,
    /// Action name (see [`ActionKind`])
    pub action: String,
    /// JSON blob with action-specific context
    pub details: Option<String>,
    /// Request source address, when known
    pub ip_address: Option<String>,
    /// Request user agent, when known
    pub user_agent: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl PatientAction {
    /// Create an audit entry with serialized details.
    pub fn new(patient_id: String, kind: ActionKind, details: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            action: kind.as_str().to_string(),
            details,
            ip_address: None,
            user_agent: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_name() {
        let action = PatientAction::new(
            "patient-1".into(),
            ActionKind::PaymentCompleted,
            Some(r#"{"amount_cents":20500}"#.into()),
        );
        assert_eq!(action.action, "payment_completed");
        assert!(action.details.unwrap().contains("20500"));
    }
}
