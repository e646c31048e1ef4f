//! Billable service models.

use serde::{Deserialize, Serialize};

use crate::pricing;

/// One billable medical service line item.
///
/// Amounts are stored in minor currency units (cents). The discounted amount
/// is computed once from the pricing table when the row is created and is
/// never re-derived at checkout time; invariant: `discounted_cents <=
/// original_cents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    /// UUID, generated at creation
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Service category code (e.g. "office_visit", "lab_work")
    pub service_code: String,
    /// Human-readable name
    pub service_name: String,
    /// Date the service was rendered
    pub service_date: String,
    /// Original charge in cents
    pub original_cents: i64,
    /// Self-pay discounted charge in cents
    pub discounted_cents: i64,
    /// Why the insurer denied the claim, if they did
    pub insurance_denial_reason: Option<String>,
    /// Insurer contact phone for the denial
    pub insurance_company_phone: Option<String>,
    /// One-way flag, flipped false→true by the reconciler
    pub is_paid: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Service {
    /// Create a new unpaid service, deriving the discounted charge from the
    /// pricing table.
    pub fn new(
        patient_id: String,
        service_code: String,
        service_name: String,
        service_date: String,
        original_cents: i64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let discounted_cents = pricing::discounted_amount_cents(original_cents, &service_code);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            service_code,
            service_name,
            service_date,
            original_cents,
            discounted_cents,
            insurance_denial_reason: None,
            insurance_company_phone: None,
            is_paid: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service_derives_discount() {
        let service = Service::new(
            "patient-1".into(),
            "office_visit".into(),
            "Office Visit".into(),
            "2024-03-01".into(),
            25000,
        );
        assert_eq!(service.discounted_cents, 16250);
        assert!(!service.is_paid);
    }

    #[test]
    fn test_discount_never_exceeds_original() {
        let service = Service::new(
            "patient-1".into(),
            "unknown_code".into(),
            "Misc".into(),
            "2024-03-01".into(),
            9999,
        );
        assert!(service.discounted_cents <= service.original_cents);
    }
}
