//! Patient dashboard aggregation.

use serde::Serialize;

use crate::db::{Database, DbError, DbResult};
use crate::models::{InsuranceCard, Patient, Service};

/// Everything the portal shows a signed-in patient.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub patient: Patient,
    /// All services, most recent first.
    pub services: Vec<Service>,
    /// Active insurance card, if one is on file.
    pub insurance_card: Option<InsuranceCard>,
    /// Sum of unpaid discounted charges, in cents.
    pub outstanding_cents: i64,
}

/// Load the dashboard for a patient.
pub fn load_dashboard(db: &Database, patient_id: &str) -> DbResult<Dashboard> {
    let patient = db
        .get_patient(patient_id)?
        .ok_or_else(|| DbError::NotFound(format!("patient {}", patient_id)))?;
    let services = db.list_services_by_patient(patient_id)?;
    let insurance_card = db.get_active_insurance_card(patient_id)?;

    let outstanding_cents = services
        .iter()
        .filter(|s| !s.is_paid)
        .map(|s| s.discounted_cents)
        .sum();

    Ok(Dashboard {
        patient,
        services,
        insurance_card,
        outstanding_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outstanding_counts_only_unpaid() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();

        let a = Service::new(
            patient.id.clone(),
            "office_visit".into(),
            "Office Visit".into(),
            "2024-03-01".into(),
            25000,
        );
        let b = Service::new(
            patient.id.clone(),
            "lab_work".into(),
            "Blood Panel".into(),
            "2024-03-02".into(),
            8500,
        );
        db.insert_service(&a).unwrap();
        db.insert_service(&b).unwrap();
        db.mark_services_paid(std::slice::from_ref(&b.id)).unwrap();

        let dashboard = load_dashboard(&db, &patient.id).unwrap();
        assert_eq!(dashboard.services.len(), 2);
        assert_eq!(dashboard.outstanding_cents, 16250);
        assert!(dashboard.insurance_card.is_none());
    }

    #[test]
    fn test_unknown_patient() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            load_dashboard(&db, "no-such-patient"),
            Err(DbError::NotFound(_))
        ));
    }
}
