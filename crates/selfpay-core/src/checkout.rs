//! Selection and integrity validation for self-pay checkout.
//!
//! The client proposes a set of service IDs and a total it expects to pay;
//! the server re-derives the truth from the patient's owned services. The
//! resolved quote, never the client's claim, is what gets charged.

use thiserror::Error;
use tracing::debug;

use crate::db::{Database, DbError};
use crate::models::Service;
use crate::pricing::AMOUNT_TOLERANCE_CENTS;

/// Checkout validation errors.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No payable services in selection")]
    EmptySelection,

    #[error("Claimed total {claimed_cents} does not match expected {expected_cents}")]
    AmountMismatch {
        expected_cents: i64,
        claimed_cents: i64,
    },
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// A server-computed quote: the resolved service set and its authoritative
/// discounted total.
#[derive(Debug, Clone)]
pub struct Quote {
    /// Services the quote covers, all owned by the patient and unpaid at
    /// resolution time.
    pub services: Vec<Service>,
    /// Sum of the stored discounted charges, in cents.
    pub expected_total_cents: i64,
}

impl Quote {
    /// IDs of the resolved services.
    pub fn service_ids(&self) -> Vec<String> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }
}

/// Checkout validator.
pub struct Checkout<'a> {
    db: &'a Database,
}

impl<'a> Checkout<'a> {
    /// Create a new checkout validator.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Resolve a requested selection against the patient's owned services.
    ///
    /// The requested IDs are intersected with the services the patient
    /// actually owns (a client-supplied service-to-patient mapping is never
    /// trusted), and already-paid services are dropped silently. An empty
    /// resolved set is a rejection.
    ///
    /// The expected total sums the stored discounted charges; those were
    /// computed by the pricing table when the services were entered and are
    /// not re-derived here.
    pub fn resolve_selection(
        &self,
        patient_id: &str,
        requested_ids: &[String],
    ) -> CheckoutResult<Quote> {
        if requested_ids.is_empty() {
            return Err(CheckoutError::Validation(
                "service ID list is empty".to_string(),
            ));
        }

        let owned = self.db.list_services_by_patient(patient_id)?;
        let services: Vec<Service> = owned
            .into_iter()
            .filter(|s| requested_ids.contains(&s.id) && !s.is_paid)
            .collect();

        if services.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let expected_total_cents = services.iter().map(|s| s.discounted_cents).sum();

        debug!(
            patient_id,
            requested = requested_ids.len(),
            resolved = services.len(),
            expected_total_cents,
            "resolved checkout selection"
        );

        Ok(Quote {
            services,
            expected_total_cents,
        })
    }

    /// Check a client-claimed total against the quote, allowing
    /// [`AMOUNT_TOLERANCE_CENTS`] of rounding drift.
    pub fn verify_claimed_total(&self, quote: &Quote, claimed_cents: i64) -> CheckoutResult<()> {
        if (quote.expected_total_cents - claimed_cents).abs() > AMOUNT_TOLERANCE_CENTS {
            return Err(CheckoutError::AmountMismatch {
                expected_cents: quote.expected_total_cents,
                claimed_cents,
            });
        }
        Ok(())
    }

    /// Resolve and verify in one step: the full compute-discounted-total
    /// contract used before creating a charge intent.
    pub fn quote_for_payment(
        &self,
        patient_id: &str,
        requested_ids: &[String],
        claimed_cents: i64,
    ) -> CheckoutResult<Quote> {
        let quote = self.resolve_selection(patient_id, requested_ids)?;
        self.verify_claimed_total(&quote, claimed_cents)?;
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn add_service(db: &Database, patient_id: &str, code: &str, original_cents: i64) -> Service {
        let service = Service::new(
            patient_id.to_string(),
            code.to_string(),
            format!("{} service", code),
            "2024-03-01".to_string(),
            original_cents,
        );
        db.insert_service(&service).unwrap();
        service
    }

    #[test]
    fn test_empty_request_rejected() {
        let (db, patient) = setup();
        let checkout = Checkout::new(&db);

        assert!(matches!(
            checkout.resolve_selection(&patient.id, &[]),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_unowned_service_filtered_out() {
        let (db, patient) = setup();
        let other = Patient::new("other@example.com".into());
        db.insert_patient(&other).unwrap();

        let mine = add_service(&db, &patient.id, "office_visit", 25000);
        let theirs = add_service(&db, &other.id, "lab_work", 8500);

        let checkout = Checkout::new(&db);
        let quote = checkout
            .resolve_selection(&patient.id, &[mine.id.clone(), theirs.id.clone()])
            .unwrap();

        assert_eq!(quote.service_ids(), vec![mine.id]);
        assert_eq!(quote.expected_total_cents, 16250);

        // A selection of exclusively foreign services resolves empty.
        assert!(matches!(
            checkout.resolve_selection(&patient.id, &[theirs.id]),
            Err(CheckoutError::EmptySelection)
        ));
    }

    #[test]
    fn test_paid_service_silently_excluded() {
        let (db, patient) = setup();

        // A: $100 → $65 unpaid; B: paid.
        let a = add_service(&db, &patient.id, "office_visit", 10000);
        let b = add_service(&db, &patient.id, "lab_work", 8500);
        db.mark_services_paid(std::slice::from_ref(&b.id)).unwrap();

        let checkout = Checkout::new(&db);
        let quote = checkout
            .resolve_selection(&patient.id, &[a.id.clone(), b.id])
            .unwrap();

        assert_eq!(quote.service_ids(), vec![a.id]);
        assert_eq!(quote.expected_total_cents, 6500);
    }

    #[test]
    fn test_amount_tolerance() {
        let (db, patient) = setup();
        let a = add_service(&db, &patient.id, "office_visit", 25000);
        let b = add_service(&db, &patient.id, "lab_work", 8500);

        let checkout = Checkout::new(&db);
        let ids = vec![a.id, b.id];

        // $162.50 + $42.50 = $205.00
        let quote = checkout.resolve_selection(&patient.id, &ids).unwrap();
        assert_eq!(quote.expected_total_cents, 20500);

        assert!(checkout.verify_claimed_total(&quote, 20500).is_ok());
        assert!(checkout.verify_claimed_total(&quote, 20501).is_ok());
        assert!(checkout.verify_claimed_total(&quote, 20499).is_ok());

        assert!(matches!(
            checkout.verify_claimed_total(&quote, 20000),
            Err(CheckoutError::AmountMismatch {
                expected_cents: 20500,
                claimed_cents: 20000,
            })
        ));
        assert!(matches!(
            checkout.verify_claimed_total(&quote, 20502),
            Err(CheckoutError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_quote_for_payment() {
        let (db, patient) = setup();
        let a = add_service(&db, &patient.id, "consultation", 10000);

        let checkout = Checkout::new(&db);
        let quote = checkout
            .quote_for_payment(&patient.id, std::slice::from_ref(&a.id), 6000)
            .unwrap();
        assert_eq!(quote.expected_total_cents, 6000);

        assert!(matches!(
            checkout.quote_for_payment(&patient.id, &[a.id], 5000),
            Err(CheckoutError::AmountMismatch { .. })
        ));
    }
}
