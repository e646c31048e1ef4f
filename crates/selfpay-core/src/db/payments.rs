//! Payment database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Payment, PaymentStatus};

/// Raw row shape; status and service_ids need parsing outside the rusqlite
/// closure so parse failures surface as `DbError` rather than panics.
struct PaymentRow {
    id: String,
    patient_id: String,
    processor_intent_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    service_ids: String,
    created_at: String,
    updated_at: String,
}

impl PaymentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            processor_intent_id: row.get(2)?,
            amount_cents: row.get(3)?,
            currency: row.get(4)?,
            status: row.get(5)?,
            service_ids: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_payment(self) -> DbResult<Payment> {
        let status = PaymentStatus::parse(&self.status).ok_or_else(|| {
            DbError::Constraint(format!("unknown payment status: {}", self.status))
        })?;
        let service_ids: Vec<String> = serde_json::from_str(&self.service_ids)?;
        Ok(Payment {
            id: self.id,
            patient_id: self.patient_id,
            processor_intent_id: self.processor_intent_id,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status,
            service_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, patient_id, processor_intent_id, amount_cents, currency, \
     status, service_ids, created_at, updated_at";

impl Database {
    /// Insert a new payment record. See [`insert_payment_in`].
    pub fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        insert_payment_in(&self.conn, payment)
    }

    /// Get a payment by its processor intent ID.
    pub fn get_payment_by_intent_id(&self, intent_id: &str) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM payments WHERE processor_intent_id = ?",
                    PAYMENT_COLUMNS
                ),
                [intent_id],
                PaymentRow::from_row,
            )
            .optional()?
            .map(PaymentRow::into_payment)
            .transpose()
    }

    /// List all payments for a patient, most recent first.
    pub fn list_payments_by_patient(&self, patient_id: &str) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM payments WHERE patient_id = ? ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], PaymentRow::from_row)?;
        let mut payments = Vec::new();
        for raw in rows {
            payments.push(raw?.into_payment()?);
        }
        Ok(payments)
    }

    /// Update a payment's status by processor intent ID.
    ///
    /// Returns whether a row was updated. Zero rows is not an error: the
    /// webhook channel can deliver before the client-driven confirmation has
    /// created the record.
    pub fn update_payment_status_by_intent_id(
        &self,
        intent_id: &str,
        status: PaymentStatus,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE payments SET status = ?2, updated_at = datetime('now') \
             WHERE processor_intent_id = ?1",
            params![intent_id, status.as_str()],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Insert a payment record on a raw connection, so the reconciler can run it
/// inside the same transaction as the service-paid update.
pub fn insert_payment_in(conn: &Connection, payment: &Payment) -> DbResult<()> {
    let service_ids_json = serde_json::to_string(&payment.service_ids)?;
    conn.execute(
        r#"
        INSERT INTO payments (
            id, patient_id, processor_intent_id, amount_cents, currency,
            status, service_ids, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            payment.id,
            payment.patient_id,
            payment.processor_intent_id,
            payment.amount_cents,
            payment.currency,
            payment.status.as_str(),
            service_ids_json,
            payment.created_at,
            payment.updated_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup_db_with_patient() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn make_payment(patient_id: &str, intent_id: &str) -> Payment {
        Payment::new(
            patient_id.to_string(),
            intent_id.to_string(),
            20500,
            "usd".to_string(),
            PaymentStatus::Succeeded,
            vec!["svc-1".to_string(), "svc-2".to_string()],
        )
    }

    #[test]
    fn test_insert_and_get_by_intent_id() {
        let (db, patient) = setup_db_with_patient();

        let payment = make_payment(&patient.id, "pi_abc");
        db.insert_payment(&payment).unwrap();

        let retrieved = db.get_payment_by_intent_id("pi_abc").unwrap().unwrap();
        assert_eq!(retrieved.amount_cents, 20500);
        assert_eq!(retrieved.status, PaymentStatus::Succeeded);
        assert_eq!(retrieved.service_ids, vec!["svc-1", "svc-2"]);

        assert!(db.get_payment_by_intent_id("pi_missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_intent_id_is_unique_violation() {
        let (db, patient) = setup_db_with_patient();

        db.insert_payment(&make_payment(&patient.id, "pi_dup")).unwrap();
        let err = db
            .insert_payment(&make_payment(&patient.id, "pi_dup"))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_update_status_by_intent_id() {
        let (db, patient) = setup_db_with_patient();

        let mut payment = make_payment(&patient.id, "pi_abc");
        payment.status = PaymentStatus::Pending;
        db.insert_payment(&payment).unwrap();

        assert!(db
            .update_payment_status_by_intent_id("pi_abc", PaymentStatus::Succeeded)
            .unwrap());
        let retrieved = db.get_payment_by_intent_id("pi_abc").unwrap().unwrap();
        assert_eq!(retrieved.status, PaymentStatus::Succeeded);

        // Unknown intent updates zero rows, which is fine.
        assert!(!db
            .update_payment_status_by_intent_id("pi_missing", PaymentStatus::Failed)
            .unwrap());
    }

    #[test]
    fn test_list_payments_by_patient() {
        let (db, patient) = setup_db_with_patient();

        db.insert_payment(&make_payment(&patient.id, "pi_1")).unwrap();
        db.insert_payment(&make_payment(&patient.id, "pi_2")).unwrap();

        let payments = db.list_payments_by_patient(&patient.id).unwrap();
        assert_eq!(payments.len(), 2);
    }
}
