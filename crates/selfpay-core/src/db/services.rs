//! Service database operations.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Service;

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        service_code: row.get(2)?,
        service_name: row.get(3)?,
        service_date: row.get(4)?,
        original_cents: row.get(5)?,
        discounted_cents: row.get(6)?,
        insurance_denial_reason: row.get(7)?,
        insurance_company_phone: row.get(8)?,
        is_paid: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const SERVICE_COLUMNS: &str = "id, patient_id, service_code, service_name, service_date, \
     original_cents, discounted_cents, insurance_denial_reason, insurance_company_phone, \
     is_paid, created_at, updated_at";

impl Database {
    /// Insert a new service.
    pub fn insert_service(&self, service: &Service) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO services (
                id, patient_id, service_code, service_name, service_date,
                original_cents, discounted_cents, insurance_denial_reason,
                insurance_company_phone, is_paid, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                service.id,
                service.patient_id,
                service.service_code,
                service.service_name,
                service.service_date,
                service.original_cents,
                service.discounted_cents,
                service.insurance_denial_reason,
                service.insurance_company_phone,
                service.is_paid,
                service.created_at,
                service.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a service by ID.
    pub fn get_service(&self, id: &str) -> DbResult<Option<Service>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM services WHERE id = ?", SERVICE_COLUMNS),
                [id],
                service_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all services owned by a patient, most recent first.
    pub fn list_services_by_patient(&self, patient_id: &str) -> DbResult<Vec<Service>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM services WHERE patient_id = ? ORDER BY service_date DESC",
            SERVICE_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], service_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark a set of services paid. See [`mark_services_paid_in`].
    pub fn mark_services_paid(&self, service_ids: &[String]) -> DbResult<usize> {
        mark_services_paid_in(&self.conn, service_ids)
    }
}

/// Conditionally mark every listed service paid, returning the number of rows
/// actually flipped.
///
/// Takes a raw connection so it can run inside a reconciliation transaction.
/// The `is_paid = 0` predicate is the concurrency guard: a service that was
/// already paid (by a racing confirmation) counts zero rows rather than being
/// re-applied, and callers treat zero as an idempotent no-op.
pub fn mark_services_paid_in(conn: &Connection, service_ids: &[String]) -> DbResult<usize> {
    if service_ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; service_ids.len()].join(", ");
    let sql = format!(
        "UPDATE services SET is_paid = 1, updated_at = datetime('now') \
         WHERE id IN ({}) AND is_paid = 0",
        placeholders
    );
    let rows_affected = conn.execute(&sql, params_from_iter(service_ids.iter()))?;
    Ok(rows_affected)
}
