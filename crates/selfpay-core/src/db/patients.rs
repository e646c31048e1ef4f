//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Patient;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        date_of_birth: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const PATIENT_COLUMNS: &str =
    "id, email, first_name, last_name, phone, date_of_birth, created_at, updated_at";

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, email, first_name, last_name, phone, date_of_birth,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                patient.id,
                patient.email,
                patient.first_name,
                patient.last_name,
                patient.phone,
                patient.date_of_birth,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by email.
    pub fn get_patient_by_email(&self, email: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE email = ?", PATIENT_COLUMNS),
                [email],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Update a patient's contact fields.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                email = ?2,
                first_name = ?3,
                last_name = ?4,
                phone = ?5,
                date_of_birth = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.email,
                patient.first_name,
                patient.last_name,
                patient.phone,
                patient.date_of_birth,
            ],
        )?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = Patient::new("jane@example.com".into());
        patient.first_name = Some("Jane".into());
        patient.last_name = Some("Doe".into());

        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.email, "jane@example.com");
        assert_eq!(retrieved.first_name, Some("Jane".into()));
    }

    #[test]
    fn test_get_by_email() {
        let db = setup_db();

        let patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();

        let by_email = db
            .get_patient_by_email("jane@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, patient.id);

        assert!(db.get_patient_by_email("other@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = setup_db();

        db.insert_patient(&Patient::new("jane@example.com".into()))
            .unwrap();
        let result = db.insert_patient(&Patient::new("jane@example.com".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();

        let mut patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();

        patient.phone = Some("555-0100".into());
        assert!(db.update_patient(&patient).unwrap());

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.phone, Some("555-0100".into()));
    }
}
