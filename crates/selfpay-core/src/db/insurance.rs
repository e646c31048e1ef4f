//! Insurance card and update-history database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{InsuranceCard, InsuranceUpdate, InsuranceUpdateKind};

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<InsuranceCard> {
    Ok(InsuranceCard {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        front_image_url: row.get(2)?,
        back_image_url: row.get(3)?,
        insurance_company: row.get(4)?,
        policy_number: row.get(5)?,
        group_number: row.get(6)?,
        member_name: row.get(7)?,
        member_id: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const CARD_COLUMNS: &str = "id, patient_id, front_image_url, back_image_url, insurance_company, \
     policy_number, group_number, member_name, member_id, is_active, created_at, updated_at";

impl Database {
    /// Get the patient's active insurance card, if any.
    pub fn get_active_insurance_card(&self, patient_id: &str) -> DbResult<Option<InsuranceCard>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM insurance_cards WHERE patient_id = ? AND is_active = 1 \
                     ORDER BY created_at DESC LIMIT 1",
                    CARD_COLUMNS
                ),
                [patient_id],
                card_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get an insurance card by ID.
    pub fn get_insurance_card(&self, id: &str) -> DbResult<Option<InsuranceCard>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM insurance_cards WHERE id = ?", CARD_COLUMNS),
                [id],
                card_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Update the stored card images. Only provided sides are touched.
    pub fn update_insurance_card_images(
        &self,
        card_id: &str,
        front_image_url: Option<&str>,
        back_image_url: Option<&str>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE insurance_cards SET
                front_image_url = COALESCE(?2, front_image_url),
                back_image_url = COALESCE(?3, back_image_url),
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![card_id, front_image_url, back_image_url],
        )?;
        Ok(rows_affected > 0)
    }

    /// List the insurance update history for a patient, most recent first.
    pub fn list_insurance_updates(&self, patient_id: &str) -> DbResult<Vec<InsuranceUpdate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, patient_id, insurance_card_id, update_kind, notes, created_at \
             FROM insurance_updates WHERE patient_id = ? ORDER BY created_at DESC",
        )?;

        struct UpdateRow {
            id: String,
            patient_id: String,
            insurance_card_id: Option<String>,
            kind: String,
            notes: Option<String>,
            created_at: String,
        }

        let rows = stmt.query_map([patient_id], |row| {
            Ok(UpdateRow {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                insurance_card_id: row.get(2)?,
                kind: row.get(3)?,
                notes: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut updates = Vec::new();
        for raw in rows {
            let raw = raw?;
            let kind = InsuranceUpdateKind::parse(&raw.kind).ok_or_else(|| {
                DbError::Constraint(format!("unknown insurance update kind: {}", raw.kind))
            })?;
            updates.push(InsuranceUpdate {
                id: raw.id,
                patient_id: raw.patient_id,
                insurance_card_id: raw.insurance_card_id,
                kind,
                notes: raw.notes,
                created_at: raw.created_at,
            });
        }
        Ok(updates)
    }
}

/// Deactivate any existing cards for the patient and insert the new one.
/// Raw-connection variant so the insurance workflow can bundle this with its
/// history and audit writes in one transaction.
pub fn replace_insurance_card_in(conn: &Connection, card: &InsuranceCard) -> DbResult<()> {
    conn.execute(
        "UPDATE insurance_cards SET is_active = 0, updated_at = datetime('now') \
         WHERE patient_id = ? AND is_active = 1",
        [&card.patient_id],
    )?;

    conn.execute(
        r#"
        INSERT INTO insurance_cards (
            id, patient_id, front_image_url, back_image_url, insurance_company,
            policy_number, group_number, member_name, member_id, is_active,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            card.id,
            card.patient_id,
            card.front_image_url,
            card.back_image_url,
            card.insurance_company,
            card.policy_number,
            card.group_number,
            card.member_name,
            card.member_id,
            card.is_active,
            card.created_at,
            card.updated_at,
        ],
    )?;
    Ok(())
}

/// Append an insurance update history entry on a raw connection.
pub fn insert_insurance_update_in(conn: &Connection, update: &InsuranceUpdate) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO insurance_updates (
            id, patient_id, insurance_card_id, update_kind, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            update.id,
            update.patient_id,
            update.insurance_card_id,
            update.kind.as_str(),
            update.notes,
            update.created_at,
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

    #[test]
    fn test_replace_deactivates_previous_card() {
        let (db, patient) = setup_db_with_patient();

        let mut first = InsuranceCard::new(patient.id.clone());
        first.insurance_company = Some("Acme Health".into());
        replace_insurance_card_in(db.conn(), &first).unwrap();

        let mut second = InsuranceCard::new(patient.id.clone());
        second.insurance_company = Some("Umbrella Mutual".into());
        replace_insurance_card_in(db.conn(), &second).unwrap();

        let active = db.get_active_insurance_card(&patient.id).unwrap().unwrap();
        assert_eq!(active.id, second.id);

        let old = db.get_insurance_card(&first.id).unwrap().unwrap();
        assert!(!old.is_active);
    }

    #[test]
    fn test_update_card_images_partial() {
        let (db, patient) = setup_db_with_patient();

        let card = InsuranceCard::new(patient.id.clone());
        replace_insurance_card_in(db.conn(), &card).unwrap();

        assert!(db
            .update_insurance_card_images(&card.id, Some("https://cdn/front.jpg"), None)
            .unwrap());
        let stored = db.get_insurance_card(&card.id).unwrap().unwrap();
        assert_eq!(stored.front_image_url.as_deref(), Some("https://cdn/front.jpg"));
        assert!(stored.back_image_url.is_none());

        // Back fill without clobbering the front.
        assert!(db
            .update_insurance_card_images(&card.id, None, Some("https://cdn/back.jpg"))
            .unwrap());
        let stored = db.get_insurance_card(&card.id).unwrap().unwrap();
        assert_eq!(stored.front_image_url.as_deref(), Some("https://cdn/front.jpg"));
        assert_eq!(stored.back_image_url.as_deref(), Some("https://cdn/back.jpg"));
    }

    #[test]
    fn test_insurance_update_history() {
        let (db, patient) = setup_db_with_patient();

        let card = InsuranceCard::new(patient.id.clone());
        replace_insurance_card_in(db.conn(), &card).unwrap();

        let mut update = InsuranceUpdate::new(
            patient.id.clone(),
            Some(card.id.clone()),
            InsuranceUpdateKind::ManualEntry,
        );
        update.notes = Some("New employer plan".into());
        insert_insurance_update_in(db.conn(), &update).unwrap();

        let history = db.list_insurance_updates(&patient.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, InsuranceUpdateKind::ManualEntry);
        assert_eq!(history[0].insurance_card_id, Some(card.id));
    }
}
