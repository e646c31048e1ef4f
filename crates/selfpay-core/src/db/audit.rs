//! Audit-trail database operations.

use rusqlite::{params, Connection, Row};

use super::{Database, DbResult};
use crate::models::PatientAction;

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<PatientAction> {
    Ok(PatientAction {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        action: row.get(2)?,
        details: row.get(3)?,
        ip_address: row.get(4)?,
        user_agent: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    /// Append an audit entry. See [`append_action_in`].
    pub fn append_action(&self, action: &PatientAction) -> DbResult<()> {
        append_action_in(&self.conn, action)
    }

    /// List audit entries for a patient, most recent first.
    pub fn list_actions_by_patient(
        &self,
        patient_id: &str,
        limit: usize,
    ) -> DbResult<Vec<PatientAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, patient_id, action, details, ip_address, user_agent, created_at \
             FROM patient_actions WHERE patient_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )?;

        let rows = stmt.query_map(params![patient_id, limit as i64], action_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Append an audit entry on a raw connection, so the reconciler can include
/// it in the same transaction as the state it describes.
pub fn append_action_in(conn: &Connection, action: &PatientAction) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO patient_actions (
            id, patient_id, action, details, ip_address, user_agent, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            action.id,
            action.patient_id,
            action.action,
            action.details,
            action.ip_address,
            action.user_agent,
            action.created_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionKind, Patient};

    #[test]
    fn test_append_and_list() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("jane@example.com".into());
        db.insert_patient(&patient).unwrap();

        for i in 0..3 {
            db.append_action(&PatientAction::new(
                patient.id.clone(),
                ActionKind::PaymentIntentCreated,
                Some(format!(r#"{{"attempt":{}}}"#, i)),
            ))
            .unwrap();
        }

        let actions = db.list_actions_by_patient(&patient.id, 10).unwrap();
        assert_eq!(actions.len(), 3);
        assert!(actions.iter().all(|a| a.action == "payment_intent_created"));

        let limited = db.list_actions_by_patient(&patient.id, 2).unwrap();
        assert_eq!(limited.len(), 2);
    }
}
