//! Magic-link database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::MagicLink;

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<MagicLink> {
    Ok(MagicLink {
        id: row.get(0)?,
        token: row.get(1)?,
        patient_id: row.get(2)?,
        expires_at: row.get(3)?,
        used: row.get(4)?,
        used_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const LINK_COLUMNS: &str = "id, token, patient_id, expires_at, used, used_at, created_at";

impl Database {
    /// Store a newly issued magic link.
    pub fn insert_magic_link(&self, link: &MagicLink) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO magic_links (
                id, token, patient_id, expires_at, used, used_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                link.id,
                link.token,
                link.patient_id,
                link.expires_at,
                link.used,
                link.used_at,
                link.created_at,
            ],
        )?;
        Ok(())
    }

    /// Look up a magic link by token.
    pub fn get_magic_link_by_token(&self, token: &str) -> DbResult<Option<MagicLink>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM magic_links WHERE token = ?", LINK_COLUMNS),
                [token],
                link_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Redeem a magic link: if the token exists, is unused, and is unexpired
    /// at `now`, flip it to used and return it. Returns `None` otherwise.
    ///
    /// The `used = 0` predicate on the update makes redemption one-time even
    /// under concurrent attempts: only one caller sees a row flip.
    pub fn redeem_magic_link(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<MagicLink>> {
        let link = match self.get_magic_link_by_token(token)? {
            Some(link) => link,
            None => return Ok(None),
        };

        if !link.is_redeemable(now) {
            return Ok(None);
        }

        let rows_affected = self.conn.execute(
            "UPDATE magic_links SET used = 1, used_at = ?2 WHERE token = ?1 AND used = 0",
            params![token, now.to_rfc3339()],
        )?;
        if rows_affected == 0 {
            // Lost the race to another redemption.
            return Ok(None);
        }

        self.get_magic_link_by_token(token)
    }
}
