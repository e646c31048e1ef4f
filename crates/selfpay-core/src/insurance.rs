//! Insurance update workflow.
//!
//! A patient who disputes a denial can put new insurance on file instead of
//! self-paying. A submission replaces the active card, appends a history
//! entry, and records an audit action, all in one transaction.

use thiserror::Error;
use tracing::info;

use crate::db::{self, Database, DbError};
use crate::models::{ActionKind, InsuranceCard, InsuranceUpdate, InsuranceUpdateKind, PatientAction};

/// Insurance workflow errors.
#[derive(Error, Debug)]
pub enum InsuranceError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Insurance submission has no card details or images")]
    EmptySubmission,
}

pub type InsuranceResult<T> = Result<T, InsuranceError>;

/// What a patient submitted: manual card fields, card photos, or both.
#[derive(Debug, Clone, Default)]
pub struct InsuranceSubmission {
    pub insurance_company: Option<String>,
    pub policy_number: Option<String>,
    pub group_number: Option<String>,
    pub member_name: Option<String>,
    pub member_id: Option<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub notes: Option<String>,
}

impl InsuranceSubmission {
    fn has_manual_fields(&self) -> bool {
        self.insurance_company.is_some()
            || self.policy_number.is_some()
            || self.group_number.is_some()
            || self.member_name.is_some()
            || self.member_id.is_some()
    }

    fn has_images(&self) -> bool {
        self.front_image_url.is_some() || self.back_image_url.is_some()
    }

    /// Classify the submission, or `None` when it carries nothing.
    fn kind(&self) -> Option<InsuranceUpdateKind> {
        match (self.has_manual_fields(), self.has_images()) {
            (true, true) => Some(InsuranceUpdateKind::Both),
            (true, false) => Some(InsuranceUpdateKind::ManualEntry),
            (false, true) => Some(InsuranceUpdateKind::PhotoUpload),
            (false, false) => None,
        }
    }
}

/// Apply an insurance submission for a patient.
///
/// Replaces the active card, appends to the update history, and writes an
/// audit entry atomically. Returns the newly active card.
pub fn submit_insurance_update(
    db: &mut Database,
    patient_id: &str,
    submission: InsuranceSubmission,
) -> InsuranceResult<InsuranceCard> {
    let kind = submission.kind().ok_or(InsuranceError::EmptySubmission)?;

    let mut card = InsuranceCard::new(patient_id.to_string());
    card.insurance_company = submission.insurance_company;
    card.policy_number = submission.policy_number;
    card.group_number = submission.group_number;
    card.member_name = submission.member_name;
    card.member_id = submission.member_id;
    card.front_image_url = submission.front_image_url;
    card.back_image_url = submission.back_image_url;

    let mut update = InsuranceUpdate::new(patient_id.to_string(), Some(card.id.clone()), kind);
    update.notes = submission.notes;

    let details = serde_json::json!({
        "description": "Insurance information updated",
        "insurance_card_id": card.id,
        "update_kind": kind.as_str(),
    })
    .to_string();
    let action = PatientAction::new(
        patient_id.to_string(),
        ActionKind::InsuranceUpdated,
        Some(details),
    );

    let tx = db.transaction()?;
    db::replace_insurance_card_in(&tx, &card)?;
    db::insert_insurance_update_in(&tx, &update)?;
    db::append_action_in(&tx, &action)?;
    tx.commit().map_err(DbError::from)?;

    info!(patient_id, card_id = %card.id, kind = kind.as_str(), "insurance updated");

    Ok(card)
}
