//! Insurance card and update-history models.

use serde::{Deserialize, Serialize};

/// How an insurance card was updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceUpdateKind {
    PhotoUpload,
    ManualEntry,
    Both,
}

impl InsuranceUpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceUpdateKind::PhotoUpload => "photo_upload",
            InsuranceUpdateKind::ManualEntry => "manual_entry",
            InsuranceUpdateKind::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo_upload" => Some(InsuranceUpdateKind::PhotoUpload),
            "manual_entry" => Some(InsuranceUpdateKind::ManualEntry),
            "both" => Some(InsuranceUpdateKind::Both),
            _ => None,
        }
    }
}

/// A patient's insurance card on file. At most one card per patient is active;
/// registering a new card deactivates the previous ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceCard {
    /// UUID, generated at creation
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Stored image of the card front, if uploaded
    pub front_image_url: Option<String>,
    /// Stored image of the card back, if uploaded
    pub back_image_url: Option<String>,
    /// Insurance company name
    pub insurance_company: Option<String>,
    /// Policy number
    pub policy_number: Option<String>,
    /// Group number
    pub group_number: Option<String>,
    /// Member name as printed on the card
    pub member_name: Option<String>,
    /// Member identifier
    pub member_id: Option<String>,
    /// Whether this is the patient's current card
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl InsuranceCard {
    /// Create a new active card for a patient.
    pub fn new(patient_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            front_image_url: None,
            back_image_url: None,
            insurance_company: None,
            policy_number: None,
            group_number: None,
            member_name: None,
            member_id: None,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One entry in the insurance update history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceUpdate {
    /// UUID, generated at creation
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Card the update produced, if any
    pub insurance_card_id: Option<String>,
    /// How the update was made
    pub kind: InsuranceUpdateKind,
    /// Free-form notes from the patient
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl InsuranceUpdate {
    pub fn new(patient_id: String, insurance_card_id: Option<String>, kind: InsuranceUpdateKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            insurance_card_id,
            kind,
            notes: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_kind_round_trip() {
        for kind in [
            InsuranceUpdateKind::PhotoUpload,
            InsuranceUpdateKind::ManualEntry,
            InsuranceUpdateKind::Both,
        ] {
            assert_eq!(InsuranceUpdateKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(InsuranceUpdateKind::parse("fax"), None);
    }

    #[test]
    fn test_new_card_is_active() {
        let card = InsuranceCard::new("patient-1".into());
        assert!(card.is_active);
        assert!(card.policy_number.is_none());
    }
}
