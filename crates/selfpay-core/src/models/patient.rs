//! Patient models.

use serde::{Deserialize, Serialize};

/// A patient account, keyed by a unique email address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// UUID, generated at creation
    pub id: String,
    /// Unique email (magic links are delivered here)
    pub email: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Date of birth
    pub date_of_birth: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with the required email.
    pub fn new(email: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            first_name: None,
            last_name: None,
            phone: None,
            date_of_birth: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Display name: "First Last" when both are present, email otherwise.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("jane@example.com".into());
        assert_eq!(patient.email, "jane@example.com");
        assert_eq!(patient.id.len(), 36); // UUID format
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut patient = Patient::new("jane@example.com".into());
        assert_eq!(patient.display_name(), "jane@example.com");

        patient.first_name = Some("Jane".into());
        assert_eq!(patient.display_name(), "jane@example.com");

        patient.last_name = Some("Doe".into());
        assert_eq!(patient.display_name(), "Jane Doe");
    }
}
