//! Patient waitlist records and their admission state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Admission status of a patient on the waiting list.
///
/// Status only moves forward through the two-step confirmation
/// (`Waiting` -> `ConfirmedOnce` -> `ConfirmedTwice`). Reschedules and
/// overflow moves reset it to `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    /// On the list, admission not yet confirmed.
    Waiting,
    /// First confirmation received.
    ConfirmedOnce,
    /// Fully confirmed; the admission date is final.
    ConfirmedTwice,
}

impl PatientStatus {
    /// True for the fully confirmed subset of a slot's membership.
    pub fn is_fully_confirmed(&self) -> bool {
        matches!(self, PatientStatus::ConfirmedTwice)
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatientStatus::Waiting => write!(f, "waiting"),
            PatientStatus::ConfirmedOnce => write!(f, "confirmed once"),
            PatientStatus::ConfirmedTwice => write!(f, "confirmed twice"),
        }
    }
}

/// One patient's entry on the admission waiting list.
///
/// `target_date` is the date the patient asked for; it becomes the final
/// admission date at the second confirmation. `slot_date` is the day whose
/// slot currently holds the patient. The two differ while the patient sits
/// in an overflow slot waiting to be rescheduled or reconfirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub national_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_date: Option<NaiveDate>,
    /// Opaque references into the disease catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnoses: Vec<String>,
    /// Opaque reference to the supervising doctor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_doctor: Option<String>,
    /// Opaque reference into the covid status catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covid_status: Option<String>,
    /// Pre-computed demographic label, supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    pub urgent: bool,
    /// True when any assigned diagnosis requires catheterization or surgery.
    pub elevated: bool,
    pub status: PatientStatus,
    pub target_date: NaiveDate,
    /// Date of the slot that currently holds this patient.
    pub slot_date: NaiveDate,
    /// 0-based position within the owning slot, rewritten on every ranking
    /// recomputation.
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Patient {
    /// Apply a partial update, skipping absent and blank fields.
    ///
    /// Returns true if the diagnosis set changed, in which case the caller
    /// must re-derive the elevated-condition flag and rerank the owning slot.
    pub fn apply(&mut self, update: &PatientUpdate) -> bool {
        if let Some(name) = given(&update.name) {
            self.name = name.to_string();
        }
        if let Some(surname) = given(&update.surname) {
            self.surname = surname.to_string();
        }
        if let Some(national_id) = given(&update.national_id) {
            self.national_id = national_id.to_string();
        }
        if let Some(phone) = given(&update.phone) {
            self.phone = Some(phone.to_string());
        }
        if let Some(email) = given(&update.email) {
            self.email = Some(email.to_string());
        }
        if let Some(main_doctor) = given(&update.main_doctor) {
            self.main_doctor = Some(main_doctor.to_string());
        }
        if let Some(covid_status) = given(&update.covid_status) {
            self.covid_status = Some(covid_status.to_string());
        }
        match &update.diagnoses {
            Some(diagnoses) if !diagnoses.is_empty() && *diagnoses != self.diagnoses => {
                self.diagnoses = diagnoses.clone();
                true
            }
            _ => false,
        }
    }
}

fn given(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Request to put a new patient on the waiting list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub name: String,
    pub surname: String,
    pub national_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnoses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covid_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    /// Requested admission day.
    pub target_date: NaiveDate,
    /// Staff reference of the creating account, when the request comes from
    /// ward staff rather than patient self-registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl AdmissionRequest {
    /// At least one contact channel must be set before admission.
    pub fn has_contact_channel(&self) -> bool {
        given(&self.phone).is_some() || given(&self.email).is_some()
    }

    /// A referral number or referral date must accompany the request.
    pub fn has_referral_info(&self) -> bool {
        given(&self.referral_number).is_some() || self.referral_date.is_some()
    }

    pub(crate) fn into_patient(
        self,
        id: String,
        created_at: DateTime<Utc>,
        elevated: bool,
    ) -> Patient {
        Patient {
            id,
            name: self.name,
            surname: self.surname,
            national_id: self.national_id,
            phone: self.phone,
            email: self.email,
            referral_number: self.referral_number,
            referral_date: self.referral_date,
            diagnoses: self.diagnoses,
            main_doctor: self.main_doctor,
            covid_status: self.covid_status,
            classification: self.classification,
            urgent: self.urgent,
            elevated,
            status: PatientStatus::Waiting,
            target_date: self.target_date,
            slot_date: self.target_date,
            rank: 0,
            created_by: self.created_by,
            created_at,
            modified_at: None,
        }
    }
}

/// Partial update of a patient record.
///
/// Absent and blank fields leave the stored value untouched. Slot
/// membership and admission status are never changed through an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnoses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covid_status: Option<String>,
}

impl PatientUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = Some(surname.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_diagnoses(mut self, diagnoses: Vec<String>) -> Self {
        self.diagnoses = Some(diagnoses);
        self
    }

    pub fn with_main_doctor(mut self, main_doctor: impl Into<String>) -> Self {
        self.main_doctor = Some(main_doctor.into());
        self
    }

    pub fn with_covid_status(mut self, covid_status: impl Into<String>) -> Self {
        self.covid_status = Some(covid_status.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn patient() -> Patient {
        AdmissionRequest {
            name: "Jan".to_string(),
            surname: "Kowalski".to_string(),
            national_id: "90010112345".to_string(),
            phone: Some("600700800".to_string()),
            email: None,
            referral_number: Some("REF-1".to_string()),
            referral_date: None,
            diagnoses: vec!["j18".to_string()],
            main_doctor: None,
            covid_status: None,
            classification: None,
            urgent: false,
            target_date: NaiveDate::from_ymd_opt(2022, 3, 17).unwrap(),
            created_by: None,
        }
        .into_patient("p-1".to_string(), Utc::now(), false)
    }

    #[test]
    fn test_status_progression_flags() {
        assert!(!PatientStatus::Waiting.is_fully_confirmed());
        assert!(!PatientStatus::ConfirmedOnce.is_fully_confirmed());
        assert!(PatientStatus::ConfirmedTwice.is_fully_confirmed());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PatientStatus::Waiting.to_string(), "waiting");
        assert_eq!(PatientStatus::ConfirmedTwice.to_string(), "confirmed twice");
    }

    #[test]
    fn test_new_patient_starts_waiting_in_target_slot() {
        let p = patient();
        assert_eq!(p.status, PatientStatus::Waiting);
        assert_eq!(p.slot_date, p.target_date);
        assert_eq!(p.rank, 0);
    }

    #[test]
    fn test_apply_skips_blank_fields() {
        let mut p = patient();
        let changed = p.apply(
            &PatientUpdate::new()
                .with_name("  ")
                .with_phone("")
                .with_email("jan@example.com"),
        );
        assert!(!changed);
        assert_eq!(p.name, "Jan");
        assert_eq!(p.phone.as_deref(), Some("600700800"));
        assert_eq!(p.email.as_deref(), Some("jan@example.com"));
    }

    #[test]
    fn test_apply_reports_diagnosis_change() {
        let mut p = patient();
        assert!(!p.apply(&PatientUpdate::new().with_diagnoses(vec!["j18".to_string()])));
        assert!(p.apply(&PatientUpdate::new().with_diagnoses(vec!["k35".to_string()])));
        assert_eq!(p.diagnoses, vec!["k35".to_string()]);
    }

    #[test]
    fn test_contact_and_referral_checks() {
        let mut request = AdmissionRequest {
            name: "Jan".to_string(),
            surname: "Kowalski".to_string(),
            national_id: "90010112345".to_string(),
            phone: None,
            email: None,
            referral_number: None,
            referral_date: None,
            diagnoses: Vec::new(),
            main_doctor: None,
            covid_status: None,
            classification: None,
            urgent: false,
            target_date: NaiveDate::from_ymd_opt(2022, 3, 17).unwrap(),
            created_by: None,
        };
        assert!(!request.has_contact_channel());
        assert!(!request.has_referral_info());

        request.email = Some("jan@example.com".to_string());
        request.referral_date = NaiveDate::from_ymd_opt(2022, 3, 1);
        assert!(request.has_contact_channel());
        assert!(request.has_referral_info());
    }

    #[test]
    fn test_patient_serialization_roundtrip() {
        let p = patient();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Patient = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }
}
