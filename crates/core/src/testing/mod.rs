//! Testing utilities and mock implementations of the injected traits.
//!
//! Every external collaborator of the core has an in-memory double here,
//! so the full admission lifecycle can be exercised without real
//! infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use admissions_core::testing::{FixedClock, MockPatientStore, MockSlotStore};
//!
//! let patients = MockPatientStore::new();
//! let slots = MockSlotStore::new();
//! let clock = FixedClock::on(monday);
//!
//! // Wire into SlotScheduler / AdmissionWorkflow...
//! ```

mod mock_directory;
mod mock_store;

pub use mock_directory::{MockAccessPolicy, MockDiagnosisLookup};
pub use mock_store::{MockPatientStore, MockSlotStore};

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::clock::Clock;

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Pin the clock to noon UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            now: Mutex::new(noon(date)),
        }
    }

    /// Jump to noon UTC on another date.
    pub fn set_today(&self, date: NaiveDate) {
        *self.now.lock().unwrap() = noon(date);
    }

    /// Move the calendar forward.
    pub fn advance_days(&self, days: i64) {
        *self.now.lock().unwrap() += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn noon(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    date.and_time(time).and_utc()
}

/// Test fixtures and helper builders.
pub mod fixtures {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::patient::{AdmissionRequest, Patient, PatientStatus};

    /// A minimally valid admission request targeting `target`.
    pub fn admission_request(name: &str, target: NaiveDate) -> AdmissionRequest {
        AdmissionRequest {
            name: name.to_string(),
            surname: "Testowy".to_string(),
            national_id: "90010112345".to_string(),
            phone: Some("600700800".to_string()),
            email: None,
            referral_number: Some(format!("REF-{name}")),
            referral_date: None,
            diagnoses: Vec::new(),
            main_doctor: None,
            covid_status: Some("vaccinated".to_string()),
            classification: None,
            urgent: false,
            target_date: target,
            created_by: None,
        }
    }

    /// An urgent request registered by `staff`.
    pub fn urgent_request(name: &str, target: NaiveDate, staff: &str) -> AdmissionRequest {
        let mut request = admission_request(name, target);
        request.urgent = true;
        request.created_by = Some(staff.to_string());
        request
    }

    /// A bare waiting patient record for unit tests.
    pub fn patient(id: &str, target: NaiveDate) -> Patient {
        Patient {
            id: id.to_string(),
            name: id.to_string(),
            surname: "Testowy".to_string(),
            national_id: "90010112345".to_string(),
            phone: Some("600700800".to_string()),
            email: None,
            referral_number: None,
            referral_date: None,
            diagnoses: Vec::new(),
            main_doctor: None,
            covid_status: None,
            classification: None,
            urgent: false,
            elevated: false,
            status: PatientStatus::Waiting,
            target_date: target,
            slot_date: target,
            rank: 0,
            created_by: None,
            created_at: Utc.with_ymd_and_hms(2022, 1, 10, 9, 0, 0).unwrap(),
            modified_at: None,
        }
    }
}
