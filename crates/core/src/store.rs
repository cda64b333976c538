//! Storage traits for patients and slots.
//!
//! The core owns no persistence technology. Callers inject implementations
//! of these traits; the `testing` module ships in-memory ones.

use chrono::NaiveDate;
use thiserror::Error;

use crate::patient::Patient;
use crate::slot::Slot;

/// Error type for storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed; not a domain error, never silently retried here.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Trait for patient record storage.
pub trait PatientStore: Send + Sync {
    /// Load a patient by id.
    fn get(&self, id: &str) -> Result<Option<Patient>, StoreError>;

    /// Insert or overwrite a patient record.
    fn save(&self, patient: &Patient) -> Result<(), StoreError>;

    /// Permanently remove a patient record.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All patient records.
    fn all(&self) -> Result<Vec<Patient>, StoreError>;
}

/// Trait for admission slot storage.
pub trait SlotStore: Send + Sync {
    /// Load the slot for a date.
    fn get(&self, date: NaiveDate) -> Result<Option<Slot>, StoreError>;

    /// Insert or overwrite a slot record.
    fn save(&self, slot: &Slot) -> Result<(), StoreError>;

    /// All slot records.
    fn all(&self) -> Result<Vec<Slot>, StoreError>;

    /// Slots dated strictly before `date`.
    fn slots_before(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;

    /// Slots dated on or after `date`.
    fn slots_on_or_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;

    /// Unlocked slots dated strictly after `date`.
    fn unlocked_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;

    /// Locked slots dated strictly after `date`.
    fn locked_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;
}
