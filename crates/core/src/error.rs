//! Domain errors shared by the scheduler, workflow, and sweep.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by admission operations.
///
/// Every operation validates fully before mutating state; a domain error
/// always leaves slots and patients as they were.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Date fails the weekday or notice rule for the operation.
    #[error("{0} is not an eligible admission date")]
    InvalidDate(NaiveDate),

    /// Target slot is locked or at capacity and the patient has no urgent
    /// bypass.
    #[error("admission slot for {0} is locked or full")]
    SlotUnavailable(NaiveDate),

    /// Confirmation blocked: the slot is locked and the patient is not
    /// urgent.
    #[error("admission slot for {0} is locked")]
    SlotLocked(NaiveDate),

    /// Confirm or delete attempted on a fully confirmed patient.
    #[error("patient {0} has already confirmed the admission")]
    AlreadyConfirmed(String),

    /// Reschedule or urgency change attempted after the admission day
    /// passed.
    #[error("patient {0} has already been admitted")]
    AlreadyAdmitted(String),

    /// Referenced patient does not exist.
    #[error("patient not found: {0}")]
    PatientNotFound(String),

    /// No slot exists for the referenced date.
    #[error("no admission slot for {0}")]
    SlotNotFound(NaiveDate),

    /// Creation requires a phone number or an email address.
    #[error("a phone number or email address is required")]
    ContactInfoRequired,

    /// Creation requires a referral number or a referral date.
    #[error("a referral number or referral date is required")]
    ReferralInfoRequired,

    /// Urgent admissions may only be registered by authorized staff.
    #[error("urgent admissions require an authorized creator")]
    UrgentNotPermitted,

    /// Storage failure, propagated untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}
