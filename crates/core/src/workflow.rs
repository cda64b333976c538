//! Patient-facing admission operations.
//!
//! Every operation validates fully, then mutates slot membership inside the
//! implicated critical sections and finishes with a ranking recomputation,
//! so callers always observe contiguous ranks and a lock flag that matches
//! the confirmed membership.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::clock::Clock;
use crate::config::WardConfig;
use crate::diagnosis::DiagnosisLookup;
use crate::error::AdmissionError;
use crate::patient::{AdmissionRequest, Patient, PatientStatus, PatientUpdate};
use crate::scheduler::{is_weekend_or_friday, SlotScheduler};
use crate::slot::{split_by_status, Slot};
use crate::store::{PatientStore, SlotStore};

/// A slot together with its members, split into the waiting and confirmed
/// subsets in rank order.
#[derive(Debug, Clone, Serialize)]
pub struct SlotOverview {
    pub date: NaiveDate,
    pub locked: bool,
    pub waiting: Vec<Patient>,
    pub confirmed: Vec<Patient>,
}

/// How a second confirmation will proceed, planned from an optimistic read
/// and re-checked under the acquired critical sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmPlan {
    /// Join the confirmed subset of an unlocked slot.
    Direct,
    /// Join an unlocked slot whose lock will trip, draining the waiting
    /// members to the given overflow date.
    DirectWithDrain(NaiveDate),
    /// Displace the lowest-priority confirmed member of a locked slot,
    /// routing the evicted patient to the given overflow date.
    Displace(NaiveDate),
}

/// Entry point for all patient-driven admission operations.
pub struct AdmissionWorkflow {
    scheduler: Arc<SlotScheduler>,
    patients: Arc<dyn PatientStore>,
    slots: Arc<dyn SlotStore>,
    lookup: Arc<dyn DiagnosisLookup>,
    access: Arc<dyn AccessPolicy>,
    clock: Arc<dyn Clock>,
    config: WardConfig,
}

impl AdmissionWorkflow {
    pub fn new(
        scheduler: Arc<SlotScheduler>,
        patients: Arc<dyn PatientStore>,
        slots: Arc<dyn SlotStore>,
        lookup: Arc<dyn DiagnosisLookup>,
        access: Arc<dyn AccessPolicy>,
        clock: Arc<dyn Clock>,
        config: WardConfig,
    ) -> Self {
        Self {
            scheduler,
            patients,
            slots,
            lookup,
            access,
            clock,
            config,
        }
    }

    // ======================================================================
    // Patient operations
    // ======================================================================

    /// Put a new patient on the waiting list for their requested day.
    ///
    /// The target date must be a Monday through Thursday at least the
    /// configured notice period away. Urgent requests need an authorized
    /// creator and may join a full or locked slot; everyone else needs the
    /// slot to accept.
    pub fn create(&self, request: AdmissionRequest) -> Result<Patient, AdmissionError> {
        let target = request.target_date;
        if is_weekend_or_friday(target) {
            return Err(AdmissionError::InvalidDate(target));
        }
        if (target - self.clock.today()).num_days() < self.config.min_notice_days {
            return Err(AdmissionError::InvalidDate(target));
        }
        if !request.has_contact_channel() {
            return Err(AdmissionError::ContactInfoRequired);
        }
        if !request.has_referral_info() {
            return Err(AdmissionError::ReferralInfoRequired);
        }
        if request.urgent {
            let authorized = request
                .created_by
                .as_deref()
                .is_some_and(|staff| self.access.can_create_urgent(staff));
            if !authorized {
                return Err(AdmissionError::UrgentNotPermitted);
            }
        } else if !self.scheduler.can_accept(target)? {
            return Err(AdmissionError::SlotUnavailable(target));
        }

        let elevated = self.lookup.is_elevated(&request.diagnoses)?;
        let mut patient =
            request.into_patient(Uuid::new_v4().to_string(), self.clock.now(), elevated);
        let id = patient.id.clone();

        {
            let _guard = self.scheduler.guard(target);
            self.scheduler
                .place_into(target, std::slice::from_mut(&mut patient))?;
        }

        let patient = self.require_patient(&id)?;
        info!("registered patient {} for admission on {}", id, target);
        Ok(patient)
    }

    /// Advance a patient through the two-step confirmation.
    ///
    /// The first confirmation is unconditional. The second finalizes the
    /// admission date; on a locked slot it requires urgency and displaces
    /// the lowest-priority confirmed member. Confirming a fully confirmed
    /// patient again is an error.
    pub fn confirm(&self, id: &str) -> Result<Patient, AdmissionError> {
        let mut patient = self.require_patient(id)?;
        match patient.status {
            PatientStatus::Waiting => {
                patient.status = PatientStatus::ConfirmedOnce;
                patient.modified_at = Some(self.clock.now());
                self.patients.save(&patient)?;
                debug!("patient {} confirmed once", id);
                Ok(patient)
            }
            PatientStatus::ConfirmedOnce => self.confirm_second(patient),
            PatientStatus::ConfirmedTwice => Err(AdmissionError::AlreadyConfirmed(id.to_string())),
        }
    }

    /// Move a patient to a new admission day, resetting the confirmation.
    pub fn reschedule(&self, id: &str, new_date: NaiveDate) -> Result<Patient, AdmissionError> {
        if is_weekend_or_friday(new_date) {
            return Err(AdmissionError::InvalidDate(new_date));
        }
        let mut patient = self.require_patient(id)?;
        if patient.status.is_fully_confirmed() && patient.target_date < self.clock.today() {
            return Err(AdmissionError::AlreadyAdmitted(id.to_string()));
        }
        if !patient.urgent && !self.scheduler.can_accept(new_date)? {
            return Err(AdmissionError::SlotUnavailable(new_date));
        }

        let old_date = patient.slot_date;
        let _guard = self.scheduler.guard_all(vec![old_date, new_date]);

        let mut old_slot = self.load_slot(old_date)?;
        old_slot.remove(&patient.id);
        patient.target_date = new_date;
        patient.modified_at = Some(self.clock.now());
        self.patients.save(&patient)?;
        self.scheduler.refresh_ranking(&mut old_slot)?;
        // Freed capacity may unlock the old slot; saving happens there.
        self.scheduler.reevaluate_lock(&mut old_slot)?;

        self.scheduler
            .place_into(new_date, std::slice::from_mut(&mut patient))?;

        let patient = self.require_patient(id)?;
        info!("rescheduled patient {} from {} to {}", id, old_date, new_date);
        Ok(patient)
    }

    /// Flip the urgency flag and rerank the owning slot.
    pub fn set_urgency(&self, id: &str, urgent: bool) -> Result<Patient, AdmissionError> {
        let mut patient = self.require_patient(id)?;
        if patient.status.is_fully_confirmed() && patient.target_date < self.clock.today() {
            return Err(AdmissionError::AlreadyAdmitted(id.to_string()));
        }
        patient.urgent = urgent;
        patient.modified_at = Some(self.clock.now());

        let _guard = self.scheduler.guard(patient.slot_date);
        self.patients.save(&patient)?;
        let mut slot = self.load_slot(patient.slot_date)?;
        self.scheduler.refresh_ranking(&mut slot)?;
        self.slots.save(&slot)?;

        self.require_patient(id)
    }

    /// Apply a partial record update. A changed diagnosis set re-derives
    /// the elevated-condition flag and reranks the owning slot; nothing
    /// else touches slot membership or status.
    pub fn update(&self, id: &str, update: &PatientUpdate) -> Result<Patient, AdmissionError> {
        let mut patient = self.require_patient(id)?;
        let diagnoses_changed = patient.apply(update);
        patient.modified_at = Some(self.clock.now());

        if diagnoses_changed {
            patient.elevated = self.lookup.is_elevated(&patient.diagnoses)?;
            let _guard = self.scheduler.guard(patient.slot_date);
            self.patients.save(&patient)?;
            let mut slot = self.load_slot(patient.slot_date)?;
            self.scheduler.refresh_ranking(&mut slot)?;
            self.slots.save(&slot)?;
            return self.require_patient(id);
        }

        self.patients.save(&patient)?;
        Ok(patient)
    }

    /// Remove a patient from the list entirely. Fully confirmed patients
    /// cannot be deleted.
    pub fn delete(&self, id: &str) -> Result<(), AdmissionError> {
        let patient = self.require_patient(id)?;
        if patient.status.is_fully_confirmed() {
            return Err(AdmissionError::AlreadyConfirmed(id.to_string()));
        }

        {
            let _guard = self.scheduler.guard(patient.slot_date);
            let mut slot = self.load_slot(patient.slot_date)?;
            slot.remove(id);
            self.scheduler.refresh_ranking(&mut slot)?;
            self.slots.save(&slot)?;
        }

        self.patients.delete(id)?;
        info!("deleted waitlist entry for patient {}", id);
        Ok(())
    }

    // ======================================================================
    // Read queries
    // ======================================================================

    /// The slot for `date`.
    pub fn slot_for(&self, date: NaiveDate) -> Result<Slot, AdmissionError> {
        self.load_slot(date)
    }

    /// The slot for `date` together with its members in rank order.
    pub fn slot_overview(&self, date: NaiveDate) -> Result<SlotOverview, AdmissionError> {
        let slot = self.load_slot(date)?;
        let members = self.scheduler.members(&slot)?;
        let (waiting, confirmed) = split_by_status(members);
        Ok(SlotOverview {
            date: slot.date,
            locked: slot.locked,
            waiting,
            confirmed,
        })
    }

    /// All slots dated from yesterday onward, ascending.
    pub fn active_slots(&self) -> Result<Vec<Slot>, AdmissionError> {
        let from = self.clock.today() - Duration::days(1);
        let mut slots = self.slots.slots_on_or_after(from)?;
        slots.sort_by_key(|slot| slot.date);
        Ok(slots)
    }

    /// Dates whose slot membership has reached capacity.
    pub fn full_dates(&self) -> Result<Vec<NaiveDate>, AdmissionError> {
        let mut dates: Vec<NaiveDate> = self
            .slots
            .all()?
            .into_iter()
            .filter(|slot| slot.len() >= self.config.capacity)
            .map(|slot| slot.date)
            .collect();
        dates.sort();
        Ok(dates)
    }

    /// A single patient record.
    pub fn patient(&self, id: &str) -> Result<Patient, AdmissionError> {
        self.require_patient(id)
    }

    /// All patient records.
    pub fn patients(&self) -> Result<Vec<Patient>, AdmissionError> {
        Ok(self.patients.all()?)
    }

    // ======================================================================
    // Internals
    // ======================================================================

    fn confirm_second(&self, mut patient: Patient) -> Result<Patient, AdmissionError> {
        let origin = patient.slot_date;
        loop {
            let slot = self.load_slot(origin)?;
            let plan = self.plan_confirmation(&patient, &slot)?;
            let guard_dates = match plan {
                ConfirmPlan::Direct => vec![origin],
                ConfirmPlan::DirectWithDrain(dest) | ConfirmPlan::Displace(dest) => {
                    vec![origin, dest]
                }
            };
            let _guard = self.scheduler.guard_all(guard_dates);

            // The slot may have moved between planning and locking.
            let mut slot = self.load_slot(origin)?;
            if self.plan_confirmation(&patient, &slot)? != plan {
                continue;
            }
            if let ConfirmPlan::DirectWithDrain(dest) | ConfirmPlan::Displace(dest) = plan {
                if !self.scheduler.destination_open(dest)? {
                    continue;
                }
            }

            // The slot date becomes the final admission date.
            patient.target_date = origin;
            patient.modified_at = Some(self.clock.now());

            match plan {
                ConfirmPlan::Displace(dest) => {
                    self.scheduler.displace(&mut patient, &mut slot, dest)?;
                    self.scheduler.reevaluate_lock(&mut slot)?;
                }
                ConfirmPlan::Direct | ConfirmPlan::DirectWithDrain(_) => {
                    patient.status = PatientStatus::ConfirmedTwice;
                    self.patients.save(&patient)?;
                    self.scheduler.refresh_ranking(&mut slot)?;
                    let mut drained = self.scheduler.reevaluate_lock(&mut slot)?;
                    if let ConfirmPlan::DirectWithDrain(dest) = plan {
                        self.scheduler.place_into(dest, &mut drained)?;
                    }
                }
            }

            let confirmed = self.require_patient(&patient.id)?;
            info!(
                "patient {} fully confirmed for admission on {}",
                confirmed.id, origin
            );
            return Ok(confirmed);
        }
    }

    /// Decide how a second confirmation proceeds for the current slot
    /// state. Read-only.
    fn plan_confirmation(
        &self,
        patient: &Patient,
        slot: &Slot,
    ) -> Result<ConfirmPlan, AdmissionError> {
        if slot.locked {
            if !patient.urgent {
                return Err(AdmissionError::SlotLocked(slot.date));
            }
            return Ok(ConfirmPlan::Displace(
                self.scheduler.probe_destination(slot.date)?,
            ));
        }

        let members = self.scheduler.members(slot)?;
        let confirmed = members
            .iter()
            .filter(|p| p.status.is_fully_confirmed())
            .count();
        let waiting_others = members
            .iter()
            .filter(|p| !p.status.is_fully_confirmed() && p.id != patient.id)
            .count();
        if confirmed + 1 >= self.config.capacity && waiting_others > 0 {
            return Ok(ConfirmPlan::DirectWithDrain(
                self.scheduler.probe_destination(slot.date)?,
            ));
        }
        Ok(ConfirmPlan::Direct)
    }

    fn require_patient(&self, id: &str) -> Result<Patient, AdmissionError> {
        self.patients
            .get(id)?
            .ok_or_else(|| AdmissionError::PatientNotFound(id.to_string()))
    }

    fn load_slot(&self, date: NaiveDate) -> Result<Slot, AdmissionError> {
        self.slots
            .get(date)?
            .ok_or(AdmissionError::SlotNotFound(date))
    }
}
