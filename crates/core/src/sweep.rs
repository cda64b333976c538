//! Nightly rollover of patients stranded on elapsed admission days.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::AdmissionError;
use crate::patient::Patient;
use crate::scheduler::SlotScheduler;
use crate::store::SlotStore;

/// Summary of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepOutcome {
    /// Patients moved to the overflow slot.
    pub moved: usize,
    /// Where the batch landed, if anything moved.
    pub destination: Option<NaiveDate>,
    /// Source slots closed for good.
    pub closed: Vec<NaiveDate>,
}

/// Recurring batch job, triggered once a day by an external scheduler.
///
/// Patients who never reached full confirmation before their slot's day
/// passed are collected across all elapsed slots and moved, as one batch,
/// to the next open slot. Drained source slots are locked permanently.
/// Runs must not overlap; the trigger cadence guarantees that.
pub struct RolloverSweep {
    scheduler: Arc<SlotScheduler>,
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
}

impl RolloverSweep {
    pub fn new(
        scheduler: Arc<SlotScheduler>,
        slots: Arc<dyn SlotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            slots,
            clock,
        }
    }

    /// Drain every waiting member of past-dated slots into a single
    /// overflow slot. A run with nothing to drain is a no-op, so repeated
    /// invocations are safe.
    pub fn run(&self) -> Result<SweepOutcome, AdmissionError> {
        let today = self.clock.today();
        let past = self.slots.slots_before(today)?;

        let mut stranded: Vec<Patient> = Vec::new();
        let mut sources: Vec<NaiveDate> = Vec::new();
        for slot in &past {
            let mut waiting: Vec<Patient> = self
                .scheduler
                .members(slot)?
                .into_iter()
                .filter(|p| !p.status.is_fully_confirmed())
                .collect();
            if !waiting.is_empty() {
                sources.push(slot.date);
                stranded.append(&mut waiting);
            }
        }
        if stranded.is_empty() {
            debug!("rollover sweep found no stranded patients");
            return Ok(SweepOutcome::default());
        }

        // Detach the stranded patients and close their slots for good.
        for date in &sources {
            let _guard = self.scheduler.guard(*date);
            let mut slot = self
                .slots
                .get(*date)?
                .ok_or(AdmissionError::SlotNotFound(*date))?;
            for patient in stranded.iter().filter(|p| p.slot_date == *date) {
                slot.remove(&patient.id);
            }
            slot.locked = true;
            self.scheduler.refresh_ranking(&mut slot)?;
            self.slots.save(&slot)?;
        }

        // One destination for the whole batch, ranked once.
        let destination = self.scheduler.route_waiting(&mut stranded, today)?;

        info!(
            "rollover sweep moved {} patient(s) to {}, closed {} slot(s)",
            stranded.len(),
            destination,
            sources.len()
        );
        Ok(SweepOutcome {
            moved: stranded.len(),
            destination: Some(destination),
            closed: sources,
        })
    }
}
