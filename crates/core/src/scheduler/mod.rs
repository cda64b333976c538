//! Slot lifecycle: on-demand creation, capacity and lock state, urgent
//! displacement, and overflow routing to the next usable admission day.

mod dates;
mod locks;

pub(crate) use dates::{is_weekend, is_weekend_or_friday, skip_weekend};
pub use locks::{SlotGuard, SlotLocks};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::WardConfig;
use crate::error::AdmissionError;
use crate::patient::{Patient, PatientStatus};
use crate::ranking;
use crate::slot::Slot;
use crate::store::{PatientStore, SlotStore, StoreError};

/// Manages admission slots: creates them on demand, keeps the capacity
/// lock in step with the confirmed membership, and moves patients between
/// slots when a day fills up.
pub struct SlotScheduler {
    slots: Arc<dyn SlotStore>,
    patients: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
    config: WardConfig,
    locks: SlotLocks,
}

impl SlotScheduler {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        patients: Arc<dyn PatientStore>,
        clock: Arc<dyn Clock>,
        config: WardConfig,
    ) -> Self {
        Self {
            slots,
            patients,
            clock,
            config,
            locks: SlotLocks::new(),
        }
    }

    // ======================================================================
    // Slot lifecycle and capacity queries
    // ======================================================================

    /// Load the slot for `date`, creating an empty unlocked one if absent.
    ///
    /// Saturdays and Sundays never hold slots.
    pub fn ensure_slot(&self, date: NaiveDate) -> Result<Slot, AdmissionError> {
        let _guard = self.locks.acquire(date);
        self.create_slot_if_absent(date)
    }

    /// Whether a patient can still join the slot for `date`.
    ///
    /// A missing slot is created on the spot and reported as accepting.
    pub fn can_accept(&self, date: NaiveDate) -> Result<bool, AdmissionError> {
        let _guard = self.locks.acquire(date);
        match self.slots.get(date)? {
            Some(slot) => Ok(!slot.locked && slot.len() < self.config.capacity),
            None => {
                self.create_slot_if_absent(date)?;
                Ok(true)
            }
        }
    }

    /// Whether the slot for `date` is locked.
    ///
    /// A missing slot is created on the spot and reported unlocked.
    pub fn is_locked(&self, date: NaiveDate) -> Result<bool, AdmissionError> {
        let _guard = self.locks.acquire(date);
        match self.slots.get(date)? {
            Some(slot) => Ok(slot.locked),
            None => {
                self.create_slot_if_absent(date)?;
                Ok(false)
            }
        }
    }

    /// Recompute the lock flag from the confirmed membership.
    ///
    /// Transitioning into locked detaches the waiting members and returns
    /// them; the caller routes them to an overflow slot. A past-dated slot
    /// is never unlocked: once the rollover sweep closes a day it stays
    /// closed. The caller must hold the slot's critical section; the slot
    /// is saved before returning.
    pub fn reevaluate_lock(&self, slot: &mut Slot) -> Result<Vec<Patient>, AdmissionError> {
        let members = self.members(slot)?;
        let confirmed = members
            .iter()
            .filter(|p| p.status.is_fully_confirmed())
            .count();

        if confirmed >= self.config.capacity {
            let transitioning = !slot.locked;
            slot.locked = true;
            let mut drained = Vec::new();
            if transitioning {
                for mut member in members {
                    if member.status.is_fully_confirmed() {
                        continue;
                    }
                    member.status = PatientStatus::Waiting;
                    slot.remove(&member.id);
                    self.patients.save(&member)?;
                    drained.push(member);
                }
                if !drained.is_empty() {
                    self.refresh_ranking(slot)?;
                }
                info!(
                    "slot {} reached capacity and locked ({} waiting detached)",
                    slot.date,
                    drained.len()
                );
            }
            self.slots.save(slot)?;
            Ok(drained)
        } else {
            if slot.locked && slot.date >= self.clock.today() {
                slot.locked = false;
                debug!("slot {} unlocked, capacity freed", slot.date);
            }
            self.slots.save(slot)?;
            Ok(Vec::new())
        }
    }

    // ======================================================================
    // Crate-internal mutation protocol
    // ======================================================================

    /// Enter the critical section for one date.
    pub(crate) fn guard(&self, date: NaiveDate) -> SlotGuard<'_> {
        self.locks.acquire(date)
    }

    /// Enter the critical sections for several dates at once.
    pub(crate) fn guard_all(&self, dates: Vec<NaiveDate>) -> SlotGuard<'_> {
        self.locks.acquire_all(dates)
    }

    /// Load or create the slot for `date`. The caller holds the date's
    /// critical section.
    pub(crate) fn create_slot_if_absent(&self, date: NaiveDate) -> Result<Slot, AdmissionError> {
        if is_weekend(date) {
            return Err(AdmissionError::InvalidDate(date));
        }
        if let Some(slot) = self.slots.get(date)? {
            return Ok(slot);
        }
        let slot = Slot::new(date);
        self.slots.save(&slot)?;
        debug!("created admission slot for {}", date);
        Ok(slot)
    }

    /// Load a slot's members in stored (rank) order.
    pub(crate) fn members(&self, slot: &Slot) -> Result<Vec<Patient>, AdmissionError> {
        let mut members = Vec::with_capacity(slot.len());
        for id in &slot.patients {
            let patient = self
                .patients
                .get(id)?
                .ok_or_else(|| AdmissionError::PatientNotFound(id.clone()))?;
            members.push(patient);
        }
        Ok(members)
    }

    /// Recompute the priority order of `slot`, rewriting member ranks and
    /// the stored membership order. Members are saved; the slot itself is
    /// left for the caller to save.
    pub(crate) fn refresh_ranking(&self, slot: &mut Slot) -> Result<(), AdmissionError> {
        let ranked = ranking::rank(self.members(slot)?);
        slot.patients = ranked.iter().map(|p| p.id.clone()).collect();
        for member in &ranked {
            self.patients.save(member)?;
        }
        Ok(())
    }

    /// Evict the lowest-priority confirmed member of a locked slot and
    /// admit `urgent` in its place; the evicted patient moves to `dest` as
    /// waiting. The caller holds the critical sections of both dates.
    /// Returns the evicted patient after routing.
    pub(crate) fn displace(
        &self,
        urgent: &mut Patient,
        slot: &mut Slot,
        dest: NaiveDate,
    ) -> Result<Patient, AdmissionError> {
        let members = self.members(slot)?;
        let mut evicted = members
            .iter()
            .filter(|p| p.status.is_fully_confirmed() && p.id != urgent.id)
            .max_by_key(|p| p.rank)
            .cloned()
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "locked slot {} has no confirmed members",
                    slot.date
                ))
            })?;

        evicted.status = PatientStatus::Waiting;
        evicted.modified_at = Some(self.clock.now());
        slot.remove(&evicted.id);
        self.patients.save(&evicted)?;

        urgent.status = PatientStatus::ConfirmedTwice;
        urgent.slot_date = slot.date;
        if !slot.contains(&urgent.id) {
            slot.patients.push(urgent.id.clone());
        }
        self.patients.save(urgent)?;

        self.refresh_ranking(slot)?;
        self.slots.save(slot)?;

        info!(
            "urgent patient {} displaced {} from slot {}",
            urgent.id, evicted.id, slot.date
        );

        self.place_into(dest, std::slice::from_mut(&mut evicted))?;
        Ok(evicted)
    }

    /// Put `patients` into the slot for `dest` as waiting members and
    /// recompute its ranking once. The caller holds the date's critical
    /// section.
    pub(crate) fn place_into(
        &self,
        dest: NaiveDate,
        patients: &mut [Patient],
    ) -> Result<Slot, AdmissionError> {
        let mut slot = self.create_slot_if_absent(dest)?;
        for patient in patients.iter_mut() {
            patient.status = PatientStatus::Waiting;
            patient.slot_date = dest;
            self.patients.save(patient)?;
            if !slot.contains(&patient.id) {
                slot.patients.push(patient.id.clone());
            }
        }
        self.refresh_ranking(&mut slot)?;
        self.slots.save(&slot)?;
        Ok(slot)
    }

    /// Find the next usable overflow date: the earliest unlocked slot dated
    /// after today, else the first scan date after `origin` that is neither
    /// a weekend day nor already locked. Friday is a valid scan target even
    /// though manual scheduling rejects it. The origin slot itself is never
    /// a destination: when routing runs it is locked or about to lock.
    ///
    /// Read-only; callers acquire the returned date's critical section and
    /// re-check it before joining.
    pub(crate) fn probe_destination(&self, origin: NaiveDate) -> Result<NaiveDate, AdmissionError> {
        let today = self.clock.today();
        if let Some(slot) = self
            .slots
            .unlocked_after(today)?
            .into_iter()
            .filter(|slot| slot.date != origin)
            .min_by_key(|slot| slot.date)
        {
            return Ok(slot.date);
        }

        let locked_dates: HashSet<NaiveDate> = self
            .slots
            .locked_after(origin)?
            .into_iter()
            .map(|slot| slot.date)
            .collect();

        let mut date = origin + Duration::days(1);
        loop {
            date = skip_weekend(date);
            if !locked_dates.contains(&date) {
                return Ok(date);
            }
            date += Duration::days(1);
        }
    }

    /// Whether `dest` can still receive routed patients.
    pub(crate) fn destination_open(&self, dest: NaiveDate) -> Result<bool, AdmissionError> {
        Ok(self.slots.get(dest)?.map_or(true, |slot| !slot.locked))
    }

    /// Route waiting patients to the next open slot, acquiring the
    /// destination's critical section. The caller must hold no sections.
    pub(crate) fn route_waiting(
        &self,
        patients: &mut [Patient],
        origin: NaiveDate,
    ) -> Result<NaiveDate, AdmissionError> {
        loop {
            let dest = self.probe_destination(origin)?;
            let _guard = self.locks.acquire(dest);
            if !self.destination_open(dest)? {
                continue;
            }
            self.place_into(dest, patients)?;
            info!(
                "routed {} waiting patient(s) from {} to {}",
                patients.len(),
                origin,
                dest
            );
            return Ok(dest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, FixedClock, MockPatientStore, MockSlotStore};

    fn date(day: u32) -> NaiveDate {
        // 2022-03-14 is a Monday.
        NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
    }

    struct Setup {
        slots: Arc<MockSlotStore>,
        patients: Arc<MockPatientStore>,
        scheduler: SlotScheduler,
    }

    fn setup(today: NaiveDate) -> Setup {
        let slots = Arc::new(MockSlotStore::new());
        let patients = Arc::new(MockPatientStore::new());
        let scheduler = SlotScheduler::new(
            Arc::clone(&slots) as Arc<dyn SlotStore>,
            Arc::clone(&patients) as Arc<dyn PatientStore>,
            Arc::new(FixedClock::on(today)),
            WardConfig::default(),
        );
        Setup {
            slots,
            patients,
            scheduler,
        }
    }

    #[test]
    fn test_ensure_slot_rejects_weekend() {
        let s = setup(date(14));
        let err = s.scheduler.ensure_slot(date(19)).unwrap_err();
        assert!(matches!(err, AdmissionError::InvalidDate(_)));
        assert!(s.scheduler.ensure_slot(date(18)).is_ok());
    }

    #[test]
    fn test_capacity_check_creates_missing_slot() {
        let s = setup(date(14));
        assert!(s.scheduler.can_accept(date(17)).unwrap());
        assert!(s.slots.get(date(17)).unwrap().is_some());

        assert!(!s.scheduler.is_locked(date(21)).unwrap());
        assert!(s.slots.get(date(21)).unwrap().is_some());
    }

    #[test]
    fn test_reevaluate_never_unlocks_past_slot() {
        let s = setup(date(21));
        let mut closed = Slot::new(date(14));
        closed.locked = true;
        s.slots.save(&closed).unwrap();

        s.scheduler.reevaluate_lock(&mut closed).unwrap();
        assert!(closed.locked);
        assert!(s.slots.get(date(14)).unwrap().unwrap().locked);
    }

    #[test]
    fn test_reevaluate_unlocks_future_slot_below_capacity() {
        let s = setup(date(14));
        let mut slot = Slot::new(date(17));
        slot.locked = true;
        s.slots.save(&slot).unwrap();

        s.scheduler.reevaluate_lock(&mut slot).unwrap();
        assert!(!slot.locked);
    }

    #[test]
    fn test_probe_prefers_earliest_unlocked_future_slot() {
        let s = setup(date(14));
        s.slots.save(&Slot::new(date(22))).unwrap();
        s.slots.save(&Slot::new(date(16))).unwrap();

        let dest = s.scheduler.probe_destination(date(17)).unwrap();
        assert_eq!(dest, date(16));
    }

    #[test]
    fn test_probe_scan_skips_weekend_and_locked_dates() {
        let s = setup(date(14));
        let mut locked = Slot::new(date(18));
        locked.locked = true;
        s.slots.save(&locked).unwrap();

        // No unlocked future slots exist; scanning starts after the origin,
        // skips the locked Friday and the weekend, and lands on Monday.
        let dest = s.scheduler.probe_destination(date(17)).unwrap();
        assert_eq!(dest, date(21));
    }

    #[test]
    fn test_probe_never_picks_the_origin_slot() {
        let s = setup(date(14));
        s.slots.save(&Slot::new(date(17))).unwrap();

        // 2022-03-17 is the only unlocked future slot, but it is the slot
        // being drained; the scan moves on to the next day.
        let dest = s.scheduler.probe_destination(date(17)).unwrap();
        assert_eq!(dest, date(18));
    }

    #[test]
    fn test_probe_scan_accepts_friday() {
        let s = setup(date(14));
        let dest = s.scheduler.probe_destination(date(17)).unwrap();
        assert_eq!(dest, date(18));
    }

    #[test]
    fn test_place_into_resets_status_and_reranks() {
        let s = setup(date(14));
        let mut moved = fixtures::patient("p-1", date(17));
        moved.status = PatientStatus::ConfirmedOnce;
        s.patients.save(&moved).unwrap();

        let slot = s
            .scheduler
            .place_into(date(21), std::slice::from_mut(&mut moved))
            .unwrap();

        assert_eq!(moved.status, PatientStatus::Waiting);
        assert_eq!(moved.slot_date, date(21));
        assert_eq!(slot.patients, vec!["p-1".to_string()]);
        let stored = s.patients.get("p-1").unwrap().unwrap();
        assert_eq!(stored.rank, 0);
    }
}
