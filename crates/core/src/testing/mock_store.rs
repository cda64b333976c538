//! In-memory stores for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::patient::Patient;
use crate::slot::Slot;
use crate::store::{PatientStore, SlotStore, StoreError};

/// In-memory patient store.
///
/// Supports injecting a one-shot backend failure for error-path tests.
#[derive(Debug, Default)]
pub struct MockPatientStore {
    records: Mutex<HashMap<String, Patient>>,
    next_error: Mutex<Option<String>>,
}

impl MockPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next store call with the given backend message.
    pub fn set_next_error(&self, message: impl Into<String>) {
        *self.next_error.lock().unwrap() = Some(message.into());
    }

    fn take_error(&self) -> Result<(), StoreError> {
        match self.next_error.lock().unwrap().take() {
            Some(message) => Err(StoreError::Backend(message)),
            None => Ok(()),
        }
    }
}

impl PatientStore for MockPatientStore {
    fn get(&self, id: &str) -> Result<Option<Patient>, StoreError> {
        self.take_error()?;
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    fn save(&self, patient: &Patient) -> Result<(), StoreError> {
        self.take_error()?;
        self.records
            .lock()
            .unwrap()
            .insert(patient.id.clone(), patient.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.take_error()?;
        self.records.lock().unwrap().remove(id);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Patient>, StoreError> {
        self.take_error()?;
        let mut records: Vec<Patient> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }
}

/// In-memory slot store.
#[derive(Debug, Default)]
pub struct MockSlotStore {
    records: Mutex<HashMap<NaiveDate, Slot>>,
}

impl MockSlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, predicate: impl Fn(&Slot) -> bool) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|slot| predicate(slot))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.date);
        slots
    }
}

impl SlotStore for MockSlotStore {
    fn get(&self, date: NaiveDate) -> Result<Option<Slot>, StoreError> {
        Ok(self.records.lock().unwrap().get(&date).cloned())
    }

    fn save(&self, slot: &Slot) -> Result<(), StoreError> {
        self.records.lock().unwrap().insert(slot.date, slot.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<Slot>, StoreError> {
        Ok(self.matching(|_| true))
    }

    fn slots_before(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        Ok(self.matching(|slot| slot.date < date))
    }

    fn slots_on_or_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        Ok(self.matching(|slot| slot.date >= date))
    }

    fn unlocked_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        Ok(self.matching(|slot| !slot.locked && slot.date > date))
    }

    fn locked_after(&self, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        Ok(self.matching(|slot| slot.locked && slot.date > date))
    }
}
