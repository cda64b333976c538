//! Admission slots, one per ward calendar day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::patient::Patient;

/// One calendar day's admission capacity.
///
/// Membership is a list of patient ids kept in rank order. The waiting and
/// confirmed subsets are derived from member status, not stored separately.
/// A locked slot only accepts joins through urgent displacement; slots
/// closed by the rollover sweep stay locked for good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub locked: bool,
    pub patients: Vec<String>,
}

impl Slot {
    /// Create an empty, unlocked slot for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            locked: false,
            patients: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.patients.iter().any(|id| id == patient_id)
    }

    /// Remove a member id; returns whether it was present.
    pub fn remove(&mut self, patient_id: &str) -> bool {
        let before = self.patients.len();
        self.patients.retain(|id| id != patient_id);
        self.patients.len() != before
    }
}

/// Split loaded members into the waiting and fully confirmed subsets,
/// preserving rank order.
pub fn split_by_status(members: Vec<Patient>) -> (Vec<Patient>, Vec<Patient>) {
    members
        .into_iter()
        .partition(|p| !p.status.is_fully_confirmed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientStatus;
    use crate::testing::fixtures;

    #[test]
    fn test_new_slot_is_open_and_empty() {
        let date = NaiveDate::from_ymd_opt(2022, 3, 17).unwrap();
        let slot = Slot::new(date);
        assert_eq!(slot.date, date);
        assert!(!slot.locked);
        assert!(slot.is_empty());
    }

    #[test]
    fn test_remove_member() {
        let mut slot = Slot::new(NaiveDate::from_ymd_opt(2022, 3, 17).unwrap());
        slot.patients.push("p-1".to_string());
        slot.patients.push("p-2".to_string());

        assert!(slot.remove("p-1"));
        assert!(!slot.remove("p-1"));
        assert!(!slot.contains("p-1"));
        assert_eq!(slot.len(), 1);
    }

    #[test]
    fn test_split_by_status_preserves_order() {
        let date = NaiveDate::from_ymd_opt(2022, 3, 17).unwrap();
        let mut a = fixtures::patient("a", date);
        let mut b = fixtures::patient("b", date);
        let c = fixtures::patient("c", date);
        a.status = PatientStatus::ConfirmedTwice;
        b.status = PatientStatus::ConfirmedOnce;

        let (waiting, confirmed) = split_by_status(vec![a, b, c]);
        assert_eq!(
            waiting.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["b", "c"]
        );
        assert_eq!(
            confirmed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["a"]
        );
    }
}
