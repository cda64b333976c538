//! Priority ordering of a slot's members.

use crate::patient::Patient;

/// Order `members` by admission priority and assign contiguous 0-based
/// ranks.
///
/// Three tiers: urgent patients first, then non-urgent patients with an
/// elevated condition, then everyone else. Within a tier, the earlier
/// `target_date` wins; equal dates fall back to creation time, and the sort
/// is stable beyond that. The caller persists the rewritten ranks.
pub fn rank(mut members: Vec<Patient>) -> Vec<Patient> {
    members.sort_by(|a, b| {
        tier(a)
            .cmp(&tier(b))
            .then_with(|| a.target_date.cmp(&b.target_date))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    for (position, patient) in members.iter_mut().enumerate() {
        patient.rank = position;
    }
    members
}

fn tier(patient: &Patient) -> u8 {
    if patient.urgent {
        0
    } else if patient.elevated {
        1
    } else {
        2
    }
}
