//! Mock catalog and authorization collaborators.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::access::AccessPolicy;
use crate::diagnosis::DiagnosisLookup;
use crate::store::StoreError;

/// Disease catalog keyed by an explicit set of severe diagnoses.
#[derive(Debug, Default)]
pub struct MockDiagnosisLookup {
    severe: Mutex<HashSet<String>>,
}

impl MockDiagnosisLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a diagnosis as requiring catheterization or surgery.
    pub fn mark_severe(&self, diagnosis: impl Into<String>) {
        self.severe.lock().unwrap().insert(diagnosis.into());
    }
}

impl DiagnosisLookup for MockDiagnosisLookup {
    fn is_elevated(&self, diagnoses: &[String]) -> Result<bool, StoreError> {
        let severe = self.severe.lock().unwrap();
        Ok(diagnoses.iter().any(|d| severe.contains(d)))
    }
}

/// Access policy with an allowlist of staff references.
#[derive(Debug, Default)]
pub struct MockAccessPolicy {
    allowed: Mutex<HashSet<String>>,
}

impl MockAccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `staff` the right to register urgent admissions.
    pub fn allow(&self, staff: impl Into<String>) {
        self.allowed.lock().unwrap().insert(staff.into());
    }
}

impl AccessPolicy for MockAccessPolicy {
    fn can_create_urgent(&self, staff: &str) -> bool {
        self.allowed.lock().unwrap().contains(staff)
    }
}
