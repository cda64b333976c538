//! Disease catalog seam.

use crate::store::StoreError;

/// Lookup into the external disease catalog.
pub trait DiagnosisLookup: Send + Sync {
    /// True if any of the referenced diagnoses requires catheterization or
    /// surgery. Patients with such a diagnosis rank above the plain tier.
    fn is_elevated(&self, diagnoses: &[String]) -> Result<bool, StoreError>;
}
