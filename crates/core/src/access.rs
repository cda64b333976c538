//! Authorization seam.
//!
//! Identity resolution happens outside the core; by the time an operation
//! runs, the caller is an opaque staff reference.

/// Permission checks consulted by the admission workflow.
pub trait AccessPolicy: Send + Sync {
    /// Whether `staff` may register an urgent admission.
    fn can_create_urgent(&self, staff: &str) -> bool;
}
