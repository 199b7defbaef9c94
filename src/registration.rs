//! Registration gate: the precondition for reporting any telemetry.
//!
//! A process must have both of its dictionary identifiers assigned by the
//! registration flow before any reporting service does work. Until then,
//! every producer and sender tick is a silent no-op.

use std::sync::atomic::{AtomicI32, Ordering};

/// Sentinel for a dictionary id that has not been assigned yet.
pub const UNASSIGNED: i32 = -1;

/// Small-integer identifier substituted for a string identity to keep wire
/// payloads compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DictionaryId(pub i32);

impl DictionaryId {
    /// Whether this id still carries the unassigned sentinel.
    pub const fn is_assigned(self) -> bool {
        self.0 != UNASSIGNED
    }
}

/// Shared holder for the two process-wide dictionary ids.
///
/// Written exactly once by the registration flow, read by every reporting
/// service. Re-registration is out of scope; the ids are immutable for the
/// process lifetime once set.
#[derive(Debug)]
pub struct RegistrationGate {
    application_id: AtomicI32,
    instance_id: AtomicI32,
}

impl RegistrationGate {
    /// Creates a gate with both ids unassigned.
    pub fn new() -> Self {
        Self {
            application_id: AtomicI32::new(UNASSIGNED),
            instance_id: AtomicI32::new(UNASSIGNED),
        }
    }

    /// Records the identifiers assigned by the registration flow.
    pub fn assign(&self, application_id: DictionaryId, instance_id: DictionaryId) {
        self.application_id
            .store(application_id.0, Ordering::Release);
        self.instance_id.store(instance_id.0, Ordering::Release);
    }

    /// The application dictionary id, possibly unassigned.
    pub fn application_id(&self) -> DictionaryId {
        DictionaryId(self.application_id.load(Ordering::Acquire))
    }

    /// The instance dictionary id, possibly unassigned.
    pub fn instance_id(&self) -> DictionaryId {
        DictionaryId(self.instance_id.load(Ordering::Acquire))
    }

    /// True once both identifiers differ from the unassigned sentinel.
    pub fn is_registered(&self) -> bool {
        self.application_id().is_assigned() && self.instance_id().is_assigned()
    }
}

impl Default for RegistrationGate {
    fn default() -> Self {
        Self::new()
    }
}
