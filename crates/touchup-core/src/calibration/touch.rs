//! Touch contacts as reported by the driver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::display::NormalizedPoint;

/// Lifecycle phase of one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchPhase {
    Began,
    Stationary,
    Moved,
    Ended,
    Cancelled,
}

/// One finger on the panel.
///
/// `contact_id` is the slot number the panel reuses between fingers; `uuid`
/// is minted by the driver when the contact begins and is never reused, so
/// it is what identifies "the same touch" across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub contact_id: i32,
    pub uuid: Uuid,
    pub location: NormalizedPoint,
    pub phase: TouchPhase,
    /// `false` when the panel flags the contact as a likely palm or glitch.
    pub confidence: bool,
}

impl TouchPoint {
    /// A freshly began, confident contact with a new uuid.
    pub fn began(contact_id: i32, location: NormalizedPoint) -> Self {
        Self {
            contact_id,
            uuid: Uuid::new_v4(),
            location,
            phase: TouchPhase::Began,
            confidence: true,
        }
    }

    pub fn with_phase(mut self, phase: TouchPhase) -> Self {
        self.phase = phase;
        self
    }

    /// `true` while the finger is still on the panel.
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, TouchPhase::Ended | TouchPhase::Cancelled)
    }
}
