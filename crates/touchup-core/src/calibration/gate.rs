//! Sample gate: decides whether a touch counts as a new calibration sample.
//!
//! A finger resting on a target produces a stream of `Stationary`/`Moved`
//! snapshots for the same contact.  Only the first of those may be captured,
//! and two captures must be at least [`TAP_DEBOUNCE`] apart so one tap can
//! never fill two corners.

use std::time::{Duration, Instant};

use uuid::Uuid;

use super::touch::{TouchPhase, TouchPoint};

/// Minimum spacing between two accepted samples.
pub const TAP_DEBOUNCE: Duration = Duration::from_millis(500);

/// The last sample a session accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedSample {
    pub touch: Uuid,
    pub at: Instant,
}

/// Pure accept/reject predicate over `(previous, candidate, now)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleGate {
    debounce: Duration,
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(TAP_DEBOUNCE)
    }
}

impl SampleGate {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    pub fn accepts(
        &self,
        previous: Option<&AcceptedSample>,
        candidate: &TouchPoint,
        now: Instant,
    ) -> bool {
        if let Some(prev) = previous {
            if now.saturating_duration_since(prev.at) < self.debounce {
                tracing::trace!(touch = %candidate.uuid, "sample rejected: debounce");
                return false;
            }
        }

        let novel = candidate.phase == TouchPhase::Began
            || (candidate.is_active() && previous.map_or(true, |p| p.touch != candidate.uuid));
        if !novel {
            tracing::trace!(touch = %candidate.uuid, "sample rejected: not a new touch");
        }
        novel
    }
}
