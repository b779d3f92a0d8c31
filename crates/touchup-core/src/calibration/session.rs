//! Four-point calibration capture.
//!
//! A session targets one display.  Targets are shown one at a time in
//! [`Corner::ORDER`]; every accepted touch is paired with the current target
//! and the session advances.  After the fourth pair the session is complete
//! and refuses further samples, and [`CalibrationSession::compute_mapping`]
//! yields the transform to install.

use std::time::{Duration, Instant};

use uuid::Uuid;

use super::gate::{AcceptedSample, SampleGate};
use super::touch::TouchPoint;
use super::transform::{CalibrationError, CalibrationMapping, CalibrationPair};
use crate::domain::display::{DisplayId, Frame, NormalizedPoint, Point};

/// Number of targets in a session.
pub const CALIBRATION_POINT_COUNT: usize = 4;

/// Delay between the last capture and the completion notification, so the
/// user can see the final target confirmed.
pub const COMPLETION_GRACE: Duration = Duration::from_secs(2);

/// Inset of each target from the frame edges, as a fraction of the frame.
const TARGET_INSET: f64 = 0.05;

/// Calibration target position, in capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ORDER: [Corner; CALIBRATION_POINT_COUNT] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }

    /// Target position relative to the frame.
    pub fn target_fraction(self) -> NormalizedPoint {
        let near = TARGET_INSET;
        let far = 1.0 - TARGET_INSET;
        match self {
            Corner::TopLeft => NormalizedPoint::new(near, near),
            Corner::TopRight => NormalizedPoint::new(far, near),
            Corner::BottomLeft => NormalizedPoint::new(near, far),
            Corner::BottomRight => NormalizedPoint::new(far, far),
        }
    }

    /// Target position in absolute pixels on `frame`.
    pub fn target_on(self, frame: &Frame) -> Point {
        frame.absolute(self.target_fraction())
    }
}

/// A sample the session just captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedSample {
    /// Target index, `0..4`.
    pub index: usize,
    pub pair: CalibrationPair,
}

impl CapturedSample {
    pub fn corner(&self) -> Corner {
        Corner::ORDER[self.index]
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    id: Uuid,
    target_display: DisplayId,
    pairs: Vec<CalibrationPair>,
    last_sample: Option<AcceptedSample>,
    gate: SampleGate,
}

impl CalibrationSession {
    pub fn new(target_display: DisplayId, debounce: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_display,
            pairs: Vec::with_capacity(CALIBRATION_POINT_COUNT),
            last_sample: None,
            gate: SampleGate::new(debounce),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target_display(&self) -> DisplayId {
        self.target_display
    }

    pub fn points_captured(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[CalibrationPair] {
        &self.pairs
    }

    pub fn is_complete(&self) -> bool {
        self.pairs.len() >= CALIBRATION_POINT_COUNT
    }

    /// The corner the user should touch next, or `None` once complete.
    pub fn next_corner(&self) -> Option<Corner> {
        Corner::ORDER.get(self.pairs.len()).copied()
    }

    pub fn last_capture(&self) -> Option<Instant> {
        self.last_sample.map(|s| s.at)
    }

    /// Feeds one touch snapshot to the session.
    ///
    /// The first touch passing the [`SampleGate`] is paired with the current
    /// target on `frame`; any further touches in the same snapshot are
    /// ignored.  Returns the captured sample, if any.
    pub fn offer(
        &mut self,
        touches: &[TouchPoint],
        frame: &Frame,
        now: Instant,
    ) -> Option<CapturedSample> {
        let corner = self.next_corner()?;
        let touch = touches
            .iter()
            .find(|t| self.gate.accepts(self.last_sample.as_ref(), t, now))?;

        let pair = CalibrationPair::new(touch.location, corner.target_on(frame));
        let index = self.pairs.len();
        self.pairs.push(pair);
        self.last_sample = Some(AcceptedSample {
            touch: touch.uuid,
            at: now,
        });

        tracing::debug!(
            session = %self.id,
            display = %self.target_display,
            index,
            corner = corner.label(),
            "calibration sample captured"
        );
        Some(CapturedSample { index, pair })
    }

    /// Computes the transform through the captured pairs.
    pub fn compute_mapping(&self) -> Result<CalibrationMapping, CalibrationError> {
        let pairs: &[CalibrationPair; CALIBRATION_POINT_COUNT] =
            self.pairs
                .as_slice()
                .try_into()
                .map_err(|_| CalibrationError::Incomplete {
                    captured: self.pairs.len(),
                })?;
        CalibrationMapping::from_pairs(pairs)
    }
}
