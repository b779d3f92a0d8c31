//! Display entity: one attached monitor as reported by the platform.
//!
//! Displays are value objects.  The registry replaces the whole list on every
//! reconfiguration event instead of patching entries in place, so a `Display`
//! held across events may describe a monitor that no longer exists.  Always
//! look displays up by [`DisplayId`] in the latest enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calibration::transform::CalibrationMapping;

/// Stable platform identifier of a display (e.g. a `CGDirectDisplayID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An absolute position in global display coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A position relative to a display's frame, with both axes in `[0, 1]`.
///
/// `(0, 0)` is the top-left corner of the panel and `(1, 1)` the bottom-right.
/// Touch drivers report contacts in this space before any calibration is
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle in global display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Top-left corner in global coordinates (may be negative).
    pub origin: Point,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            width,
            height,
        }
    }

    /// Returns `width × height`.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Converts a frame-relative position to absolute pixels.
    pub fn absolute(&self, relative: NormalizedPoint) -> Point {
        Point {
            x: self.origin.x + relative.x * self.width,
            y: self.origin.y + relative.y * self.height,
        }
    }
}

/// One attached display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: DisplayId,
    /// Human-readable product name reported by the platform.
    pub name: String,
    pub frame: Frame,
    /// `true` for the display holding the menu bar / primary desktop.
    pub is_main: bool,
    /// The installed touch-to-pixel mapping, if this display was calibrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationMapping>,
}

impl Display {
    /// Creates an uncalibrated display.
    pub fn new(id: u32, name: impl Into<String>, frame: Frame, is_main: bool) -> Self {
        Self {
            id: DisplayId(id),
            name: name.into(),
            frame,
            is_main,
            calibration: None,
        }
    }

    /// Builder-style helper attaching an existing mapping.
    pub fn with_calibration(mut self, mapping: CalibrationMapping) -> Self {
        self.calibration = Some(mapping);
        self
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Installs a mapping computed by a completed calibration session.
    pub fn install_calibration(&mut self, mapping: CalibrationMapping) {
        self.calibration = Some(mapping);
    }

    /// Drops the installed mapping so the display needs calibrating again.
    pub fn clear_calibration(&mut self) {
        self.calibration = None;
    }

    /// Maps a raw touch location to absolute pixels.
    ///
    /// Uses the installed calibration when present; otherwise (or when the
    /// mapping is undefined at that point) the raw location is stretched
    /// linearly over the frame.
    pub fn map_touch(&self, raw: NormalizedPoint) -> Point {
        self.calibration
            .as_ref()
            .and_then(|mapping| mapping.apply(raw))
            .unwrap_or_else(|| self.frame.absolute(raw))
    }
}
