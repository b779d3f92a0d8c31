//! # touchup-core
//!
//! Domain library for Touch Up: decides which attached display is "the
//! touchscreen" and captures the 4-point calibration that maps raw panel
//! coordinates onto that display's pixels.
//!
//! This crate has zero dependencies on OS APIs, UI frameworks, or the touch
//! driver.  Every decision is a pure function of the evidence passed in
//! (display list, remembered identity, hot-plug timestamps, touch snapshots),
//! which keeps it testable without any hardware attached.
//!
//! # Architecture overview (for beginners)
//!
//! A USB touch panel shows up to the operating system as two unrelated
//! things: a HID device that reports touches, and a monitor in the display
//! list.  Nothing tells us which monitor the touches belong to, so we combine
//! several weak signals:
//!
//! - **`domain::identity`** – Scores displays against the remembered
//!   (name, id) of the last confirmed touchscreen.
//!
//! - **`domain::hotplug`** – Correlates "USB device arrived" and "display
//!   arrived" when both happened within a short window.
//!
//! - **`domain::selection`** – A deterministic fallback ranking used when
//!   neither of the above is conclusive.
//!
//! - **`domain::connection`** – The coarse lifecycle shown to the user.
//!
//! - **`calibration`** – The 4-corner capture protocol and the projective
//!   transform computed from it.
//!
//! - **`gesture`** – Driver tuning settings and the gesture-to-action table.

pub mod calibration;
pub mod domain;
pub mod gesture;

// Re-export the most-used types at the crate root so callers can write
// `touchup_core::Display` instead of `touchup_core::domain::display::Display`.
pub use calibration::gate::{AcceptedSample, SampleGate, TAP_DEBOUNCE};
pub use calibration::session::{
    CalibrationSession, CapturedSample, Corner, CALIBRATION_POINT_COUNT, COMPLETION_GRACE,
};
pub use calibration::touch::{TouchPhase, TouchPoint};
pub use calibration::transform::{CalibrationError, CalibrationMapping, CalibrationPair};
pub use domain::connection::{ConnectionState, ConnectionStateMachine, Transition};
pub use domain::display::{Display, DisplayId, Frame, NormalizedPoint, Point};
pub use domain::hotplug::{HotPlugEvidence, HotPlugReconciler, HOT_PLUG_WINDOW};
pub use domain::identity::{resolve_preferred, IdentityCue, MatchScore};
pub use domain::selection::{select_fallback, Selection, SelectionRule};
pub use gesture::{action_for, CursorAction, CursorGesture, DriverSettings, GestureToggles};
