//! Domain entities for touchscreen identity resolution.
//!
//! Everything in this module is pure business logic: no OS calls, no clocks
//! read implicitly (callers pass `now`), no persistence.  The application
//! layer in `touchup-agent` owns the mutable state and feeds these functions
//! the latest evidence on every event.
//!
//! # Resolution order
//!
//! ```text
//! displays changed
//!   └─ identity::resolve_preferred   (exact name + id match)
//!        └─ hotplug::HotPlugReconciler (USB + display arrival inside window)
//!             └─ selection::select_fallback (calibrated > external > main > last)
//! ```

/// Connection lifecycle surfaced to the shell.
pub mod connection;

/// Attached display geometry and calibration state.
pub mod display;

/// Hot-plug evidence and the reconciler that consumes it.
pub mod hotplug;

/// Remembered identity cue and the scoring rules.
pub mod identity;

/// Deterministic fallback ranking.
pub mod selection;
