//! Calibration: touch model, sample gating, 4-point capture and the
//! projective transform computed from it.

pub mod gate;
pub mod session;
pub mod touch;
pub mod transform;
