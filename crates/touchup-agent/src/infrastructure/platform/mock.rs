//! Mock platform: an in-memory display list and touch driver.
//!
//! # Why a mock platform?
//!
//! The real display list comes from the window server and the real touch
//! driver talks to a HID device.  Neither exists on a CI machine, and neither
//! can be observed from test code.
//!
//! `MockPlatform` replaces both with plain recording.  Tests (and the demo
//! binary) change the display list with [`MockPlatform::plug`] and
//! [`MockPlatform::unplug`], then inspect what the coordinator asked the
//! driver to do.
//!
//! # `should_fail` flag
//!
//! Set `should_fail` to make `enumerate_displays` return an error, to exercise
//! the "keep the previous list" path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use touchup_core::{
    CalibrationMapping, Display, DisplayId, DriverSettings, Frame, NormalizedPoint, Point,
};

use crate::application::coordinator::TouchDriver;
use crate::application::display_registry::{DisplayEnumerator, PlatformError};

/// One call to [`TouchDriver::record_calibration_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedPoint {
    pub display: DisplayId,
    pub raw: NormalizedPoint,
    pub screen: Point,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    /// Current display list, in enumeration order.
    pub displays: Mutex<Vec<Display>>,
    pub recorded_points: Mutex<Vec<RecordedPoint>>,
    pub commits: Mutex<Vec<(DisplayId, CalibrationMapping)>>,
    pub resets: Mutex<Vec<DisplayId>>,
    pub applied_settings: Mutex<Vec<DriverSettings>>,
    pub should_fail: AtomicBool,
}

impl MockPlatform {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays: Mutex::new(displays),
            ..Self::default()
        }
    }

    /// A built-in 1440x900 main display with a 1920x1080 "Digital" touch
    /// panel to its right.
    pub fn demo() -> Self {
        Self::new(vec![
            Display::new(1, "Built-in Retina Display", Frame::new(0.0, 0.0, 1440.0, 900.0), true),
            Display::new(2, "Digital", Frame::new(1440.0, 0.0, 1920.0, 1080.0), false),
        ])
    }

    pub fn set_displays(&self, displays: Vec<Display>) {
        *self.displays.lock().expect("lock poisoned") = displays;
    }

    /// Appends `display` to the end of the enumeration order.
    pub fn plug(&self, display: Display) {
        self.displays.lock().expect("lock poisoned").push(display);
    }

    pub fn unplug(&self, id: DisplayId) {
        self.displays.lock().expect("lock poisoned").retain(|d| d.id != id);
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn recorded_points(&self) -> Vec<RecordedPoint> {
        self.recorded_points.lock().expect("lock poisoned").clone()
    }

    pub fn commits(&self) -> Vec<(DisplayId, CalibrationMapping)> {
        self.commits.lock().expect("lock poisoned").clone()
    }

    pub fn resets(&self) -> Vec<DisplayId> {
        self.resets.lock().expect("lock poisoned").clone()
    }

    pub fn applied_settings(&self) -> Vec<DriverSettings> {
        self.applied_settings.lock().expect("lock poisoned").clone()
    }
}

impl DisplayEnumerator for MockPlatform {
    fn enumerate_displays(&self) -> Result<Vec<Display>, PlatformError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Enumeration("mock failure".into()));
        }
        Ok(self.displays.lock().expect("lock poisoned").clone())
    }
}

impl TouchDriver for MockPlatform {
    fn record_calibration_point(
        &self,
        display: DisplayId,
        raw: NormalizedPoint,
        screen: Point,
        index: usize,
    ) {
        self.recorded_points
            .lock()
            .expect("lock poisoned")
            .push(RecordedPoint {
                display,
                raw,
                screen,
                index,
            });
    }

    fn commit_calibration(&self, display: DisplayId, mapping: &CalibrationMapping) {
        self.commits
            .lock()
            .expect("lock poisoned")
            .push((display, *mapping));
    }

    fn reset_calibration(&self, display: DisplayId) {
        self.resets.lock().expect("lock poisoned").push(display);
    }

    fn apply_settings(&self, settings: &DriverSettings) {
        self.applied_settings
            .lock()
            .expect("lock poisoned")
            .push(settings.clone());
    }
}
