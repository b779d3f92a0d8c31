//! Gesture → cursor action lookup and the driver tuning knobs.
//!
//! The driver recognises gestures itself; this table only decides what each
//! gesture does to the cursor given the user's toggles.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A gesture recognised by the touch driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorGesture {
    TouchDown,
    Tap,
    LongPress,
    Drag,
    HoldAndDrag,
    TapSecondFinger,
    TwoFingerDrag,
    Pinch,
    Unknown,
}

/// What the driver should do with the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorAction {
    None,
    Move,
    MoveClickIfNeeded,
    Click,
    PointAndClick,
    Scroll,
    Drag,
    SecondaryClick,
    Magnify,
}

/// User-facing gesture switches.  All off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GestureToggles {
    pub scrolling_with_one_finger: bool,
    pub secondary_click: bool,
    pub magnification: bool,
    pub click_window_to_front: bool,
    pub click_on_lift: bool,
}

/// Tuning pushed to the driver at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Whether touches are turned into mouse events at all.
    pub post_mouse_events: bool,
    /// How long a contact must rest before it counts as a hold.
    pub hold_duration: Duration,
    /// Maximum distance between two taps of a double click, in millimetres.
    pub double_click_distance_mm: f64,
    /// Number of missing reports tolerated before a touch is cancelled.
    pub error_resistance: u32,
    /// Drop contacts reported at exactly (0, 0); some panels emit them as noise.
    pub ignore_origin_touches: bool,
    pub gestures: GestureToggles,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            post_mouse_events: true,
            hold_duration: Duration::from_millis(100),
            double_click_distance_mm: 8.0,
            error_resistance: 4,
            ignore_origin_touches: true,
            gestures: GestureToggles::default(),
        }
    }
}

pub fn action_for(gesture: CursorGesture, toggles: &GestureToggles) -> CursorAction {
    match gesture {
        CursorGesture::TouchDown if toggles.click_window_to_front => CursorAction::MoveClickIfNeeded,
        CursorGesture::TouchDown => CursorAction::Move,
        CursorGesture::Tap | CursorGesture::LongPress => CursorAction::Click,
        CursorGesture::Drag if toggles.click_on_lift => CursorAction::PointAndClick,
        CursorGesture::Drag if toggles.scrolling_with_one_finger => CursorAction::Scroll,
        CursorGesture::Drag => CursorAction::Move,
        CursorGesture::HoldAndDrag => CursorAction::Drag,
        CursorGesture::TapSecondFinger if toggles.secondary_click => CursorAction::SecondaryClick,
        // One-finger scrolling frees two fingers for dragging.
        CursorGesture::TwoFingerDrag if toggles.scrolling_with_one_finger => CursorAction::Drag,
        CursorGesture::TwoFingerDrag => CursorAction::Scroll,
        CursorGesture::Pinch if toggles.magnification => CursorAction::Magnify,
        CursorGesture::TapSecondFinger | CursorGesture::Pinch | CursorGesture::Unknown => {
            CursorAction::None
        }
    }
}
