//! Shell bridge: exposes coordinator state and intents to the menu bar shell.
//!
//! The shell (menu bar icon, settings window, calibration overlay) is a
//! separate front end.  It never touches the coordinator directly: it reads
//! [`StatusSnapshot`]s published on a `watch` channel and sends intents
//! through the command functions at the bottom of this module.
//!
//! # Data Transfer Objects (DTOs)
//!
//! DTOs contain only JSON-friendly fields (`String`, `u32`, `f64`, `bool`)
//! and derive `Serialize`/`Deserialize`, so the shell can consume them as
//! plain JSON via [`to_json`].  Enum states are rendered with their variant
//! names (e.g. `"ConnectedHotPlug"`).
//!
//! # `CommandResult<T>` wrapper
//!
//! Every command returns `CommandResult<T>` so each response has the same
//! shape: `{ success: bool, data: T | null, error: string | null }`.

use serde::{Deserialize, Serialize};
use touchup_core::{
    ConnectionState, Corner, Display, DisplayId, TouchPoint, CALIBRATION_POINT_COUNT,
};

use crate::application::coordinator::TouchscreenCoordinator;
use crate::infrastructure::runtime::{CoordinatorEvent, CoordinatorHandle};

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One display as shown in the settings window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDto {
    pub id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_main: bool,
    pub is_calibrated: bool,
}

impl From<&Display> for DisplayDto {
    fn from(d: &Display) -> Self {
        Self {
            id: d.id.0,
            name: d.name.clone(),
            x: d.frame.origin.x,
            y: d.frame.origin.y,
            width: d.frame.width,
            height: d.frame.height,
            is_main: d.is_main,
            is_calibrated: d.is_calibrated(),
        }
    }
}

/// One contact, with its position mapped onto the touchscreen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchDto {
    pub contact_id: i32,
    pub uuid: String,
    pub raw_x: f64,
    pub raw_y: f64,
    /// Absolute pixels on the touchscreen; absent without a touchscreen.
    pub screen_x: Option<f64>,
    pub screen_y: Option<f64>,
    pub phase: String,
    pub confidence: bool,
}

impl TouchDto {
    fn new(touch: &TouchPoint, touchscreen: Option<&Display>) -> Self {
        let mapped = touchscreen.map(|d| d.map_touch(touch.location));
        Self {
            contact_id: touch.contact_id,
            uuid: touch.uuid.to_string(),
            raw_x: touch.location.x,
            raw_y: touch.location.y,
            screen_x: mapped.map(|p| p.x),
            screen_y: mapped.map(|p| p.y),
            phase: format!("{:?}", touch.phase),
            confidence: touch.confidence,
        }
    }
}

/// Progress of the running calibration session, for the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgressDto {
    pub session: String,
    pub display_id: u32,
    pub points_captured: usize,
    pub points_total: usize,
    /// e.g. `"2/4"`.
    pub label: String,
    /// Label of the next target, e.g. `"bottom-left"`; absent once complete.
    pub next_corner: Option<String>,
    pub next_target_x: Option<f64>,
    pub next_target_y: Option<f64>,
}

/// Everything the shell renders, published after every coordinator event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub connection_state: String,
    pub is_connected: bool,
    /// SF Symbol name for the menu bar icon.
    pub status_symbol: String,
    pub touchscreen: Option<DisplayDto>,
    pub displays: Vec<DisplayDto>,
    pub touches: Vec<TouchDto>,
    pub calibration: Option<CalibrationProgressDto>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        let state = ConnectionState::default();
        Self {
            connection_state: format!("{state:?}"),
            is_connected: false,
            status_symbol: status_symbol(state).to_string(),
            touchscreen: None,
            displays: Vec::new(),
            touches: Vec::new(),
            calibration: None,
        }
    }
}

impl StatusSnapshot {
    pub fn from_coordinator(coordinator: &TouchscreenCoordinator) -> Self {
        let state = coordinator.connection_state();
        let touchscreen = coordinator.touchscreen();

        let calibration = coordinator.calibration_progress().map(|p| {
            let corner = Corner::ORDER.get(p.points_captured).copied();
            let target = corner.and_then(|c| {
                coordinator
                    .displays()
                    .iter()
                    .find(|d| d.id == p.display)
                    .map(|d| c.target_on(&d.frame))
            });
            CalibrationProgressDto {
                session: p.session.to_string(),
                display_id: p.display.0,
                points_captured: p.points_captured,
                points_total: CALIBRATION_POINT_COUNT,
                label: format!("{}/{}", p.points_captured, CALIBRATION_POINT_COUNT),
                next_corner: corner.map(|c| c.label().to_string()),
                next_target_x: target.map(|t| t.x),
                next_target_y: target.map(|t| t.y),
            }
        });

        Self {
            connection_state: format!("{state:?}"),
            is_connected: state.is_connected(),
            status_symbol: status_symbol(state).to_string(),
            touchscreen: touchscreen.map(DisplayDto::from),
            displays: coordinator.displays().iter().map(DisplayDto::from).collect(),
            touches: coordinator
                .touches()
                .iter()
                .map(|t| TouchDto::new(t, touchscreen))
                .collect(),
            calibration,
        }
    }
}

/// Menu bar icon for `state`.
pub fn status_symbol(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Uncertain => "rectangle.dashed",
        ConnectionState::Disconnected => "rectangle.badge.xmark",
        ConnectionState::ConnectedHotPlug | ConnectionState::ConnectedPreferred => {
            "hand.point.up.left"
        }
    }
}

/// Renders any DTO as JSON for the shell.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Unified response wrapper for shell commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Shell commands ────────────────────────────────────────────────────────────

/// Returns a snapshot taken after every previously sent event was handled.
pub async fn get_status(handle: &CoordinatorHandle) -> CommandResult<StatusSnapshot> {
    match handle.snapshot().await {
        Ok(snapshot) => CommandResult::ok(snapshot),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Starts calibrating `display_id` from scratch.
pub async fn calibrate_display(handle: &CoordinatorHandle, display_id: u32) -> CommandResult<()> {
    send(handle, CoordinatorEvent::RequestCalibration(DisplayId(display_id))).await
}

pub async fn cancel_calibration(handle: &CoordinatorHandle) -> CommandResult<()> {
    send(handle, CoordinatorEvent::CancelCalibration).await
}

/// Makes `display_id` the touchscreen and remembers it.
pub async fn assign_touchscreen(handle: &CoordinatorHandle, display_id: u32) -> CommandResult<()> {
    send(handle, CoordinatorEvent::AssignTouchscreen(DisplayId(display_id))).await
}

async fn send(handle: &CoordinatorHandle, event: CoordinatorEvent) -> CommandResult<()> {
    match handle.send(event).await {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;
    use touchup_core::{Frame, IdentityCue, NormalizedPoint};

    use crate::application::coordinator::{CoordinatorSettings, TouchDriver};
    use crate::application::display_registry::DisplayEnumerator;
    use crate::infrastructure::platform::mock::MockPlatform;

    fn coordinator_with(platform: &Arc<MockPlatform>, cue: IdentityCue) -> TouchscreenCoordinator {
        let mut c = TouchscreenCoordinator::new(
            Arc::clone(platform) as Arc<dyn DisplayEnumerator>,
            Arc::clone(platform) as Arc<dyn TouchDriver>,
            cue,
            CoordinatorSettings::default(),
        );
        c.displays_changed(Instant::now());
        c
    }

    fn panel() -> Display {
        Display::new(2, "Digital", Frame::new(1000.0, 0.0, 1000.0, 500.0), false)
    }

    #[test]
    fn test_status_symbols() {
        assert_eq!(status_symbol(ConnectionState::Uncertain), "rectangle.dashed");
        assert_eq!(status_symbol(ConnectionState::Disconnected), "rectangle.badge.xmark");
        assert_eq!(status_symbol(ConnectionState::ConnectedHotPlug), "hand.point.up.left");
        assert_eq!(status_symbol(ConnectionState::ConnectedPreferred), "hand.point.up.left");
    }

    #[test]
    fn test_default_snapshot_is_uncertain_and_empty() {
        let snapshot = StatusSnapshot::default();
        assert_eq!(snapshot.connection_state, "Uncertain");
        assert!(!snapshot.is_connected);
        assert!(snapshot.displays.is_empty());
    }

    #[test]
    fn test_snapshot_reports_selection_and_calibration_progress() {
        // Arrange
        let platform = Arc::new(MockPlatform::new(vec![panel()]));
        let c = coordinator_with(&platform, IdentityCue::new("Digital", 2));

        // Act
        let snapshot = StatusSnapshot::from_coordinator(&c);

        // Assert
        assert_eq!(snapshot.connection_state, "ConnectedPreferred");
        assert_eq!(snapshot.touchscreen.as_ref().map(|d| d.id), Some(2));
        let progress = snapshot.calibration.expect("auto-opened session");
        assert_eq!(progress.label, "0/4");
        assert_eq!(progress.next_corner.as_deref(), Some("top-left"));
        assert!((progress.next_target_x.expect("x") - 1050.0).abs() < 1e-9);
        assert!((progress.next_target_y.expect("y") - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_maps_touches_onto_touchscreen() {
        let platform = Arc::new(MockPlatform::new(vec![panel()]));
        let mut c = coordinator_with(&platform, IdentityCue::new("Digital", 2));
        c.touches_changed(
            vec![TouchPoint::began(3, NormalizedPoint::new(0.5, 0.5))],
            Instant::now(),
        );

        let snapshot = StatusSnapshot::from_coordinator(&c);

        let touch = &snapshot.touches[0];
        assert_eq!(touch.contact_id, 3);
        assert_eq!(touch.screen_x, Some(1500.0));
        assert_eq!(touch.screen_y, Some(250.0));
        assert_eq!(touch.phase, "Began");
    }

    #[test]
    fn test_snapshot_serialises_to_json() {
        let json = to_json(&StatusSnapshot::default()).expect("json");
        assert!(json.contains("\"status_symbol\":\"rectangle.dashed\""));
    }

    #[test]
    fn test_command_result_ok_sets_success_true() {
        let r: CommandResult<u32> = CommandResult::ok(99);
        assert!(r.success);
        assert_eq!(r.data, Some(99));
        assert!(r.error.is_none());
    }

    #[test]
    fn test_command_result_err_sets_success_false() {
        let r: CommandResult<u32> = CommandResult::err("oops");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.as_deref(), Some("oops"));
    }
}
