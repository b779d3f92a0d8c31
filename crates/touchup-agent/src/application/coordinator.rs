//! TouchscreenCoordinator: decides which display is the touchscreen and runs
//! calibration capture against it.
//!
//! The coordinator is the single owner of all mutable touchscreen state.  It
//! is driven by platform events (display reconfiguration, USB arrival, driver
//! connect/disconnect, touch snapshots) and by user intents (calibrate,
//! cancel, assign).  Each event method re-evaluates whatever the event can
//! affect and returns the [`Effect`]s the runtime must carry out: persisting
//! the identity cue, arming or cancelling the completion timer, and
//! publishing completion notices.
//!
//! # Resolution order
//!
//! ```text
//!  displays empty? ──yes──► clear selection, Uncertain
//!        │ no
//!  exact identity match? ──yes──► select, ConnectedPreferred / ConnectedHotPlug
//!        │ no
//!  hot-plug evidence? ──yes──► select, ConnectedHotPlug / ConnectedPreferred
//!        │ no                    (evidence consumed)
//!  connected and selection attached? ──yes──► keep selection
//!        │ no
//!  fallback chain ──► select, connection state untouched
//! ```
//!
//! # Architecture
//!
//! The coordinator owns no async machinery.  Time is passed in as `now` and
//! timers are requested through [`Effect::ScheduleCalibrationGrace`], so
//! every rule here is testable with plain `#[test]` functions.  The platform
//! is reached only through [`DisplayEnumerator`] and [`TouchDriver`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use touchup_core::{
    resolve_preferred, select_fallback, CalibrationMapping, CalibrationSession, ConnectionState,
    ConnectionStateMachine, Display, DisplayId, DriverSettings, HotPlugEvidence,
    HotPlugReconciler, IdentityCue, NormalizedPoint, Point, TouchPoint, Transition,
    COMPLETION_GRACE, HOT_PLUG_WINDOW, TAP_DEBOUNCE,
};
use uuid::Uuid;

use super::display_registry::{DisplayEnumerator, DisplayRegistry};

/// The touch driver as seen by the coordinator.
///
/// Infrastructure implementations talk to the native driver; tests use the
/// generated `MockTouchDriver` or the recording mock platform.
#[cfg_attr(test, mockall::automock)]
pub trait TouchDriver: Send + Sync {
    /// Forwards one captured (raw, screen) pair; `index` is the target `0..4`.
    fn record_calibration_point(
        &self,
        display: DisplayId,
        raw: NormalizedPoint,
        screen: Point,
        index: usize,
    );

    /// Installs the computed transform for `display`.
    fn commit_calibration(&self, display: DisplayId, mapping: &CalibrationMapping);

    /// Forgets any transform or recorded points for `display`.
    fn reset_calibration(&self, display: DisplayId);

    fn apply_settings(&self, settings: &DriverSettings);
}

/// Tunables of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub hot_plug_window: Duration,
    pub tap_debounce: Duration,
    pub completion_grace: Duration,
    /// Open a session automatically when the touchscreen is uncalibrated.
    pub auto_calibrate: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            hot_plug_window: HOT_PLUG_WINDOW,
            tap_debounce: TAP_DEBOUNCE,
            completion_grace: COMPLETION_GRACE,
            auto_calibrate: true,
        }
    }
}

/// Published when a calibration session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationCompleted {
    pub session: Uuid,
    pub display: DisplayId,
    /// `false` when the captured points were degenerate.
    pub calibrated: bool,
}

/// Work the runtime must perform on behalf of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the identity cue (fire-and-forget).
    PersistCue(IdentityCue),
    /// Call [`TouchscreenCoordinator::calibration_grace_elapsed`] with
    /// `session` after `delay`.
    ScheduleCalibrationGrace { session: Uuid, delay: Duration },
    /// Abort any pending grace timer.
    CancelCalibrationGrace,
    CalibrationCompleted(CalibrationCompleted),
}

/// Calibration progress, for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationProgress {
    pub session: Uuid,
    pub display: DisplayId,
    pub points_captured: usize,
    pub complete: bool,
}

/// Who opened the current calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionOrigin {
    /// Opened because the selected touchscreen was uncalibrated.
    Automatic,
    /// Opened by [`TouchscreenCoordinator::request_calibration`].
    Requested,
}

pub struct TouchscreenCoordinator {
    registry: DisplayRegistry,
    cue: IdentityCue,
    evidence: HotPlugEvidence,
    connection: ConnectionStateMachine,
    reconciler: HotPlugReconciler,
    selected: Option<DisplayId>,
    session: Option<CalibrationSession>,
    session_origin: SessionOrigin,
    /// Display whose automatic calibration the user cancelled.
    auto_open_suppressed: Option<DisplayId>,
    touches: Vec<TouchPoint>,
    /// Set after the first enumeration, whose displays are not arrivals.
    enumerated: bool,
    settings: CoordinatorSettings,
    enumerator: Arc<dyn DisplayEnumerator>,
    driver: Arc<dyn TouchDriver>,
}

impl TouchscreenCoordinator {
    /// Creates a coordinator with an empty display list.  Call
    /// [`displays_changed`](Self::displays_changed) once to take the initial
    /// enumeration.
    pub fn new(
        enumerator: Arc<dyn DisplayEnumerator>,
        driver: Arc<dyn TouchDriver>,
        cue: IdentityCue,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            registry: DisplayRegistry::new(),
            cue,
            evidence: HotPlugEvidence::new(),
            connection: ConnectionStateMachine::new(),
            reconciler: HotPlugReconciler::new(settings.hot_plug_window),
            selected: None,
            session: None,
            session_origin: SessionOrigin::Automatic,
            auto_open_suppressed: None,
            touches: Vec::new(),
            enumerated: false,
            settings,
            enumerator,
            driver,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn displays(&self) -> &[Display] {
        self.registry.displays()
    }

    pub fn cue(&self) -> &IdentityCue {
        &self.cue
    }

    pub fn evidence(&self) -> &HotPlugEvidence {
        &self.evidence
    }

    /// The display chosen by the last resolution, if still attached.
    pub fn selected(&self) -> Option<&Display> {
        self.selected.and_then(|id| self.registry.get(id))
    }

    /// The display touches are mapped onto: the selection, else the last
    /// enumerated display.
    pub fn touchscreen(&self) -> Option<&Display> {
        self.selected().or_else(|| self.registry.last())
    }

    pub fn touches(&self) -> &[TouchPoint] {
        &self.touches
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    pub fn calibration_progress(&self) -> Option<CalibrationProgress> {
        self.session.as_ref().map(|s| CalibrationProgress {
            session: s.id(),
            display: s.target_display(),
            points_captured: s.points_captured(),
            complete: s.is_complete(),
        })
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    // ── Platform events ───────────────────────────────────────────────────────

    /// The display configuration changed.
    pub fn displays_changed(&mut self, now: Instant) -> Vec<Effect> {
        let changes = self.registry.refresh(self.enumerator.as_ref());
        let initial = !std::mem::replace(&mut self.enumerated, true);
        if let Some(&arrived) = changes.added.first().filter(|_| !initial) {
            tracing::debug!(display = %arrived, "display arrival recorded");
            self.evidence.record_display_arrival(now, Some(arrived));
        }

        let mut effects = Vec::new();
        self.resolve(now, &mut effects);
        self.maybe_open_session(&mut effects);
        effects
    }

    /// A USB touch device was attached.
    pub fn usb_device_arrived(&mut self, now: Instant) -> Vec<Effect> {
        tracing::debug!("usb arrival recorded");
        self.evidence.record_usb_arrival(now);
        self.evidence.prune(now, self.settings.hot_plug_window);

        let mut effects = Vec::new();
        self.resolve_hot_plug(now);
        self.maybe_open_session(&mut effects);
        effects
    }

    /// The driver reported that the touchscreen connected.
    pub fn touchscreen_connected(&mut self, now: Instant) -> Vec<Effect> {
        self.evidence.record_display_arrival(now, None);

        let mut effects = Vec::new();
        self.resolve(now, &mut effects);
        self.maybe_open_session(&mut effects);
        effects
    }

    /// The driver reported that the touchscreen disconnected.
    pub fn touchscreen_disconnected(&mut self) -> Vec<Effect> {
        let transition = self.connection.on_driver_disconnect();
        log_transition(transition, "driver disconnect");
        Vec::new()
    }

    /// A new touch snapshot arrived.
    pub fn touches_changed(&mut self, touches: Vec<TouchPoint>, now: Instant) -> Vec<Effect> {
        self.touches = touches;

        let mut effects = Vec::new();
        self.maybe_open_session(&mut effects);

        let Some(session) = self.session.as_mut() else {
            return effects;
        };
        let target = session.target_display();
        let Some(frame) = self.registry.get(target).map(|d| d.frame) else {
            return effects;
        };
        let Some(captured) = session.offer(&self.touches, &frame, now) else {
            return effects;
        };

        self.driver.record_calibration_point(
            target,
            captured.pair.raw,
            captured.pair.screen,
            captured.index,
        );

        if session.is_complete() {
            let id = session.id();
            match session.compute_mapping() {
                Ok(mapping) => {
                    if let Some(display) = self.registry.get_mut(target) {
                        display.install_calibration(mapping);
                    }
                    self.driver.commit_calibration(target, &mapping);
                    tracing::info!(display = %target, "calibration installed");
                    effects.push(Effect::ScheduleCalibrationGrace {
                        session: id,
                        delay: self.settings.completion_grace,
                    });
                }
                Err(e) => {
                    tracing::warn!(display = %target, "calibration discarded: {e}");
                    self.session = None;
                    self.driver.reset_calibration(target);
                    effects.push(Effect::CalibrationCompleted(CalibrationCompleted {
                        session: id,
                        display: target,
                        calibrated: false,
                    }));
                    self.maybe_open_session(&mut effects);
                }
            }
        }
        effects
    }

    // ── User intents ──────────────────────────────────────────────────────────

    /// Starts calibrating `display` from scratch.  Any existing mapping on it
    /// is cleared and any running session is replaced.
    pub fn request_calibration(&mut self, id: DisplayId) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(target) = self.registry.get_mut(id) else {
            tracing::warn!(display = %id, "calibration requested for unknown display");
            return effects;
        };
        target.clear_calibration();
        self.driver.reset_calibration(id);

        if self.auto_open_suppressed == Some(id) {
            self.auto_open_suppressed = None;
        }
        self.open_session(id, SessionOrigin::Requested, &mut effects);
        effects
    }

    /// Abandons the active session, if any.
    pub fn cancel_calibration(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(session) = self.session.take() {
            tracing::info!(session = %session.id(), "calibration cancelled");
            if !session.is_complete() {
                self.auto_open_suppressed = Some(session.target_display());
            }
            effects.push(Effect::CancelCalibrationGrace);
        }
        effects
    }

    /// The user picked display `id` as the touchscreen.  Its identity becomes
    /// the new cue and resolution runs again.
    pub fn assign_touchscreen(&mut self, id: DisplayId, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(chosen) = self.registry.get(id) else {
            tracing::warn!(display = %id, "cannot assign unknown display");
            return effects;
        };

        self.cue = IdentityCue::from_display(chosen);
        tracing::info!(name = %self.cue.name, id = %self.cue.id, "touchscreen assigned");
        effects.push(Effect::PersistCue(self.cue.clone()));

        self.resolve(now, &mut effects);
        self.maybe_open_session(&mut effects);
        effects
    }

    /// The completion timer for `session` fired.
    pub fn calibration_grace_elapsed(&mut self, session: Uuid) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.session.as_ref().map(|s| s.id()) != Some(session) {
            tracing::debug!(session = %session, "ignoring stale calibration timer");
            return effects;
        }
        let Some(finished) = self.session.take() else {
            return effects;
        };

        let target = finished.target_display();
        let calibrated = self.registry.get(target).is_some_and(|d| d.is_calibrated());
        tracing::info!(session = %session, display = %target, calibrated, "calibration complete");
        effects.push(Effect::CalibrationCompleted(CalibrationCompleted {
            session,
            display: target,
            calibrated,
        }));

        self.maybe_open_session(&mut effects);
        effects
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    fn resolve(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        self.evidence.prune(now, self.settings.hot_plug_window);

        if self.registry.is_empty() {
            self.selected = None;
            log_transition(self.connection.on_displays_empty(), "no displays");
            self.drop_orphaned_session(effects);
            return;
        }

        let preferred = resolve_preferred(self.registry.displays(), &self.cue).map(|d| d.id);
        if let Some(id) = preferred {
            let pending = self
                .evidence
                .usb_arrival_within(now, self.settings.hot_plug_window);
            log_transition(self.connection.on_preferred_match(pending), "preferred match");
            self.select(id, "preferred");
        } else if !self.resolve_hot_plug(now) && !self.keeps_connected_selection() {
            let fallback = select_fallback(self.registry.displays())
                .map(|s| (s.display.id, s.rule.label()));
            if let Some((id, rule)) = fallback {
                self.select(id, rule);
            }
        }

        self.drop_orphaned_session(effects);
    }

    fn resolve_hot_plug(&mut self, now: Instant) -> bool {
        let found = self
            .reconciler
            .try_resolve(
                &self.evidence,
                self.registry.displays(),
                self.connection.state(),
                now,
            )
            .map(|d| (d.id, self.cue.score(d).is_exact()));

        let Some((id, matches_cue)) = found else {
            return false;
        };
        log_transition(self.connection.on_hot_plug_match(matches_cue), "hot-plug");
        self.evidence.clear();
        self.select(id, "hot-plug");
        true
    }

    /// A connected touchscreen stays selected while it is attached, even
    /// when a larger display would win the fallback chain.
    fn keeps_connected_selection(&self) -> bool {
        self.connection.state().is_connected() && self.selected().is_some()
    }

    fn select(&mut self, id: DisplayId, rule: &'static str) {
        if self.selected != Some(id) {
            tracing::info!(display = %id, rule, "touchscreen selected");
            self.selected = Some(id);
        }
    }

    /// Discards the session when its display is gone.
    fn drop_orphaned_session(&mut self, effects: &mut Vec<Effect>) {
        let orphaned = self
            .session
            .as_ref()
            .is_some_and(|s| self.registry.get(s.target_display()).is_none());
        if orphaned {
            if let Some(session) = self.session.take() {
                tracing::info!(
                    session = %session.id(),
                    display = %session.target_display(),
                    "calibration dropped: display detached"
                );
                effects.push(Effect::CancelCalibrationGrace);
            }
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    fn maybe_open_session(&mut self, effects: &mut Vec<Effect>) {
        if !self.settings.auto_calibrate {
            return;
        }
        self.retarget_auto_session(effects);
        if self.session.is_some() {
            return;
        }
        let Some(candidate) = self.selected() else {
            return;
        };
        if candidate.is_calibrated() || self.auto_open_suppressed == Some(candidate.id) {
            return;
        }
        let id = candidate.id;
        self.open_session(id, SessionOrigin::Automatic, effects);
    }

    /// Drops an unfinished automatic session once the selection moves off
    /// its display.  Sessions the user asked for stay put.
    fn retarget_auto_session(&mut self, effects: &mut Vec<Effect>) {
        let stale = self.session_origin == SessionOrigin::Automatic
            && self.session.as_ref().is_some_and(|s| {
                !s.is_complete() && Some(s.target_display()) != self.selected
            });
        if !stale {
            return;
        }
        if let Some(session) = self.session.take() {
            tracing::info!(
                session = %session.id(),
                display = %session.target_display(),
                "calibration abandoned: touchscreen selection moved"
            );
            effects.push(Effect::CancelCalibrationGrace);
        }
    }

    fn open_session(&mut self, id: DisplayId, origin: SessionOrigin, effects: &mut Vec<Effect>) {
        if self.session.take().is_some() {
            effects.push(Effect::CancelCalibrationGrace);
        }
        let session = CalibrationSession::new(id, self.settings.tap_debounce);
        tracing::info!(session = %session.id(), display = %id, ?origin, "calibration started");
        self.session = Some(session);
        self.session_origin = origin;
    }
}

fn log_transition(transition: Option<Transition>, cause: &str) {
    if let Some(t) = transition {
        tracing::info!(from = ?t.from, to = ?t.to, cause, "connection state changed");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
