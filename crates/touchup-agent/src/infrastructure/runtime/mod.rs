//! Coordinator runtime: runs the [`TouchscreenCoordinator`] as a Tokio task.
//!
//! # Actor model (for beginners)
//!
//! The coordinator is not thread-safe and does not need to be: exactly one
//! task owns it.  Everything else talks to that task through channels:
//!
//! ```text
//!  platform callbacks ─┐                                 ┌─► watch<StatusSnapshot>
//!  shell commands ─────┼─► mpsc<CoordinatorEvent> ─► actor ─┼─► broadcast<CalibrationCompleted>
//!  grace timer ────────┘                                 └─► IdentityStore (spawned)
//! ```
//!
//! Events are handled strictly one at a time in arrival order, so the
//! coordinator never observes a half-applied change.
//!
//! # Timers
//!
//! The completion grace timer is a spawned `sleep` that sends
//! [`CoordinatorEvent::CalibrationGraceElapsed`] back into the actor's own
//! queue through a weak sender, so a pending timer never keeps the actor
//! alive after every [`CoordinatorHandle`] is dropped.  Time comes from
//! `tokio::time::Instant`, which lets tests pause and advance the clock.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use touchup_core::{DisplayId, TouchPoint};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::coordinator::{CalibrationCompleted, Effect, TouchscreenCoordinator};
use crate::infrastructure::storage::identity::IdentityStore;
use crate::infrastructure::ui_bridge::StatusSnapshot;

const EVENT_QUEUE_CAPACITY: usize = 256;
const COMPLETION_CHANNEL_CAPACITY: usize = 16;

/// Inputs to the coordinator task.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// The display configuration changed.
    DisplaysChanged,
    /// A USB device was attached.
    UsbDeviceArrived,
    /// The touch driver reported the touchscreen connected.
    TouchscreenConnected,
    TouchscreenDisconnected,
    /// Full set of current contacts.
    Touches(Vec<TouchPoint>),
    RequestCalibration(DisplayId),
    CancelCalibration,
    AssignTouchscreen(DisplayId),
    /// Sent by the grace timer armed for `session`.
    CalibrationGraceElapsed(Uuid),
    /// Replies with the status after all earlier events were handled.
    Snapshot(oneshot::Sender<StatusSnapshot>),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("coordinator task has stopped")]
    Stopped,
}

/// Cloneable handle to the running coordinator.
///
/// The task stops once every handle is dropped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::Sender<CoordinatorEvent>,
    status: watch::Receiver<StatusSnapshot>,
    completions: broadcast::Sender<CalibrationCompleted>,
}

impl CoordinatorHandle {
    pub async fn send(&self, event: CoordinatorEvent) -> Result<(), RuntimeError> {
        self.events.send(event).await.map_err(|_| RuntimeError::Stopped)
    }

    /// Queues an event without waiting.  Used from platform callbacks that
    /// cannot await; a full queue drops the event with a warning.
    pub fn try_send(&self, event: CoordinatorEvent) -> Result<(), RuntimeError> {
        match self.events.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("coordinator queue full, dropping {event:?}");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RuntimeError::Stopped),
        }
    }

    /// Status as of every event handled so far.
    pub async fn snapshot(&self) -> Result<StatusSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorEvent::Snapshot(reply)).await?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Latest published status, without waiting for queued events.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    /// Receiver that is notified after every handled event.
    pub fn watch_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<CalibrationCompleted> {
        self.completions.subscribe()
    }
}

/// Spawns the coordinator task.
///
/// The task takes the initial display enumeration before handling any
/// queued event.
pub fn spawn_coordinator(
    coordinator: TouchscreenCoordinator,
    store: Arc<dyn IdentityStore>,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());
    let (completions_tx, _) = broadcast::channel(COMPLETION_CHANNEL_CAPACITY);

    let actor = CoordinatorActor {
        coordinator,
        store,
        timer_tx: events_tx.downgrade(),
        status_tx,
        completions_tx: completions_tx.clone(),
        grace_timer: None,
    };
    let task = tokio::spawn(actor.run(events_rx));

    let handle = CoordinatorHandle {
        events: events_tx,
        status: status_rx,
        completions: completions_tx,
    };
    (handle, task)
}

struct CoordinatorActor {
    coordinator: TouchscreenCoordinator,
    store: Arc<dyn IdentityStore>,
    timer_tx: mpsc::WeakSender<CoordinatorEvent>,
    status_tx: watch::Sender<StatusSnapshot>,
    completions_tx: broadcast::Sender<CalibrationCompleted>,
    grace_timer: Option<JoinHandle<()>>,
}

impl CoordinatorActor {
    async fn run(mut self, mut events: mpsc::Receiver<CoordinatorEvent>) {
        info!("coordinator started");
        let effects = self.coordinator.displays_changed(now());
        self.apply(effects);

        while let Some(event) = events.recv().await {
            let effects = self.handle(event);
            self.apply(effects);
        }

        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
        }
        info!("coordinator stopped");
    }

    fn handle(&mut self, event: CoordinatorEvent) -> Vec<Effect> {
        let c = &mut self.coordinator;
        match event {
            CoordinatorEvent::DisplaysChanged => c.displays_changed(now()),
            CoordinatorEvent::UsbDeviceArrived => c.usb_device_arrived(now()),
            CoordinatorEvent::TouchscreenConnected => c.touchscreen_connected(now()),
            CoordinatorEvent::TouchscreenDisconnected => c.touchscreen_disconnected(),
            CoordinatorEvent::Touches(touches) => c.touches_changed(touches, now()),
            CoordinatorEvent::RequestCalibration(id) => c.request_calibration(id),
            CoordinatorEvent::CancelCalibration => c.cancel_calibration(),
            CoordinatorEvent::AssignTouchscreen(id) => c.assign_touchscreen(id, now()),
            CoordinatorEvent::CalibrationGraceElapsed(session) => {
                c.calibration_grace_elapsed(session)
            }
            CoordinatorEvent::Snapshot(reply) => {
                // The caller may have given up waiting.
                let _ = reply.send(StatusSnapshot::from_coordinator(c));
                Vec::new()
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PersistCue(cue) => {
                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        match store.save_cue(&cue).await {
                            Ok(()) => debug!(name = %cue.name, id = %cue.id, "identity cue saved"),
                            Err(e) => warn!("failed to persist identity cue: {e}"),
                        }
                    });
                }
                Effect::ScheduleCalibrationGrace { session, delay } => {
                    self.cancel_grace_timer();
                    let tx = self.timer_tx.clone();
                    self.grace_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(tx) = tx.upgrade() {
                            let _ = tx.send(CoordinatorEvent::CalibrationGraceElapsed(session)).await;
                        }
                    }));
                }
                Effect::CancelCalibrationGrace => self.cancel_grace_timer(),
                Effect::CalibrationCompleted(done) => {
                    info!(
                        session = %done.session,
                        display = ?done.display,
                        calibrated = done.calibrated,
                        "calibration finished"
                    );
                    // No subscribers is fine.
                    let _ = self.completions_tx.send(done);
                }
            }
        }
        self.status_tx
            .send_replace(StatusSnapshot::from_coordinator(&self.coordinator));
    }

    fn cancel_grace_timer(&mut self) {
        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
        }
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use touchup_core::{Display, Frame, IdentityCue, NormalizedPoint};

    use crate::application::coordinator::{CoordinatorSettings, TouchDriver};
    use crate::application::display_registry::DisplayEnumerator;
    use crate::infrastructure::platform::mock::MockPlatform;
    use crate::infrastructure::storage::identity::InMemoryIdentityStore;

    fn start(
        platform: &Arc<MockPlatform>,
        store: &Arc<InMemoryIdentityStore>,
        cue: IdentityCue,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let coordinator = TouchscreenCoordinator::new(
            Arc::clone(platform) as Arc<dyn DisplayEnumerator>,
            Arc::clone(platform) as Arc<dyn TouchDriver>,
            cue,
            CoordinatorSettings::default(),
        );
        spawn_coordinator(coordinator, Arc::clone(store) as Arc<dyn IdentityStore>)
    }

    fn tap(x: f64, y: f64) -> CoordinatorEvent {
        CoordinatorEvent::Touches(vec![TouchPoint::began(0, NormalizedPoint::new(x, y))])
    }

    #[tokio::test]
    async fn test_initial_enumeration_happens_before_first_event() {
        // Arrange
        let platform = Arc::new(MockPlatform::demo());
        let store = Arc::new(InMemoryIdentityStore::new());

        // Act
        let (handle, _task) = start(&platform, &store, IdentityCue::new("Digital", 2));
        let status = handle.snapshot().await.expect("running");

        // Assert
        assert_eq!(status.displays.len(), 2);
        assert_eq!(status.connection_state, "ConnectedPreferred");
        assert_eq!(status.touchscreen.map(|d| d.id), Some(2));
    }

    #[tokio::test]
    async fn test_assign_persists_cue_through_store() {
        let platform = Arc::new(MockPlatform::demo());
        let store = Arc::new(InMemoryIdentityStore::new());
        let (handle, _task) = start(&platform, &store, IdentityCue::default());

        handle
            .send(CoordinatorEvent::AssignTouchscreen(DisplayId(1)))
            .await
            .unwrap();
        let status = handle.snapshot().await.unwrap();
        // Let the spawned persistence task run.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(status.touchscreen.map(|d| d.id), Some(1));
        assert_eq!(
            store.saved(),
            vec![IdentityCue::new("Built-in Retina Display", 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_timer_publishes_completion() {
        // Arrange
        let platform = Arc::new(MockPlatform::demo());
        let store = Arc::new(InMemoryIdentityStore::new());
        let (handle, _task) = start(&platform, &store, IdentityCue::default());
        let mut completions = handle.subscribe_completions();

        // Act
        for (x, y) in [(0.05, 0.05), (0.95, 0.05), (0.05, 0.95), (0.95, 0.95)] {
            handle.send(tap(x, y)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
        let during_grace = handle.snapshot().await.unwrap();
        let done = completions.recv().await.expect("completion");

        // Assert
        assert_eq!(during_grace.calibration.map(|p| p.label), Some("4/4".to_string()));
        assert!(done.calibrated);
        assert_eq!(done.display, DisplayId(2));
        assert_eq!(platform.commits().len(), 1);
        let after = handle.snapshot().await.unwrap();
        assert!(after.calibration.is_none());
        assert!(after.touchscreen.expect("selected").is_calibrated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recalibration_request_cancels_pending_grace() {
        let platform = Arc::new(MockPlatform::demo());
        let store = Arc::new(InMemoryIdentityStore::new());
        let (handle, _task) = start(&platform, &store, IdentityCue::default());
        let mut completions = handle.subscribe_completions();
        for (x, y) in [(0.05, 0.05), (0.95, 0.05), (0.05, 0.95), (0.95, 0.95)] {
            handle.send(tap(x, y)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
        }

        handle
            .send(CoordinatorEvent::RequestCalibration(DisplayId(2)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(completions.try_recv().is_err());
        let status = handle.snapshot().await.unwrap();
        assert_eq!(status.calibration.map(|p| p.label), Some("0/4".to_string()));
    }

    #[tokio::test]
    async fn test_task_stops_when_all_handles_dropped() {
        let platform = Arc::new(MockPlatform::new(vec![Display::new(
            7,
            "Digital",
            Frame::new(0.0, 0.0, 800.0, 600.0),
            true,
        )]));
        let store = Arc::new(InMemoryIdentityStore::new());
        let (handle, task) = start(&platform, &store, IdentityCue::default());

        drop(handle);

        tokio_test::assert_ok!(task.await);
    }
}
