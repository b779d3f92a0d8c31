//! Hot-plug reconciliation.
//!
//! Plugging in a USB touch monitor produces two independent notifications:
//! the HID device arrives on the USB bus, and a new display appears in the
//! display list.  They are delivered asynchronously and in either order.
//! When both happened within [`HOT_PLUG_WINDOW`] of each other (measured
//! from "now"), the newly arrived display is taken to be the touchscreen.
//!
//! # Evidence lifetime
//!
//! Evidence older than the window is treated as absent and dropped by
//! [`HotPlugEvidence::prune`].  A successful resolution consumes the evidence
//! ([`HotPlugEvidence::clear`]) so the same plug-in can never be attributed
//! to a second display later on.

use std::time::{Duration, Instant};

use super::connection::ConnectionState;
use super::display::{Display, DisplayId};

/// Maximum age of a USB or display arrival for it to count as hot-plug evidence.
pub const HOT_PLUG_WINDOW: Duration = Duration::from_secs(10);

/// Timestamps of the most recent USB and display arrivals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotPlugEvidence {
    last_usb_arrival: Option<Instant>,
    last_display_arrival: Option<Instant>,
    last_arrived_display: Option<DisplayId>,
}

impl HotPlugEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A USB touch device was attached.
    pub fn record_usb_arrival(&mut self, now: Instant) {
        self.last_usb_arrival = Some(now);
    }

    /// A display arrived.  `display` is `None` when the signal did not say
    /// which one (e.g. the driver's "connected" notification); the id of the
    /// previous arrival is kept in that case.
    pub fn record_display_arrival(&mut self, now: Instant, display: Option<DisplayId>) {
        self.last_display_arrival = Some(now);
        if let Some(id) = display {
            self.last_arrived_display = Some(id);
        }
    }

    pub fn last_usb_arrival(&self) -> Option<Instant> {
        self.last_usb_arrival
    }

    pub fn last_display_arrival(&self) -> Option<Instant> {
        self.last_display_arrival
    }

    pub fn last_arrived_display(&self) -> Option<DisplayId> {
        self.last_arrived_display
    }

    /// Returns `true` if a USB arrival is recorded inside `window`.
    pub fn usb_arrival_within(&self, now: Instant, window: Duration) -> bool {
        within(self.last_usb_arrival, now, window)
    }

    /// Drops timestamps that have fallen out of `window`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        if !within(self.last_usb_arrival, now, window) {
            self.last_usb_arrival = None;
        }
        if !within(self.last_display_arrival, now, window) {
            self.last_display_arrival = None;
            self.last_arrived_display = None;
        }
    }

    /// Forgets everything.  Called once the evidence has been used.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn within(at: Option<Instant>, now: Instant, window: Duration) -> bool {
    at.is_some_and(|at| now.saturating_duration_since(at) < window)
}

/// Resolves the touchscreen from [`HotPlugEvidence`].
#[derive(Debug, Clone, Copy)]
pub struct HotPlugReconciler {
    window: Duration,
}

impl Default for HotPlugReconciler {
    fn default() -> Self {
        Self::new(HOT_PLUG_WINDOW)
    }
}

impl HotPlugReconciler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Returns the display that just arrived, if the evidence supports it.
    ///
    /// Never resolves while `state` is already connected: stale evidence must
    /// not preempt an established connection.
    pub fn try_resolve<'a>(
        &self,
        evidence: &HotPlugEvidence,
        displays: &'a [Display],
        state: ConnectionState,
        now: Instant,
    ) -> Option<&'a Display> {
        if state.is_connected() {
            tracing::debug!("hot-plug skipped: already connected");
            return None;
        }

        if !within(evidence.last_usb_arrival, now, self.window)
            || !within(evidence.last_display_arrival, now, self.window)
        {
            return None;
        }

        let arrived = evidence.last_arrived_display?;
        let found = displays.iter().find(|d| d.id == arrived);
        if found.is_none() {
            tracing::debug!(display = %arrived, "hot-plug failed: arrived display is gone");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::display::Frame;

    fn displays() -> Vec<Display> {
        vec![
            Display::new(1, "Built-in Retina Display", Frame::new(0.0, 0.0, 1512.0, 982.0), true),
            Display::new(2, "Digital", Frame::new(1512.0, 0.0, 1920.0, 1080.0), false),
        ]
    }

    fn fresh_evidence(base: Instant, id: u32) -> HotPlugEvidence {
        let mut evidence = HotPlugEvidence::new();
        evidence.record_usb_arrival(base);
        evidence.record_display_arrival(base, Some(DisplayId(id)));
        evidence
    }

    #[test]
    fn test_resolves_arrived_display_within_window() {
        // Arrange
        let base = Instant::now();
        let evidence = fresh_evidence(base, 2);
        let displays = displays();

        // Act
        let found = HotPlugReconciler::default().try_resolve(
            &evidence,
            &displays,
            ConnectionState::Uncertain,
            base + Duration::from_secs(3),
        );

        // Assert
        assert_eq!(found.map(|d| d.id), Some(DisplayId(2)));
    }

    #[test]
    fn test_never_resolves_while_connected() {
        let base = Instant::now();
        let evidence = fresh_evidence(base, 2);
        let displays = displays();
        let reconciler = HotPlugReconciler::default();

        for state in [ConnectionState::ConnectedHotPlug, ConnectionState::ConnectedPreferred] {
            assert!(reconciler
                .try_resolve(&evidence, &displays, state, base + Duration::from_secs(1))
                .is_none());
        }
    }

    #[test]
    fn test_stale_usb_arrival_never_resolves() {
        // Arrange: USB arrival 11 s ago, display arrival just now.
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        evidence.record_usb_arrival(base);
        let now = base + Duration::from_secs(11);
        evidence.record_display_arrival(now, Some(DisplayId(2)));

        // Act
        let displays = displays();
        let found = HotPlugReconciler::default().try_resolve(
            &evidence,
            &displays,
            ConnectionState::Uncertain,
            now,
        );

        // Assert
        assert!(found.is_none());
    }

    #[test]
    fn test_stale_display_arrival_never_resolves() {
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        evidence.record_display_arrival(base, Some(DisplayId(2)));
        let now = base + Duration::from_secs(12);
        evidence.record_usb_arrival(now);

        let displays = displays();
        let found = HotPlugReconciler::default().try_resolve(
            &evidence,
            &displays,
            ConnectionState::Disconnected,
            now,
        );

        assert!(found.is_none());
    }

    #[test]
    fn test_missing_usb_arrival_never_resolves() {
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        evidence.record_display_arrival(base, Some(DisplayId(2)));

        let displays = displays();
        let found = HotPlugReconciler::default().try_resolve(
            &evidence,
            &displays,
            ConnectionState::Uncertain,
            base,
        );

        assert!(found.is_none());
    }

    #[test]
    fn test_arrived_display_no_longer_present_fails() {
        let base = Instant::now();
        let evidence = fresh_evidence(base, 99);

        let displays = displays();
        let found = HotPlugReconciler::default().try_resolve(
            &evidence,
            &displays,
            ConnectionState::Uncertain,
            base,
        );

        assert!(found.is_none());
    }

    #[test]
    fn test_display_arrival_without_id_keeps_previous_id() {
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        evidence.record_display_arrival(base, Some(DisplayId(2)));

        evidence.record_display_arrival(base + Duration::from_secs(1), None);

        assert_eq!(evidence.last_arrived_display(), Some(DisplayId(2)));
        assert_eq!(evidence.last_display_arrival(), Some(base + Duration::from_secs(1)));
    }

    #[test]
    fn test_prune_drops_only_expired_timestamps() {
        // Arrange
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        evidence.record_display_arrival(base, Some(DisplayId(2)));
        evidence.record_usb_arrival(base + Duration::from_secs(8));

        // Act
        evidence.prune(base + Duration::from_secs(10), HOT_PLUG_WINDOW);

        // Assert
        assert_eq!(evidence.last_display_arrival(), None);
        assert_eq!(evidence.last_arrived_display(), None);
        assert!(evidence.last_usb_arrival().is_some());
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut evidence = fresh_evidence(Instant::now(), 2);
        evidence.clear();
        assert_eq!(evidence, HotPlugEvidence::default());
    }

    #[test]
    fn test_usb_arrival_within_window() {
        let base = Instant::now();
        let mut evidence = HotPlugEvidence::new();
        assert!(!evidence.usb_arrival_within(base, HOT_PLUG_WINDOW));

        evidence.record_usb_arrival(base);

        assert!(evidence.usb_arrival_within(base + Duration::from_secs(9), HOT_PLUG_WINDOW));
        assert!(!evidence.usb_arrival_within(base + Duration::from_secs(10), HOT_PLUG_WINDOW));
    }
}
