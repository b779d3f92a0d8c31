//! Connection lifecycle of the touchscreen.
//!
//! ```text
//!             displays empty (from any state)
//!      ┌──────────────────────────────────────────┐
//!      ▼                                          │
//!  Uncertain ──► ConnectedHotPlug ◄──► ConnectedPreferred
//!      ▲                 │                 │
//!      │                 └──── driver ─────┤
//!      │                    disconnect     ▼
//!      └──────────── (resolution) ──── Disconnected
//! ```
//!
//! The state is only ever changed through [`ConnectionStateMachine`], whose
//! methods are named after the events allowed to cause a transition.  Display
//! list changes alone never demote a connected state, so bursts of
//! reconfiguration notifications do not make the status icon flap.

use serde::{Deserialize, Serialize};

/// Coarse connection state surfaced to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No determination made yet, or no displays attached.
    #[default]
    Uncertain,
    /// The driver reported that the touch device went away.
    Disconnected,
    /// Connected as a result of a hot-plug within the last few seconds.
    ConnectedHotPlug,
    /// Connected to the display matching the stored identity cue.
    ConnectedPreferred,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedHotPlug | ConnectionState::ConnectedPreferred
        )
    }
}

/// A state change, returned so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Owner of the current [`ConnectionState`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The display list became empty.
    pub fn on_displays_empty(&mut self) -> Option<Transition> {
        self.set(ConnectionState::Uncertain)
    }

    /// The identity matcher found an exact match.
    ///
    /// `hot_plug_pending` is `true` when a USB arrival is still inside the
    /// hot-plug window, i.e. the match is a consequence of a plug-in rather
    /// than of a steady-state scan.
    pub fn on_preferred_match(&mut self, hot_plug_pending: bool) -> Option<Transition> {
        if hot_plug_pending {
            self.set(ConnectionState::ConnectedHotPlug)
        } else {
            self.set(ConnectionState::ConnectedPreferred)
        }
    }

    /// The hot-plug reconciler resolved a display.  `matches_cue` upgrades
    /// the result to `ConnectedPreferred`.
    pub fn on_hot_plug_match(&mut self, matches_cue: bool) -> Option<Transition> {
        if matches_cue {
            self.set(ConnectionState::ConnectedPreferred)
        } else {
            self.set(ConnectionState::ConnectedHotPlug)
        }
    }

    /// The driver explicitly reported a disconnect.
    pub fn on_driver_disconnect(&mut self) -> Option<Transition> {
        self.set(ConnectionState::Disconnected)
    }

    fn set(&mut self, to: ConnectionState) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        Some(Transition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_uncertain() {
        assert_eq!(ConnectionStateMachine::new().state(), ConnectionState::Uncertain);
    }

    #[test]
    fn test_is_connected_only_for_connected_variants() {
        assert!(!ConnectionState::Uncertain.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::ConnectedHotPlug.is_connected());
        assert!(ConnectionState::ConnectedPreferred.is_connected());
    }

    #[test]
    fn test_preferred_match_without_pending_hot_plug_is_preferred() {
        let mut machine = ConnectionStateMachine::new();

        let transition = machine.on_preferred_match(false);

        assert_eq!(
            transition,
            Some(Transition {
                from: ConnectionState::Uncertain,
                to: ConnectionState::ConnectedPreferred,
            })
        );
    }

    #[test]
    fn test_preferred_match_with_pending_hot_plug_is_hot_plug() {
        let mut machine = ConnectionStateMachine::new();
        machine.on_preferred_match(true);
        assert_eq!(machine.state(), ConnectionState::ConnectedHotPlug);
    }

    #[test]
    fn test_hot_plug_match_upgrades_when_cue_matches() {
        let mut machine = ConnectionStateMachine::new();
        machine.on_driver_disconnect();

        machine.on_hot_plug_match(true);

        assert_eq!(machine.state(), ConnectionState::ConnectedPreferred);
    }

    #[test]
    fn test_driver_disconnect_from_connected() {
        let mut machine = ConnectionStateMachine::new();
        machine.on_hot_plug_match(false);

        let transition = machine.on_driver_disconnect();

        assert_eq!(transition.map(|t| t.to), Some(ConnectionState::Disconnected));
    }

    #[test]
    fn test_empty_displays_returns_to_uncertain_from_any_state() {
        let mut disconnected = ConnectionStateMachine::new();
        disconnected.on_driver_disconnect();
        let mut hot_plug = ConnectionStateMachine::new();
        hot_plug.on_hot_plug_match(false);
        let mut preferred = ConnectionStateMachine::new();
        preferred.on_preferred_match(false);

        for mut machine in [disconnected, hot_plug, preferred] {
            machine.on_displays_empty();
            assert_eq!(machine.state(), ConnectionState::Uncertain);
        }
    }

    #[test]
    fn test_repeated_transition_to_same_state_reports_nothing() {
        let mut machine = ConnectionStateMachine::new();
        machine.on_preferred_match(false);
        assert_eq!(machine.on_preferred_match(false), None);
    }
}
