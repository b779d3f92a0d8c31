//! DisplayRegistry: the latest enumeration of attached displays.
//!
//! The registry never patches entries.  Every refresh replaces the whole list
//! with what the platform reports, in the platform's order, and the diff
//! against the previous list is returned so the caller can record display
//! arrivals as hot-plug evidence.

use std::collections::HashSet;

use thiserror::Error;
use touchup_core::{Display, DisplayId};

/// Error type for platform display queries.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The OS refused or failed to list displays.
    #[error("display enumeration failed: {0}")]
    Enumeration(String),
}

/// Platform seam for listing attached displays.
///
/// Implementations return displays in the platform's enumeration order.  The
/// order matters: it is the tie-break for every selection rule.
pub trait DisplayEnumerator: Send + Sync {
    fn enumerate_displays(&self) -> Result<Vec<Display>, PlatformError>;
}

/// Ids that appeared or disappeared in a refresh, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayChanges {
    pub added: Vec<DisplayId>,
    pub removed: Vec<DisplayId>,
}

impl DisplayChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DisplayRegistry {
    displays: Vec<Display>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-enumerates and replaces the list.
    ///
    /// An enumeration failure keeps the previous list and reports no change;
    /// the next reconfiguration event will try again.
    pub fn refresh(&mut self, enumerator: &dyn DisplayEnumerator) -> DisplayChanges {
        match enumerator.enumerate_displays() {
            Ok(displays) => self.replace(displays),
            Err(e) => {
                tracing::warn!("keeping previous display list: {e}");
                DisplayChanges::default()
            }
        }
    }

    /// Replaces the list with `displays` and returns the diff.
    ///
    /// Calibration mappings already installed on a display carry over when
    /// the platform reports the same id again without one.
    pub fn replace(&mut self, mut displays: Vec<Display>) -> DisplayChanges {
        let before: HashSet<DisplayId> = self.displays.iter().map(|d| d.id).collect();
        let after: HashSet<DisplayId> = displays.iter().map(|d| d.id).collect();

        for display in displays.iter_mut().filter(|d| d.calibration.is_none()) {
            if let Some(previous) = self.get(display.id) {
                display.calibration = previous.calibration;
            }
        }

        let changes = DisplayChanges {
            added: displays
                .iter()
                .map(|d| d.id)
                .filter(|id| !before.contains(id))
                .collect(),
            removed: self
                .displays
                .iter()
                .map(|d| d.id)
                .filter(|id| !after.contains(id))
                .collect(),
        };

        if !changes.is_empty() {
            tracing::debug!(
                added = ?changes.added,
                removed = ?changes.removed,
                total = displays.len(),
                "display list changed"
            );
        }
        self.displays = displays;
        changes
    }

    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn get(&self, id: DisplayId) -> Option<&Display> {
        self.displays.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DisplayId) -> Option<&mut Display> {
        self.displays.iter_mut().find(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    /// The last display in enumeration order.
    pub fn last(&self) -> Option<&Display> {
        self.displays.last()
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchup_core::{CalibrationMapping, CalibrationPair, Frame, NormalizedPoint, Point};

    struct FixedEnumerator(Result<Vec<Display>, String>);

    impl DisplayEnumerator for FixedEnumerator {
        fn enumerate_displays(&self) -> Result<Vec<Display>, PlatformError> {
            self.0.clone().map_err(PlatformError::Enumeration)
        }
    }

    fn display(id: u32) -> Display {
        Display::new(id, format!("display-{id}"), Frame::new(0.0, 0.0, 1920.0, 1080.0), id == 1)
    }

    fn mapping() -> CalibrationMapping {
        let pairs = [
            CalibrationPair::new(NormalizedPoint::new(0.0, 0.0), Point::new(0.0, 0.0)),
            CalibrationPair::new(NormalizedPoint::new(1.0, 0.0), Point::new(1920.0, 0.0)),
            CalibrationPair::new(NormalizedPoint::new(0.0, 1.0), Point::new(0.0, 1080.0)),
            CalibrationPair::new(NormalizedPoint::new(1.0, 1.0), Point::new(1920.0, 1080.0)),
        ];
        CalibrationMapping::from_pairs(&pairs).expect("mapping")
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = DisplayRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.last().is_none());
    }

    #[test]
    fn test_refresh_reports_added_displays_in_order() {
        // Arrange
        let mut registry = DisplayRegistry::new();
        let enumerator = FixedEnumerator(Ok(vec![display(1), display(2)]));

        // Act
        let changes = registry.refresh(&enumerator);

        // Assert
        assert_eq!(changes.added, vec![DisplayId(1), DisplayId(2)]);
        assert!(changes.removed.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_replace_reports_removed_displays() {
        let mut registry = DisplayRegistry::new();
        registry.replace(vec![display(1), display(2)]);

        let changes = registry.replace(vec![display(1)]);

        assert!(changes.added.is_empty());
        assert_eq!(changes.removed, vec![DisplayId(2)]);
        assert!(registry.get(DisplayId(2)).is_none());
    }

    #[test]
    fn test_replace_with_empty_list_is_valid() {
        let mut registry = DisplayRegistry::new();
        registry.replace(vec![display(1)]);

        let changes = registry.replace(Vec::new());

        assert!(registry.is_empty());
        assert_eq!(changes.removed, vec![DisplayId(1)]);
    }

    #[test]
    fn test_enumeration_failure_keeps_previous_list() {
        // Arrange
        let mut registry = DisplayRegistry::new();
        registry.replace(vec![display(1), display(2)]);
        let failing = FixedEnumerator(Err("CGGetActiveDisplayList failed".to_string()));

        // Act
        let changes = registry.refresh(&failing);

        // Assert
        assert!(changes.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_installed_calibration_survives_refresh() {
        let mut registry = DisplayRegistry::new();
        registry.replace(vec![display(1), display(2)]);
        registry
            .get_mut(DisplayId(2))
            .expect("present")
            .install_calibration(mapping());

        registry.replace(vec![display(2), display(1)]);

        assert!(registry.get(DisplayId(2)).expect("present").is_calibrated());
        assert_eq!(registry.last().map(|d| d.id), Some(DisplayId(1)));
    }
}
