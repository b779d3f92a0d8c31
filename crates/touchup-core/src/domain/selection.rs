//! Fallback selection policy.
//!
//! Used when neither the remembered identity nor hot-plug evidence points at
//! a display.  The rules form a chain of responsibility: each [`SelectionRule`]
//! either picks a display or passes, and the first rule that picks wins.
//!
//! | Order | Rule                | Rationale                                      |
//! |-------|---------------------|------------------------------------------------|
//! | 1     | `LargestCalibrated` | a calibrated panel is almost certainly touch   |
//! | 2     | `LargestExternal`   | built-in displays are rarely touch panels      |
//! | 3     | `Main`              | the main display is a safe default             |
//! | 4     | `Last`              | always applies to a non-empty list             |
//!
//! Rule 4 makes the chain total: any non-empty list yields exactly one
//! display, and the same list always yields the same display.

use super::display::Display;

/// One link in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    LargestCalibrated,
    LargestExternal,
    Main,
    Last,
}

impl SelectionRule {
    /// The chain, in evaluation order.
    pub const CHAIN: [SelectionRule; 4] = [
        SelectionRule::LargestCalibrated,
        SelectionRule::LargestExternal,
        SelectionRule::Main,
        SelectionRule::Last,
    ];

    /// Applies this rule alone; `None` passes to the next rule.
    pub fn select(self, displays: &[Display]) -> Option<&Display> {
        match self {
            SelectionRule::LargestCalibrated => {
                largest(displays.iter().filter(|d| d.is_calibrated()))
            }
            SelectionRule::LargestExternal => largest(displays.iter().filter(|d| !d.is_main)),
            SelectionRule::Main => displays.iter().find(|d| d.is_main),
            SelectionRule::Last => displays.last(),
        }
    }

    /// Short label used in log output.
    pub fn label(self) -> &'static str {
        match self {
            SelectionRule::LargestCalibrated => "calibrated",
            SelectionRule::LargestExternal => "external",
            SelectionRule::Main => "main",
            SelectionRule::Last => "last",
        }
    }
}

/// A display picked by the fallback chain, with the rule that picked it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub display: &'a Display,
    pub rule: SelectionRule,
}

/// Runs the fallback chain.  Returns `None` only for an empty list.
pub fn select_fallback(displays: &[Display]) -> Option<Selection<'_>> {
    SelectionRule::CHAIN.iter().find_map(|&rule| {
        rule.select(displays)
            .map(|display| Selection { display, rule })
    })
}

/// Largest area; on equal area the earliest in enumeration order wins.
fn largest<'a>(candidates: impl Iterator<Item = &'a Display>) -> Option<&'a Display> {
    let mut best: Option<&'a Display> = None;
    for d in candidates {
        match best {
            Some(b) if b.frame.area() >= d.frame.area() => {}
            _ => best = Some(d),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::transform::{CalibrationMapping, CalibrationPair};
    use crate::domain::display::{DisplayId, Frame, NormalizedPoint, Point};

    fn identity_mapping() -> CalibrationMapping {
        let pairs = [
            CalibrationPair::new(NormalizedPoint::new(0.0, 0.0), Point::new(0.0, 0.0)),
            CalibrationPair::new(NormalizedPoint::new(1.0, 0.0), Point::new(1.0, 0.0)),
            CalibrationPair::new(NormalizedPoint::new(0.0, 1.0), Point::new(0.0, 1.0)),
            CalibrationPair::new(NormalizedPoint::new(1.0, 1.0), Point::new(1.0, 1.0)),
        ];
        CalibrationMapping::from_pairs(&pairs).expect("identity mapping")
    }

    fn display(id: u32, w: f64, h: f64, is_main: bool) -> Display {
        Display::new(id, format!("display-{id}"), Frame::new(0.0, 0.0, w, h), is_main)
    }

    #[test]
    fn test_select_fallback_returns_none_for_empty_list() {
        assert!(select_fallback(&[]).is_none());
    }

    #[test]
    fn test_calibrated_display_beats_larger_external() {
        // Arrange
        let displays = vec![
            display(1, 2560.0, 1440.0, true),
            display(2, 3840.0, 2160.0, false),
            display(3, 1280.0, 800.0, false).with_calibration(identity_mapping()),
        ];

        // Act
        let selection = select_fallback(&displays).expect("selection");

        // Assert
        assert_eq!(selection.display.id, DisplayId(3));
        assert_eq!(selection.rule, SelectionRule::LargestCalibrated);
    }

    #[test]
    fn test_largest_calibrated_wins_among_calibrated() {
        let displays = vec![
            display(1, 800.0, 600.0, false).with_calibration(identity_mapping()),
            display(2, 1920.0, 1080.0, true).with_calibration(identity_mapping()),
        ];

        let selection = select_fallback(&displays).expect("selection");

        assert_eq!(selection.display.id, DisplayId(2));
    }

    #[test]
    fn test_largest_external_selected_when_nothing_calibrated() {
        let displays = vec![
            display(1, 2560.0, 1600.0, true),
            display(2, 1024.0, 768.0, false),
            display(3, 1920.0, 1080.0, false),
        ];

        let selection = select_fallback(&displays).expect("selection");

        assert_eq!(selection.display.id, DisplayId(3));
        assert_eq!(selection.rule, SelectionRule::LargestExternal);
    }

    #[test]
    fn test_main_selected_when_only_main_present() {
        let displays = vec![display(1, 2560.0, 1600.0, true)];

        let selection = select_fallback(&displays).expect("selection");

        assert_eq!(selection.rule, SelectionRule::Main);
    }

    #[test]
    fn test_first_main_selected_when_every_display_claims_main() {
        // Degenerate platform report: rule 2 finds nothing.
        let displays = vec![display(1, 100.0, 100.0, true), display(2, 100.0, 100.0, true)];

        let selection = select_fallback(&displays).expect("selection");

        assert_eq!(selection.rule, SelectionRule::Main);
        assert_eq!(selection.display.id, DisplayId(1));
    }

    #[test]
    fn test_last_rule_returns_last_in_enumeration_order() {
        let displays = vec![display(1, 1.0, 1.0, false), display(2, 1.0, 1.0, false)];
        assert_eq!(SelectionRule::Last.select(&displays).map(|d| d.id), Some(DisplayId(2)));
    }

    #[test]
    fn test_equal_area_tie_resolves_to_first_in_enumeration_order() {
        let displays = vec![
            display(1, 1920.0, 1080.0, true),
            display(2, 1920.0, 1080.0, false),
            display(3, 1920.0, 1080.0, false),
        ];

        let selection = select_fallback(&displays).expect("selection");

        assert_eq!(selection.display.id, DisplayId(2));
    }

    #[test]
    fn test_select_fallback_is_deterministic() {
        let displays = vec![
            display(1, 1440.0, 900.0, true),
            display(2, 1920.0, 1080.0, false),
            display(3, 1920.0, 1200.0, false),
        ];

        let first = select_fallback(&displays).map(|s| s.display.id);
        let second = select_fallback(&displays).map(|s| s.display.id);

        assert_eq!(first, second);
        assert_eq!(first, Some(DisplayId(3)));
    }
}
