//! Identity cue: the remembered (name, id) of the last confirmed touchscreen.
//!
//! Display ids are stable across reboots on most platforms but not across
//! ports or docks, and product names are shared by identical monitors.  Only
//! the combination is trusted: a display that matches both is "the"
//! touchscreen, anything weaker is merely a hint for logging.

use serde::{Deserialize, Serialize};

use super::display::{Display, DisplayId};

/// Name used when no cue has been stored yet.
pub const DEFAULT_NAME_CUE: &str = "Digital";

/// How well a display matches an [`IdentityCue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchScore {
    None,
    IdOnly,
    NameOnly,
    Exact,
}

impl MatchScore {
    /// Numeric weight: 1.0 exact, 0.5 name only, 0.2 id only, 0.0 none.
    pub fn value(self) -> f32 {
        match self {
            MatchScore::Exact => 1.0,
            MatchScore::NameOnly => 0.5,
            MatchScore::IdOnly => 0.2,
            MatchScore::None => 0.0,
        }
    }

    pub fn is_exact(self) -> bool {
        self == MatchScore::Exact
    }
}

/// The last confirmed-good touchscreen identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCue {
    pub name: String,
    pub id: DisplayId,
}

impl IdentityCue {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id: DisplayId(id),
        }
    }

    /// Captures the identity of a display the user has confirmed.
    pub fn from_display(display: &Display) -> Self {
        Self {
            name: display.name.clone(),
            id: display.id,
        }
    }

    /// Scores `display` against this cue.
    pub fn score(&self, display: &Display) -> MatchScore {
        let same_name = display.name == self.name;
        let same_id = display.id == self.id;

        match (same_name, same_id) {
            (true, true) => MatchScore::Exact,
            (true, false) => MatchScore::NameOnly,
            (false, true) => MatchScore::IdOnly,
            (false, false) => MatchScore::None,
        }
    }
}

impl Default for IdentityCue {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_CUE, 0)
    }
}

/// Returns the first display that matches `cue` exactly.
///
/// Partial matches are never accepted.  When several displays share the same
/// name and id the first one in enumeration order wins.
pub fn resolve_preferred<'a>(displays: &'a [Display], cue: &IdentityCue) -> Option<&'a Display> {
    displays.iter().find(|candidate| {
        let score = cue.score(candidate);
        tracing::trace!(
            name = %candidate.name,
            id = %candidate.id,
            score = score.value(),
            "scored display against identity cue"
        );
        score.is_exact()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::display::Frame;

    fn display(id: u32, name: &str) -> Display {
        Display::new(id, name, Frame::new(0.0, 0.0, 1920.0, 1080.0), false)
    }

    // ── score ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_score_is_exact_when_name_and_id_match() {
        let cue = IdentityCue::new("Digital", 5);
        assert_eq!(cue.score(&display(5, "Digital")), MatchScore::Exact);
        assert_eq!(cue.score(&display(5, "Digital")).value(), 1.0);
    }

    #[test]
    fn test_score_is_name_only_when_id_differs() {
        let cue = IdentityCue::new("Digital", 5);
        assert_eq!(cue.score(&display(6, "Digital")), MatchScore::NameOnly);
        assert_eq!(MatchScore::NameOnly.value(), 0.5);
    }

    #[test]
    fn test_score_is_id_only_when_name_differs() {
        let cue = IdentityCue::new("Digital", 5);
        assert_eq!(cue.score(&display(5, "Retina")), MatchScore::IdOnly);
        assert_eq!(MatchScore::IdOnly.value(), 0.2);
    }

    #[test]
    fn test_score_is_none_when_nothing_matches() {
        let cue = IdentityCue::new("Digital", 5);
        assert_eq!(cue.score(&display(1, "Retina")), MatchScore::None);
        assert_eq!(MatchScore::None.value(), 0.0);
    }

    #[test]
    fn test_default_cue_uses_digital_name_and_zero_id() {
        let cue = IdentityCue::default();
        assert_eq!(cue.name, "Digital");
        assert_eq!(cue.id, DisplayId(0));
    }

    #[test]
    fn test_from_display_copies_name_and_id() {
        let cue = IdentityCue::from_display(&display(9, "Touch 15"));
        assert_eq!(cue, IdentityCue::new("Touch 15", 9));
    }

    // ── resolve_preferred ─────────────────────────────────────────────────────

    #[test]
    fn test_resolve_preferred_returns_exact_match() {
        let displays = vec![display(1, "Retina"), display(2, "Digital")];
        let cue = IdentityCue::new("Digital", 2);

        let found = resolve_preferred(&displays, &cue).expect("exact match");

        assert_eq!(found.id, DisplayId(2));
    }

    #[test]
    fn test_resolve_preferred_ignores_partial_matches() {
        let displays = vec![display(1, "Digital"), display(2, "Retina")];
        let cue = IdentityCue::new("Digital", 2);

        assert!(resolve_preferred(&displays, &cue).is_none());
    }

    #[test]
    fn test_resolve_preferred_returns_none_for_empty_list() {
        assert!(resolve_preferred(&[], &IdentityCue::default()).is_none());
    }

    #[test]
    fn test_resolve_preferred_duplicate_exact_matches_pick_first_in_order() {
        // Two identical panels reporting the same name and id.
        let mut first = display(3, "Digital");
        first.frame = Frame::new(0.0, 0.0, 800.0, 600.0);
        let second = display(3, "Digital");
        let displays = vec![first.clone(), second];

        let found = resolve_preferred(&displays, &IdentityCue::new("Digital", 3)).expect("match");

        assert_eq!(found.frame, first.frame);
    }
}
