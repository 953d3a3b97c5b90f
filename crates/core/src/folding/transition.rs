//! Classification of marker changes.
//!
//! The host reports a folding's marker geometry before and after each
//! mutation. Comparing the new extent with the extent recorded right after
//! folding tells whether the folding merely moved, was hidden or revealed by
//! an enclosing fold, or was damaged.

use crate::models::{Point, TextRange};
use crate::surface::MarkerChange;

/// What happened to a folding's marker, derived from screen geometry alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Same shape, displaced (lines inserted or removed above)
    Translated,
    /// Was collapsed to a point and is back to its folded shape
    BecameVisible,
    /// Collapsed to a point by an enclosing fold
    BecameHidden,
    /// The host no longer tracks the range
    Invalidated,
    /// The span changed, the folding cannot be kept
    Destructive,
}

/// Screen geometry of a marker around one mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSnapshot {
    pub old_tail: Point,
    pub old_head: Point,
    pub new_tail: Point,
    pub new_head: Point,
    pub is_valid: bool,
    pub text_changed: bool,
}

impl From<&MarkerChange> for MarkerSnapshot {
    fn from(change: &MarkerChange) -> Self {
        Self {
            old_tail: change.old_tail,
            old_head: change.old_head,
            new_tail: change.new_tail,
            new_head: change.new_head,
            is_valid: change.is_valid,
            text_changed: change.text_changed,
        }
    }
}

impl MarkerSnapshot {
    pub fn old_extent(&self) -> TextRange {
        TextRange {
            start: self.old_tail,
            end: self.old_head,
        }
    }

    pub fn new_extent(&self) -> TextRange {
        TextRange {
            start: self.new_tail,
            end: self.new_head,
        }
    }
}

/// Classify a marker change against the screen extent the folding had when
/// it was created.
pub fn classify(snapshot: &MarkerSnapshot, initial: &TextRange) -> Transition {
    if !snapshot.is_valid {
        return Transition::Invalidated;
    }
    let new_extent = snapshot.new_extent();
    if initial.is_translation_of(&new_extent) {
        if snapshot.old_extent().is_empty() {
            Transition::BecameVisible
        } else {
            Transition::Translated
        }
    } else if new_extent.is_empty() && !snapshot.text_changed {
        Transition::BecameHidden
    } else {
        Transition::Destructive
    }
}
