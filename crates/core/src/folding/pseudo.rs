//! Partial-line folding built from the whole-range fold primitive.
//!
//! A native fold collapses a range to one placeholder char. To leave exactly
//! `width` chars of a declaration visible, every line ending inside it is
//! folded first (joining it onto one screen row), then a prefix covering
//! `visual_len - width + 1` units is folded; the `+ 1` pays for the
//! placeholder the prefix fold leaves behind.

use crate::models::{Point, TextRange};
use crate::surface::{advance_position, visual_len, FoldId, MarkerId, TextSurface};
use std::num::NonZeroUsize;

/// Outcome of checking whether a range can be pseudo-folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoFoldingCheck {
    Possible,
    FoldAreaIsIncorrect,
    FoldAreaIsTooWide,
    TextHasTabs,
    WillExceedMaxLineLength,
}

/// Native folds that together leave a fixed number of chars visible
#[derive(Debug)]
pub struct PseudoFolding {
    marker: MarkerId,
    folds: Vec<FoldId>,
}

impl PseudoFolding {
    /// Preconditions, evaluated in order: positive width, no tabs, width not
    /// larger than the text, and room on the line when a maximum is enforced.
    pub fn check_possible<S: TextSurface + ?Sized>(
        surface: &S,
        range: TextRange,
        width: usize,
        max_line_length: Option<usize>,
    ) -> PseudoFoldingCheck {
        if width == 0 {
            return PseudoFoldingCheck::FoldAreaIsIncorrect;
        }
        let text = surface.text_in_range(range);
        if text.contains('\t') {
            return PseudoFoldingCheck::TextHasTabs;
        }
        if width > visual_len(&text) {
            return PseudoFoldingCheck::FoldAreaIsTooWide;
        }
        let Some(max) = max_line_length else {
            return PseudoFoldingCheck::Possible;
        };
        let start_column = surface.screen_position_for(range.start).column as usize;
        if start_column + width < max {
            PseudoFoldingCheck::Possible
        } else {
            PseudoFoldingCheck::WillExceedMaxLineLength
        }
    }

    /// Fold the marker's range down to `width` visible chars.
    ///
    /// # Panics
    ///
    /// If atomic soft tabs are enabled, the marker is unknown, or `width`
    /// exceeds the visual length of the text. Callers run
    /// [`check_possible`](Self::check_possible) first.
    pub fn new<S: TextSurface + ?Sized>(surface: &mut S, marker: MarkerId, width: NonZeroUsize) -> Self {
        assert!(
            !surface.config().atomic_soft_tabs,
            "pseudo-folding requires atomic soft tabs to be disabled"
        );
        let range = surface
            .marker_range(marker)
            .expect("pseudo-folding over a released marker");
        let text_len = visual_len(&surface.text_in_range(range));
        assert!(
            width.get() <= text_len,
            "cannot pseudo-fold {} chars down to {}",
            text_len,
            width
        );

        let mut folds = Vec::new();
        for row in range.start.row..range.end.row {
            let line_end = surface.clip_position(Point::new(row, u32::MAX));
            let next_line = Point::new(row + 1, 0);
            folds.push(surface.fold_range(TextRange::new(line_end, next_line)));
        }

        let redundant = text_len - width.get();
        let prefix_end = advance_position(surface, range.start, redundant + 1);
        folds.push(surface.fold_range(TextRange::new(range.start, prefix_end)));
        tracing::trace!("pseudo-folded {} with {} native folds", range.start, folds.len());

        Self { marker, folds }
    }

    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    /// Remove the folds this pseudo-folding created; other folds on the same
    /// rows are left alone.
    pub fn destroy<S: TextSurface + ?Sized>(self, surface: &mut S) {
        for fold in self.folds {
            surface.destroy_fold(fold);
        }
    }
}
