//! Abstraction over the editing host.
//!
//! Everything the folding engine needs from an editor goes through
//! [`TextSurface`]: reading text, buffer to screen translation, the native
//! fold primitive, tracked markers with change notifications, cursor moves and
//! overlay decorations. [`MemoryEditor`] is the in-process implementation used
//! by the command line tool and the tests.

mod memory;

pub use memory::{MemoryEditor, OverlayView, FOLD_PLACEHOLDER};

use crate::config::EditorConfig;
use crate::models::{Point, TextRange};
use serde::{Deserialize, Serialize};

/// Handle of a tracked range owned by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// Handle of a native fold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FoldId(pub u64);

/// Handle of an overlay decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecorationId(pub u64);

/// Geometry of a marker before and after a host mutation, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerChange {
    pub marker: MarkerId,
    pub old_tail: Point,
    pub old_head: Point,
    pub new_tail: Point,
    pub new_head: Point,
    pub is_valid: bool,
    /// Text strictly inside the marker was modified
    pub text_changed: bool,
}

/// Cursor displacement, both in buffer and screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMove {
    pub old_buffer: Point,
    pub new_buffer: Point,
    pub old_screen: Point,
    pub new_screen: Point,
}

/// Inline overlay drawn at the start of a marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub text: String,
    pub class: String,
}

impl Overlay {
    pub fn new(text: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: class.into(),
        }
    }
}

/// Capabilities consumed from the editing host
pub trait TextSurface {
    /// Text between two buffer positions; line endings are kept verbatim
    fn text_in_range(&self, range: TextRange) -> String;

    fn last_row(&self) -> u32;

    /// Length of a row in chars, excluding its line ending
    fn line_len(&self, row: u32) -> u32;

    fn clip_position(&self, point: Point) -> Point {
        let row = point.row.min(self.last_row());
        Point::new(row, point.column.min(self.line_len(row)))
    }

    fn screen_position_for(&self, point: Point) -> Point;

    fn screen_range_for(&self, range: TextRange) -> TextRange {
        TextRange {
            start: self.screen_position_for(range.start),
            end: self.screen_position_for(range.end),
        }
    }

    fn cursor(&self) -> Point;

    fn set_cursor(&mut self, point: Point);

    /// Collapse a buffer range behind a single placeholder
    fn fold_range(&mut self, range: TextRange) -> FoldId;

    /// Unknown or already removed folds are ignored
    fn destroy_fold(&mut self, id: FoldId);

    /// Remove every fold touching `row`
    fn unfold_row(&mut self, row: u32);

    /// Track a range that is invalidated by edits strictly inside it
    fn create_marker(&mut self, range: TextRange) -> MarkerId;

    fn destroy_marker(&mut self, id: MarkerId);

    fn marker_range(&self, id: MarkerId) -> Option<TextRange>;

    fn marker_screen_range(&self, id: MarkerId) -> Option<TextRange> {
        self.marker_range(id).map(|range| self.screen_range_for(range))
    }

    fn drain_marker_changes(&mut self) -> Vec<MarkerChange>;

    fn drain_cursor_moves(&mut self) -> Vec<CursorMove>;

    fn decorate_marker(&mut self, marker: MarkerId, overlay: Overlay) -> DecorationId;

    fn set_decoration_class(&mut self, id: DecorationId, class: &str);

    fn destroy_decoration(&mut self, id: DecorationId);

    fn config(&self) -> EditorConfig;

    fn set_atomic_soft_tabs(&mut self, enabled: bool);
}

/// Range from the origin to the end of the last row
pub fn full_buffer_range<S: TextSurface + ?Sized>(surface: &S) -> TextRange {
    let last = surface.last_row();
    TextRange::new((0, 0), (last, surface.line_len(last)))
}

/// The position one char after `point`, wrapping to the next row at a line
/// end. The end of the buffer maps to itself.
pub fn next_position<S: TextSurface + ?Sized>(surface: &S, point: Point) -> Point {
    let next = Point::new(point.row, point.column + 1);
    if surface.clip_position(next) == next {
        next
    } else if point.row < surface.last_row() {
        Point::new(point.row + 1, 0)
    } else {
        point
    }
}

/// Step `n` positions forward; a line ending counts as one step
pub fn advance_position<S: TextSurface + ?Sized>(surface: &S, mut point: Point, n: usize) -> Point {
    for _ in 0..n {
        let next = next_position(surface, point);
        if next == point {
            break;
        }
        point = next;
    }
    point
}

/// Char count of `text` with every CRLF pair counted once
pub fn visual_len(text: &str) -> usize {
    text.chars().count() - text.matches("\r\n").count()
}

/// Position reached after writing `text` starting at `start`
pub fn point_after(start: Point, text: &str) -> Point {
    match text.rfind('\n') {
        None => Point::new(start.row, start.column + text.chars().count() as u32),
        Some(last_newline) => {
            let rows = text.matches('\n').count() as u32;
            let column = text[last_newline + 1..].chars().count() as u32;
            Point::new(start.row + rows, column)
        }
    }
}
