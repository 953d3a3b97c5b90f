//! Cursor-driven highlighting of fold previews.
//!
//! Only foldings whose start is on the old or the new cursor row can change
//! state on a cursor move, so live visible foldings are indexed by the screen
//! row of their start.

use crate::models::{FoldingId, TextRange};
use crate::surface::CursorMove;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Multi-map from screen row to the foldings starting on it
#[derive(Debug, Default)]
pub(crate) struct RowIndex {
    rows: HashMap<u32, BTreeSet<FoldingId>>,
    row_of: HashMap<FoldingId, u32>,
}

impl RowIndex {
    /// Put `id` at `row`, dropping it from any previous row
    pub fn insert(&mut self, id: FoldingId, row: u32) {
        self.remove(id);
        self.rows.entry(row).or_default().insert(id);
        self.row_of.insert(id, row);
    }

    pub fn remove(&mut self, id: FoldingId) {
        let Some(row) = self.row_of.remove(&id) else {
            return;
        };
        if let Some(ids) = self.rows.get_mut(&row) {
            ids.remove(&id);
            if ids.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    pub fn at(&self, row: u32) -> impl Iterator<Item = FoldingId> + '_ {
        self.rows.get(&row).into_iter().flatten().copied()
    }

    pub fn row_of(&self, id: FoldingId) -> Option<u32> {
        self.row_of.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.row_of.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.row_of.clear();
    }
}

/// Highlight state change requested by a cursor move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightChange {
    Add(FoldingId),
    Remove(FoldingId),
}

/// Turns highlighting back on when dropped
#[derive(Debug)]
pub struct HighlightSuspension {
    enabled: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for HighlightSuspension {
    fn drop(&mut self) {
        self.enabled.set(self.previous);
    }
}

#[derive(Debug)]
pub struct HighlightingManager {
    index: RowIndex,
    enabled: Rc<Cell<bool>>,
}

impl Default for HighlightingManager {
    fn default() -> Self {
        Self {
            index: RowIndex::default(),
            enabled: Rc::new(Cell::new(true)),
        }
    }
}

impl HighlightingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a visible folding whose start is on `row`
    pub fn manage(&mut self, id: FoldingId, row: u32) {
        self.index.insert(id, row);
    }

    pub fn forget(&mut self, id: FoldingId) {
        self.index.remove(id);
    }

    pub fn forget_all(&mut self) {
        self.index.clear();
    }

    pub(crate) fn index(&self) -> &RowIndex {
        &self.index
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Ignore cursor moves until the returned guard is dropped
    pub fn suspend(&self) -> HighlightSuspension {
        let previous = self.enabled.replace(false);
        HighlightSuspension {
            enabled: Rc::clone(&self.enabled),
            previous,
        }
    }

    /// Highlight changes caused by `mv`; `range_of` yields a folding's buffer range
    pub fn on_cursor_moved<F>(&self, mv: &CursorMove, range_of: F) -> Vec<HighlightChange>
    where
        F: Fn(FoldingId) -> Option<TextRange>,
    {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut changes = Vec::new();
        for id in self.index.at(mv.old_screen.row) {
            let Some(range) = range_of(id) else { continue };
            if range.contains_point(mv.old_buffer) && !range.contains_point(mv.new_buffer) {
                tracing::debug!("cursor left fold preview {}", id);
                changes.push(HighlightChange::Remove(id));
            }
        }
        for id in self.index.at(mv.new_screen.row) {
            let Some(range) = range_of(id) else { continue };
            if !range.contains_point(mv.old_buffer) && range.contains_point(mv.new_buffer) {
                tracing::debug!("cursor entered fold preview {}", id);
                changes.push(HighlightChange::Add(id));
            }
        }
        changes
    }
}
