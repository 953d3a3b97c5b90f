use super::{CursorMove, DecorationId, FoldId, MarkerChange, MarkerId, Overlay, TextSurface};
use crate::config::EditorConfig;
use crate::models::{Point, TextRange};
use ropey::Rope;
use std::collections::BTreeMap;

/// Char drawn in place of a collapsed fold
pub const FOLD_PLACEHOLDER: char = '⋯';

#[derive(Debug, Clone)]
struct MarkerState {
    range: TextRange,
    valid: bool,
    text_changed: bool,
}

#[derive(Debug, Clone)]
struct Decoration {
    marker: MarkerId,
    overlay: Overlay,
}

/// A live overlay as it would be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub marker: MarkerId,
    pub text: String,
    pub class: String,
    pub buffer_range: TextRange,
    pub screen_position: Point,
}

/// Marker and cursor geometry captured before a mutation
struct Snapshot {
    markers: Vec<(MarkerId, TextRange, TextRange)>,
    cursor: Point,
    cursor_screen: Point,
}

/// One replacement of `[start, old_end)` by text ending at `new_end`
struct Edit {
    start: Point,
    old_end: Point,
    new_end: Point,
}

impl Edit {
    /// Move a point located at or after the replaced text
    fn shift(&self, p: Point) -> Point {
        if p.row == self.old_end.row {
            Point::new(
                self.new_end.row,
                self.new_end.column + (p.column - self.old_end.column),
            )
        } else {
            Point::new(p.row - self.old_end.row + self.new_end.row, p.column)
        }
    }

    fn hits_interior(&self, range: &TextRange) -> bool {
        self.start < range.end && self.old_end > range.start
    }

    /// Boundaries are exclusive: text inserted at the start pushes the range,
    /// text inserted at the end stays outside of it.
    fn map_range(&self, range: TextRange) -> TextRange {
        if self.old_end <= range.start {
            TextRange {
                start: self.shift(range.start),
                end: self.shift(range.end),
            }
        } else if self.start >= range.end {
            range
        } else {
            let start = if range.start <= self.start {
                range.start
            } else {
                self.new_end
            };
            let end = if range.end >= self.old_end {
                self.shift(range.end)
            } else {
                self.new_end
            };
            TextRange::new(start, end)
        }
    }

    fn map_cursor(&self, p: Point) -> Point {
        if p < self.start {
            p
        } else if p >= self.old_end {
            self.shift(p)
        } else {
            self.new_end
        }
    }
}

/// In-memory editor backed by a rope.
///
/// Rows are separated by `\n`; a `\r` right before it belongs to the line
/// ending. Folds collapse to a single [`FOLD_PLACEHOLDER`] on screen,
/// overlapping folds merge and adjacent ones stay apart. Soft wrap is only
/// reported through [`EditorConfig`], lines are never wrapped geometrically.
#[derive(Debug, Clone)]
pub struct MemoryEditor {
    rope: Rope,
    config: EditorConfig,
    cursor: Point,
    folds: BTreeMap<FoldId, TextRange>,
    markers: BTreeMap<MarkerId, MarkerState>,
    decorations: BTreeMap<DecorationId, Decoration>,
    marker_changes: Vec<MarkerChange>,
    cursor_moves: Vec<CursorMove>,
    next_id: u64,
}

impl MemoryEditor {
    pub fn new(text: &str) -> Self {
        Self::with_config(text, EditorConfig::default())
    }

    pub fn with_config(text: &str, config: EditorConfig) -> Self {
        Self {
            rope: Rope::from_str(text),
            config,
            cursor: Point::default(),
            folds: BTreeMap::new(),
            markers: BTreeMap::new(),
            decorations: BTreeMap::new(),
            marker_changes: Vec::new(),
            cursor_moves: Vec::new(),
            next_id: 1,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
    }

    /// Replace `range` with `text` and return the range of the new text
    pub fn set_text_in_range(&mut self, range: TextRange, text: &str) -> TextRange {
        let range = TextRange::new(
            self.clip_position(range.start),
            self.clip_position(range.end),
        );
        self.track(|this| {
            let start = this.char_index(range.start);
            let end = this.char_index(range.end);
            this.rope.remove(start..end);
            this.rope.insert(start, text);

            let edit = Edit {
                start: range.start,
                old_end: range.end,
                new_end: super::point_after(range.start, text),
            };
            for state in this.markers.values_mut().filter(|m| m.valid) {
                if edit.hits_interior(&state.range) {
                    state.valid = false;
                    state.text_changed = true;
                }
                state.range = edit.map_range(state.range);
            }
            this.folds.retain(|_, fold| !edit.hits_interior(fold));
            for fold in this.folds.values_mut() {
                *fold = edit.map_range(*fold);
            }
            this.cursor = edit.map_cursor(this.cursor);

            TextRange {
                start: range.start,
                end: edit.new_end,
            }
        })
    }

    pub fn insert(&mut self, at: Point, text: &str) -> TextRange {
        self.set_text_in_range(TextRange::new(at, at), text)
    }

    /// Raw fold ranges in buffer coordinates, ordered by start
    pub fn fold_ranges(&self) -> Vec<TextRange> {
        let mut ranges: Vec<TextRange> = self.folds.values().copied().collect();
        ranges.sort_by_key(|r| (r.start, r.end));
        ranges
    }

    pub fn has_pending_events(&self) -> bool {
        !self.marker_changes.is_empty() || !self.cursor_moves.is_empty()
    }

    /// Buffer text as displayed, one string per screen row
    pub fn screen_lines(&self) -> Vec<String> {
        let mut lines = vec![String::new()];
        let mut pos = Point::default();
        for fold in self.effective_folds() {
            self.push_screen_text(&mut lines, TextRange { start: pos, end: fold.start });
            if let Some(line) = lines.last_mut() {
                line.push(FOLD_PLACEHOLDER);
            }
            pos = fold.end;
        }
        let end = super::full_buffer_range(self).end;
        if pos < end {
            self.push_screen_text(&mut lines, TextRange { start: pos, end });
        }
        lines
    }

    /// Screen lines with every overlay painted over the text it covers
    pub fn render_with_overlays(&self) -> Vec<String> {
        let mut lines = self.screen_lines();
        for view in self.overlay_decorations() {
            let Some(line) = lines.get_mut(view.screen_position.row as usize) else {
                continue;
            };
            let mut chars: Vec<char> = line.chars().collect();
            let column = view.screen_position.column as usize;
            for (offset, ch) in view.text.chars().enumerate() {
                let at = column + offset;
                if at < chars.len() {
                    chars[at] = ch;
                } else {
                    chars.resize(at, ' ');
                    chars.push(ch);
                }
            }
            *line = chars.into_iter().collect();
        }
        lines
    }

    /// Overlays anchored to live markers
    pub fn overlay_decorations(&self) -> Vec<OverlayView> {
        self.decorations
            .values()
            .filter_map(|decoration| {
                let state = self.markers.get(&decoration.marker)?;
                Some(OverlayView {
                    marker: decoration.marker,
                    text: decoration.overlay.text.clone(),
                    class: decoration.overlay.class.clone(),
                    buffer_range: state.range,
                    screen_position: self.screen_position_for(state.range.start),
                })
            })
            .collect()
    }

    fn char_index(&self, point: Point) -> usize {
        let point = self.clip_position(point);
        self.rope.line_to_char(point.row as usize) + point.column as usize
    }

    /// Folds as drawn: empty folds dropped, overlapping ones merged
    fn effective_folds(&self) -> Vec<TextRange> {
        let mut merged: Vec<TextRange> = Vec::new();
        for fold in self.fold_ranges().into_iter().filter(|f| !f.is_empty()) {
            match merged.last_mut() {
                Some(last) if fold.start < last.end => {
                    if fold.end > last.end {
                        last.end = fold.end;
                    }
                }
                _ => merged.push(fold),
            }
        }
        merged
    }

    fn push_screen_text(&self, lines: &mut Vec<String>, range: TextRange) {
        let text = self.text_in_range(range);
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => lines.push(String::new()),
                _ => {
                    if let Some(line) = lines.last_mut() {
                        line.push(ch);
                    }
                }
            }
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run a mutation and queue notifications for everything it moved
    fn track<R>(&mut self, mutate: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.snapshot();
        let result = mutate(self);
        self.record_changes(before);
        result
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            markers: self
                .markers
                .iter()
                .filter(|(_, state)| state.valid)
                .map(|(id, state)| (*id, state.range, self.screen_range_for(state.range)))
                .collect(),
            cursor: self.cursor,
            cursor_screen: self.screen_position_for(self.cursor),
        }
    }

    fn record_changes(&mut self, before: Snapshot) {
        for (id, old_range, old_screen) in before.markers {
            let Some(state) = self.markers.get(&id) else {
                continue;
            };
            let new_screen = self.screen_range_for(state.range);
            let unchanged = state.valid
                && !state.text_changed
                && state.range == old_range
                && new_screen == old_screen;
            if unchanged {
                continue;
            }
            let change = MarkerChange {
                marker: id,
                old_tail: old_screen.start,
                old_head: old_screen.end,
                new_tail: new_screen.start,
                new_head: new_screen.end,
                is_valid: state.valid,
                text_changed: state.text_changed,
            };
            if let Some(state) = self.markers.get_mut(&id) {
                state.text_changed = false;
            }
            self.push_marker_change(change);
        }

        let cursor_screen = self.screen_position_for(self.cursor);
        if self.cursor != before.cursor || cursor_screen != before.cursor_screen {
            self.cursor_moves.push(CursorMove {
                old_buffer: before.cursor,
                new_buffer: self.cursor,
                old_screen: before.cursor_screen,
                new_screen: cursor_screen,
            });
        }
    }

    /// Undelivered changes of one marker collapse into a single notification
    fn push_marker_change(&mut self, change: MarkerChange) {
        match self
            .marker_changes
            .iter_mut()
            .find(|pending| pending.marker == change.marker)
        {
            Some(pending) => {
                pending.new_tail = change.new_tail;
                pending.new_head = change.new_head;
                pending.is_valid &= change.is_valid;
                pending.text_changed |= change.text_changed;
            }
            None => self.marker_changes.push(change),
        }
    }
}

impl TextSurface for MemoryEditor {
    fn text_in_range(&self, range: TextRange) -> String {
        let start = self.char_index(range.start);
        let end = self.char_index(range.end);
        self.rope.slice(start..end).to_string()
    }

    fn last_row(&self) -> u32 {
        (self.rope.len_lines() - 1) as u32
    }

    fn line_len(&self, row: u32) -> u32 {
        if row > self.last_row() {
            return 0;
        }
        let line = self.rope.line(row as usize);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && line.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len as u32
    }

    fn screen_position_for(&self, point: Point) -> Point {
        let point = self.clip_position(point);
        let advance = |buffer: Point, screen: Point, to: Point| {
            if to.row == buffer.row {
                Point::new(screen.row, screen.column + (to.column - buffer.column))
            } else {
                Point::new(screen.row + (to.row - buffer.row), to.column)
            }
        };

        let mut last_buffer = Point::default();
        let mut last_screen = Point::default();
        for fold in self.effective_folds() {
            if point <= fold.start {
                break;
            }
            let fold_screen = advance(last_buffer, last_screen, fold.start);
            if point < fold.end {
                return fold_screen;
            }
            last_screen = Point::new(fold_screen.row, fold_screen.column + 1);
            last_buffer = fold.end;
        }
        advance(last_buffer, last_screen, point)
    }

    fn cursor(&self) -> Point {
        self.cursor
    }

    fn set_cursor(&mut self, point: Point) {
        let point = self.clip_position(point);
        self.track(|this| this.cursor = point);
    }

    fn fold_range(&mut self, range: TextRange) -> FoldId {
        let range = TextRange::new(
            self.clip_position(range.start),
            self.clip_position(range.end),
        );
        let id = FoldId(self.allocate_id());
        self.track(|this| this.folds.insert(id, range));
        id
    }

    fn destroy_fold(&mut self, id: FoldId) {
        if self.folds.contains_key(&id) {
            self.track(|this| this.folds.remove(&id));
        }
    }

    fn unfold_row(&mut self, row: u32) {
        self.track(|this| {
            this.folds.retain(|_, fold| {
                let touches = fold.start.row == row
                    || (fold.start.row < row && row < fold.end.row)
                    || (fold.start.row < row && row == fold.end.row && fold.end.column > 0);
                !touches
            });
        });
    }

    fn create_marker(&mut self, range: TextRange) -> MarkerId {
        let range = TextRange::new(
            self.clip_position(range.start),
            self.clip_position(range.end),
        );
        let id = MarkerId(self.allocate_id());
        self.markers.insert(
            id,
            MarkerState {
                range,
                valid: true,
                text_changed: false,
            },
        );
        id
    }

    fn destroy_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
        self.decorations.retain(|_, decoration| decoration.marker != id);
        self.marker_changes.retain(|change| change.marker != id);
    }

    fn marker_range(&self, id: MarkerId) -> Option<TextRange> {
        self.markers.get(&id).map(|state| state.range)
    }

    fn drain_marker_changes(&mut self) -> Vec<MarkerChange> {
        std::mem::take(&mut self.marker_changes)
    }

    fn drain_cursor_moves(&mut self) -> Vec<CursorMove> {
        std::mem::take(&mut self.cursor_moves)
    }

    fn decorate_marker(&mut self, marker: MarkerId, overlay: Overlay) -> DecorationId {
        let id = DecorationId(self.allocate_id());
        self.decorations.insert(id, Decoration { marker, overlay });
        id
    }

    fn set_decoration_class(&mut self, id: DecorationId, class: &str) {
        if let Some(decoration) = self.decorations.get_mut(&id) {
            decoration.overlay.class = class.to_string();
        }
    }

    fn destroy_decoration(&mut self, id: DecorationId) {
        self.decorations.remove(&id);
    }

    fn config(&self) -> EditorConfig {
        self.config
    }

    fn set_atomic_soft_tabs(&mut self, enabled: bool) {
        self.config.atomic_soft_tabs = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_len_excludes_line_endings() {
        let editor = MemoryEditor::new("abc\r\nde\nf");
        assert_eq!(editor.last_row(), 2);
        assert_eq!(editor.line_len(0), 3);
        assert_eq!(editor.line_len(1), 2);
        assert_eq!(editor.line_len(2), 1);
        assert_eq!(editor.clip_position(Point::new(0, 99)), Point::new(0, 3));
        assert_eq!(editor.clip_position(Point::new(9, 0)), Point::new(2, 0));
    }

    #[test]
    fn test_text_in_range_keeps_line_endings() {
        let editor = MemoryEditor::new("ab\r\ncd\nef");
        assert_eq!(editor.text_in_range(TextRange::new((0, 1), (1, 1))), "b\r\nc");
        assert_eq!(editor.text_in_range(TextRange::new((1, 0), (2, 2))), "cd\nef");
    }

    #[test]
    fn test_fold_renders_placeholder() {
        let mut editor = MemoryEditor::new("0123\n4567\n89");
        editor.fold_range(TextRange::new((0, 2), (1, 1)));
        assert_eq!(editor.screen_lines(), vec!["01⋯567", "89"]);
        assert_eq!(editor.screen_position_for(Point::new(0, 1)), Point::new(0, 1));
        assert_eq!(editor.screen_position_for(Point::new(0, 3)), Point::new(0, 2));
        assert_eq!(editor.screen_position_for(Point::new(1, 1)), Point::new(0, 3));
        assert_eq!(editor.screen_position_for(Point::new(1, 3)), Point::new(0, 5));
        assert_eq!(editor.screen_position_for(Point::new(2, 1)), Point::new(1, 1));
    }

    #[test]
    fn test_overlapping_folds_merge_adjacent_stay_apart() {
        let mut editor = MemoryEditor::new("abcdefgh");
        editor.fold_range(TextRange::new((0, 1), (0, 4)));
        editor.fold_range(TextRange::new((0, 3), (0, 5)));
        assert_eq!(editor.screen_lines(), vec!["a⋯fgh"]);

        let mut editor = MemoryEditor::new("abcdefgh");
        editor.fold_range(TextRange::new((0, 1), (0, 3)));
        editor.fold_range(TextRange::new((0, 3), (0, 5)));
        assert_eq!(editor.screen_lines(), vec!["a⋯⋯fgh"]);
    }

    #[test]
    fn test_crlf_line_ending_fold() {
        let mut editor = MemoryEditor::new("ab\r\ncd");
        editor.fold_range(TextRange::new((0, 2), (1, 0)));
        assert_eq!(editor.screen_lines(), vec!["ab⋯cd"]);
        assert_eq!(editor.screen_position_for(Point::new(1, 1)), Point::new(0, 4));
    }

    #[test]
    fn test_destroy_and_unfold_row() {
        let mut editor = MemoryEditor::new("aa\nbb\ncc\ndd");
        let first = editor.fold_range(TextRange::new((0, 2), (1, 0)));
        editor.fold_range(TextRange::new((2, 1), (3, 1)));
        assert_eq!(editor.screen_lines(), vec!["aa⋯bb", "c⋯d"]);

        editor.unfold_row(3);
        assert_eq!(editor.screen_lines(), vec!["aa⋯bb", "cc", "dd"]);
        editor.destroy_fold(first);
        editor.destroy_fold(first);
        assert_eq!(editor.screen_lines(), vec!["aa", "bb", "cc", "dd"]);
        assert!(editor.fold_ranges().is_empty());
    }

    #[test]
    fn test_marker_boundaries_are_exclusive() {
        let mut editor = MemoryEditor::new("0123456789");
        let marker = editor.create_marker(TextRange::new((0, 2), (0, 5)));

        editor.insert(Point::new(0, 2), "xx");
        assert_eq!(editor.marker_range(marker), Some(TextRange::new((0, 4), (0, 7))));

        editor.insert(Point::new(0, 7), "yy");
        assert_eq!(editor.marker_range(marker), Some(TextRange::new((0, 4), (0, 7))));

        let changes = editor.drain_marker_changes();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_valid);
        assert_eq!(changes[0].old_tail, Point::new(0, 2));
        assert_eq!(changes[0].new_tail, Point::new(0, 4));
        assert!(editor.drain_marker_changes().is_empty());
    }

    #[test]
    fn test_interior_edit_invalidates_marker() {
        let mut editor = MemoryEditor::new("0123456789");
        let marker = editor.create_marker(TextRange::new((0, 2), (0, 5)));
        editor.insert(Point::new(0, 3), "x");
        let changes = editor.drain_marker_changes();
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].is_valid);
        assert!(changes[0].text_changed);

        // invalid markers stay silent
        editor.insert(Point::new(0, 0), "\n");
        assert!(editor.drain_marker_changes().is_empty());
        assert!(editor.marker_range(marker).is_some());
    }

    #[test]
    fn test_lines_inserted_above_translate_marker_and_folds() {
        let mut editor = MemoryEditor::new("a\nbcd\ne");
        let marker = editor.create_marker(TextRange::new((1, 0), (1, 3)));
        editor.fold_range(TextRange::new((1, 1), (1, 2)));
        editor.insert(Point::new(0, 1), "\n\n");
        assert_eq!(editor.marker_range(marker), Some(TextRange::new((3, 0), (3, 3))));
        assert_eq!(editor.fold_ranges(), vec![TextRange::new((3, 1), (3, 2))]);
        assert_eq!(editor.screen_lines(), vec!["a", "", "", "b⋯d", "e"]);
    }

    #[test]
    fn test_edit_inside_fold_removes_it() {
        let mut editor = MemoryEditor::new("abcdef");
        editor.fold_range(TextRange::new((0, 1), (0, 4)));
        editor.insert(Point::new(0, 2), "X");
        assert!(editor.fold_ranges().is_empty());
        assert_eq!(editor.screen_lines(), vec!["abXcdef"]);
    }

    #[test]
    fn test_fold_over_marker_reports_point_extent() {
        let mut editor = MemoryEditor::new("{\n  int x;\n}\n");
        let marker = editor.create_marker(TextRange::new((1, 2), (1, 8)));
        let fold = editor.fold_range(TextRange::new((0, 1), (2, 0)));
        let changes = editor.drain_marker_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_tail, changes[0].new_head);

        editor.destroy_fold(fold);
        let changes = editor.drain_marker_changes();
        assert_eq!(changes[0].old_tail, changes[0].old_head);
        assert_eq!(changes[0].new_tail, Point::new(1, 2));
        assert_eq!(changes[0].new_head, Point::new(1, 8));
        assert_eq!(editor.marker_range(marker), Some(TextRange::new((1, 2), (1, 8))));
    }

    #[test]
    fn test_cursor_moves_are_queued() {
        let mut editor = MemoryEditor::new("abc\ndef");
        editor.set_cursor(Point::new(1, 2));
        editor.set_cursor(Point::new(1, 2));
        let moves = editor.drain_cursor_moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].old_buffer, Point::new(0, 0));
        assert_eq!(moves[0].new_buffer, Point::new(1, 2));
        assert_eq!(moves[0].new_screen, Point::new(1, 2));

        editor.insert(Point::new(0, 0), "\n");
        assert_eq!(editor.cursor(), Point::new(2, 2));
        assert_eq!(editor.drain_cursor_moves().len(), 1);
    }

    #[test]
    fn test_render_with_overlays() {
        let mut editor = MemoryEditor::new("template<class T> struct S;");
        let marker = editor.create_marker(TextRange::new((0, 0), (0, 17)));
        editor.fold_range(TextRange::new((0, 0), (0, 7)));
        let decoration = editor.decorate_marker(marker, Overlay::new("template<T>", "folding-preview"));
        assert_eq!(editor.screen_lines(), vec!["⋯e<class T> struct S;"]);
        assert_eq!(editor.render_with_overlays(), vec!["template<T> struct S;"]);

        editor.set_decoration_class(decoration, "folding-preview-under-cursor");
        assert_eq!(
            editor.overlay_decorations()[0].class,
            "folding-preview-under-cursor"
        );
        editor.destroy_marker(marker);
        assert!(editor.overlay_decorations().is_empty());
    }

    #[test]
    fn test_atomic_soft_tabs_setter() {
        let mut editor = MemoryEditor::new("");
        assert!(editor.config().atomic_soft_tabs);
        editor.set_atomic_soft_tabs(false);
        assert!(!editor.config().atomic_soft_tabs);
    }
}
