//! Per-editor entry point: find every template declaration, fold it behind
//! its preview and keep the foldings in sync with later edits.

use crate::engine::{PreviewRenderer, TemplateScanner};
use crate::folding::{FoldRequest, FoldingError, FoldingsManager};
use crate::models::{FoldingId, FoldingInfo, FoldingStatus, TemplateOccurrence};
use crate::surface::{full_buffer_range, TextSurface};
use serde::Serialize;

/// A declaration that was found but could not be folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoldFailure {
    /// Zero-based buffer row of the `template` keyword
    pub row: u32,
    pub reason: FoldingStatus,
}

/// Summary of one `fold_all` pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FoldReport {
    pub folded: usize,
    /// Declarations whose parameter list was not worth a preview
    pub skipped: usize,
    pub failures: Vec<FoldFailure>,
}

impl FoldReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line per failed declaration, rows shown one-based
    pub fn notification_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|failure| format!("line {}: {}", failure.row + 1, failure.reason.describe()))
            .collect()
    }
}

/// Template foldings of one editor
#[derive(Debug)]
pub struct TemplateFoldings<S: TextSurface> {
    surface: S,
    manager: FoldingsManager,
    scanner: TemplateScanner,
    renderer: PreviewRenderer,
    next_id: u64,
}

impl<S: TextSurface> TemplateFoldings<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            manager: FoldingsManager::new(),
            scanner: TemplateScanner::new(),
            renderer: PreviewRenderer::new(),
            next_id: 1,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn manager(&self) -> &FoldingsManager {
        &self.manager
    }

    /// Refold the whole buffer from scratch
    pub fn fold_all(&mut self) -> Result<FoldReport, FoldingError> {
        self.manager.unfold_all(&mut self.surface);

        let range = full_buffer_range(&self.surface);
        let occurrences = self.scanner.scan_surface(&self.surface, range);
        let mut report = FoldReport::default();
        let mut requests = Vec::with_capacity(occurrences.len());
        let mut rows = Vec::with_capacity(occurrences.len());
        for occurrence in &occurrences {
            match self.renderer.render(&occurrence.params) {
                Ok(preview) => {
                    requests.push(FoldRequest::new(occurrence.range, preview.text, self.allocate_id()));
                    rows.push(occurrence.range.start.row);
                }
                Err(err) => {
                    tracing::debug!("skipping template at {}: {}", occurrence.range.start, err);
                    report.skipped += 1;
                }
            }
        }

        let results = self.manager.fold_all_with_preview(&mut self.surface, &requests)?;
        for (result, row) in results.iter().zip(rows) {
            if result.is_folded() {
                report.folded += 1;
            } else {
                report.failures.push(FoldFailure {
                    row,
                    reason: result.status,
                });
            }
        }
        Ok(report)
    }

    pub fn unfold_all(&mut self) {
        self.manager.unfold_all(&mut self.surface);
    }

    /// Declarations currently in the buffer, folded or not
    pub fn occurrences(&self) -> Vec<TemplateOccurrence> {
        let range = full_buffer_range(&self.surface);
        self.scanner.scan_surface(&self.surface, range)
    }

    /// Run a host mutation, then bring the foldings up to date with it
    pub fn edit<R>(&mut self, mutate: impl FnOnce(&mut S) -> R) -> R {
        let result = mutate(&mut self.surface);
        self.manager.process_events(&mut self.surface);
        result
    }

    /// Clicking a preview puts the cursor at the start of its declaration
    pub fn click_preview(&mut self, id: FoldingId) -> bool {
        let Some(range) = self.manager.range_of(&self.surface, id) else {
            return false;
        };
        self.edit(|surface| surface.set_cursor(range.start));
        true
    }

    pub fn folding_info(&self, id: FoldingId) -> Option<FoldingInfo> {
        self.manager.folding_info(id)
    }

    pub fn folding_ids(&self) -> Vec<FoldingId> {
        self.manager.ids().collect()
    }

    /// Remove every folding and hand the surface back
    pub fn dispose(mut self) -> S {
        self.manager.unfold_all(&mut self.surface);
        self.surface
    }

    fn allocate_id(&mut self) -> FoldingId {
        let id = FoldingId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::fixtures::{NESTED_CLASS_TEMPLATE, OUTER_PREVIEW};
    use crate::models::{FoldingEvent, Point, TextRange};
    use crate::surface::MemoryEditor;

    fn foldings(text: &str) -> TemplateFoldings<MemoryEditor> {
        TemplateFoldings::new(MemoryEditor::new(text))
    }

    #[test]
    fn test_fold_all_nested_class_template() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        let report = tf.fold_all().unwrap();
        assert_eq!(report.folded, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.is_clean());
        assert_eq!(tf.surface().overlay_decorations().len(), 2);
        assert_eq!(tf.surface().render_with_overlays()[2], OUTER_PREVIEW);
    }

    #[test]
    fn test_fold_all_twice_refolds() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        tf.fold_all().unwrap();
        let first_ids = tf.folding_ids();
        let report = tf.fold_all().unwrap();
        assert_eq!(report.folded, 2);
        assert_eq!(tf.folding_ids().len(), 2);
        for id in first_ids {
            assert_eq!(tf.folding_info(id).unwrap().last_event, FoldingEvent::Destroyed);
        }
        assert_eq!(tf.surface().overlay_decorations().len(), 2);
    }

    #[test]
    fn test_report_lists_failures_and_skips() {
        let text = "template<int N> struct Fixed;\n\
                    template<class A,\tclass B> struct Tabbed;\n\
                    template<class T> struct Plain;\n";
        let mut tf = foldings(text);
        let report = tf.fold_all().unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.folded, 1);
        assert_eq!(
            report.failures,
            vec![FoldFailure {
                row: 1,
                reason: FoldingStatus::TextHasTabs
            }]
        );
        assert_eq!(
            report.notification_lines(),
            vec!["line 2: declaration contains tab characters".to_string()]
        );
    }

    #[test]
    fn test_unsupported_soft_wrap() {
        let config = EditorConfig {
            soft_wrap: true,
            ..EditorConfig::default()
        };
        let mut tf = TemplateFoldings::new(MemoryEditor::with_config(NESTED_CLASS_TEMPLATE, config));
        assert_eq!(tf.fold_all(), Err(FoldingError::UnsupportedSoftWrap));
        assert!(tf.folding_ids().is_empty());
    }

    #[test]
    fn test_edit_inside_destroys_and_above_moves() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        tf.fold_all().unwrap();
        let ids = tf.folding_ids();

        tf.edit(|editor| editor.insert(Point::new(0, 0), "// header\n"));
        for &id in &ids {
            assert_eq!(tf.folding_info(id).unwrap().last_event, FoldingEvent::Moved);
        }

        tf.edit(|editor| editor.insert(Point::new(15, 10), "X"));
        assert_eq!(tf.folding_info(ids[1]).unwrap().last_event, FoldingEvent::Destroyed);
        assert_eq!(tf.folding_ids(), vec![ids[0]]);
        assert_eq!(tf.surface().overlay_decorations().len(), 1);
    }

    #[test]
    fn test_click_preview_moves_cursor_and_highlights() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        tf.fold_all().unwrap();
        let ids = tf.folding_ids();
        assert!(tf.click_preview(ids[1]));
        assert_eq!(tf.surface().cursor(), Point::new(14, 4));
        assert!(tf.folding_info(ids[1]).unwrap().highlighted);
        assert!(!tf.click_preview(FoldingId(999)));
    }

    #[test]
    fn test_dispose_restores_text() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        tf.fold_all().unwrap();
        let editor = tf.dispose();
        assert_eq!(editor.text(), NESTED_CLASS_TEMPLATE);
        assert!(editor.fold_ranges().is_empty());
        assert!(editor.overlay_decorations().is_empty());
        assert_eq!(
            editor.screen_lines().len(),
            NESTED_CLASS_TEMPLATE.lines().count() + 1
        );
    }

    #[test]
    fn test_occurrences_after_fold() {
        let mut tf = foldings(NESTED_CLASS_TEMPLATE);
        tf.fold_all().unwrap();
        let ranges: Vec<TextRange> = tf.occurrences().iter().map(|o| o.range).collect();
        assert_eq!(
            ranges,
            vec![TextRange::new((2, 0), (9, 1)), TextRange::new((14, 4), (14, 21))]
        );
    }
}
