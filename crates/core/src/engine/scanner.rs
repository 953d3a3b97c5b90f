use crate::models::{Point, TemplateOccurrence, TextRange};
use crate::parsers::parse_template_prefix;
use crate::surface::{point_after, TextSurface};
use std::ops::Range;

const KEYWORD: &str = "template";

/// Locates `template<...>` prefixes in arbitrary text.
///
/// Every occurrence of the keyword is a candidate. A candidate the grammar
/// accepts is reported and scanning resumes after its closing `>`; a rejected
/// one is skipped by the length of the keyword only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateScanner;

impl TemplateScanner {
    pub fn new() -> Self {
        Self
    }

    /// Occurrences in `text`, positions relative to the origin
    pub fn scan(&self, text: &str) -> Vec<TemplateOccurrence> {
        self.scan_from(text, Point::default())
    }

    /// Occurrences inside `range` of a surface
    pub fn scan_surface<S: TextSurface + ?Sized>(
        &self,
        surface: &S,
        range: TextRange,
    ) -> Vec<TemplateOccurrence> {
        let text = surface.text_in_range(range);
        self.scan_from(&text, range.start)
    }

    /// Occurrences paired with their byte span in `text`
    pub fn scan_with_offsets(&self, text: &str) -> Vec<(Range<usize>, TemplateOccurrence)> {
        let mut found = Vec::new();
        // last translated offset and its position, so conversion stays linear
        let mut anchor = (0usize, Point::default());
        let mut locate = |offset: usize| {
            let point = point_after(anchor.1, &text[anchor.0..offset]);
            anchor = (offset, point);
            point
        };

        let mut cursor = 0;
        while let Some(found_at) = text[cursor..].find(KEYWORD) {
            let start = cursor + found_at;
            match parse_template_prefix(&text[start..]) {
                Some(parsed) => {
                    let end = start + parsed.consumed;
                    let range = TextRange {
                        start: locate(start),
                        end: locate(end),
                    };
                    found.push((
                        start..end,
                        TemplateOccurrence {
                            range,
                            params: parsed.params,
                        },
                    ));
                    cursor = end;
                }
                None => cursor = start + KEYWORD.len(),
            }
        }

        tracing::debug!("found {} template declarations", found.len());
        found
    }

    fn scan_from(&self, text: &str, base: Point) -> Vec<TemplateOccurrence> {
        self.scan_with_offsets(text)
            .into_iter()
            .map(|(_, mut occurrence)| {
                occurrence.range = TextRange {
                    start: rebase(base, occurrence.range.start),
                    end: rebase(base, occurrence.range.end),
                };
                occurrence
            })
            .collect()
    }
}

/// Translate a point relative to the start of a scanned slice
fn rebase(base: Point, relative: Point) -> Point {
    if relative.row == 0 {
        Point::new(base.row, base.column + relative.column)
    } else {
        Point::new(base.row + relative.row, relative.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::NESTED_CLASS_TEMPLATE;
    use crate::models::TemplateParameter;
    use crate::surface::MemoryEditor;

    #[test]
    fn test_find_nested_class_template() {
        let found = TemplateScanner::new().scan(NESTED_CLASS_TEMPLATE);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].range, TextRange::new((2, 0), (9, 1)));
        assert_eq!(found[0].params.len(), 6);
        assert_eq!(found[1].range, TextRange::new((14, 4), (14, 21)));
        assert_eq!(
            found[1].params,
            vec![TemplateParameter::type_param(false, "Z", "")]
        );
    }

    #[test]
    fn test_find_multiple_templates_on_separate_lines() {
        let text = "template<class T>\nstruct A;\n\ntemplate<class U>\nstruct B;\n\ntemplate<typename K, int>\nstruct C;\n";
        let found = TemplateScanner::new().scan(text);
        let ranges: Vec<TextRange> = found.iter().map(|o| o.range).collect();
        assert_eq!(
            ranges,
            vec![
                TextRange::new((0, 0), (0, 17)),
                TextRange::new((3, 0), (3, 17)),
                TextRange::new((6, 0), (6, 25)),
            ]
        );
    }

    #[test]
    fn test_occurrences_are_ordered_and_disjoint() {
        let text = "template<class A> template<class B> x; template<> y; template<int N> z; template<class C>";
        let found = TemplateScanner::new().scan(text);
        assert_eq!(found.len(), 5);
        for pair in found.windows(2) {
            assert!(pair[0].range.end <= pair[1].range.start);
            assert!(pair[0].range.start < pair[1].range.start);
        }
    }

    #[test]
    fn test_rejected_candidate_resumes_after_keyword() {
        let text = "template class X; template<class Y> y;";
        let found = TemplateScanner::new().scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, TextRange::new((0, 18), (0, 35)));
    }

    #[test]
    fn test_keyword_without_list_is_skipped() {
        let found = TemplateScanner::new().scan("// template metaprogramming\nx.template get<0>();");
        assert!(found.is_empty());
    }

    #[test]
    fn test_multiline_end_column_counts_chars() {
        let text = "  template<class T,\n   class Ü = ü>";
        let found = TemplateScanner::new().scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, TextRange::new((0, 2), (1, 15)));
    }

    #[test]
    fn test_scan_with_offsets_reports_byte_spans() {
        let text = "ä template<class T> x";
        let found = TemplateScanner::new().scan_with_offsets(text);
        assert_eq!(found.len(), 1);
        let (span, occurrence) = &found[0];
        assert_eq!(&text[span.clone()], "template<class T>");
        assert_eq!(occurrence.range, TextRange::new((0, 2), (0, 19)));
    }

    #[test]
    fn test_scan_surface_subrange() {
        let editor = MemoryEditor::new(NESTED_CLASS_TEMPLATE);
        let range = TextRange::new((12, 0), (16, 2));
        let found = TemplateScanner::new().scan_surface(&editor, range);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, TextRange::new((14, 4), (14, 21)));

        let found = TemplateScanner::new().scan_surface(&editor, TextRange::new((14, 6), (16, 0)));
        assert!(found.is_empty());
    }
}
