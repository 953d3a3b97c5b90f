use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// A position in the buffer (or on screen), zero-based, columns in chars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Row/column displacement from `self` to `other`
    pub fn delta_to(&self, other: Point) -> (i64, i64) {
        (
            i64::from(other.row) - i64::from(self.row),
            i64::from(other.column) - i64::from(self.column),
        )
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

impl From<(u32, u32)> for Point {
    fn from((row, column): (u32, u32)) -> Self {
        Self { row, column }
    }
}

/// A span between two points, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Point,
    pub end: Point,
}

impl TextRange {
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        let (start, end) = (start.into(), end.into());
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_single_line(&self) -> bool {
        self.start.row == self.end.row
    }

    /// Inclusive at both ends
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` has the same shape, i.e. both ends moved by the same delta
    pub fn is_translation_of(&self, other: &TextRange) -> bool {
        self.start.delta_to(other.start) == self.end.delta_to(other.end)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// One parameter of a `template<...>` parameter list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateParameter {
    /// `class T`, `typename... Ts`, `typename U = int`
    Type {
        is_pack: bool,
        name: String,
        default: String,
    },
    /// Anything not recognized as a type or template parameter
    NonType { value: String },
    /// Template template parameter: `template<class> class TT`
    Template {
        params: Vec<TemplateParameter>,
        is_pack: bool,
        name: String,
        default: String,
    },
}

impl TemplateParameter {
    pub fn type_param(is_pack: bool, name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Type {
            is_pack,
            name: name.into(),
            default: default.into(),
        }
    }

    pub fn non_type(value: impl Into<String>) -> Self {
        Self::NonType {
            value: value.into(),
        }
    }

    pub fn template(
        params: Vec<TemplateParameter>,
        is_pack: bool,
        name: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self::Template {
            params,
            is_pack,
            name: name.into(),
            default: default.into(),
        }
    }

    pub fn is_non_type(&self) -> bool {
        matches!(self, Self::NonType { .. })
    }
}

/// A located, successfully parsed `template<...>` prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOccurrence {
    /// From the `template` keyword through the closing `>`
    pub range: TextRange,
    pub params: Vec<TemplateParameter>,
}

/// Identifier of a folding inside a `FoldingsManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FoldingId(pub u64);

impl fmt::Display for FoldingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Last lifecycle event observed for a folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldingEvent {
    Created,
    Destroyed,
    Moved,
    BecameHidden,
    BecameVisible,
}

impl FoldingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldingEvent::Created => "created",
            FoldingEvent::Destroyed => "destroyed",
            FoldingEvent::Moved => "moved",
            FoldingEvent::BecameHidden => "became_hidden",
            FoldingEvent::BecameVisible => "became_visible",
        }
    }
}

/// Observable state of a folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldingInfo {
    pub last_event: FoldingEvent,
    pub highlighted: bool,
}

impl Default for FoldingInfo {
    fn default() -> Self {
        Self {
            last_event: FoldingEvent::Created,
            highlighted: false,
        }
    }
}

/// Per-item result of a fold request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldingStatus {
    Ok,
    /// Unclassified failure
    Error,
    WillExceedMaxLineLength,
    TextHasTabs,
}

impl FoldingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldingStatus::Ok => "ok",
            FoldingStatus::Error => "error",
            FoldingStatus::WillExceedMaxLineLength => "will_exceed_max_line_length",
            FoldingStatus::TextHasTabs => "text_has_tabs",
        }
    }

    /// Short explanation suitable for a user notification
    pub fn describe(&self) -> &'static str {
        match self {
            FoldingStatus::Ok => "folded",
            FoldingStatus::Error => "cannot be folded",
            FoldingStatus::WillExceedMaxLineLength => {
                "preview would exceed the preferred line length"
            }
            FoldingStatus::TextHasTabs => "declaration contains tab characters",
        }
    }
}

/// Source file flavour, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Header,
    Source,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "h" | "hh" | "hpp" | "hxx" | "h++" | "ipp" | "tpp" | "tcc" | "inl" => {
                Some(SourceKind::Header)
            }
            "cpp" | "cc" | "cxx" | "c++" | "cppm" | "ixx" => Some(SourceKind::Source),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Header => "header",
            SourceKind::Source => "source",
        }
    }
}

/// A template occurrence as reported by a project scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceEntry {
    pub range: TextRange,
    /// Number of lines the declaration spans
    pub line_count: u32,
    /// Visual length of the declaration text (CRLF counted once)
    pub visual_length: usize,
    /// Rendered preview, absent when the list is not worth summarizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Why no preview was rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub params: Vec<TemplateParameter>,
}

impl OccurrenceEntry {
    /// Characters hidden by folding this occurrence behind its preview
    pub fn saved_chars(&self) -> usize {
        self.preview
            .as_ref()
            .map(|p| self.visual_length.saturating_sub(p.chars().count()))
            .unwrap_or(0)
    }
}

/// A scanned source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative path from project root
    pub path: PathBuf,
    /// Absolute path
    pub absolute_path: PathBuf,
    pub kind: SourceKind,
    pub occurrences: Vec<OccurrenceEntry>,
    pub line_count: usize,
    /// Whether the file was read successfully
    pub parsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about a project scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateStats {
    pub total_files: usize,
    pub header_files: usize,
    pub source_files: usize,
    pub total_lines: usize,
    pub total_templates: usize,
    pub previewable_templates: usize,
    pub multiline_templates: usize,
    pub total_params: usize,
    pub saved_chars: usize,
}

impl TemplateStats {
    pub fn add_file(&mut self, file: &SourceFile) {
        self.total_files += 1;
        match file.kind {
            SourceKind::Header => self.header_files += 1,
            SourceKind::Source => self.source_files += 1,
        }
        self.total_lines += file.line_count;
        for occurrence in &file.occurrences {
            self.total_templates += 1;
            self.total_params += occurrence.params.len();
            if occurrence.preview.is_some() {
                self.previewable_templates += 1;
            }
            if occurrence.line_count > 1 {
                self.multiline_templates += 1;
            }
            self.saved_chars += occurrence.saved_chars();
        }
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregated result of scanning a project for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMap {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub stats: TemplateStats,
    pub metadata: ScanMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ordering_is_row_major() {
        assert!(Point::new(1, 50) < Point::new(2, 0));
        assert!(Point::new(2, 3) < Point::new(2, 4));
        assert_eq!(Point::new(3, 3).cmp(&Point::new(3, 3)), Ordering::Equal);
    }

    #[test]
    fn test_range_contains_point_inclusive() {
        let range = TextRange::new((2, 0), (9, 1));
        assert!(range.contains_point(Point::new(2, 0)));
        assert!(range.contains_point(Point::new(9, 1)));
        assert!(range.contains_point(Point::new(5, 80)));
        assert!(!range.contains_point(Point::new(9, 2)));
        assert!(!range.contains_point(Point::new(1, 0)));
    }

    #[test]
    fn test_range_new_orders_points() {
        let range = TextRange::new((4, 2), (1, 0));
        assert_eq!(range.start, Point::new(1, 0));
        assert_eq!(range.end, Point::new(4, 2));
    }

    #[test]
    fn test_translation_shape() {
        let a = TextRange::new((2, 4), (2, 20));
        assert!(a.is_translation_of(&TextRange::new((5, 4), (5, 20))));
        assert!(a.is_translation_of(&TextRange::new((2, 10), (2, 26))));
        assert!(!a.is_translation_of(&TextRange::new((2, 4), (2, 21))));
    }

    #[test]
    fn test_parameter_serializes_with_kind_tag() {
        let param = TemplateParameter::type_param(true, "Ts", "");
        let json = serde_json::to_string(&param).unwrap();
        assert!(json.contains("\"kind\":\"type\""));
        assert!(json.contains("\"is_pack\":true"));
    }

    #[test]
    fn test_source_kind_from_extension() {
        assert_eq!(SourceKind::from_extension("HPP"), Some(SourceKind::Header));
        assert_eq!(SourceKind::from_extension("cc"), Some(SourceKind::Source));
        assert_eq!(SourceKind::from_extension("rs"), None);
    }
}
