//! tplfold Core Library
//!
//! Finds C++ `template<...>` parameter lists and folds each of them behind a
//! compact one-line preview such as `template<T, U = int>`, keeping the
//! foldings consistent while the text is edited.
//!
//! # Features
//!
//! - Backtracking parser for template parameter lists (type, non-type,
//!   template template parameters, packs, defaults, nested brackets)
//! - Preview rendering that drops keywords and anonymizes unnamed parameters
//! - Pseudo-folding: partial-line folds built from a whole-range fold primitive
//! - Folding lifecycle driven by marker change notifications, with cursor
//!   highlighting of the preview under the cursor
//! - An in-memory editor surface, project scanning and JSON/YAML/ANSI output
//!
//! # Example
//!
//! ```no_run
//! use tplfold_core::{MemoryEditor, TemplateFoldings};
//!
//! let editor = MemoryEditor::new("template<class T, int N> struct Array;\n");
//! let mut foldings = TemplateFoldings::new(editor);
//! let report = foldings.fold_all().unwrap();
//! for line in report.notification_lines() {
//!     eprintln!("{}", line);
//! }
//! println!("{}", foldings.surface().render_with_overlays().join("\n"));
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod folding;
pub mod models;
pub mod output;
pub mod parsers;
pub mod surface;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-exports for convenience
pub use config::{EditorConfig, ScanConfig};
pub use controller::{FoldFailure, FoldReport, TemplateFoldings};
pub use engine::{Preview, PreviewRenderer, ProjectScanner, RenderError, ScanError, TemplateScanner};
pub use folding::{FoldRequest, FoldResult, FoldingError, FoldingsManager};
pub use models::*;
pub use output::{
    format_file, format_file_listing, format_folded_screen, format_output, format_summary,
    to_json, to_yaml, FormatError, OutputFormat,
};
pub use parsers::{parse_parameter, parse_template_prefix};
pub use surface::{MemoryEditor, TextSurface};
