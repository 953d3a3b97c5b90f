//! Folding engine: pseudo-foldings, previews, marker tracking and cursor
//! highlighting, coordinated by [`FoldingsManager`].

mod highlight;
mod manager;
mod preview;
mod pseudo;
mod transition;

pub use highlight::{HighlightChange, HighlightSuspension, HighlightingManager};
pub use manager::{FoldRequest, FoldResult, FoldingsManager, SoftTabsOverride};
pub use preview::{FoldingPreview, PreviewClass};
pub use pseudo::{PseudoFolding, PseudoFoldingCheck};
pub use transition::{classify, MarkerSnapshot, Transition};

use thiserror::Error;

/// Failures that abort a whole fold batch
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldingError {
    #[error(
        "Template folding does not support soft wrap at the window edge; \
         turn soft wrap off or wrap at the preferred line length"
    )]
    UnsupportedSoftWrap,
}
