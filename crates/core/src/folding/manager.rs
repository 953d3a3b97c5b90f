//! Lifecycle of template foldings inside one editor.
//!
//! A folding ties together a tracked marker, the pseudo-folding that
//! shrinks the declaration on screen and the preview painted over it.
//! The manager reacts to the marker notifications queued by the surface
//! and keeps each folding consistent with the text, or tears it down.

use super::highlight::{HighlightChange, HighlightingManager};
use super::preview::{FoldingPreview, PreviewClass};
use super::pseudo::{PseudoFolding, PseudoFoldingCheck};
use super::transition::{classify, MarkerSnapshot, Transition};
use super::FoldingError;
use crate::models::{FoldingEvent, FoldingId, FoldingInfo, FoldingStatus, TextRange};
use crate::surface::{CursorMove, MarkerChange, MarkerId, TextSurface};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};

/// One range to fold behind a preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRequest {
    pub range: TextRange,
    pub preview_text: String,
    pub id: FoldingId,
}

impl FoldRequest {
    pub fn new(range: TextRange, preview_text: impl Into<String>, id: FoldingId) -> Self {
        Self {
            range,
            preview_text: preview_text.into(),
            id,
        }
    }
}

/// Outcome of one fold request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldResult {
    pub id: FoldingId,
    pub status: FoldingStatus,
    /// State of the folding, present only when it was created
    pub info: Option<FoldingInfo>,
}

impl FoldResult {
    pub fn is_folded(&self) -> bool {
        self.status == FoldingStatus::Ok
    }
}

/// Keeps atomic soft tabs disabled on the wrapped surface for its lifetime
pub struct SoftTabsOverride<'a, S: TextSurface + ?Sized> {
    surface: &'a mut S,
    previous: bool,
}

impl<'a, S: TextSurface + ?Sized> SoftTabsOverride<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let previous = surface.config().atomic_soft_tabs;
        surface.set_atomic_soft_tabs(false);
        Self { surface, previous }
    }
}

impl<S: TextSurface + ?Sized> Deref for SoftTabsOverride<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: TextSurface + ?Sized> DerefMut for SoftTabsOverride<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: TextSurface + ?Sized> Drop for SoftTabsOverride<'_, S> {
    fn drop(&mut self) {
        self.surface.set_atomic_soft_tabs(self.previous);
    }
}

#[derive(Debug)]
struct Folding {
    marker: MarkerId,
    pseudo: PseudoFolding,
    preview: FoldingPreview,
    /// Screen extent right after folding; the shape every later extent is compared to
    initial_screen: TextRange,
    info: FoldingInfo,
}

/// Owner of every folding in one editor
#[derive(Debug, Default)]
pub struct FoldingsManager {
    foldings: BTreeMap<FoldingId, Folding>,
    owners: HashMap<MarkerId, FoldingId>,
    retired: HashMap<FoldingId, FoldingInfo>,
    highlighting: HighlightingManager,
}

impl FoldingsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single range; see [`fold_all_with_preview`](Self::fold_all_with_preview)
    pub fn fold_with_preview<S: TextSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        range: TextRange,
        preview_text: &str,
        id: FoldingId,
    ) -> Result<FoldResult, FoldingError> {
        let request = FoldRequest::new(range, preview_text, id);
        self.run_batch(surface, |manager, surface, max_line_length| {
            manager.fold_one(surface, &request, max_line_length)
        })
    }

    /// Fold every request as one batch.
    ///
    /// The editor configuration is validated once for the whole batch. Items
    /// are independent: one that cannot be folded reports its status and the
    /// rest still fold.
    pub fn fold_all_with_preview<S: TextSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        items: &[FoldRequest],
    ) -> Result<Vec<FoldResult>, FoldingError> {
        let results = self.run_batch(surface, |manager, surface, max_line_length| {
            items
                .iter()
                .map(|item| manager.fold_one(surface, item, max_line_length))
                .collect::<Vec<_>>()
        })?;
        tracing::info!(
            "folded {} of {} template declarations, {} previews tracked for highlighting",
            results.iter().filter(|r| r.is_folded()).count(),
            results.len(),
            self.highlighting.index().len()
        );
        Ok(results)
    }

    /// Destroy every live folding. Safe to call repeatedly.
    pub fn unfold_all<S: TextSurface + ?Sized>(&mut self, surface: &mut S) {
        let ids: Vec<FoldingId> = self.foldings.keys().copied().collect();
        for id in ids {
            self.destroy_folding(surface, id);
        }
        self.highlighting.forget_all();
        self.process_events(surface);
    }

    /// Apply every notification the surface has queued.
    ///
    /// Tearing a folding down removes its folds, which moves the foldings
    /// after it, so draining repeats until the surface has nothing left.
    pub fn process_events<S: TextSurface + ?Sized>(&mut self, surface: &mut S) {
        loop {
            let changes = surface.drain_marker_changes();
            let moves = surface.drain_cursor_moves();
            if changes.is_empty() && moves.is_empty() {
                break;
            }
            for change in &changes {
                self.on_marker_changed(surface, change);
            }
            for mv in &moves {
                self.on_cursor_moved(surface, mv);
            }
        }
    }

    /// Last known state; kept after destruction
    pub fn folding_info(&self, id: FoldingId) -> Option<FoldingInfo> {
        self.foldings
            .get(&id)
            .map(|folding| folding.info)
            .or_else(|| self.retired.get(&id).copied())
    }

    /// Current buffer range of a live folding
    pub fn range_of<S: TextSurface + ?Sized>(&self, surface: &S, id: FoldingId) -> Option<TextRange> {
        self.foldings
            .get(&id)
            .and_then(|folding| surface.marker_range(folding.marker))
    }

    pub fn ids(&self) -> impl Iterator<Item = FoldingId> + '_ {
        self.foldings.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.foldings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foldings.is_empty()
    }

    fn run_batch<S, R, F>(&mut self, surface: &mut S, batch: F) -> Result<R, FoldingError>
    where
        S: TextSurface + ?Sized,
        F: FnOnce(&mut Self, &mut S, Option<usize>) -> R,
    {
        let max_line_length = surface.config().max_line_length().map_err(|err| {
            tracing::warn!("template folding aborted: {}", err);
            err
        })?;
        // Notifications queued before the batch are handled with highlighting on
        self.process_events(surface);
        let _suspended = self.highlighting.suspend();
        let mut surface = SoftTabsOverride::new(surface);
        Ok(batch(self, &mut *surface, max_line_length))
    }

    fn fold_one<S: TextSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        item: &FoldRequest,
        max_line_length: Option<usize>,
    ) -> FoldResult {
        let rejected = |status| FoldResult {
            id: item.id,
            status,
            info: None,
        };
        if self.foldings.contains_key(&item.id) {
            tracing::debug!("folding {} already exists", item.id);
            return rejected(FoldingStatus::Error);
        }

        let width = item.preview_text.chars().count();
        let check = PseudoFolding::check_possible(surface, item.range, width, max_line_length);
        let status = match check {
            PseudoFoldingCheck::Possible => FoldingStatus::Ok,
            PseudoFoldingCheck::WillExceedMaxLineLength => FoldingStatus::WillExceedMaxLineLength,
            PseudoFoldingCheck::TextHasTabs => FoldingStatus::TextHasTabs,
            PseudoFoldingCheck::FoldAreaIsIncorrect | PseudoFoldingCheck::FoldAreaIsTooWide => {
                FoldingStatus::Error
            }
        };
        let Some(width) = NonZeroUsize::new(width).filter(|_| status == FoldingStatus::Ok) else {
            tracing::debug!("folding {} rejected: {:?}", item.id, check);
            return rejected(status);
        };

        // Pending notifications belong to foldings that already exist
        self.process_events(surface);

        let marker = surface.create_marker(item.range);
        let pseudo = PseudoFolding::new(surface, marker, width);
        let preview = FoldingPreview::new(surface, marker, item.preview_text.clone());
        // The new marker is not registered yet, so its own notifications are dropped
        self.process_events(surface);

        let initial_screen = surface
            .marker_screen_range(marker)
            .unwrap_or_else(|| surface.screen_range_for(item.range));
        let mut folding = Folding {
            marker,
            pseudo,
            preview,
            initial_screen,
            info: FoldingInfo::default(),
        };

        let under_cursor = surface
            .marker_range(marker)
            .is_some_and(|range| range.contains_point(surface.cursor()));
        if under_cursor {
            folding.preview.set_class(surface, PreviewClass::UnderCursor);
            folding.info.highlighted = true;
        }

        tracing::debug!("folding {} created at {}", item.id, initial_screen);
        self.highlighting.manage(item.id, initial_screen.start.row);
        self.owners.insert(marker, item.id);
        self.retired.remove(&item.id);
        let info = folding.info;
        self.foldings.insert(item.id, folding);

        FoldResult {
            id: item.id,
            status,
            info: Some(info),
        }
    }

    fn on_marker_changed<S: TextSurface + ?Sized>(&mut self, surface: &mut S, change: &MarkerChange) {
        let Some(&id) = self.owners.get(&change.marker) else {
            return;
        };
        let Some(folding) = self.foldings.get_mut(&id) else {
            return;
        };

        let snapshot = MarkerSnapshot::from(change);
        match classify(&snapshot, &folding.initial_screen) {
            Transition::Translated => {
                tracing::debug!("marker of folding {} translated", id);
                folding.info.last_event = FoldingEvent::Moved;
                self.highlighting.manage(id, snapshot.new_tail.row);
            }
            Transition::BecameVisible => {
                tracing::debug!("marker of folding {} became visible", id);
                folding.preview.show(surface);
                folding.info.last_event = FoldingEvent::BecameVisible;
                self.highlighting.manage(id, snapshot.new_tail.row);
            }
            Transition::BecameHidden => {
                tracing::debug!("marker of folding {} became hidden", id);
                folding.preview.set_class(surface, PreviewClass::Normal);
                folding.preview.hide(surface);
                folding.info.last_event = FoldingEvent::BecameHidden;
                folding.info.highlighted = false;
                self.highlighting.forget(id);
            }
            transition @ (Transition::Invalidated | Transition::Destructive) => {
                tracing::debug!("folding {} destroyed: {:?} {:?}", id, transition, snapshot);
                self.destroy_folding(surface, id);
            }
        }
    }

    fn on_cursor_moved<S: TextSurface + ?Sized>(&mut self, surface: &mut S, mv: &CursorMove) {
        let changes = {
            let foldings = &self.foldings;
            let surface = &*surface;
            self.highlighting.on_cursor_moved(mv, |id| {
                foldings
                    .get(&id)
                    .and_then(|folding| surface.marker_range(folding.marker))
            })
        };
        for change in changes {
            let (id, class) = match change {
                HighlightChange::Add(id) => (id, PreviewClass::UnderCursor),
                HighlightChange::Remove(id) => (id, PreviewClass::Normal),
            };
            let Some(folding) = self.foldings.get_mut(&id) else {
                continue;
            };
            if folding.preview.is_hidden() {
                continue;
            }
            folding.preview.set_class(surface, class);
            folding.info.highlighted = class == PreviewClass::UnderCursor;
        }
    }

    fn destroy_folding<S: TextSurface + ?Sized>(&mut self, surface: &mut S, id: FoldingId) {
        let Some(folding) = self.foldings.remove(&id) else {
            return;
        };
        self.owners.remove(&folding.marker);
        self.highlighting.forget(id);
        folding.preview.destroy(surface);
        // the marker must outlive the folds and the overlay anchored to it
        folding.pseudo.destroy(surface);
        surface.destroy_marker(folding.marker);
        self.retired.insert(
            id,
            FoldingInfo {
                last_event: FoldingEvent::Destroyed,
                highlighted: false,
            },
        );
    }
}
