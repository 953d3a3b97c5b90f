use crate::surface::{DecorationId, MarkerId, Overlay, TextSurface};

/// Style class of a preview overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewClass {
    Normal,
    UnderCursor,
}

impl PreviewClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewClass::Normal => "folding-preview",
            PreviewClass::UnderCursor => "folding-preview-under-cursor",
        }
    }
}

/// Overlay showing the preview text at the start of a folding
#[derive(Debug)]
pub struct FoldingPreview {
    marker: MarkerId,
    text: String,
    class: PreviewClass,
    decoration: Option<DecorationId>,
}

impl FoldingPreview {
    pub fn new<S: TextSurface + ?Sized>(surface: &mut S, marker: MarkerId, text: impl Into<String>) -> Self {
        let mut preview = Self {
            marker,
            text: text.into(),
            class: PreviewClass::Normal,
            decoration: None,
        };
        preview.show(surface);
        preview
    }

    pub fn is_hidden(&self) -> bool {
        self.decoration.is_none()
    }

    pub fn set_class<S: TextSurface + ?Sized>(&mut self, surface: &mut S, class: PreviewClass) {
        self.class = class;
        if let Some(decoration) = self.decoration {
            surface.set_decoration_class(decoration, class.as_str());
        }
    }

    pub fn hide<S: TextSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(decoration) = self.decoration.take() {
            surface.destroy_decoration(decoration);
        }
    }

    pub fn show<S: TextSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.decoration.is_none() {
            let overlay = Overlay::new(self.text.clone(), self.class.as_str());
            self.decoration = Some(surface.decorate_marker(self.marker, overlay));
        }
    }

    pub fn destroy<S: TextSurface + ?Sized>(mut self, surface: &mut S) {
        self.hide(surface);
    }
}
