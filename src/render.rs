use crate::{PreviewId, PreviewKey};

/// What the visual block should currently display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualContent {
    /// Inline-embeddable markup, shown directly.
    EmbedHtml { html: String },
    /// A plain image, applied as the frame background.
    Image { url: String },
}

/// Width-derived presentation of an image frame. `ThumbnailMini` implies
/// both the thumbnail and the mini classes on the rendered markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Full,
    Thumbnail,
    ThumbnailMini,
}

impl SizeClass {
    /// Classify an image width against the configured thresholds. Unknown
    /// widths render full-size.
    pub fn for_width(width: Option<u32>, thumbnail_size: u32, thumbnail_mini: u32) -> Self {
        match width {
            Some(w) if w < thumbnail_size && w <= thumbnail_mini => SizeClass::ThumbnailMini,
            Some(w) if w < thumbnail_size => SizeClass::Thumbnail,
            _ => SizeClass::Full,
        }
    }
}

/// Media representation kept by a cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Embed,
    Image,
}

/// UI changes a transition asks of the host. The state machine only ever
/// describes what must change; a host-side adapter owns the document and
/// applies these to it.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    /// Insert the empty preview container (block + wrapping link) at the
    /// submission point, tagged with the preview's marker id.
    InsertPlaceholder { link_target: String },
    /// Adopt an already-serialized block discovered during revival.
    /// `marker` is the id found in the markup; the adapter rewrites it to
    /// the adopting preview's id.
    BindExisting { marker: Option<PreviewId> },
    /// Create/update the progress indicator.
    SetProgress { percent: f64 },
    /// Replace the placeholder content with an error message.
    ShowError { message: String },
    /// Render the text block: title, description, attribution, link href.
    RenderText {
        title: String,
        description: String,
        attribution: Option<String>,
        url: Option<String>,
    },
    /// Render the visual block for the given content.
    ShowVisual { content: VisualContent },
    /// Apply the width-derived classes to the frame.
    SetSizeClass { class: SizeClass },
    /// Attach the preview navigation (whole-preview delete control).
    AttachNav,
    /// Attach the media navigation (media-only delete control).
    AttachMediaNav,
    /// Attach previous/next cycling controls.
    AttachCycleControls,
    /// Detach previous/next cycling controls.
    RemoveCycleControls,
    /// Detach the media navigation.
    RemoveMediaNav,
    /// Detach the visual block.
    RemoveVisual,
    /// Drop the media representation that is not currently displayed, so
    /// only `keep` survives serialization.
    PruneAlternateMedia { keep: MediaKind },
    /// Detach the preview navigation and every bound UI handler.
    RemoveNav,
    /// Remove the editable flags from the preview's sub-regions.
    ClearEditableFlags,
    /// Remove the helper marker classes used for drag/swap affordances.
    RemoveHelperMarkers,
    /// Re-apply helper marker classes and editable flags after revival.
    RestoreHelperMarkers,
    /// Remove the preview's entire subtree.
    RemovePreview,
    /// Hide the submission form and the host toolbar.
    HideSubmissionUi,
    /// Clear the host text selection.
    ClearSelection,
    /// Insert the transparent drag trap ahead of embedded markup.
    InsertDropTrap,
    /// Remove the drag trap.
    RemoveDropTrap,
}

/// Rendering adapter: the host applies each op to its document. Tests use
/// a recording implementation instead of a document.
pub trait RenderSurface: Send + Sync {
    fn apply(&self, key: PreviewKey, op: &RenderOp);
}
