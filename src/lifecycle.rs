use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EmbedConfig;
use crate::error::EmbedError;
use crate::events::{EmbedEvent, SwapFile};
use crate::markup::SurvivingMarkup;
use crate::metadata::{
    sort_images_widest_first, EmbedMedia, Image, MediaItem, MetadataResult,
};
use crate::render::{MediaKind, RenderOp, SizeClass, VisualContent};
use crate::PreviewKey;

/// Main lifecycle state. `Destroyed` is terminal; the clean/live
/// distinction is tracked separately because it is orthogonal to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Populated,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Content record backing the rendered text block. Populated from the
/// fetched metadata, or reconstructed from surviving markup on revival.
#[derive(Debug, Clone, Default)]
pub struct PreviewData {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
}

/// Result of one transition: the UI changes a rendering adapter must
/// apply, and the events to publish on the bus. Callers apply ops first,
/// then publish, after releasing any lock on the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub ops: Vec<RenderOp>,
    pub emits: Vec<EmbedEvent>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }
}

/// The state machine behind one embedded preview. It owns no document
/// handles and performs no IO; every mutation returns a [`Transition`]
/// describing what the host must do.
#[derive(Debug)]
pub struct PreviewLifecycle {
    key: PreviewKey,
    config: Arc<EmbedConfig>,
    status: Status,
    is_clean: bool,
    error_seen: bool,
    media: Vec<MediaItem>,
    media_index: usize,
    has_cycle_controls: bool,
    data: PreviewData,
}

impl PreviewLifecycle {
    /// A fresh pending preview. Submission pairs this with
    /// [`PreviewLifecycle::insert_placeholder`]; revival instead adopts an
    /// existing serialized block.
    pub fn new(key: PreviewKey, config: Arc<EmbedConfig>) -> Self {
        Self {
            key,
            config,
            status: Status::Pending,
            is_clean: true,
            error_seen: false,
            media: Vec::new(),
            media_index: 0,
            has_cycle_controls: false,
            data: PreviewData::default(),
        }
    }

    /// Insert the empty placeholder container at the submission point.
    pub fn insert_placeholder(&self) -> Transition {
        Transition {
            ops: vec![RenderOp::InsertPlaceholder {
                link_target: self.config.link_target.clone(),
            }],
            emits: Vec::new(),
        }
    }

    pub fn key(&self) -> PreviewKey {
        self.key
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_clean(&self) -> bool {
        self.is_clean
    }

    pub fn media(&self) -> &[MediaItem] {
        &self.media
    }

    pub fn media_index(&self) -> usize {
        self.media_index
    }

    pub fn data(&self) -> &PreviewData {
        &self.data
    }

    /// Whether drag events over this preview need the page drop trap:
    /// only when embedded markup is live in the visual block.
    pub fn wants_drop_trap(&self) -> bool {
        !self.is_clean
            && self.status == Status::Populated
            && self
                .media
                .get(self.media_index)
                .map_or(false, MediaItem::is_embed)
    }

    /// Entry point for bus events addressed to this preview.
    pub fn handle_event(&mut self, event: &EmbedEvent) -> Transition {
        match event {
            EmbedEvent::Progress { percent } => self.on_progress(*percent),
            EmbedEvent::Success { metadata } => self.on_success(metadata),
            EmbedEvent::Error { message } => self.on_error(message),
            EmbedEvent::Swap { file } => self.on_swap(file),
            // Outbound notifications; nothing for the state machine to do.
            EmbedEvent::MediaSelected { .. } | EmbedEvent::NoMedia | EmbedEvent::Removed => {
                Transition::none()
            }
        }
    }

    fn on_progress(&mut self, percent: f64) -> Transition {
        if self.status != Status::Pending {
            return Transition::none();
        }
        Transition {
            ops: vec![RenderOp::SetProgress { percent }],
            emits: Vec::new(),
        }
    }

    fn on_error(&mut self, message: &str) -> Transition {
        if self.status == Status::Destroyed {
            return Transition::none();
        }
        self.error_seen = true;
        if self.config.display_errors && self.status == Status::Pending {
            Transition {
                ops: vec![RenderOp::ShowError {
                    message: message.to_string(),
                }],
                emits: Vec::new(),
            }
        } else {
            Transition::none()
        }
    }

    fn on_success(&mut self, metadata: &MetadataResult) -> Transition {
        if self.status != Status::Pending {
            debug!(key = ?self.key, status = ?self.status, "success ignored outside Pending");
            return Transition::none();
        }
        if self.error_seen && self.config.error_is_terminal {
            debug!(key = ?self.key, "late success dropped, error already latched");
            return Transition::none();
        }
        if !metadata.has_minimum_content() {
            return Transition {
                ops: Vec::new(),
                emits: vec![EmbedEvent::Error {
                    message: EmbedError::NotEnoughMetadata.to_string(),
                }],
            };
        }

        let mut ops = Vec::new();
        let mut emits = Vec::new();

        if self.config.hide_toolbar_after {
            ops.push(RenderOp::HideSubmissionUi);
        }
        if self.config.deselect_after {
            ops.push(RenderOp::ClearSelection);
        }

        let mut images = metadata.images.clone();
        sort_images_widest_first(&mut images);
        self.media = images.into_iter().map(MediaItem::Image).collect();
        if let Some(EmbedMedia { html }) = &metadata.media {
            if !html.is_empty() {
                self.media.insert(0, MediaItem::Embed { html: html.clone() });
            }
        }
        self.media_index = 0;

        self.data = PreviewData {
            url: metadata.url.clone(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            attribution: metadata.provider_display.clone(),
        };

        ops.push(RenderOp::AttachNav);
        ops.push(RenderOp::RenderText {
            title: self.data.title.clone().unwrap_or_default(),
            description: self.data.description.clone().unwrap_or_default(),
            attribution: self.data.attribution.clone(),
            url: self.data.url.clone(),
        });

        if !self.media.is_empty() {
            ops.push(RenderOp::AttachMediaNav);
            let total = self.media.len();
            let first = self.media[0].clone();
            match &first {
                MediaItem::Embed { html } => {
                    ops.push(RenderOp::ShowVisual {
                        content: VisualContent::EmbedHtml { html: html.clone() },
                    });
                    // A lone embed renders without an image frame, and no
                    // media notification fires for it.
                    if total > 1 {
                        ops.push(RenderOp::SetSizeClass {
                            class: SizeClass::Full,
                        });
                        emits.push(EmbedEvent::MediaSelected { media: first });
                    }
                }
                MediaItem::Image(image) => {
                    ops.push(RenderOp::ShowVisual {
                        content: VisualContent::Image {
                            url: image.url.clone(),
                        },
                    });
                    ops.push(RenderOp::SetSizeClass {
                        class: self.size_class_for(image),
                    });
                    emits.push(EmbedEvent::MediaSelected { media: first });
                }
            }
            if total > 1 {
                ops.push(RenderOp::AttachCycleControls);
                self.has_cycle_controls = true;
            }
        }

        self.status = Status::Populated;
        self.is_clean = false;

        Transition { ops, emits }
    }

    /// Step to the previous/next media item, wrapping at either end.
    pub fn cycle_media(&mut self, direction: Direction) -> Transition {
        if self.status != Status::Populated || self.is_clean || self.media.len() < 2 {
            return Transition::none();
        }
        let total = self.media.len();
        self.media_index = match direction {
            Direction::Next => (self.media_index + 1) % total,
            Direction::Previous => (self.media_index + total - 1) % total,
        };
        let item = self.media[self.media_index].clone();
        let mut ops = Vec::new();
        match &item {
            MediaItem::Embed { html } => {
                ops.push(RenderOp::ShowVisual {
                    content: VisualContent::EmbedHtml { html: html.clone() },
                });
                ops.push(RenderOp::SetSizeClass {
                    class: SizeClass::Full,
                });
            }
            MediaItem::Image(image) => {
                ops.push(RenderOp::ShowVisual {
                    content: VisualContent::Image {
                        url: image.url.clone(),
                    },
                });
                ops.push(RenderOp::SetSizeClass {
                    class: self.size_class_for(image),
                });
            }
        }
        Transition {
            ops,
            emits: vec![EmbedEvent::MediaSelected { media: item }],
        }
    }

    fn on_swap(&mut self, file: &SwapFile) -> Transition {
        if self.status != Status::Populated || self.is_clean {
            return Transition::none();
        }
        if self.media.is_empty() {
            debug!(key = ?self.key, "swap ignored, preview has no media");
            return Transition::none();
        }
        if !is_swappable_image(&file.mime) {
            return Transition::none();
        }

        let replacement = MediaItem::Image(Image {
            url: file.url.clone(),
            width: None,
            height: None,
        });
        self.media = vec![replacement.clone()];
        self.media_index = 0;

        let mut ops = vec![RenderOp::ShowVisual {
            content: VisualContent::Image {
                url: file.url.clone(),
            },
        }];
        if self.has_cycle_controls {
            ops.push(RenderOp::RemoveCycleControls);
            self.has_cycle_controls = false;
        }
        Transition {
            ops,
            emits: vec![EmbedEvent::MediaSelected { media: replacement }],
        }
    }

    /// Detach the visual block and its navigation without touching the
    /// rest of the preview.
    pub fn remove_media(&mut self) -> Transition {
        if self.status != Status::Populated || self.is_clean {
            return Transition::none();
        }
        if self.media.is_empty() {
            // The original fell back to querying the document here; the
            // media list is authoritative, so an empty one means there is
            // nothing to remove.
            debug!(key = ?self.key, "remove_media with empty media list");
            return Transition::none();
        }
        self.media.clear();
        self.media_index = 0;
        let mut ops = vec![RenderOp::RemoveVisual];
        if self.has_cycle_controls {
            ops.push(RenderOp::RemoveCycleControls);
            self.has_cycle_controls = false;
        }
        ops.push(RenderOp::RemoveMediaNav);
        Transition {
            ops,
            emits: vec![EmbedEvent::NoMedia],
        }
    }

    /// Strip everything that must not be serialized: interactive chrome,
    /// editable flags, helper markers, and whichever media representation
    /// is not currently displayed. Idempotent; a second call is a no-op.
    pub fn cleanup(&mut self) -> Transition {
        if self.is_clean || self.status == Status::Destroyed {
            return Transition::none();
        }

        let mut ops = vec![
            RenderOp::RemoveNav,
            RenderOp::ClearEditableFlags,
            RenderOp::RemoveHelperMarkers,
        ];

        if let Some(current) = self.media.get(self.media_index).cloned() {
            let has_embed = self.media.iter().any(MediaItem::is_embed);
            let has_image = self.media.iter().any(|m| !m.is_embed());
            if has_embed && has_image {
                let keep = if current.is_embed() {
                    MediaKind::Embed
                } else {
                    MediaKind::Image
                };
                ops.push(RenderOp::PruneAlternateMedia { keep });
            }
            self.media = vec![current];
            self.media_index = 0;
        }
        self.has_cycle_controls = false;
        self.is_clean = true;

        Transition {
            ops,
            emits: Vec::new(),
        }
    }

    /// Re-attach chrome and rebuild the data record from markup that
    /// survived a cleanup + persistence round trip. Only effective while
    /// clean.
    pub fn revive(&mut self, markup: &SurvivingMarkup) -> Transition {
        if !self.is_clean || self.status == Status::Destroyed {
            return Transition::none();
        }

        self.data = PreviewData {
            url: Some(markup.url.clone()),
            ..PreviewData::default()
        };

        // The serialized block holds exactly one media representation;
        // embedded markup wins if both somehow survived.
        self.media = if let Some(html) = &markup.embed_html {
            vec![MediaItem::Embed { html: html.clone() }]
        } else if let Some(url) = &markup.image_url {
            vec![MediaItem::Image(Image {
                url: url.clone(),
                width: None,
                height: None,
            })]
        } else {
            Vec::new()
        };
        self.media_index = 0;

        let mut ops = vec![
            RenderOp::BindExisting {
                marker: markup.marker,
            },
            RenderOp::AttachNav,
            RenderOp::RestoreHelperMarkers,
        ];
        let mut emits = Vec::new();

        if let Some(item) = self.media.first().cloned() {
            ops.push(RenderOp::AttachMediaNav);
            emits.push(EmbedEvent::MediaSelected { media: item });
        }

        let mut reconstructed = MetadataResult {
            url: Some(markup.url.clone()),
            ..MetadataResult::default()
        };
        match self.media.first() {
            Some(MediaItem::Embed { html }) => {
                reconstructed.media = Some(EmbedMedia { html: html.clone() });
            }
            Some(MediaItem::Image(image)) => {
                reconstructed.images = vec![image.clone()];
            }
            None => {}
        }
        emits.push(EmbedEvent::Success {
            metadata: reconstructed,
        });

        // Populated before the emits publish, so the success notification
        // bouncing back through this preview's own subscription is ignored.
        self.status = Status::Populated;
        self.is_clean = false;
        self.error_seen = false;

        Transition { ops, emits }
    }

    /// Remove the preview entirely. Terminal: once destroyed, every
    /// further transition returns empty.
    pub fn destroy(&mut self) -> Transition {
        if self.status == Status::Destroyed {
            warn!(key = ?self.key, "destroy on an already-destroyed preview");
            return Transition::none();
        }
        self.status = Status::Destroyed;
        Transition {
            ops: vec![RenderOp::RemovePreview],
            emits: vec![EmbedEvent::Removed],
        }
    }

    fn size_class_for(&self, image: &Image) -> SizeClass {
        SizeClass::for_width(
            image.width,
            self.config.thumbnail_size,
            self.config.thumbnail_mini,
        )
    }
}

/// MIME subtypes accepted as swap replacements. Matched on the subtype as
/// a substring, so `svg+xml` qualifies.
fn is_swappable_image(mime: &str) -> bool {
    let subtype = mime.rsplit('/').next().unwrap_or(mime);
    ["jpeg", "gif", "svg", "png"]
        .iter()
        .any(|accepted| subtype.contains(accepted))
}
