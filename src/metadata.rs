use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Payload of a successful extraction, as delivered by the metadata
/// service. Everything is optional at the wire layer; the minimum-content
/// rule (title + description) is enforced by the preview lifecycle, not
/// here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider_display: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub media: Option<EmbedMedia>,
    /// The URL the user submitted, stamped by the fetcher after decoding.
    #[serde(default)]
    pub original_url: Option<String>,
}

impl MetadataResult {
    /// A preview needs at least a title and a description to render.
    pub fn has_minimum_content(&self) -> bool {
        self.title.is_some() && self.description.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Inline-embeddable media (video/iframe markup) attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub html: String,
}

/// Error body the service returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceFailure {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

/// One entry of a preview's media list: either embeddable markup or a
/// plain image. When both exist the embed sits at the front of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    Embed { html: String },
    Image(Image),
}

impl MediaItem {
    pub fn is_embed(&self) -> bool {
        matches!(self, MediaItem::Embed { .. })
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            MediaItem::Image(img) => Some(img),
            MediaItem::Embed { .. } => None,
        }
    }
}

/// Order images widest first. The sort is stable and treats any pair where
/// either width is unknown as equal, so such entries keep their relative
/// order.
pub fn sort_images_widest_first(images: &mut [Image]) {
    if images.len() < 2 {
        return;
    }
    images.sort_by(|a, b| match (a.width, b.width) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    });
}
