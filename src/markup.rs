use scraper::{Html, Selector};
use tracing::debug;

use crate::PreviewId;

/// Stable vocabulary of the serialized preview block. Hosts render with
/// these names; revival reads them back.
pub const MARKER_ATTR: &str = "data-embed-preview-id";
pub const PREVIEW_CLASS: &str = "embed-preview";
pub const TEXT_CLASS: &str = "embed-preview-text";
pub const VISUAL_CLASS: &str = "embed-preview-visual";
pub const EMBED_HTML_CLASS: &str = "embed-preview-html";
pub const IMAGE_CLASS: &str = "embed-preview-image";
pub const DROP_TRAP_CLASS: &str = "embed-preview-drop-trap";

/// What a cleanup + persistence round trip left behind: the marker id, the
/// link target, and at most one media representation worth reviving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurvivingMarkup {
    pub marker: Option<PreviewId>,
    pub url: String,
    pub embed_html: Option<String>,
    pub image_url: Option<String>,
}

/// Read a serialized preview block back into a [`SurvivingMarkup`].
/// Returns `None` when the fragment has no wrapping link to anchor a
/// preview on.
pub fn inspect_preview(html: &str) -> Option<SurvivingMarkup> {
    let fragment = Html::parse_fragment(html);

    let marker_selector = Selector::parse(&format!("[{MARKER_ATTR}]")).ok()?;
    let link_selector = Selector::parse("a[href]").ok()?;
    let embed_selector = Selector::parse(&format!(".{EMBED_HTML_CLASS}")).ok()?;
    let image_selector = Selector::parse(&format!(".{IMAGE_CLASS}")).ok()?;

    let marker = fragment
        .select(&marker_selector)
        .next()
        .and_then(|el| el.value().attr(MARKER_ATTR))
        .and_then(|raw| raw.parse::<PreviewId>().ok());

    let url = match fragment
        .select(&link_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
    {
        Some(href) => href.to_string(),
        None => {
            debug!("serialized block has no link, skipping");
            return None;
        }
    };

    let embed_html = fragment
        .select(&embed_selector)
        .next()
        .map(|el| el.inner_html());

    let image_url = fragment
        .select(&image_selector)
        .next()
        .and_then(|el| el.value().attr("style"))
        .and_then(parse_background_image);

    Some(SurvivingMarkup {
        marker,
        url,
        embed_html,
        image_url,
    })
}

/// Pull the url out of an inline `background-image: url(...)` declaration.
fn parse_background_image(style: &str) -> Option<String> {
    let start = style.find("url(")? + "url(".len();
    let rest = &style[start..];
    let end = rest.find(')')?;
    let url = rest[..end].trim().trim_matches(|c| c == '"' || c == '\'');
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
