//! Link-embed preview core for rich-text editors.
//!
//! Paste a URL, fetch link metadata from an extraction service, and drive
//! an interactive preview card through its whole life: pending, populated,
//! media cycling, cleanup for persistence, revival, destruction. The host
//! editor and its document stay behind the [`HostEditor`] and
//! [`RenderSurface`] traits; the lifecycle itself is a pure state machine
//! whose transitions return [`render::RenderOp`] descriptions.

mod config;
mod controller;
mod error;
mod events;
mod fetcher;
mod host;
mod lifecycle;
#[cfg(feature = "logging")]
mod logging;
pub mod markup;
mod metadata;
pub mod render;

pub use config::{EmbedConfig, IdSequence, URL_ACCEPT_PATTERN};
pub use controller::{EmbedController, SubmissionPrompt};
pub use error::EmbedError;
pub use events::{EmbedEvent, EventBus, EventKind, SubscriptionToken, SwapFile};
pub use fetcher::{Fetcher, RequestContext, Resolve, SERVICE_HOST, SERVICE_VERSION};
pub use host::{DragCoordinator, DragPhase, HostEditor};
pub use lifecycle::{Direction, PreviewData, PreviewLifecycle, Status, Transition};
#[cfg(feature = "logging")]
pub use logging::{setup_logging, LogConfig, LogLevelGuard};
pub use markup::SurvivingMarkup;
pub use metadata::{
    sort_images_widest_first, EmbedMedia, Image, MediaItem, MetadataResult, ServiceFailure,
};
pub use render::{MediaKind, RenderOp, RenderSurface, SizeClass, VisualContent};

/// Index of an editor instance on the hosting page.
pub type EditorIndex = u32;

/// Process-unique preview id; issued by [`IdSequence`], never reused.
pub type PreviewId = u64;

/// Identity of one embedded preview: the editor that hosts it and its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub editor: EditorIndex,
    pub id: PreviewId,
}
