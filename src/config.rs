use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use regex::Regex;

use crate::PreviewId;

/// Shape every accepted URL must match: absolute http(s), optional
/// userinfo, host, optional port, constrained path/query characters.
pub const URL_ACCEPT_PATTERN: &str =
    r"(http|https)://(\w+:?\w*@)?(\S+)(:[0-9]+)?(/|/([\w#!:.?+=&%@!\-/]))?";

/// Per-editor-instance configuration, merged against these defaults by the
/// host before constructing a controller.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// API key for the extraction service. Required unless `fake_data`
    /// bypasses the live endpoint.
    pub key: Option<String>,
    /// Fixture URL fetched instead of the live endpoint; lifts the key
    /// requirement. Meant for demos and tests.
    pub fake_data: Option<String>,
    /// Extraction endpoint name appended to the fixed service prefix.
    pub endpoint: String,
    /// Force http/https. When unset the page scheme is inherited.
    pub secure: Option<bool>,
    /// Extra query parameters, sent in this order before `key` and `url`.
    pub query: Vec<(String, String)>,
    /// Overrides the built-in acceptance pattern when set.
    pub url_pattern: Option<Regex>,
    /// Allow more than one active preview per editor.
    pub allow_multiple: bool,
    /// `target` attribute for the preview's wrapping link.
    pub link_target: String,
    /// Render errors inside the preview area. The `error` event fires
    /// either way.
    pub display_errors: bool,
    /// Hide the submission form and toolbar once a preview renders.
    pub hide_toolbar_after: bool,
    /// Clear the host text selection once a preview renders.
    pub deselect_after: bool,
    /// Images narrower than this get the thumbnail treatment.
    pub thumbnail_size: u32,
    /// Images at or below this width additionally get the mini treatment.
    pub thumbnail_mini: u32,
    /// When true, the first error latches and a later success for the same
    /// preview is ignored. Defaults to false: a late success still
    /// populates the preview.
    pub error_is_terminal: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            key: None,
            fake_data: None,
            endpoint: "extract".to_string(),
            secure: None,
            query: Vec::new(),
            url_pattern: None,
            allow_multiple: false,
            link_target: "_blank".to_string(),
            display_errors: true,
            hide_toolbar_after: true,
            deselect_after: true,
            thumbnail_size: 300,
            thumbnail_mini: 100,
            error_is_terminal: false,
        }
    }
}

impl EmbedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_fake_data(mut self, url: impl Into<String>) -> Self {
        self.fake_data = Some(url.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_url_pattern(mut self, pattern: Regex) -> Self {
        self.url_pattern = Some(pattern);
        self
    }

    pub fn with_allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    pub fn with_display_errors(mut self, display: bool) -> Self {
        self.display_errors = display;
        self
    }

    pub fn with_error_is_terminal(mut self, terminal: bool) -> Self {
        self.error_is_terminal = terminal;
        self
    }
}

/// Monotonic preview-id source. Clone handles share the counter, so a page
/// hosting several controllers can inject one sequence and keep ids unique
/// across all of them. Ids are never reused, destroyed or not.
#[derive(Debug, Clone, Default)]
pub struct IdSequence {
    next: Arc<AtomicU64>,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> PreviewId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
