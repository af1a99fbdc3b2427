use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, instrument};
use url::form_urlencoded;

use crate::config::{EmbedConfig, URL_ACCEPT_PATTERN};
use crate::error::EmbedError;
use crate::events::{EmbedEvent, EventBus};
use crate::metadata::{MetadataResult, ServiceFailure};
use crate::PreviewKey;

/// Fixed location of the extraction service; only the endpoint name and
/// the scheme vary by configuration.
pub const SERVICE_HOST: &str = "api.embed.ly";
pub const SERVICE_VERSION: &str = "1";

/// Correlation data attached to one resolution, so every emitted event
/// names the preview it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub key: PreviewKey,
    /// Scheme of the hosting page, inherited when `secure` is unset.
    pub page_https: bool,
}

/// Resolution seam: anything able to turn a submitted URL into bus events.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, url: &str, ctx: &RequestContext) -> Result<(), EmbedError>;
}

/// Validates a submitted URL, performs the single metadata GET, and emits
/// `progress`/`success`/`error` events on the shared bus. Holds no state
/// beyond the HTTP client and the compiled acceptance pattern.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: Arc<EmbedConfig>,
    bus: Arc<EventBus>,
    pattern: Regex,
}

impl Fetcher {
    pub fn new(config: Arc<EmbedConfig>, bus: Arc<EventBus>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("embed-preview/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to create HTTP client");
                panic!("Failed to initialize HTTP client: {}", e);
            });
        Self::with_client(client, config, bus)
    }

    pub fn with_client(client: Client, config: Arc<EmbedConfig>, bus: Arc<EventBus>) -> Self {
        let pattern = config.url_pattern.clone().unwrap_or_else(|| {
            Regex::new(URL_ACCEPT_PATTERN).expect("built-in acceptance pattern compiles")
        });
        Fetcher {
            client,
            config,
            bus,
            pattern,
        }
    }

    /// Whether a URL passes the acceptance pattern. The controller uses
    /// the same test, so rejected URLs never reach network code.
    pub fn accepts(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Assemble the service URL: configured or inherited scheme, fixed
    /// host and version, endpoint name, then the configured query pairs
    /// with `key` and `url` appended last.
    pub(crate) fn build_url(&self, url: &str, ctx: &RequestContext) -> String {
        let secure = self.config.secure.unwrap_or(ctx.page_https);
        let scheme = if secure { "https" } else { "http" };

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.config.query {
            query.append_pair(name, value);
        }
        if let Some(key) = &self.config.key {
            query.append_pair("key", key);
        }
        query.append_pair("url", url);

        format!(
            "{scheme}://{SERVICE_HOST}/{SERVICE_VERSION}/{}?{}",
            self.config.endpoint,
            query.finish()
        )
    }

    fn fail(&self, ctx: &RequestContext, err: EmbedError) -> Result<(), EmbedError> {
        err.log();
        self.bus.trigger(
            ctx.key,
            &EmbedEvent::Error {
                message: err.to_string(),
            },
        );
        Err(err)
    }
}

#[async_trait]
impl Resolve for Fetcher {
    /// Fires exactly one terminal event (`success` or `error`) on the bus,
    /// preceded by zero or more `progress` events. Validation failures
    /// emit immediately and perform no network call.
    #[instrument(level = "debug", skip(self, ctx), err)]
    async fn resolve(&self, url: &str, ctx: &RequestContext) -> Result<(), EmbedError> {
        if url.trim().is_empty() {
            return self.fail(ctx, EmbedError::MissingUrl);
        }
        if self.config.key.is_none() && self.config.fake_data.is_none() {
            return self.fail(ctx, EmbedError::KeyRequired);
        }
        if !self.pattern.is_match(url) {
            return self.fail(ctx, EmbedError::InvalidUrl);
        }

        let target = self
            .config
            .fake_data
            .clone()
            .unwrap_or_else(|| self.build_url(url, ctx));

        // Early zero so the placeholder can show a bar before any bytes
        // arrive.
        self.bus
            .trigger(ctx.key, &EmbedEvent::Progress { percent: 0.0 });

        debug!(target = %target, "Requesting metadata");
        let mut response = match self.client.get(&target).send().await {
            Ok(response) => response,
            Err(e) => return self.fail(ctx, EmbedError::Transport(e.to_string())),
        };

        let status = response.status();
        let total = response.content_length();
        let mut body: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    // No synthetic progress when the total is unknown.
                    if let Some(total) = total.filter(|t| *t > 0) {
                        self.bus.trigger(
                            ctx.key,
                            &EmbedEvent::Progress {
                                percent: 100.0 * body.len() as f64 / total as f64,
                            },
                        );
                    }
                }
                Ok(None) => break,
                Err(e) => return self.fail(ctx, EmbedError::Transport(e.to_string())),
            }
        }

        if is_acceptable_status(status) {
            let mut metadata: MetadataResult = match serde_json::from_slice(&body) {
                Ok(metadata) => metadata,
                Err(e) => return self.fail(ctx, EmbedError::DecodeError(e.to_string())),
            };
            metadata.original_url = Some(url.to_string());
            debug!(url = %url, "Metadata resolved");
            self.bus.trigger(ctx.key, &EmbedEvent::Success { metadata });
            Ok(())
        } else {
            let code = status.as_u16();
            let err = match serde_json::from_slice::<ServiceFailure>(&body) {
                Ok(ServiceFailure {
                    error_message: Some(message),
                    error_code,
                }) => EmbedError::ServiceError {
                    message,
                    code: error_code.unwrap_or(code),
                },
                _ => match status.canonical_reason() {
                    Some(reason) => EmbedError::HttpStatus {
                        status: reason.to_string(),
                        code,
                    },
                    None => EmbedError::RequestFailed { code },
                },
            };
            self.fail(ctx, err)
        }
    }
}

/// 2xx or 304: both carry a usable metadata payload.
fn is_acceptable_status(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_MODIFIED
}
