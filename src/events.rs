use std::sync::{Arc, Mutex};

use crate::metadata::{MediaItem, MetadataResult};
use crate::PreviewKey;

/// Events flowing over the shared bus. Outbound (`Progress` through
/// `Removed`) are published by the fetcher and the lifecycle; `Swap` is
/// inbound, triggered by the host when the user drops a file onto a
/// preview.
#[derive(Debug, Clone)]
pub enum EmbedEvent {
    Progress { percent: f64 },
    Success { metadata: MetadataResult },
    Error { message: String },
    MediaSelected { media: MediaItem },
    NoMedia,
    Removed,
    Swap { file: SwapFile },
}

impl EmbedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EmbedEvent::Progress { .. } => EventKind::Progress,
            EmbedEvent::Success { .. } => EventKind::Success,
            EmbedEvent::Error { .. } => EventKind::Error,
            EmbedEvent::MediaSelected { .. } => EventKind::MediaSelected,
            EmbedEvent::NoMedia => EventKind::NoMedia,
            EmbedEvent::Removed => EventKind::Removed,
            EmbedEvent::Swap { .. } => EventKind::Swap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Progress,
    Success,
    Error,
    MediaSelected,
    NoMedia,
    Removed,
    Swap,
}

/// A file dropped onto a preview, offered as replacement media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapFile {
    pub mime: String,
    pub url: String,
}

pub type EventHandler = Arc<dyn Fn(PreviewKey, &EmbedEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(u64);

struct Subscriber {
    token: SubscriptionToken,
    kind: EventKind,
    filter: Option<PreviewKey>,
    handler: EventHandler,
}

/// Shared publish/subscribe bus. Delivery is synchronous, in subscription
/// order. Handlers are registered per event kind and may additionally be
/// pre-filtered to a single preview key, so a lifecycle never sees events
/// addressed to its neighbors.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_token: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event of `kind`, regardless of which preview it
    /// addresses. This is the boundary contract external collaborators
    /// (telemetry, the host) use.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(PreviewKey, &EmbedEvent) + Send + Sync + 'static,
    {
        self.register(kind, None, Arc::new(handler))
    }

    /// Subscribe pre-filtered to one preview key.
    pub fn subscribe_preview<F>(
        &self,
        key: PreviewKey,
        kind: EventKind,
        handler: F,
    ) -> SubscriptionToken
    where
        F: Fn(PreviewKey, &EmbedEvent) + Send + Sync + 'static,
    {
        self.register(kind, Some(key), Arc::new(handler))
    }

    fn register(
        &self,
        kind: EventKind,
        filter: Option<PreviewKey>,
        handler: EventHandler,
    ) -> SubscriptionToken {
        let mut inner = self.inner.lock().unwrap();
        let token = SubscriptionToken(inner.next_token);
        inner.next_token += 1;
        inner.subscribers.push(Subscriber {
            token,
            kind,
            filter,
            handler,
        });
        token
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|s| s.token != token);
    }

    /// Publish an event addressed to `key`. The matching handler set is
    /// snapshotted before any handler runs, so handlers are free to
    /// subscribe, unsubscribe or trigger again without deadlocking the
    /// bus.
    pub fn trigger(&self, key: PreviewKey, event: &EmbedEvent) {
        let kind = event.kind();
        let matching: Vec<EventHandler> = {
            let inner = self.inner.lock().unwrap();
            inner
                .subscribers
                .iter()
                .filter(|s| s.kind == kind && s.filter.map_or(true, |f| f == key))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };
        for handler in matching {
            handler(key, event);
        }
    }
}
