use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use crate::config::{EmbedConfig, IdSequence};
use crate::error::EmbedError;
use crate::events::{EmbedEvent, EventBus, EventKind, SubscriptionToken, SwapFile};
use crate::fetcher::{Fetcher, RequestContext, Resolve};
use crate::host::{DragCoordinator, DragPhase, HostEditor};
use crate::lifecycle::{Direction, PreviewLifecycle, Transition};
use crate::markup;
use crate::render::RenderSurface;
use crate::{EditorIndex, PreviewKey};

/// What the submission form should open with: the saved selection,
/// trimmed when it already looks like an acceptable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPrompt {
    pub prefill: String,
    pub valid: bool,
}

struct PreviewEntry {
    lifecycle: Arc<Mutex<PreviewLifecycle>>,
    subscriptions: Vec<SubscriptionToken>,
}

/// Per-editor-instance entry point. Owns the merged configuration, the
/// registry of live previews, the id sequence and the drag coordinator;
/// translates host gestures into lifecycle transitions and fans the
/// editor-persistence hooks out to every registered preview.
pub struct EmbedController {
    config: Arc<EmbedConfig>,
    bus: Arc<EventBus>,
    surface: Arc<dyn RenderSurface>,
    fetcher: Fetcher,
    registry: DashMap<PreviewKey, PreviewEntry>,
    ids: IdSequence,
    drag: Mutex<DragCoordinator>,
}

impl EmbedController {
    pub fn new(config: EmbedConfig, surface: Arc<dyn RenderSurface>) -> Self {
        Self::with_shared(config, surface, Arc::new(EventBus::new()), IdSequence::new())
    }

    /// Construct against a shared bus and id sequence, so several
    /// controllers on one page stay on one event channel and one id space.
    pub fn with_shared(
        config: EmbedConfig,
        surface: Arc<dyn RenderSurface>,
        bus: Arc<EventBus>,
        ids: IdSequence,
    ) -> Self {
        let config = Arc::new(config);
        let fetcher = Fetcher::new(Arc::clone(&config), Arc::clone(&bus));
        Self {
            config,
            bus,
            surface,
            fetcher,
            registry: DashMap::new(),
            ids,
            drag: Mutex::new(DragCoordinator::new()),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &Arc<EmbedConfig> {
        &self.config
    }

    /// Keys of the previews currently registered for an editor, id order.
    pub fn previews_for(&self, editor: EditorIndex) -> Vec<PreviewKey> {
        let mut keys: Vec<PreviewKey> = self
            .registry
            .iter()
            .map(|entry| *entry.key())
            .filter(|key| key.editor == editor)
            .collect();
        keys.sort_by_key(|key| key.id);
        keys
    }

    /// Open the submission form: saves the selection and offers it back as
    /// the prefill, trimmed when it already passes the acceptance pattern.
    pub fn begin_submission(&self, editor: &dyn HostEditor) -> SubmissionPrompt {
        let selection = editor.selection_text();
        editor.save_selection();
        let trimmed = selection.trim();
        if self.fetcher.accepts(trimmed) {
            SubmissionPrompt {
                prefill: trimmed.to_string(),
                valid: true,
            }
        } else {
            SubmissionPrompt {
                prefill: selection,
                valid: false,
            }
        }
    }

    /// Close the submission form without embedding.
    pub fn cancel_submission(&self, editor: &dyn HostEditor) {
        editor.restore_selection();
    }

    /// Submit a URL for embedding. Enforces single-preview mode, inserts
    /// the pending placeholder, then hands the URL to the fetcher; every
    /// later step arrives as bus events addressed to the returned key.
    #[instrument(level = "debug", skip(self, editor))]
    pub async fn submit(
        &self,
        editor: &dyn HostEditor,
        url: &str,
    ) -> Result<PreviewKey, EmbedError> {
        let url = url.trim();
        let editor_index = editor.editor_index();

        if !self.config.allow_multiple {
            for key in self.previews_for(editor_index) {
                debug!(key = ?key, "single-preview mode, destroying prior preview");
                self.destroy(key);
            }
        }

        let key = PreviewKey {
            editor: editor_index,
            id: self.ids.next_id(),
        };
        let lifecycle = Arc::new(Mutex::new(PreviewLifecycle::new(
            key,
            Arc::clone(&self.config),
        )));
        let placeholder = lifecycle.lock().unwrap().insert_placeholder();
        let subscriptions = self.bind(key, &lifecycle);
        self.registry.insert(
            key,
            PreviewEntry {
                lifecycle,
                subscriptions,
            },
        );
        self.apply(key, placeholder);

        let ctx = RequestContext {
            key,
            page_https: editor.page_is_https(),
        };
        // Failures were already published as error events; the Result is
        // for direct callers.
        self.fetcher.resolve(url, &ctx).await?;
        Ok(key)
    }

    pub fn next_media(&self, key: PreviewKey) {
        self.with_lifecycle(key, |lifecycle| lifecycle.cycle_media(Direction::Next));
    }

    pub fn prev_media(&self, key: PreviewKey) {
        self.with_lifecycle(key, |lifecycle| lifecycle.cycle_media(Direction::Previous));
    }

    pub fn remove_media(&self, key: PreviewKey) {
        self.with_lifecycle(key, |lifecycle| lifecycle.remove_media());
    }

    /// Offer a dropped file as replacement media. Routed through the bus
    /// so an externally triggered swap behaves identically.
    pub fn swap(&self, key: PreviewKey, file: SwapFile) {
        self.bus.trigger(key, &EmbedEvent::Swap { file });
    }

    /// Route a drag phase over a preview's visual block. The trap only
    /// goes in over live embedded markup, and only once; drag-leave always
    /// clears a lingering trap.
    pub fn drag(&self, key: PreviewKey, phase: DragPhase) {
        if phase == DragPhase::Over {
            let wants = self
                .lifecycle_for(key)
                .map(|lifecycle| lifecycle.lock().unwrap().wants_drop_trap())
                .unwrap_or(false);
            if !wants {
                return;
            }
        }
        if let Some(op) = self.drag.lock().unwrap().transition(phase) {
            self.surface.apply(key, &op);
        }
    }

    /// Destroy a preview: terminal transition, subscription teardown and
    /// deregistration. The `removed` event publishes after the entry is
    /// gone, so late events for this key find no subscriber.
    pub fn destroy(&self, key: PreviewKey) {
        let Some((_, entry)) = self.registry.remove(&key) else {
            warn!(key = ?key, "destroy for an unregistered preview");
            return;
        };
        for token in entry.subscriptions {
            self.bus.unsubscribe(token);
        }
        let transition = entry.lifecycle.lock().unwrap().destroy();
        self.apply(key, transition);
    }

    /// Host hook: strip every preview in this editor down to its
    /// serializable form before the content is persisted.
    pub fn cleanup_editor(&self, editor: &dyn HostEditor) {
        for key in self.previews_for(editor.editor_index()) {
            let Some(lifecycle) = self.lifecycle_for(key) else {
                continue;
            };
            let transition = lifecycle.lock().unwrap().cleanup();
            if let Some(mut entry) = self.registry.get_mut(&key) {
                for token in entry.subscriptions.drain(..) {
                    self.bus.unsubscribe(token);
                }
            }
            self.apply(key, transition);
        }
    }

    /// Host hook: rediscover serialized preview blocks after persisted
    /// content was loaded, reviving registered previews in place and
    /// adopting unknown markers under fresh ids.
    pub fn revive_editor(&self, editor: &dyn HostEditor) {
        let editor_index = editor.editor_index();
        for block in editor.preview_blocks() {
            let Some(surviving) = markup::inspect_preview(&block) else {
                continue;
            };

            let registered = surviving
                .marker
                .map(|id| PreviewKey {
                    editor: editor_index,
                    id,
                })
                .filter(|key| self.registry.contains_key(key));

            let key = match registered {
                Some(key) => key,
                None => {
                    let key = PreviewKey {
                        editor: editor_index,
                        id: self.ids.next_id(),
                    };
                    let lifecycle = Arc::new(Mutex::new(PreviewLifecycle::new(
                        key,
                        Arc::clone(&self.config),
                    )));
                    self.registry.insert(
                        key,
                        PreviewEntry {
                            lifecycle,
                            subscriptions: Vec::new(),
                        },
                    );
                    key
                }
            };

            // Cleanup detached the bus subscriptions; revival re-binds.
            if let Some(mut entry) = self.registry.get_mut(&key) {
                if entry.subscriptions.is_empty() {
                    let lifecycle = Arc::clone(&entry.lifecycle);
                    entry.subscriptions = self.bind(key, &lifecycle);
                }
            }

            if let Some(lifecycle) = self.lifecycle_for(key) {
                let transition = lifecycle.lock().unwrap().revive(&surviving);
                self.apply(key, transition);
            }
        }
    }

    fn lifecycle_for(&self, key: PreviewKey) -> Option<Arc<Mutex<PreviewLifecycle>>> {
        self.registry
            .get(&key)
            .map(|entry| Arc::clone(&entry.lifecycle))
    }

    fn with_lifecycle<F>(&self, key: PreviewKey, f: F)
    where
        F: FnOnce(&mut PreviewLifecycle) -> Transition,
    {
        let Some(lifecycle) = self.lifecycle_for(key) else {
            debug!(key = ?key, "gesture for an unregistered preview");
            return;
        };
        let transition = f(&mut *lifecycle.lock().unwrap());
        self.apply(key, transition);
    }

    /// Apply a transition: ops to the surface first, then the emitted
    /// events, with no lifecycle lock held.
    fn apply(&self, key: PreviewKey, transition: Transition) {
        for op in &transition.ops {
            self.surface.apply(key, op);
        }
        for event in transition.emits {
            self.bus.trigger(key, &event);
        }
    }

    /// Subscribe a lifecycle to the events addressed to it. Handlers hold
    /// the lifecycle weakly; a destroyed preview whose events are still in
    /// flight simply stops reacting.
    fn bind(
        &self,
        key: PreviewKey,
        lifecycle: &Arc<Mutex<PreviewLifecycle>>,
    ) -> Vec<SubscriptionToken> {
        [
            EventKind::Progress,
            EventKind::Success,
            EventKind::Error,
            EventKind::Swap,
        ]
        .iter()
        .map(|kind| {
            let lifecycle = Arc::downgrade(lifecycle);
            let surface = Arc::clone(&self.surface);
            let bus = Arc::clone(&self.bus);
            self.bus.subscribe_preview(key, *kind, move |key, event| {
                let Some(lifecycle) = lifecycle.upgrade() else {
                    return;
                };
                let transition = lifecycle.lock().unwrap().handle_event(event);
                for op in &transition.ops {
                    surface.apply(key, op);
                }
                for emitted in transition.emits {
                    bus.trigger(key, &emitted);
                }
            })
        })
        .collect()
    }
}
