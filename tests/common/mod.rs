#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use embed_preview::{
    EditorIndex, EmbedEvent, EventBus, EventKind, HostEditor, PreviewKey, RenderOp, RenderSurface,
};

/// Rendering adapter that records every op instead of touching a document.
#[derive(Default)]
pub struct RecordingSurface {
    ops: Mutex<Vec<(PreviewKey, RenderOp)>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<(PreviewKey, RenderOp)> {
        self.ops.lock().unwrap().clone()
    }

    pub fn ops_for(&self, key: PreviewKey) -> Vec<RenderOp> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, op)| op.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

impl RenderSurface for RecordingSurface {
    fn apply(&self, key: PreviewKey, op: &RenderOp) {
        self.ops.lock().unwrap().push((key, op.clone()));
    }
}

/// Record every event of every kind, in delivery order.
pub fn record_events(bus: &EventBus) -> Arc<Mutex<Vec<(PreviewKey, EmbedEvent)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::Progress,
        EventKind::Success,
        EventKind::Error,
        EventKind::MediaSelected,
        EventKind::NoMedia,
        EventKind::Removed,
        EventKind::Swap,
    ] {
        let log = Arc::clone(&log);
        bus.subscribe(kind, move |key, event| {
            log.lock().unwrap().push((key, event.clone()));
        });
    }
    log
}

/// Minimal host editor: fixed index, settable selection and serialized
/// blocks.
pub struct MockEditor {
    index: EditorIndex,
    https: bool,
    selection: Mutex<String>,
    blocks: Mutex<Vec<String>>,
}

impl MockEditor {
    pub fn new(index: EditorIndex) -> Self {
        Self {
            index,
            https: false,
            selection: Mutex::new(String::new()),
            blocks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_selection(self, selection: &str) -> Self {
        *self.selection.lock().unwrap() = selection.to_string();
        self
    }

    pub fn set_blocks(&self, blocks: Vec<String>) {
        *self.blocks.lock().unwrap() = blocks;
    }
}

impl HostEditor for MockEditor {
    fn editor_index(&self) -> EditorIndex {
        self.index
    }

    fn page_is_https(&self) -> bool {
        self.https
    }

    fn selection_text(&self) -> String {
        self.selection.lock().unwrap().clone()
    }

    fn save_selection(&self) {}

    fn restore_selection(&self) {}

    fn preview_blocks(&self) -> Vec<String> {
        self.blocks.lock().unwrap().clone()
    }
}
