use crate::render::RenderOp;
use crate::EditorIndex;

/// The slice of the host rich-text editor the embed core needs. The host
/// is an external collaborator: the core never subclasses or reaches into
/// it beyond this trait and the rendering surface.
pub trait HostEditor: Send + Sync {
    /// Stable index of this editor instance on the page.
    fn editor_index(&self) -> EditorIndex;

    /// Scheme of the hosting page; decides the service scheme when the
    /// `secure` option is unset.
    fn page_is_https(&self) -> bool;

    /// Text of the current selection, used to prefill the submission form.
    fn selection_text(&self) -> String;

    /// Persist the selection before the submission form takes focus.
    fn save_selection(&self);

    /// Restore the selection saved by [`HostEditor::save_selection`].
    fn restore_selection(&self);

    /// Serialized preview blocks currently present in this editor's
    /// content, in document order. Drives revival discovery.
    fn preview_blocks(&self) -> Vec<String>;
}

/// Phases of a drag interaction over a preview's visual block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Over,
    Leave,
}

/// Owner of the one transparent drop-trap element on the page. Embedded
/// iframes swallow drag events, so a trap is laid over them while a drag
/// is in flight; there is a single trap per page no matter how many
/// previews or editors exist, and both transitions guard against running
/// twice.
#[derive(Debug, Default)]
pub struct DragCoordinator {
    trap_active: bool,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trap_active(&self) -> bool {
        self.trap_active
    }

    /// Returns the op to apply, if the phase changes anything.
    pub fn transition(&mut self, phase: DragPhase) -> Option<RenderOp> {
        match phase {
            DragPhase::Over if !self.trap_active => {
                self.trap_active = true;
                Some(RenderOp::InsertDropTrap)
            }
            DragPhase::Leave if self.trap_active => {
                self.trap_active = false;
                Some(RenderOp::RemoveDropTrap)
            }
            _ => None,
        }
    }
}
