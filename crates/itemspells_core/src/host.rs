//! Host UI collaborators: confirmation prompts and render requests.

use crate::model::document::ContainerRef;
use async_trait::async_trait;

/// Title used for every confirmation prompt.
pub const PROMPT_TITLE: &str = "Items with Spells";
/// Asked before deleting a child spell that is being unlinked.
pub const DELETE_ORPHANED_SPELL_MESSAGE: &str =
    "Also delete the spell from the actor? Choosing no keeps it as an unlinked spell.";
/// Asked before cascading a parent deletion to its child spells.
pub const ALSO_DELETE_SPELLS_MESSAGE: &str =
    "This item granted spells to the actor. Delete those spells as well?";

/// Suspending yes/no prompt; waits indefinitely for the user.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Receives re-render requests for documents and containers.
pub trait RenderSink: Send + Sync {
    fn render_document(&self, uuid: &str);
    fn render_container(&self, container: &ContainerRef);
}

/// Prompt that always gives the same answer, for non-interactive callers.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl ConfirmPrompt for FixedAnswer {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        self.0
    }
}

/// Render sink for headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderSink;

impl RenderSink for NoopRenderSink {
    fn render_document(&self, _uuid: &str) {}

    fn render_container(&self, _container: &ContainerRef) {}
}
