//! User-supplied reconcile hook.

use async_trait::async_trait;

use arbor_core::result::AppResult;
use arbor_entity::directory::DirectoryEvent;

/// Business logic invoked when a tracked directory diverges from the
/// mirror.
///
/// Must be idempotent: the same effective state may be handed over more
/// than once due to event/tick overlap. Errors are fatal to the
/// controller's run; the supervisor decides whether to restart.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// React to a directory create, update, or delete.
    async fn reconcile(&self, event: DirectoryEvent) -> AppResult<()>;
}
