use crate::sender::{CommandSender, SenderRef};

/// A unit of work handed to the platform scheduler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Everything the dispatcher needs from the host platform.
///
/// The dispatcher never spawns threads itself. It only decides whether work runs
/// inline, on the main context or on a worker, and hands it to the backend.
pub trait PlatformBackend: Send + Sync {
    /// Recorded on log events emitted on behalf of this backend.
    fn name(&self) -> &str;

    fn schedule_sync(&self, job: Job);

    fn schedule_async(&self, job: Job);

    fn is_on_main_context(&self) -> bool;

    fn connected_senders(&self) -> Vec<SenderRef>;

    fn resolve_sender(&self, name: &str) -> Option<SenderRef>;

    fn console(&self) -> SenderRef;

    /// `None` when the platform has no permission system loaded.
    fn check_permission(&self, sender: &dyn CommandSender, node: &str) -> Option<bool>;
}
