use crate::config::PermissionsConfig;
use mccmd_core::platform::{Job, PlatformBackend};
use mccmd_core::sender::{CommandSender, SenderHandle, SenderRef};
use mccmd_scheduler::{Scheduler, once};
use std::sync::Arc;

type Output = Box<dyn Fn(&str) + Send + Sync>;

/// The operator at the terminal.
pub struct ConsoleSender {
    output: Output,
}

impl ConsoleSender {
    pub fn new(output: impl Fn(&str) + Send + Sync + 'static) -> ConsoleSender {
        ConsoleSender {
            output: Box::new(output),
        }
    }

    pub fn stdout() -> ConsoleSender {
        ConsoleSender::new(|line| println!("{}", line))
    }
}

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "CONSOLE"
    }

    fn send_message(&self, lines: &[&str]) {
        for line in lines {
            (self.output)(line);
        }
    }

    fn has_permission(&self, _node: &str) -> Option<bool> {
        None
    }

    fn is_player(&self) -> bool {
        false
    }

    fn is_operator(&self) -> bool {
        true
    }

    fn handle(&self) -> SenderHandle {
        SenderHandle::Console
    }
}

/// A platform backed by the polling scheduler. The scheduler thread is the main
/// context.
pub struct ConsoleBackend {
    scheduler: Arc<Scheduler>,
    console: Arc<ConsoleSender>,
    permissions: PermissionsConfig,
}

impl ConsoleBackend {
    pub fn new(
        scheduler: Arc<Scheduler>,
        console: ConsoleSender,
        permissions: Option<PermissionsConfig>,
    ) -> ConsoleBackend {
        ConsoleBackend {
            scheduler,
            console: Arc::new(console),
            permissions: permissions.unwrap_or_default(),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}

impl PlatformBackend for ConsoleBackend {
    fn name(&self) -> &str {
        "console"
    }

    fn schedule_sync(&self, job: Job) {
        self.scheduler.run(once(job), Some(true));
    }

    fn schedule_async(&self, job: Job) {
        self.scheduler.run(once(job), Some(false));
    }

    fn is_on_main_context(&self) -> bool {
        self.scheduler.is_main_thread()
    }

    fn connected_senders(&self) -> Vec<SenderRef> {
        vec![self.console()]
    }

    fn resolve_sender(&self, name: &str) -> Option<SenderRef> {
        name.eq_ignore_ascii_case(self.console.name())
            .then(|| self.console())
    }

    fn console(&self) -> SenderRef {
        self.console.clone()
    }

    fn check_permission(&self, _sender: &dyn CommandSender, node: &str) -> Option<bool> {
        self.permissions.check(node)
    }
}
