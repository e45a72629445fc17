#![allow(dead_code)]

use mccmd_core::platform::{Job, PlatformBackend};
use mccmd_core::sender::{CommandSender, SenderHandle, SenderRef};
use mccmd_scheduler::{Scheduler, once};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

static NEXT_PLAYER: AtomicU64 = AtomicU64::new(1);

/// A sender that records every line sent to it.
pub struct RecordingSender {
    name: String,
    handle: SenderHandle,
    operator: Mutex<bool>,
    permissions: Mutex<HashMap<String, bool>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn with_handle(name: &str, handle: SenderHandle) -> Arc<RecordingSender> {
        Arc::new(RecordingSender {
            name: name.to_string(),
            handle,
            operator: Mutex::new(false),
            permissions: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn player(name: &str) -> Arc<RecordingSender> {
        let id = NEXT_PLAYER.fetch_add(1, Ordering::Relaxed) as u128;
        RecordingSender::with_handle(name, SenderHandle::Player(id))
    }

    pub fn console() -> Arc<RecordingSender> {
        let console = RecordingSender::with_handle("CONSOLE", SenderHandle::Console);
        console.set_operator(true);
        console
    }

    pub fn set_operator(&self, operator: bool) {
        *self.operator.lock().unwrap() = operator;
    }

    pub fn grant(&self, node: &str) {
        self.permissions.lock().unwrap().insert(node.to_string(), true);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn take_messages(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }

    /// Waits until at least `count` messages arrived and takes them.
    pub fn wait_for_messages(&self, count: usize) -> Vec<String> {
        assert!(
            wait_until(|| self.messages.lock().unwrap().len() >= count),
            "expected {} messages, got {:?}",
            count,
            self.messages()
        );
        self.take_messages()
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, lines: &[&str]) {
        let mut messages = self.messages.lock().unwrap();
        messages.extend(lines.iter().map(|line| line.to_string()));
    }

    fn has_permission(&self, node: &str) -> Option<bool> {
        self.permissions.lock().unwrap().get(node).copied()
    }

    fn is_player(&self) -> bool {
        matches!(self.handle, SenderHandle::Player(_))
    }

    fn is_operator(&self) -> bool {
        *self.operator.lock().unwrap()
    }

    fn handle(&self) -> SenderHandle {
        self.handle
    }
}

/// A platform whose main context is the polling thread of a real scheduler.
pub struct SchedulerBackend {
    pub scheduler: Arc<Scheduler>,
    console: Arc<RecordingSender>,
    players: Mutex<Vec<Arc<RecordingSender>>>,
}

impl SchedulerBackend {
    pub fn new() -> Arc<SchedulerBackend> {
        let scheduler = Scheduler::start(Duration::from_millis(5)).unwrap();
        Arc::new(SchedulerBackend {
            scheduler: Arc::new(scheduler),
            console: RecordingSender::console(),
            players: Mutex::new(Vec::new()),
        })
    }

    pub fn console_sender(&self) -> Arc<RecordingSender> {
        self.console.clone()
    }

    pub fn connect(&self, name: &str) -> Arc<RecordingSender> {
        let player = RecordingSender::player(name);
        self.players.lock().unwrap().push(player.clone());
        player
    }

    /// Blocks until every task submitted so far has run.
    pub fn settle(&self) {
        assert!(wait_until(|| self.scheduler.pending() == 0));
    }
}

impl PlatformBackend for SchedulerBackend {
    fn name(&self) -> &str {
        "test-scheduler"
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
        let mut senders: Vec<SenderRef> = vec![self.console.clone()];
        for player in self.players.lock().unwrap().iter() {
            senders.push(player.clone());
        }
        senders
    }

    fn resolve_sender(&self, name: &str) -> Option<SenderRef> {
        self.connected_senders()
            .into_iter()
            .find(|sender| sender.name().eq_ignore_ascii_case(name))
    }

    fn console(&self) -> SenderRef {
        self.console.clone()
    }

    fn check_permission(&self, _sender: &dyn CommandSender, _node: &str) -> Option<bool> {
        None
    }
}

pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// A shared counter for asserting how often a handler ran.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicU64>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
