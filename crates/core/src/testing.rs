//! In-memory senders and backend used by the unit tests.

use crate::platform::{Job, PlatformBackend};
use crate::sender::{CommandSender, SenderHandle, SenderRef};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_PLAYER: AtomicU64 = AtomicU64::new(1);

pub struct TestSender {
    name: String,
    handle: SenderHandle,
    operator: AtomicBool,
    permissions: Mutex<FxHashMap<String, bool>>,
    messages: Mutex<Vec<String>>,
}

impl TestSender {
    pub fn player(name: &str) -> Arc<TestSender> {
        let id = NEXT_PLAYER.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self::with_handle(name, SenderHandle::Player(id as u128)))
    }

    pub fn console() -> Arc<TestSender> {
        Arc::new(Self::with_handle("CONSOLE", SenderHandle::Console))
    }

    fn with_handle(name: &str, handle: SenderHandle) -> Self {
        Self {
            name: name.to_string(),
            handle,
            operator: AtomicBool::new(false),
            permissions: Mutex::new(FxHashMap::default()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn set_operator(&self, operator: bool) {
        self.operator.store(operator, Ordering::SeqCst);
    }

    pub fn grant(&self, node: &str) {
        self.permissions.lock().unwrap().insert(node.to_string(), true);
    }

    pub fn deny(&self, node: &str) {
        self.permissions.lock().unwrap().insert(node.to_string(), false);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn take_messages(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }
}

impl CommandSender for TestSender {
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
        self.operator.load(Ordering::SeqCst)
    }

    fn handle(&self) -> SenderHandle {
        self.handle
    }
}

/// Runs scheduled jobs inline unless `hold_jobs` is set.
pub struct TestBackend {
    console: Arc<TestSender>,
    senders: Mutex<Vec<Arc<TestSender>>>,
    sync_jobs: Mutex<VecDeque<Job>>,
    async_jobs: Mutex<VecDeque<Job>>,
    hold_jobs: AtomicBool,
    on_main: AtomicBool,
    permission_system: AtomicBool,
    pub sync_scheduled: AtomicUsize,
    pub async_scheduled: AtomicUsize,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            console: TestSender::console(),
            senders: Mutex::new(Vec::new()),
            sync_jobs: Mutex::new(VecDeque::new()),
            async_jobs: Mutex::new(VecDeque::new()),
            hold_jobs: AtomicBool::new(false),
            on_main: AtomicBool::new(true),
            permission_system: AtomicBool::new(false),
            sync_scheduled: AtomicUsize::new(0),
            async_scheduled: AtomicUsize::new(0),
        }
    }

    pub fn connect(&self, sender: Arc<TestSender>) {
        self.senders.lock().unwrap().push(sender);
    }

    pub fn console_sender(&self) -> Arc<TestSender> {
        self.console.clone()
    }

    pub fn set_on_main(&self, on_main: bool) {
        self.on_main.store(on_main, Ordering::SeqCst);
    }

    pub fn hold_jobs(&self, hold: bool) {
        self.hold_jobs.store(hold, Ordering::SeqCst);
    }

    /// Answers permission checks from the sender's own grants instead of
    /// reporting that no permission system is loaded.
    pub fn enable_permissions(&self) {
        self.permission_system.store(true, Ordering::SeqCst);
    }

    pub fn run_sync_jobs(&self) -> usize {
        Self::drain(&self.sync_jobs)
    }

    pub fn run_async_jobs(&self) -> usize {
        Self::drain(&self.async_jobs)
    }

    pub fn take_async_jobs(&self) -> Vec<Job> {
        self.async_jobs.lock().unwrap().drain(..).collect()
    }

    fn drain(queue: &Mutex<VecDeque<Job>>) -> usize {
        let mut ran = 0;
        loop {
            let job = queue.lock().unwrap().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    fn submit(&self, queue: &Mutex<VecDeque<Job>>, job: Job) {
        if self.hold_jobs.load(Ordering::SeqCst) {
            queue.lock().unwrap().push_back(job);
        } else {
            job();
        }
    }
}

impl PlatformBackend for TestBackend {
    fn name(&self) -> &str {
        "test"
    }

    fn schedule_sync(&self, job: Job) {
        self.sync_scheduled.fetch_add(1, Ordering::SeqCst);
        self.submit(&self.sync_jobs, job);
    }

    fn schedule_async(&self, job: Job) {
        self.async_scheduled.fetch_add(1, Ordering::SeqCst);
        self.submit(&self.async_jobs, job);
    }

    fn is_on_main_context(&self) -> bool {
        self.on_main.load(Ordering::SeqCst)
    }

    fn connected_senders(&self) -> Vec<SenderRef> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .map(|sender| sender.clone() as SenderRef)
            .collect()
    }

    fn resolve_sender(&self, name: &str) -> Option<SenderRef> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .find(|sender| sender.name().eq_ignore_ascii_case(name))
            .map(|sender| sender.clone() as SenderRef)
    }

    fn console(&self) -> SenderRef {
        self.console.clone()
    }

    fn check_permission(&self, sender: &dyn CommandSender, node: &str) -> Option<bool> {
        if self.permission_system.load(Ordering::SeqCst) {
            Some(sender.has_permission(node).unwrap_or(false))
        } else {
            None
        }
    }
}
