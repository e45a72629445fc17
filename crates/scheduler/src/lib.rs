//! A polling task scheduler for hosts that do not bring their own.
//!
//! One background thread polls the task list. It sleeps until the soonest task is
//! due, but never longer than the configured cap. Sync tasks run on that thread, which
//! is the "main" context; async tasks get a worker thread per run.

#![deny(rust_2018_idioms)]

mod task;

pub use task::{Task, TaskJob, TaskMode, once};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(50);

struct Shared {
    tasks: Mutex<Vec<Arc<Task>>>,
    wake: Condvar,
    running: AtomicBool,
    next_id: AtomicU64,
    max_interval: Duration,
}

impl Shared {
    fn notify(&self) {
        let _guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    /// Cancels every queued task, releasing the jobs they hold.
    fn drain(&self) {
        let drained = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        if !drained.is_empty() {
            debug!(dropped = drained.len(), "Dropping queued tasks");
        }
        for task in drained {
            task.cancel();
        }
    }
}

pub struct Scheduler {
    shared: Arc<Shared>,
    main_thread: ThreadId,
    poll_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawns the polling thread.
    pub fn start(max_interval: Duration) -> std::io::Result<Scheduler> {
        let shared = Arc::new(Shared {
            tasks: Mutex::new(Vec::new()),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            max_interval: max_interval.max(Duration::from_millis(1)),
        });

        let poll_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || Scheduler::poll(poll_shared))?;

        Ok(Scheduler {
            shared,
            main_thread: handle.thread().id(),
            poll_thread: Mutex::new(Some(handle)),
        })
    }

    /// Runs `job` as soon as possible. `None` runs it on the calling thread before
    /// returning, `Some(true)` on the polling thread and `Some(false)` on a worker.
    pub fn run(&self, job: TaskJob, sync: Option<bool>) -> Arc<Task> {
        self.submit(job, sync, Duration::ZERO, Duration::ZERO)
    }

    pub fn run_later(&self, job: TaskJob, sync: Option<bool>, delay: Duration) -> Arc<Task> {
        self.submit(job, sync, delay, Duration::ZERO)
    }

    /// The next run is scheduled `period` after the previous one finished.
    pub fn run_repeating(
        &self,
        job: TaskJob,
        sync: Option<bool>,
        delay: Duration,
        period: Duration,
    ) -> Arc<Task> {
        self.submit(job, sync, delay, period)
    }

    fn submit(
        &self,
        job: TaskJob,
        sync: Option<bool>,
        delay: Duration,
        period: Duration,
    ) -> Arc<Task> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let mode = TaskMode::from(sync);
        let task = Arc::new(Task::new(id, mode, job, delay, period));

        if mode == TaskMode::Inline {
            task.execute();
            return task;
        }

        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.shared.running.load(Ordering::SeqCst) {
            drop(tasks);
            warn!(task = id, "Scheduler is shut down, dropping task");
            task.cancel();
            return task;
        }

        debug!(task = id, ?mode, ?delay, ?period, "Scheduling task");
        tasks.push(task.clone());
        self.shared.wake.notify_all();
        task
    }

    /// True on the polling thread.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    /// Tasks that have neither completed nor been cancelled.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|task| !task.is_finished())
            .cloned()
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Stops polling and waits for the polling thread. Tasks that have not run are
    /// cancelled and their jobs dropped.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.notify();

        let handle = self
            .poll_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("Scheduler thread panicked");
            }
        }
        self.shared.drain();
    }

    fn poll(shared: Arc<Shared>) {
        let mut tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while shared.running.load(Ordering::SeqCst) {
            tasks.retain(|task| !task.is_finished());

            let now = Instant::now();
            let due: Vec<Arc<Task>> = tasks
                .iter()
                .filter(|task| task.is_due(now))
                .cloned()
                .collect();

            if !due.is_empty() {
                drop(tasks);
                for task in due {
                    if !shared.running.load(Ordering::SeqCst) {
                        break;
                    }
                    Scheduler::dispatch(&shared, task);
                }
                tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                continue;
            }

            let now = Instant::now();
            let wait = tasks
                .iter()
                .filter(|task| !task.is_finished() && !task.is_in_flight())
                .map(|task| task.next_execution().saturating_duration_since(now))
                .min()
                .map_or(shared.max_interval, |soonest| soonest.min(shared.max_interval));
            tasks = shared
                .wake
                .wait_timeout(tasks, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        drop(tasks);
        shared.drain();
        debug!("Scheduler stopped");
    }

    fn dispatch(shared: &Arc<Shared>, task: Arc<Task>) {
        if !task.claim() {
            return;
        }
        match task.mode() {
            TaskMode::Async => {
                let worker_shared = shared.clone();
                let worker_task = task.clone();
                let spawned = thread::Builder::new()
                    .name(format!("scheduler-worker-{}", task.id()))
                    .spawn(move || {
                        worker_task.execute();
                        worker_shared.notify();
                    });
                if let Err(err) = spawned {
                    warn!(task = task.id(), "Could not spawn worker thread: {}", err);
                    task.execute();
                }
            }
            TaskMode::Sync | TaskMode::Inline => task.execute(),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
