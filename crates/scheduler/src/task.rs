use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// The body of a task. Repeating tasks call it once per period.
pub type TaskJob = Box<dyn FnMut() -> anyhow::Result<()> + Send + 'static>;

/// Adapts a one-shot closure into a task body.
pub fn once<F>(f: F) -> TaskJob
where
    F: FnOnce() + Send + 'static,
{
    let mut f = Some(f);
    Box::new(move || -> anyhow::Result<()> {
        if let Some(f) = f.take() {
            f();
        }
        Ok(())
    })
}

/// Where a task body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// On the submitting thread, immediately.
    Inline,
    /// On the polling thread.
    Sync,
    /// On a worker thread spawned for the run.
    Async,
}

impl From<Option<bool>> for TaskMode {
    fn from(sync: Option<bool>) -> Self {
        match sync {
            None => TaskMode::Inline,
            Some(true) => TaskMode::Sync,
            Some(false) => TaskMode::Async,
        }
    }
}

pub struct Task {
    id: u64,
    mode: TaskMode,
    period: Duration,
    cancelled: AtomicBool,
    completed: AtomicBool,
    in_flight: AtomicBool,
    runs: AtomicU64,
    next_execution: Mutex<Instant>,
    /// Emptied once the task can never run again, releasing what the body holds.
    job: Mutex<Option<TaskJob>>,
}

impl Task {
    pub(crate) fn new(
        id: u64,
        mode: TaskMode,
        job: TaskJob,
        delay: Duration,
        period: Duration,
    ) -> Task {
        Task {
            id,
            mode,
            period,
            cancelled: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            next_execution: Mutex::new(Instant::now() + delay),
            job: Mutex::new(Some(job)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    /// Zero for one-shot tasks.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_repeating(&self) -> bool {
        !self.period.is_zero()
    }

    /// Stops every run that has not started yet. A run in progress finishes and
    /// then releases the body.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Ok(mut job) = self.job.try_lock() {
            job.take();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Cancelled or completed tasks are dropped on the next poll.
    pub fn is_finished(&self) -> bool {
        self.is_cancelled() || self.is_completed()
    }

    /// How many times the body has been entered.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn next_execution(&self) -> Instant {
        *self
            .next_execution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        !self.is_finished() && !self.is_in_flight() && self.next_execution() <= now
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Marks the task as handed to a worker. Returns false if it already was.
    pub(crate) fn claim(&self) -> bool {
        !self.in_flight.swap(true, Ordering::SeqCst)
    }

    /// Runs the body once and re-arms or completes the task.
    pub(crate) fn execute(&self) {
        let mut job = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            job.take();
        }
        let Some(body) = job.as_mut() else {
            self.in_flight.store(false, Ordering::SeqCst);
            return;
        };
        self.runs.fetch_add(1, Ordering::SeqCst);
        match panic::catch_unwind(AssertUnwindSafe(|| body())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(task = self.id, "Task failed: {:#}", err),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(task = self.id, "Task panicked: {}", message);
            }
        }

        if self.is_repeating() && self.mode != TaskMode::Inline {
            *self
                .next_execution
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Instant::now() + self.period;
        } else {
            self.completed.store(true, Ordering::SeqCst);
        }
        if self.is_finished() {
            job.take();
        }
        drop(job);
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("period", &self.period)
            .field("cancelled", &self.is_cancelled())
            .field("completed", &self.is_completed())
            .field("runs", &self.runs())
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            TaskMode::Inline => "inline",
            TaskMode::Sync => "sync",
            TaskMode::Async => "async",
        };
        write!(f, "#{} {}", self.id, mode)?;
        if self.is_repeating() {
            write!(f, " every {}ms", self.period.as_millis())?;
        }
        write!(f, " ({} runs)", self.runs())
    }
}
