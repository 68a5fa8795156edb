//! Background task tracking over a bounded pool of worker threads.
//!
//! Units of work are blocking closures. Each is queued to the pool under a
//! caller-chosen id and its status can be polled until [`TaskRegistry::cleanup`]
//! removes it. Cancellation only succeeds while the unit is still queued.

use crate::panic_message;
use chrono::{DateTime, Utc};
use formdesk_core::error::Result;
use formdesk_core::task::{TaskInfo, TaskStatus};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 5;

const QUEUED: u8 = 0;
const STARTED: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;

type Work = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Completion slot shared between a registry entry and the worker running it.
struct TaskSlot {
    phase: AtomicU8,
    outcome: Mutex<Option<std::result::Result<(), String>>>,
}

impl TaskSlot {
    fn new() -> Self {
        Self {
            phase: AtomicU8::new(QUEUED),
            outcome: Mutex::new(None),
        }
    }

    fn claim(&self) -> bool {
        self.phase
            .compare_exchange(QUEUED, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn cancel(&self) -> bool {
        self.phase
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self, outcome: std::result::Result<(), String>) {
        *self.outcome.lock().unwrap_or_else(|e| e.into_inner()) = Some(outcome);
        self.phase.store(FINISHED, Ordering::Release);
    }

    fn outcome(&self) -> Option<std::result::Result<(), String>> {
        if self.phase.load(Ordering::Acquire) != FINISHED {
            return None;
        }
        self.outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

struct Job {
    id: String,
    slot: Arc<TaskSlot>,
    work: Work,
}

struct TaskEntry {
    status: TaskStatus,
    created_at: DateTime<Utc>,
    error: Option<String>,
    slot: Arc<TaskSlot>,
}

impl TaskEntry {
    /// Moves a running entry to its terminal status once the unit finished.
    fn reconcile(&mut self) {
        if self.status != TaskStatus::Running {
            return;
        }
        match self.slot.outcome() {
            Some(Ok(())) => self.status = TaskStatus::Completed,
            Some(Err(message)) => {
                self.status = TaskStatus::Failed;
                self.error = Some(message);
            }
            None => {}
        }
    }

    fn info(&self, id: &str) -> TaskInfo {
        TaskInfo {
            id: id.to_string(),
            status: self.status,
            created_at: self.created_at,
            error: self.error.clone(),
        }
    }
}

/// Registry of background tasks executed by a fixed worker pool.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    /// Spawns `worker_count` worker threads (at least one).
    pub fn new(worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..worker_count.max(1))
            .filter_map(|index| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("task-worker-{}", index))
                    .spawn(move || worker_loop(receiver))
                    .map_err(|e| tracing::error!("[TaskRegistry] Failed to spawn worker {}: {}", index, e))
                    .ok()
            })
            .collect();

        Self {
            tasks: Mutex::new(HashMap::new()),
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues `work` under `id`.
    ///
    /// Returns `false` without queuing anything when `id` is already tracked
    /// or the registry is shut down.
    pub fn add<F>(&self, id: impl Into<String>, work: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let id = id.into();
        let mut tasks = self.lock_tasks();
        if tasks.contains_key(&id) {
            tracing::warn!("[TaskRegistry] Task '{}' already exists; ignoring", id);
            return false;
        }

        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            tracing::warn!("[TaskRegistry] Shut down; ignoring task '{}'", id);
            return false;
        };

        let slot = Arc::new(TaskSlot::new());
        let job = Job {
            id: id.clone(),
            slot: Arc::clone(&slot),
            work: Box::new(work),
        };
        if sender.send(job).is_err() {
            tracing::error!("[TaskRegistry] Worker pool is gone; dropping task '{}'", id);
            return false;
        }

        tasks.insert(
            id.clone(),
            TaskEntry {
                status: TaskStatus::Running,
                created_at: Utc::now(),
                error: None,
                slot,
            },
        );
        tracing::debug!("[TaskRegistry] Queued task '{}'", id);
        true
    }

    /// Current status of `id`, or `None` if it is not tracked.
    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        let mut tasks = self.lock_tasks();
        let entry = tasks.get_mut(id)?;
        entry.reconcile();
        Some(entry.status)
    }

    /// Full snapshot of one task.
    pub fn info(&self, id: &str) -> Option<TaskInfo> {
        let mut tasks = self.lock_tasks();
        let entry = tasks.get_mut(id)?;
        entry.reconcile();
        Some(entry.info(id))
    }

    /// Cancels `id` if its unit has not started yet.
    pub fn cancel(&self, id: &str) -> bool {
        let mut tasks = self.lock_tasks();
        let Some(entry) = tasks.get_mut(id) else {
            return false;
        };
        if entry.status != TaskStatus::Running || !entry.slot.cancel() {
            return false;
        }
        entry.status = TaskStatus::Cancelled;
        tracing::info!("[TaskRegistry] Cancelled task '{}'", id);
        true
    }

    /// All tracked tasks, oldest first.
    pub fn list(&self) -> Vec<TaskInfo> {
        let mut tasks = self.lock_tasks();
        let mut infos: Vec<TaskInfo> = tasks
            .iter_mut()
            .map(|(id, entry)| {
                entry.reconcile();
                entry.info(id)
            })
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    /// Removes every task in a terminal state and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut tasks = self.lock_tasks();
        let before = tasks.len();
        tasks.retain(|_, entry| {
            entry.reconcile();
            !entry.status.is_terminal()
        });
        before - tasks.len()
    }

    /// Stops accepting work, lets queued and running units finish, and joins
    /// the workers. Safe to call more than once.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        let count = workers.len();
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("[TaskRegistry] Worker thread panicked");
            }
        }
        tracing::info!("[TaskRegistry] Shut down {} workers", count);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let next = {
            let receiver = receiver.lock().unwrap_or_else(|e| e.into_inner());
            receiver.recv()
        };
        let Ok(job) = next else {
            break;
        };

        if !job.slot.claim() {
            tracing::debug!("[TaskRegistry] Skipping cancelled task '{}'", job.id);
            continue;
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(job.work)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!("[TaskRegistry] Task '{}' failed: {}", job.id, e);
                Err(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload);
                tracing::error!("[TaskRegistry] Task '{}' panicked: {}", job.id, message);
                Err(format!("panicked: {}", message))
            }
        };
        job.slot.finish(outcome);
    }
}
