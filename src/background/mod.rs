//! Background tasks — long-running jobs tied to the application lifetime.
//!
//! Tasks are registered before the application starts, spawned on the Tokio
//! runtime by [`TaskSet::start`], and stopped together through a shared
//! [`CancellationToken`] by [`TaskSet::shutdown`].

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod sweeper;

pub use sweeper::Sweeper;

/// A job that runs until its shutdown token is cancelled.
pub trait BackgroundTask: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the task. Implementations must return promptly once `shutdown`
    /// is cancelled.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Registered background tasks and the token that stops them.
#[derive(Default)]
pub struct TaskSet {
    pending: Mutex<Vec<Box<dyn BackgroundTask>>>,
    running: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    shutdown: CancellationToken,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task to be spawned by the next [`start`](Self::start).
    pub fn register(&self, task: impl BackgroundTask) {
        self.pending.lock().push(Box::new(task));
    }

    /// Spawns every registered task that is not running yet.
    ///
    /// Must be called from within a Tokio runtime. Calling it again only
    /// spawns tasks registered since the previous call.
    pub fn start(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        let mut running = self.running.lock();
        for task in pending {
            let name = task.name();
            debug!(task = name, "starting background task");
            let handle = tokio::spawn(task.run(self.shutdown.child_token()));
            running.push((name, handle));
        }
    }

    pub fn running(&self) -> usize {
        self.running.lock().len()
    }

    /// Cancels every task and waits for them to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let running = std::mem::take(&mut *self.running.lock());
        for (name, handle) in running {
            match handle.await {
                Ok(()) => debug!(task = name, "background task stopped"),
                Err(err) => warn!(task = name, error = %err, "background task ended abnormally"),
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
