//! Shared FIFO task queue.

use std::sync::Arc;
use std::time::Duration;

use drivecord_transfer::TaskId;
use tokio::sync::{Mutex, mpsc};

use crate::EngineError;
use crate::task::Task;

type Item = (TaskId, Task);

/// Sending half, held by the engine.
pub(crate) struct TaskQueue {
    tx: mpsc::UnboundedSender<Item>,
    rx: QueueReceiver,
}

/// Receiving half, cloned into every worker.
#[derive(Clone)]
pub(crate) struct QueueReceiver(Arc<Mutex<mpsc::UnboundedReceiver<Item>>>);

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: QueueReceiver(Arc::new(Mutex::new(rx))),
        }
    }

    pub fn push(&self, id: TaskId, task: Task) -> Result<(), EngineError> {
        self.tx.send((id, task)).map_err(|_| EngineError::ShuttingDown)
    }

    pub fn receiver(&self) -> QueueReceiver {
        self.rx.clone()
    }
}

impl QueueReceiver {
    /// Takes the oldest task, waiting at most `timeout`.
    ///
    /// The wait covers both contention with other workers and an empty
    /// queue, so a caller always regains control within `timeout`.
    pub async fn pop(&self, timeout: Duration) -> Option<Item> {
        tokio::time::timeout(timeout, async { self.0.lock().await.recv().await })
            .await
            .ok()
            .flatten()
    }
}
