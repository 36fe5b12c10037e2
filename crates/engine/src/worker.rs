//! Fixed-size worker pool.

use std::sync::Arc;
use std::time::Duration;

use drivecord_transfer::TaskId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::queue::QueueReceiver;
use crate::task::Task;
use crate::{download, upload};

/// Running workers plus the token that stops them.
pub(crate) struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` workers sharing `rx`.
    pub fn spawn(
        ctx: Arc<EngineContext>,
        rx: QueueReceiver,
        count: usize,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..count)
            .map(|worker| {
                let ctx = Arc::clone(&ctx);
                let rx = rx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { worker_loop(worker, ctx, rx, cancel).await })
            })
            .collect();

        debug!(workers = count, "worker pool started");
        Self { cancel, handles }
    }

    /// Signals every worker and waits up to `grace` for each to exit.
    ///
    /// A worker busy with a task finishes that task first; one that
    /// overruns the grace period is left to finish in the background.
    pub async fn stop(self, grace: Duration) {
        self.cancel.cancel();
        for (worker, handle) in self.handles.into_iter().enumerate() {
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!(worker, "worker still busy after shutdown grace period");
            }
        }
    }
}

async fn worker_loop(
    worker: usize,
    ctx: Arc<EngineContext>,
    rx: QueueReceiver,
    cancel: CancellationToken,
) {
    let poll = ctx.config.pool.poll_timeout;
    while !cancel.is_cancelled() {
        let Some((id, task)) = rx.pop(poll).await else {
            continue;
        };
        debug!(worker, task = %id, "task started");
        run(&ctx, id, task).await;
    }
    debug!(worker, "worker stopped");
}

/// Executes one task. Never fails: every error becomes a status line and
/// the entry is always marked finished.
async fn run(ctx: &Arc<EngineContext>, id: TaskId, task: Task) {
    let aggregate = match &task {
        Task::ChunkUpload(t) => Some(t.aggregate),
        Task::Download(_) => None,
    };
    let task_ctx = Arc::clone(ctx);
    // A panic inside the task surfaces as a join error instead of killing
    // the worker.
    let outcome = tokio::spawn(async move {
        match task {
            Task::ChunkUpload(t) => upload::run_chunk_upload(&task_ctx, id, t).await,
            Task::Download(t) => download::run_download(&task_ctx, id, t).await,
        }
    })
    .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(task = %id, error = %e, "task failed");
            ctx.progress.set_status(&id, e.status());
        }
        Err(e) => {
            warn!(task = %id, error = %e, "task aborted");
            ctx.progress.set_status(&id, format!("Task aborted: {e}"));
            // An aborted chunk counts as failed or its upload never settles.
            if let Some(aggregate) = aggregate {
                upload::record_failure(ctx, &aggregate);
            }
        }
    }
    ctx.progress.mark_finished(&id);
}
