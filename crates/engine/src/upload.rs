//! Upload orchestration and the chunk upload task.

use std::path::Path;

use drivecord_transfer::{Chunk, ChunkReader, TaskId, TransferError, TransferKind};
use drivecord_transport::ChunkTag;
use drivecord_tree::{DirPath, FileRecord, generate_file_id};
use tracing::{debug, error, info, warn};

use crate::EngineError;
use crate::context::EngineContext;
use crate::queue::TaskQueue;
use crate::task::{ChunkUploadTask, Task, part_name};

pub(crate) const STATUS_UPLOADING: &str = "Uploading...";
pub(crate) const STATUS_UPLOADED: &str = "Upload complete";
pub(crate) const STATUS_PENDING: &str = "pending";

/// Registers `source` under `dir` and enqueues one task per chunk.
///
/// Returns the id of the whole-file aggregate entry.
pub(crate) fn queue_upload(
    ctx: &EngineContext,
    queue: &TaskQueue,
    source: &Path,
    dir: &DirPath,
) -> Result<TaskId, EngineError> {
    if !source.is_file() {
        return Err(EngineError::NotAFile(source.to_path_buf()));
    }
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| EngineError::NotAFile(source.to_path_buf()))?;

    let reader = ChunkReader::new(source, ctx.config.chunk_size.bytes())?;
    let total = reader.chunk_count();
    let file_id = generate_file_id();

    ctx.lock_tree().register_file(
        dir,
        FileRecord::in_process(file_id.clone(), file_name.clone(), total),
    )?;
    let aggregate = ctx.progress.insert(
        TransferKind::FileUpload,
        &file_id,
        &source.display().to_string(),
        total,
        STATUS_UPLOADING,
    );
    info!(file_id = %file_id, file = %file_name, chunks = total, "upload queued");

    // Exactly `total` chunks, even if the file grows while it is read.
    enqueue_chunks(
        ctx,
        queue,
        reader.take(total as usize),
        &file_id,
        &file_name,
        total,
        aggregate,
    )?;
    Ok(aggregate)
}

/// Queues one task per chunk. A read error, or fewer than `total` chunks
/// (the file shrank), abandons the whole upload.
pub(crate) fn enqueue_chunks(
    ctx: &EngineContext,
    queue: &TaskQueue,
    chunks: impl Iterator<Item = Result<Chunk, TransferError>>,
    file_id: &str,
    file_name: &str,
    total: u32,
    aggregate: TaskId,
) -> Result<(), EngineError> {
    let mut sent = 0;

    for chunk in chunks {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(abort_upload(ctx, file_id, aggregate, e)),
        };

        let id = ctx.progress.insert(
            TransferKind::ChunkUpload,
            file_id,
            file_name,
            1,
            STATUS_PENDING,
        );
        queue.push(
            id,
            Task::ChunkUpload(ChunkUploadTask {
                file_id: file_id.to_string(),
                index: chunk.index,
                part_name: part_name(file_name, chunk.index),
                data: chunk.data,
                aggregate,
                credential: ctx.credentials.next(),
            }),
        )?;
        sent += 1;
    }

    if sent < total {
        let short = TransferError::Incomplete {
            missing: (sent..total).collect(),
            total,
        };
        return Err(abort_upload(ctx, file_id, aggregate, short));
    }
    Ok(())
}

/// Closes the aggregate and drops the record of an upload that cannot be
/// read in full. Chunks already queued still run but can never complete it.
fn abort_upload(
    ctx: &EngineContext,
    file_id: &str,
    aggregate: TaskId,
    e: TransferError,
) -> EngineError {
    warn!(file_id, error = %e, "source read failed, upload abandoned");
    ctx.progress.update(&aggregate, |agg| {
        agg.status = format!("Read failed: {e}");
        agg.finished = true;
    });
    if let Err(tree_err) = ctx.lock_tree().remove_file(file_id) {
        error!(file_id, error = %tree_err, "failed to drop record");
    }
    e.into()
}

/// Posts one chunk and folds the outcome into its aggregate.
pub(crate) async fn run_chunk_upload(
    ctx: &EngineContext,
    id: TaskId,
    task: ChunkUploadTask,
) -> Result<(), EngineError> {
    let ChunkUploadTask {
        file_id,
        index,
        data,
        part_name,
        aggregate,
        credential,
    } = task;

    let posted = match credential {
        Some(credential) => {
            let tag = ChunkTag::new(&file_id, index);
            ctx.transport
                .post(&credential, &tag, data, &part_name)
                .await
                .map_err(|source| EngineError::ChunkFailed { index, source })
        }
        None => Err(EngineError::NoCredential),
    };

    if let Err(e) = posted {
        record_failure(ctx, &aggregate);
        return Err(e);
    }

    ctx.progress.update(&id, |e| {
        e.progress = 1;
        e.status = format!("Chunk {index} done");
    });
    debug!(file_id = %file_id, index, "chunk uploaded");

    // Increment, completion check and finalize form one critical section:
    // exactly one chunk observes the aggregate reaching its total.
    let completed = ctx
        .progress
        .update(&aggregate, |agg| {
            if agg.progress >= agg.total {
                return false;
            }
            agg.progress += 1;
            if agg.progress < agg.total {
                settle_if_resolved(agg);
                return false;
            }
            agg.status = STATUS_UPLOADED.to_string();
            agg.finished = true;
            if let Err(e) = ctx.lock_tree().finalize_upload(&file_id) {
                error!(file_id = %file_id, error = %e, "failed to finalize upload");
                agg.status = format!("Metadata error: {e}");
            }
            true
        })
        .unwrap_or(false);

    if completed {
        info!(file_id = %file_id, "upload complete");
    }
    Ok(())
}

pub(crate) fn record_failure(ctx: &EngineContext, aggregate: &TaskId) {
    ctx.progress.update(aggregate, |agg| {
        agg.failed += 1;
        settle_if_resolved(agg);
    });
}

/// Closes an aggregate once every chunk has either succeeded or failed
/// without it reaching its total.
fn settle_if_resolved(agg: &mut drivecord_transfer::ProgressEntry) {
    if agg.failed > 0 && agg.progress + agg.failed >= agg.total {
        agg.status = format!("Upload failed: {} of {} chunks", agg.failed, agg.total);
        agg.finished = true;
    }
}
