//! Download task: rebuild a file from recent channel history.

use std::collections::HashMap;

use drivecord_transfer::{EtaEstimator, TaskId, validate_file_name, write_joined};
use drivecord_transport::ChunkTag;
use tracing::{debug, info, warn};

use crate::EngineError;
use crate::context::EngineContext;
use crate::task::DownloadTask;

pub(crate) const STATUS_DOWNLOADING: &str = "Downloading...";

/// Scans history for the file's chunks, then writes the joined file.
///
/// Chunks older than the page window are never seen; the task gives up
/// after the policy's attempt budget.
pub(crate) async fn run_download(
    ctx: &EngineContext,
    id: TaskId,
    task: DownloadTask,
) -> Result<(), EngineError> {
    let file_id = task.file_id;
    let (file_name, total) = {
        let tree = ctx.lock_tree();
        let (_, record) = tree
            .find_file(&file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.clone()))?;
        (record.file_name.clone(), record.chunk_count)
    };
    validate_file_name(&file_name)?;
    ctx.progress.update(&id, |e| e.total = total);

    if ctx.credentials.is_empty() {
        return Err(EngineError::NoCredential);
    }

    let policy = &ctx.config.retrieval;
    let eta = EtaEstimator::start();
    let mut chunks: HashMap<u32, Vec<u8>> = HashMap::new();

    for attempt in 1..=policy.max_attempts {
        let Some(credential) = ctx.credentials.next() else {
            break;
        };

        match ctx.transport.list_recent(&credential, policy.page_size).await {
            Ok(messages) => {
                for message in messages {
                    let Some(tag) = ChunkTag::parse(&message.content) else {
                        continue;
                    };
                    if tag.file_id != file_id
                        || tag.index >= total
                        || chunks.contains_key(&tag.index)
                    {
                        continue;
                    }
                    let Some(url) = message.single_attachment() else {
                        continue;
                    };

                    match ctx.transport.fetch(&credential, url).await {
                        Ok(data) => {
                            chunks.insert(tag.index, data);
                            let done = chunks.len() as u32;
                            let status = match eta.eta(done, total) {
                                Some(left) => format!("{STATUS_DOWNLOADING} ETA: {}s", left.as_secs()),
                                None => STATUS_DOWNLOADING.to_string(),
                            };
                            ctx.progress.update(&id, |e| {
                                e.progress = done;
                                e.status = status;
                            });
                            debug!(file_id = %file_id, index = tag.index, done, total, "chunk fetched");
                        }
                        Err(e) => {
                            warn!(file_id = %file_id, index = tag.index, error = %e, "chunk fetch failed");
                        }
                    }
                }
            }
            Err(e) => warn!(file_id = %file_id, attempt, error = %e, "history listing failed"),
        }

        if chunks.len() as u32 >= total {
            break;
        }
        tokio::time::sleep(policy.poll_delay).await;
    }

    let collected = chunks.len() as u32;
    if collected < total {
        return Err(EngineError::Incomplete {
            file_id,
            collected,
            total,
        });
    }

    let target = ctx.config.download_dir.join(&file_name);
    let written = write_joined(&target, &chunks, total)?;
    ctx.progress.set_status(
        &id,
        format!("Download complete, file saved to: {}", written.display()),
    );
    info!(file_id = %file_id, path = %written.display(), "download complete");
    Ok(())
}
