//! Command dispatch: wires config, tree, transport and engine together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use drivecord_engine::{Engine, EngineError, ProgressEntry, TaskId, TransferKind};
use drivecord_transport::DiscordTransport;
use drivecord_tree::{DirPath, JsonFileStore, MetadataTree, ROOT_NAME};

use crate::cli::{Commands, ConfigCommand};
use crate::config::Config;

/// Runs one command to completion.
pub async fn run(command: Commands, mut config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    let tree_path = config.tree_path(&config_path);

    match command {
        Commands::Upload { file, dir } => {
            let engine = build_engine(&config, &tree_path)?;
            let queued = engine.queue_upload(&file, &DirPath::parse(&dir));
            let id = stop_on_error(&engine, queued)
                .await
                .with_context(|| format!("cannot upload {}", file.display()))?;
            let entry = run_until_done(&engine, id).await?;
            if !entry.is_complete() {
                bail!("upload failed: {}", entry.status);
            }
            println!("{} [ID={}]", file.display(), entry.file_id);
        }

        Commands::Download { file_id } => {
            let engine = build_engine(&config, &tree_path)?;
            let queued = engine.queue_download(&file_id);
            let id = stop_on_error(&engine, queued).await?;
            let entry = run_until_done(&engine, id).await?;
            if !entry.status.starts_with("Download complete") {
                bail!("download failed: {}", entry.status);
            }
        }

        Commands::Ls { all } => {
            let tree = open_tree(&tree_path)?;
            for line in tree.root().render_lines(all) {
                println!("{line}");
            }
        }

        Commands::Mv { file_id, dir } => {
            let mut tree = open_tree(&tree_path)?;
            if !tree.move_file(&file_id, &DirPath::parse(&dir))? {
                bail!("no file with id {file_id}");
            }
        }

        Commands::Rm { file_id } => {
            let mut tree = open_tree(&tree_path)?;
            if !tree.remove_file(&file_id)? {
                bail!("no file with id {file_id}");
            }
        }

        Commands::Rmdir { name } => {
            if name.eq_ignore_ascii_case(ROOT_NAME) {
                bail!("the root directory cannot be deleted");
            }
            let mut tree = open_tree(&tree_path)?;
            if !tree.delete_dir(&name)? {
                bail!("no directory named {name}");
            }
        }

        Commands::Config { command } => configure(command, &mut config, &config_path)?,
    }

    Ok(())
}

fn open_tree(path: &Path) -> anyhow::Result<MetadataTree> {
    MetadataTree::load(JsonFileStore::new(path))
        .with_context(|| format!("cannot open tree at {}", path.display()))
}

fn build_engine(config: &Config, tree_path: &Path) -> anyhow::Result<Engine> {
    let transport = DiscordTransport::new(&config.channel_id)?;
    let engine = Engine::new(
        open_tree(tree_path)?,
        Arc::new(transport),
        config.credentials(),
        config.engine_config(),
    );
    engine.start()?;
    Ok(engine)
}

async fn stop_on_error(
    engine: &Engine,
    queued: Result<TaskId, EngineError>,
) -> Result<TaskId, EngineError> {
    if queued.is_err() {
        engine.shutdown().await;
    }
    queued
}

/// Prints progress until `id` finishes or Ctrl-C is pressed, then shuts
/// the engine down.
async fn run_until_done(engine: &Engine, id: TaskId) -> anyhow::Result<ProgressEntry> {
    engine.progress().on_change(Box::new(print_progress));

    let outcome = tokio::select! {
        entry = engine.wait_for(&id) => entry,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            None
        }
    };

    let purged = engine.shutdown().await;
    if purged > 0 {
        tracing::info!(purged, "dropped unfinished uploads");
    }
    outcome.context("transfer interrupted")
}

fn print_progress(id: &TaskId, entry: &ProgressEntry) {
    let line = format!("{id:<12} {:>3}% {}", entry.percent(), entry.status);
    match id.kind {
        TransferKind::FileUpload | TransferKind::Download => println!("{line}"),
        TransferKind::ChunkUpload if entry.status.ends_with("fail") => eprintln!("{line}"),
        TransferKind::ChunkUpload => tracing::debug!(task = %id, status = %entry.status),
    }
}

fn configure(command: ConfigCommand, config: &mut Config, path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("config:        {}", path.display());
            println!("server_id:     {}", config.server_id);
            println!("channel_id:    {}", config.channel_id);
            println!("chunk_size_mb: {}", config.chunk_size_mb.mib());
            println!("download_dir:  {}", config.download_dir.display());
            println!("tree_path:     {}", config.tree_path(path).display());
            println!("max_workers:   {}", config.max_workers);
            println!("bot_tokens:");
            for (i, credential) in config.credentials().iter().enumerate() {
                println!("  {i}: ...{}", credential.hint());
            }
            for problem in config.problems() {
                println!("warning: {problem}");
            }
            return Ok(());
        }
        ConfigCommand::ChunkSize { mib } => {
            let size = config.set_chunk_size(&mib);
            println!("chunk size set to {} MiB", size.mib());
        }
        ConfigCommand::AddToken { token } => {
            let token = token.trim().to_string();
            if token.is_empty() {
                bail!("token is empty");
            }
            config.bot_tokens.push(token);
        }
        ConfigCommand::RemoveToken { index } => {
            if index >= config.bot_tokens.len() {
                bail!("no token at index {index}");
            }
            config.bot_tokens.remove(index);
        }
        ConfigCommand::Channel { id } => config.channel_id = id.trim().to_string(),
        ConfigCommand::Server { id } => config.server_id = id.trim().to_string(),
    }

    config.save(path)?;
    config.warn_if_incomplete();
    Ok(())
}
