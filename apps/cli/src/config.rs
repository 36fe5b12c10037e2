//! Client configuration.
//!
//! Stored as TOML:
//! - Linux/macOS: `~/.config/drivecord/config.toml`
//! - Windows: `%APPDATA%/drivecord/config.toml`

use std::path::{Path, PathBuf};

use drivecord_engine::config::DEFAULT_DOWNLOAD_DIR;
use drivecord_engine::{EngineConfig, PoolConfig};
use drivecord_transfer::ChunkSize;
use drivecord_transport::Credential;
use serde::{Deserialize, Serialize};

const TREE_FILE: &str = "tree.json";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Discord server (guild) id.
    #[serde(default)]
    pub server_id: String,

    /// Channel chunks are posted to.
    #[serde(default)]
    pub channel_id: String,

    /// Bot tokens, used round-robin.
    #[serde(default)]
    pub bot_tokens: Vec<String>,

    /// Chunk size in MiB; out-of-range values load as the default.
    #[serde(default)]
    pub chunk_size_mb: ChunkSize,

    /// Where downloads are written.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Metadata tree file. Defaults to `tree.json` next to the config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_path: Option<PathBuf>,

    /// Upper bound on concurrent workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOWNLOAD_DIR)
}

fn default_max_workers() -> usize {
    PoolConfig::default().max_workers
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            channel_id: String::new(),
            bot_tokens: Vec::new(),
            chunk_size_mb: ChunkSize::default(),
            download_dir: default_download_dir(),
            tree_path: None,
            max_workers: default_max_workers(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or creates a default there if
    /// the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Tokens are secrets.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Parses `input` as the new chunk size. Unusable input stores the
    /// default.
    pub fn set_chunk_size(&mut self, input: &str) -> ChunkSize {
        self.chunk_size_mb = ChunkSize::parse(input);
        self.chunk_size_mb
    }

    /// Problems that make transfers fail but do not prevent startup.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (key, value) in [("server_id", &self.server_id), ("channel_id", &self.channel_id)] {
            if value.is_empty() {
                problems.push(format!("{key} is not set"));
            } else if !value.chars().all(|c| c.is_ascii_digit()) {
                problems.push(format!("{key} is not numeric"));
            }
        }
        if self.bot_tokens.is_empty() {
            problems.push("no bot tokens configured".into());
        }
        problems
    }

    pub fn warn_if_incomplete(&self) {
        for problem in self.problems() {
            tracing::warn!("{problem}");
        }
    }

    /// Tree file location for a config stored at `config_path`.
    pub fn tree_path(&self, config_path: &Path) -> PathBuf {
        match &self.tree_path {
            Some(path) => path.clone(),
            None => config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(TREE_FILE),
        }
    }

    pub fn credentials(&self) -> Vec<Credential> {
        self.bot_tokens.iter().map(Credential::new).collect()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chunk_size: self.chunk_size_mb,
            download_dir: self.download_dir.clone(),
            pool: PoolConfig {
                max_workers: self.max_workers,
                ..PoolConfig::default()
            },
            ..EngineConfig::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn default_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("drivecord").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("drivecord")
            .join("config.toml")
    }
}
