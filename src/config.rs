//! CLI parsing and the optional TOML config file it can be layered on top
//! of (§10.4). Command-line flags always win over the file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "safekeeper", version, about = "Replicated durable WAL store")]
pub struct Cli {
    /// Path to a TOML config file; CLI flags override anything it sets.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub replica_id: Option<String>,

    /// Comma-separated peer base URLs, e.g. `http://host:port`.
    #[arg(long)]
    pub peers: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    /// Comma-separated bearer tokens accepted on `Required`/`Optional` routes.
    #[arg(long)]
    pub auth_tokens: Option<String>,

    #[arg(long)]
    pub compression: Option<bool>,

    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    #[arg(long)]
    pub quorum_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    replica_id: Option<String>,
    peers: Option<Vec<String>>,
    api_key: Option<String>,
    auth_tokens: Option<Vec<String>>,
    compression: Option<bool>,
    backup_dir: Option<PathBuf>,
    quorum_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub data_dir: PathBuf,
    pub replica_id: String,
    pub peers: Vec<String>,
    pub api_key: Option<String>,
    pub auth_tokens: HashSet<String>,
    pub compression: bool,
    pub backup_dir: Option<PathBuf>,
    pub quorum_timeout: Duration,
}

impl Cli {
    pub fn resolve(self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str::<FileConfig>(&text)?
            }
            None => FileConfig::default(),
        };

        let peers = self
            .peers
            .map(|s| split_csv(&s))
            .or(file.peers)
            .unwrap_or_default();
        let auth_tokens = self
            .auth_tokens
            .map(|s| split_csv(&s))
            .or(file.auth_tokens)
            .unwrap_or_default()
            .into_iter()
            .collect();

        Ok(Settings {
            port: self.port.or(file.port).unwrap_or(7676),
            data_dir: self.data_dir.or(file.data_dir).unwrap_or_else(|| PathBuf::from("./data")),
            replica_id: self.replica_id.or(file.replica_id).unwrap_or_else(|| "safekeeper-1".to_string()),
            peers,
            api_key: self.api_key.or(file.api_key),
            auth_tokens,
            compression: self.compression.or(file.compression).unwrap_or(false),
            backup_dir: self.backup_dir.or(file.backup_dir),
            quorum_timeout: Duration::from_millis(
                self.quorum_timeout_ms.or(file.quorum_timeout_ms).unwrap_or(2000),
            ),
        })
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
