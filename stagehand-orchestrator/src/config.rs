//! Orchestrator configuration
//!
//! Defines where playbooks live, how the runner program is invoked, where
//! job records are stored and which address the API binds to.

use std::path::PathBuf;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection string (e.g., "sqlite://stagehand.db")
    pub database_url: String,

    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Directory scanned for playbooks (non-recursive)
    pub playbook_dir: PathBuf,

    /// File extensions accepted as playbooks, including the leading dot
    pub playbook_extensions: Vec<String>,

    /// Largest accepted request body in bytes
    pub max_request_bytes: usize,

    /// How the external automation process is launched
    pub runner: RunnerConfig,
}

/// Settings for the external automation process launched per job
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Executable launched for every job
    pub program: String,

    /// Extra arguments appended after `--limit <host>`
    pub extra_args: Vec<String>,

    /// Inventory file passed with `-i`, if any
    pub inventory_path: Option<PathBuf>,

    /// Exported to the child as `ANSIBLE_CONFIG`, if set
    pub ansible_config: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "ansible-playbook".to_string(),
            extra_args: vec!["-v".to_string()],
            inventory_path: None,
            ansible_config: None,
        }
    }
}

impl Config {
    /// Creates a configuration with defaults for the given playbook directory
    pub fn new(playbook_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: "sqlite://stagehand.db".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            playbook_dir: playbook_dir.into(),
            playbook_extensions: vec![".yml".to_string(), ".yaml".to_string()],
            max_request_bytes: 16 * 1024,
            runner: RunnerConfig::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - DATABASE_URL (default: sqlite://stagehand.db)
    /// - STAGEHAND_BIND_ADDR (default: 0.0.0.0:8080)
    /// - STAGEHAND_PLAYBOOK_DIR (default: ./playbooks)
    /// - STAGEHAND_PLAYBOOK_EXTENSIONS (comma separated, default: yml,yaml)
    /// - STAGEHAND_MAX_REQUEST_BYTES (default: 16384)
    /// - STAGEHAND_RUNNER_PROGRAM (default: ansible-playbook)
    /// - STAGEHAND_RUNNER_ARGS (whitespace separated, default: -v)
    /// - STAGEHAND_INVENTORY_PATH
    /// - STAGEHAND_ANSIBLE_CONFIG
    pub fn from_env() -> anyhow::Result<Self> {
        let playbook_dir = std::env::var("STAGEHAND_PLAYBOOK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./playbooks"));

        let mut config = Self::new(playbook_dir);

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(addr) = std::env::var("STAGEHAND_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(raw) = std::env::var("STAGEHAND_PLAYBOOK_EXTENSIONS") {
            config.playbook_extensions = parse_extensions(&raw);
        }

        if let Ok(raw) = std::env::var("STAGEHAND_MAX_REQUEST_BYTES") {
            config.max_request_bytes = raw.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("STAGEHAND_MAX_REQUEST_BYTES must be a number of bytes")
            })?;
        }

        if let Ok(program) = std::env::var("STAGEHAND_RUNNER_PROGRAM") {
            config.runner.program = program;
        }

        if let Ok(raw) = std::env::var("STAGEHAND_RUNNER_ARGS") {
            config.runner.extra_args = raw.split_whitespace().map(str::to_string).collect();
        }

        config.runner.inventory_path = std::env::var("STAGEHAND_INVENTORY_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        config.runner.ansible_config = std::env::var("STAGEHAND_ANSIBLE_CONFIG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("database_url cannot be empty");
        }

        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!("database_url must be a sqlite: URL");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.playbook_extensions.is_empty() {
            anyhow::bail!("at least one playbook extension is required");
        }

        if self.max_request_bytes == 0 {
            anyhow::bail!("max_request_bytes must be greater than 0");
        }

        if self.runner.program.trim().is_empty() {
            anyhow::bail!("runner program cannot be empty");
        }

        Ok(())
    }
}

/// Parses "yml, .yaml" into [".yml", ".yaml"]
fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('.') {
                s.to_string()
            } else {
                format!(".{}", s)
            }
        })
        .collect()
}
