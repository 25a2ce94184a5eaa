//! Playbook Catalog
//!
//! Read-only view of the playbook directory. Nothing is cached: every call
//! re-reads the directory so the listing always reflects the filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use stagehand_core::domain::playbook::Playbook;

/// Catalog error type
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("playbook directory {} is unavailable: {source}", dir.display())]
    Unavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Enumerates playbook files in a single directory (non-recursive)
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List all playbooks, sorted by name
    pub async fn list(&self) -> Result<Vec<Playbook>, CatalogError> {
        let unavailable = |source| CatalogError::Unavailable {
            dir: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let root = tokio::fs::canonicalize(&self.dir)
            .await
            .map_err(unavailable)?;
        let mut playbooks = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if !self.has_playbook_extension(&name) {
                continue;
            }

            // Symlinks count only if they resolve inside the playbook directory
            match tokio::fs::canonicalize(entry.path()).await {
                Ok(resolved) if resolved.starts_with(&root) => {}
                Ok(resolved) => {
                    tracing::warn!(
                        "Skipping {}: resolves outside the playbook directory ({})",
                        name,
                        resolved.display()
                    );
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", name, e);
                    continue;
                }
            }

            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", name, e);
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            playbooks.push(Playbook {
                name,
                size: metadata.len(),
                modified,
            });
        }

        playbooks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(playbooks)
    }

    /// Find a playbook by exact name
    ///
    /// Names are matched against directory entries, so a name containing a
    /// path separator or `..` never resolves.
    pub async fn find(&self, name: &str) -> Result<Option<Playbook>, CatalogError> {
        let playbooks = self.list().await?;
        Ok(playbooks.into_iter().find(|p| p.name == name))
    }

    /// Filesystem path of a catalog entry
    pub fn path_of(&self, playbook: &Playbook) -> PathBuf {
        self.dir.join(&playbook.name)
    }

    fn has_playbook_extension(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }
}
