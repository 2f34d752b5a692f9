//! Build staging workspaces
//!
//! arduino-cli only accepts a sketch folder whose name equals the main
//! `.ino` file's base name, so each build gets a fresh directory under the
//! uploads root and the sketch is written into it renamed after that
//! directory.
//!
//! Workspaces outlive the request that created them (upload reuses the
//! compile output in place). They are removed by [`StagingManager::sweep_expired`],
//! which the server runs periodically.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::errors::BuildError;
use crate::models::SKETCH_EXTENSION;

/// Prefix of every workspace directory name
pub const WORKSPACE_PREFIX: &str = "compile_";

// arduino-cli limits sketch names to 63 characters
const MAX_STEM_LEN: usize = 24;
const MAX_CREATE_ATTEMPTS: usize = 16;

/// One isolated build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingWorkspace {
    pub dir: PathBuf,
    /// `<dir>/<dir name>.ino`
    pub main_file: PathBuf,
}

impl StagingWorkspace {
    pub fn name(&self) -> &str {
        self.dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Creates and sweeps staging workspaces under one root directory
#[derive(Debug)]
pub struct StagingManager {
    root: PathBuf,
    sequence: AtomicU64,
}

impl StagingManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace and write `content` into it as its main sketch.
    ///
    /// `base_name` is the sketch identity the workspace is named after; it is
    /// reduced to characters arduino-cli accepts in a sketch name.
    pub async fn stage(
        &self,
        content: &str,
        base_name: &str,
    ) -> Result<StagingWorkspace, BuildError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| BuildError::Staging {
                path: self.root.clone(),
                source,
            })?;

        let stem = sanitize_stem(base_name);
        let mut attempt = 0;
        let dir = loop {
            let candidate = self.root.join(self.next_dir_name(&stem));
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => break candidate,
                Err(e)
                    if e.kind() == std::io::ErrorKind::AlreadyExists
                        && attempt < MAX_CREATE_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(source) => {
                    return Err(BuildError::Staging {
                        path: candidate,
                        source,
                    });
                }
            }
        };

        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let main_file = dir.join(format!("{}.{}", dir_name, SKETCH_EXTENSION));

        tokio::fs::write(&main_file, content)
            .await
            .map_err(|source| BuildError::Staging {
                path: main_file.clone(),
                source,
            })?;

        log::debug!("Staged {} into {}", base_name, dir.display());
        Ok(StagingWorkspace { dir, main_file })
    }

    /// Delete workspaces last modified more than `max_age` ago. Returns how many were removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> std::io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let is_workspace = entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with(WORKSPACE_PREFIX))
                .unwrap_or(false);
            if !is_workspace {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_dir() => metadata,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age >= max_age {
                match tokio::fs::remove_dir_all(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!(
                        "Failed to remove staging workspace {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }

        Ok(removed)
    }

    fn next_dir_name(&self, stem: &str) -> String {
        let micros = chrono::Local::now().timestamp_micros();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}{}_{}_{}", WORKSPACE_PREFIX, stem, micros, seq)
    }
}

/// Strip the extension and keep `[A-Za-z0-9_-]`, bounded in length
fn sanitize_stem(base_name: &str) -> String {
    let stem = Path::new(base_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base_name);

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    if cleaned.is_empty() {
        "sketch".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_main_file_matches_workspace_name() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StagingManager::new(temp_dir.path().join("uploads"));

        for name in ["blink.ino", "my sketch.ino", "ünïcode.ino", ".ino", "a.b.c.ino"] {
            let workspace = manager.stage("void setup() {}\n", name).await.unwrap();

            let dir_name = workspace.dir.file_name().unwrap().to_str().unwrap();
            let stem = workspace.main_file.file_stem().unwrap().to_str().unwrap();
            assert_eq!(stem, dir_name, "naming invariant broken for {}", name);
            assert_eq!(workspace.main_file.parent().unwrap(), workspace.dir);
            assert_eq!(workspace.name(), dir_name);
            assert!(dir_name.len() <= 63);
            assert!(dir_name.starts_with(WORKSPACE_PREFIX));
        }
    }

    #[tokio::test]
    async fn test_workspace_holds_exactly_the_sketch() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StagingManager::new(temp_dir.path());
        let content = "void setup() {}\nvoid loop() {}\n";

        let workspace = manager.stage(content, "blink.ino").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&workspace.dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read_to_string(&workspace.main_file).unwrap(), content);
    }

    #[tokio::test]
    async fn test_concurrent_stages_never_collide() {
        let temp_dir = TempDir::new().unwrap();
        let manager = std::sync::Arc::new(StagingManager::new(temp_dir.path()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.stage("x", "blink.ino").await.unwrap().dir
            }));
        }

        let mut dirs = std::collections::HashSet::new();
        for handle in handles {
            assert!(dirs.insert(handle.await.unwrap()));
        }
        assert_eq!(dirs.len(), 16);
    }

    #[tokio::test]
    async fn test_stage_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("uploads");
        std::fs::write(&blocker, "not a directory").unwrap();

        let manager = StagingManager::new(&blocker);
        let err = manager.stage("x", "blink.ino").await.unwrap_err();
        assert!(matches!(err, BuildError::Staging { .. }));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_workspaces() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StagingManager::new(temp_dir.path());
        manager.stage("x", "blink.ino").await.unwrap();
        std::fs::create_dir(temp_dir.path().join("keep_me")).unwrap();

        assert_eq!(manager.sweep_expired(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(manager.sweep_expired(Duration::ZERO).await.unwrap(), 1);
        assert!(temp_dir.path().join("keep_me").exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_root_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StagingManager::new(temp_dir.path().join("never-created"));
        assert_eq!(manager.sweep_expired(Duration::ZERO).await.unwrap(), 0);
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("blink.ino"), "blink");
        assert_eq!(sanitize_stem("my sketch.ino"), "my_sketch");
        assert_eq!(sanitize_stem(""), "sketch");
    }
}
