use async_trait::async_trait;
use postwatch_core::{StateError, WatchState};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<WatchState, StateError>;

    async fn save(&self, state: &WatchState) -> Result<(), StateError>;
}

/// Keeps the watcher state in a small JSON file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, reason: impl ToString) -> StateError {
        StateError::Write {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<WatchState, StateError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No state file at {}, starting without a marker",
                    self.path.display()
                );
                return Ok(WatchState::default());
            }
            Err(e) => {
                return Err(StateError::Read {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let state: WatchState =
            serde_json::from_str(&contents).map_err(|e| StateError::Corrupt {
                path: self.path.display().to_string(),
                details: e.to_string(),
            })?;

        debug!("Loaded state from {}: {:?}", self.path.display(), state);
        Ok(state)
    }

    async fn save(&self, state: &WatchState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state).map_err(|e| self.write_error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        // Replace atomically: write a sibling temp file, then rename it over the target.
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// In-process store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<WatchState>,
}

impl MemoryStateStore {
    pub fn new(state: WatchState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn snapshot(&self) -> WatchState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<WatchState, StateError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, state: &WatchState) -> Result<(), StateError> {
        *self.state.lock().await = state.clone();
        Ok(())
    }
}
