use std::collections::HashSet;
use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::ProbeError;

struct ProgressState {
    completed: HashSet<String>,
    file: tokio::fs::File,
}

/// Durable set of already-attempted payloads, one per line.
///
/// Loaded once on open; every later [`record`](Self::record) appends and
/// flushes before returning, so progress survives a crash mid-scan.
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
}

impl ProgressTracker {
    pub async fn open(path: &Path) -> Result<Self, ProbeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let completed: HashSet<String> = content.lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        // A crash can leave a half-written last line; start fresh after it.
        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        debug!(path = %path.display(), completed = completed.len(), "Resume record loaded");

        Ok(Self {
            state: Mutex::new(ProgressState { completed, file }),
        })
    }

    /// Snapshot of attempted payloads.
    pub async fn completed(&self) -> HashSet<String> {
        self.state.lock().await.completed.clone()
    }

    /// Mark a payload attempted. Returns `false` if it was already recorded,
    /// in which case nothing is written.
    pub async fn record(&self, payload: &str) -> Result<bool, ProbeError> {
        let mut state = self.state.lock().await;
        if state.completed.contains(payload) {
            return Ok(false);
        }

        let mut line = payload.to_string();
        line.push('\n');
        state.file.write_all(line.as_bytes()).await?;
        state.file.flush().await?;
        state.completed.insert(payload.to_string());
        Ok(true)
    }
}
