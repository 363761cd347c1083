use crate::common::{EventEnvelope, EventPublisher};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Appends envelopes to a single JSON Lines file.
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> Result<(), String> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create event directory: {}", e)),
            _ => Ok(()),
        }
    }

    /// Reads back everything written so far.
    pub async fn read_all(&self) -> Result<Vec<EventEnvelope>, String> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)
            .await
            .map_err(|e| format!("Failed to open event file {}: {}", self.path.display(), e))?;

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        let mut line_number = 0usize;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("Failed to read line: {}", e))?
        {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let event: EventEnvelope = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to deserialize event at line {}: {}", line_number, e))?;
            events.push(event);
        }
        Ok(events)
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), String> {
        self.ensure_parent_dir().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| format!("Failed to open event file {}: {}", self.path.display(), e))?;

        let mut line = serde_json::to_string(&envelope).map_err(|e| format!("Failed to serialize event: {}", e))?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| format!("Failed to write event: {}", e))?;
        file.flush()
            .await
            .map_err(|e| format!("Failed to flush file: {}", e))?;
        Ok(())
    }
}
