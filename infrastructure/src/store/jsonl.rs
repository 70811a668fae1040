//! JSONL version store.
//!
//! Appends one JSON object per saved version to a single file via a
//! buffered writer, flushed per record for crash safety. Version numbers
//! continue from any records already in the file.

use appforge_application::ports::app_store::{AppVersionStore, StoreError};
use appforge_domain::{AppVersion, GeneratedApp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonlAppStore {
    writer: Mutex<BufWriter<File>>,
    counters: Mutex<HashMap<String, u32>>,
    path: PathBuf,
}

impl JsonlAppStore {
    /// Open (or create) the store file, scanning existing records to
    /// restore per-conversation version counters.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        let mut counters = HashMap::new();
        for version in Self::read_all(path)? {
            let counter = counters.entry(version.conversation_id).or_insert(0);
            *counter = (*counter).max(version.version_number);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            counters: Mutex::new(counters),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(path: &Path) -> Result<Vec<AppVersion>, StoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::WriteFailed(e.to_string())),
        };

        let mut versions = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AppVersion>(&line) {
                Ok(version) => versions.push(version),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed record"),
            }
        }
        Ok(versions)
    }
}

#[async_trait]
impl AppVersionStore for JsonlAppStore {
    async fn save_version(
        &self,
        conversation_id: &str,
        artifact: &GeneratedApp,
        prompt: &str,
    ) -> Result<AppVersion, StoreError> {
        let version_number = {
            let mut counters = self
                .counters
                .lock()
                .map_err(|_| StoreError::WriteFailed("counter lock poisoned".to_string()))?;
            let counter = counters.entry(conversation_id.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        let version = AppVersion {
            version_id: format!("{}-v{}", conversation_id, version_number),
            conversation_id: conversation_id.to_string(),
            version_number,
            code: artifact.code.clone(),
            prompt: prompt.to_string(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };

        let line = serde_json::to_string(&version)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::WriteFailed("writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", line).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(version)
    }

    async fn versions(&self, conversation_id: &str) -> Result<Vec<AppVersion>, StoreError> {
        // Flush pending writes so the read sees every record.
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
        Ok(Self::read_all(&self.path)?
            .into_iter()
            .filter(|v| v.conversation_id == conversation_id)
            .collect())
    }
}

impl Drop for JsonlAppStore {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
