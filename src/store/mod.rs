//! JSON-file-backed object store
//!
//! Holds the whole entity graph in memory and persists it atomically on
//! `save()` (write to a temp file, then rename). Recordings own their chunks
//! and transcript; deleting a recording removes them and its chunk files.
//! Profiles are only referenced: deleting one nullifies the references on
//! recordings and processed results but keeps the results themselves.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ProcessedResult, Profile, Recording};

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct StoreData {
    recordings: Vec<Recording>,
    profiles: Vec<Profile>,
    results: Vec<ProcessedResult>,
}

pub struct ObjectStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl ObjectStore {
    /// Open the store file, creating an empty graph if it doesn't exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse store file {:?}", path))?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Default store location under the platform data directory
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxnotes")
            .join("store.json")
    }

    /// Insert a recording, or replace the stored copy with the same id
    pub fn upsert_recording(&self, recording: Recording) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = data.recordings.iter_mut().find(|r| r.id == recording.id) {
            *existing = recording;
        } else {
            data.recordings.push(recording);
        }
    }

    pub fn recordings(&self) -> Vec<Recording> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let mut recordings = data.recordings.clone();
        recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recordings
    }

    pub fn recording(&self, id: Uuid) -> Option<Recording> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.recordings.iter().find(|r| r.id == id).cloned()
    }

    /// Cascade-delete a recording: its chunks and transcript go with it, and
    /// chunk files are removed from disk best-effort.
    pub fn delete_recording(&self, id: Uuid) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = data.recordings.iter().position(|r| r.id == id) {
            let recording = data.recordings.remove(pos);
            for chunk in &recording.chunks {
                if let Err(e) = fs::remove_file(&chunk.file_path) {
                    warn!("Failed to remove chunk file {:?}: {}", chunk.file_path, e);
                }
            }
            for result in data.results.iter_mut() {
                if result.recording_id == Some(id) {
                    result.recording_id = None;
                }
            }
            info!("Deleted recording {} ({} chunks)", id, recording.chunks.len());
        }
    }

    pub fn upsert_profile(&self, profile: Profile) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = data.profiles.iter_mut().find(|p| p.id == profile.id) {
            *existing = profile;
        } else {
            data.profiles.push(profile);
        }
    }

    pub fn profiles(&self) -> Vec<Profile> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.profiles.clone()
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Delete a profile, nullifying references on recordings and results
    pub fn delete_profile(&self, id: Uuid) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.profiles.retain(|p| p.id != id);
        for recording in data.recordings.iter_mut() {
            if recording.profile_id == Some(id) {
                recording.profile_id = None;
            }
        }
        for result in data.results.iter_mut() {
            if result.profile_id == Some(id) {
                result.profile_id = None;
            }
        }
    }

    pub fn insert_result(&self, result: ProcessedResult) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.results.push(result);
    }

    pub fn results_for_recording(&self, recording_id: Uuid) -> Vec<ProcessedResult> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.results
            .iter()
            .filter(|r| r.recording_id == Some(recording_id))
            .cloned()
            .collect()
    }

    /// Persist the graph to disk
    pub fn save(&self) -> Result<()> {
        let contents = {
            let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
            serde_json::to_string_pretty(&*data).context("Failed to serialize store")?
        };

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write store file {:?}", tmp))?;
        fs::rename(&tmp, &self.path).context("Failed to replace store file")?;

        Ok(())
    }
}
