//! File-backed presentation records, keyed by presentation id.
//!
//! Each record is written once as `<dir>/<id>_<unix_ts>.json`. Nothing is ever deleted;
//! when an id has several files the newest timestamp wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::presentation::Presentation;

#[derive(Debug, Clone)]
pub struct PresentationStore {
    dir: PathBuf,
}

impl PresentationStore {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            dir: work_dir.join("presentations"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the full record (image prompts included) under a fresh id.
    pub async fn save(&self, presentation: &Presentation) -> Result<Uuid> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let id = Uuid::new_v4();
        let path = self
            .dir
            .join(format!("{}_{}.json", id, chrono::Utc::now().timestamp()));
        let body = serde_json::to_vec_pretty(presentation)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Stored presentation {} at {}", id, path.display());
        Ok(id)
    }

    /// Loads the newest record for `id`, or `None` when nothing was stored under it.
    pub async fn load(&self, id: Uuid) -> Result<Option<Presentation>> {
        let Some(path) = self.latest_file(id).await? else {
            debug!("No stored presentation for {}", id);
            return Ok(None);
        };

        let body = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let presentation = serde_json::from_slice(&body)
            .with_context(|| format!("Stored record {} is not valid JSON", path.display()))?;
        Ok(Some(presentation))
    }

    async fn latest_file(&self, id: Uuid) -> Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to list stored presentations"),
        };

        let prefix = format!("{id}_");
        let mut latest: Option<(i64, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(timestamp) = name
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|ts| ts.parse::<i64>().ok())
            else {
                continue;
            };
            if latest.as_ref().map_or(true, |(best, _)| timestamp > *best) {
                latest = Some((timestamp, entry.path()));
            }
        }
        Ok(latest.map(|(_, path)| path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(title: &str) -> Presentation {
        serde_json::from_value(json!({
            "title": title,
            "slides": [{"type": "title", "title": title, "image_prompt": "a lighthouse", "custom": 1}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_full_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresentationStore::new(dir.path());

        let id = store.save(&sample("Harbours")).await.unwrap();
        let loaded = store.load(id).await.unwrap().unwrap();

        assert_eq!(loaded, sample("Harbours"));
        assert_eq!(loaded.slides[0].image_prompt.as_deref(), Some("a lighthouse"));
    }

    #[tokio::test]
    async fn test_load_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresentationStore::new(dir.path());
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newest_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresentationStore::new(dir.path());
        tokio::fs::create_dir_all(store.dir()).await.unwrap();

        let id = Uuid::new_v4();
        let write = |ts: i64, title: &str| {
            std::fs::write(
                store.dir().join(format!("{id}_{ts}.json")),
                serde_json::to_vec(&sample(title)).unwrap(),
            )
            .unwrap()
        };
        write(1_700_000_000, "old");
        write(1_700_000_500, "new");
        write(1_600_000_000, "older");
        std::fs::write(store.dir().join(format!("{id}_notes.txt")), b"x").unwrap();

        let loaded = store.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresentationStore::new(dir.path());
        tokio::fs::create_dir_all(store.dir()).await.unwrap();

        let id = Uuid::new_v4();
        std::fs::write(store.dir().join(format!("{id}_1.json")), b"{not json").unwrap();
        assert!(store.load(id).await.is_err());
    }
}
