use crate::app::ports::CheckpointPort;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Checkpoints as `<root>/<key>.json` files.
pub struct FsCheckpoint {
    root: PathBuf,
}

impl FsCheckpoint {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.starts_with('.') {
            return Err(ScraperError::Config(format!("invalid checkpoint key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[async_trait]
impl CheckpointPort for FsCheckpoint {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        // Write-then-rename so readers never see a half-written artifact
        let tmp = tmp_path(&path);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "checkpoint written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnrichedRecord, Forecast, GeoPoint, RawEvent};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_links_round_trip_preserves_order_and_duplicates() {
        let dir = tempdir().unwrap();
        let checkpoint = FsCheckpoint::new(dir.path().join("data"));
        let links = vec![
            "https://visitseattle.org/events/b/".to_string(),
            "https://visitseattle.org/events/a/".to_string(),
            "https://visitseattle.org/events/b/".to_string(),
        ];
        checkpoint.save_links(&links).await.unwrap();
        assert_eq!(checkpoint.load_links().await.unwrap(), Some(links));
        assert!(dir.path().join("data").join("links.json").exists());
    }

    #[tokio::test]
    async fn test_records_round_trip() {
        let dir = tempdir().unwrap();
        let checkpoint = FsCheckpoint::new(dir.path());
        let records = vec![EnrichedRecord {
            url: "https://visitseattle.org/events/a/".into(),
            event: RawEvent {
                title: "A & B".into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                venue: "Neumos".into(),
                category: "Music".into(),
                region: "Capitol Hill".into(),
            },
            geolocation: Some(GeoPoint::new(47.6141, -122.3196)),
            weather: Some(Forecast {
                condition: "Sunny".into(),
                temperature: 64,
                wind_speed: None,
            }),
        }];
        checkpoint.save_records(&records).await.unwrap();
        assert_eq!(checkpoint.load_records().await.unwrap(), Some(records));
    }

    #[tokio::test]
    async fn test_missing_checkpoint_is_none() {
        let dir = tempdir().unwrap();
        let checkpoint = FsCheckpoint::new(dir.path());
        assert!(checkpoint.load_links().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_artifact() {
        let dir = tempdir().unwrap();
        let checkpoint = FsCheckpoint::new(dir.path());
        checkpoint.save_links(&["one".to_string()]).await.unwrap();
        checkpoint.save_links(&["two".to_string()]).await.unwrap();
        assert_eq!(
            checkpoint.load_links().await.unwrap(),
            Some(vec!["two".to_string()])
        );
        assert!(!dir.path().join("links.json.tmp").exists());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let checkpoint = FsCheckpoint::new("data");
        assert!(checkpoint.path_for("../escape").is_err());
        assert!(checkpoint.path_for("").is_err());
        assert!(checkpoint.path_for("links").is_ok());
    }
}
