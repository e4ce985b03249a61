use crate::constants::{LINKS_CHECKPOINT, RECORDS_CHECKPOINT};
use crate::error::Result;
use crate::types::{EnrichedRecord, Link};
use async_trait::async_trait;

// Fetch-side port
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// GET `url`. Implementations return `Err` for anything other than a
    /// successful response, after whatever retry discipline they apply.
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }
}

/// Durable blob storage for intermediate artifacts, so a later stage can
/// resume without redoing earlier ones.
#[async_trait]
pub trait CheckpointPort: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn save_links(&self, links: &[Link]) -> Result<()> {
        self.put(LINKS_CHECKPOINT, serde_json::to_vec(links)?).await
    }

    async fn load_links(&self) -> Result<Option<Vec<Link>>> {
        match self.get(LINKS_CHECKPOINT).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save_records(&self, records: &[EnrichedRecord]) -> Result<()> {
        self.put(RECORDS_CHECKPOINT, serde_json::to_vec_pretty(records)?)
            .await
    }

    async fn load_records(&self) -> Result<Option<Vec<EnrichedRecord>>> {
        match self.get(RECORDS_CHECKPOINT).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
