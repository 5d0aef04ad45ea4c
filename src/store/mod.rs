pub mod cleaner;
pub mod http_client;
#[cfg(test)]
pub mod mock;
pub mod parsers;

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::metrics::today_in;
use crate::models::{Account, Dataset, Deal, RecordKind, Representative};
use crate::storage::LocalStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use self::cleaner::{account_to_row, clean_payload, deal_to_row, rep_to_row};
use self::http_client::HttpClient;
use self::parsers::{SaveRequest, parse_payload};

// ── Collections ───────────────────────────────────────────────────────────────

/// One collection, borrowed for a write.
#[derive(Debug, Clone, Copy)]
pub enum Collection<'a> {
    Accounts(&'a [Account]),
    Deals(&'a [Deal]),
    Representatives(&'a [Representative]),
}

impl<'a> Collection<'a> {
    pub fn of(data: &'a Dataset, kind: RecordKind) -> Self {
        match kind {
            RecordKind::Accounts => Collection::Accounts(&data.accounts),
            RecordKind::Deals => Collection::Deals(&data.deals),
            RecordKind::Representatives => Collection::Representatives(&data.representatives),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Collection::Accounts(_) => RecordKind::Accounts,
            Collection::Deals(_) => RecordKind::Deals,
            Collection::Representatives(_) => RecordKind::Representatives,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::Accounts(r) => r.len(),
            Collection::Deals(r) => r.len(),
            Collection::Representatives(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Store trait ───────────────────────────────────────────────────────────────

/// Backing store for the three collections. The implementation is chosen
/// once at startup; the reconciler only sees this trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn fetch_all(&self) -> Result<Dataset, SyncError>;

    /// Replace one whole collection.
    async fn replace_collection(&self, records: Collection<'_>) -> Result<(), SyncError>;

    /// Whether an empty first load should be replaced by the sample dataset.
    /// Stores that seed themselves on first use, and so can only read back
    /// empty collections the user emptied, return false.
    fn seeds_when_empty(&self) -> bool {
        true
    }

    /// Forget stored data so the next fetch starts from the sample dataset.
    async fn reset(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

// ── Remote spreadsheet store ──────────────────────────────────────────────────

pub struct RemoteStore {
    client: HttpClient,
    endpoint: Url,
}

impl RemoteStore {
    pub fn new(config: &AppConfig, remote_url: &str) -> Result<Self> {
        let endpoint = Url::parse(remote_url)
            .with_context(|| format!("Invalid store.remote_url {:?}", remote_url))?;
        Ok(Self {
            client: HttpClient::new(&config.store)?,
            endpoint,
        })
    }

    fn fetch_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("action", "getCRMData");
        url
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch_all(&self) -> Result<Dataset, SyncError> {
        let url = self.fetch_url();
        info!("Fetching all collections from {}", self.endpoint);

        let body = self
            .client
            .get_text(url.as_str())
            .await
            .map_err(SyncError::Transport)?;

        let data = clean_payload(parse_payload(&body)?);
        info!(
            "Fetched {} accounts, {} deals, {} representatives",
            data.accounts.len(),
            data.deals.len(),
            data.representatives.len()
        );
        Ok(data)
    }

    async fn replace_collection(&self, records: Collection<'_>) -> Result<(), SyncError> {
        let kind = records.kind();
        let request = match records {
            Collection::Accounts(rows) => {
                let rows = rows
                    .iter()
                    .map(account_to_row)
                    .collect::<serde_json::Result<Vec<_>>>()
                    .context("encode accounts")
                    .map_err(SyncError::Transport)?;
                SaveRequest::new(kind.wire_name(), &rows)
            }
            Collection::Deals(rows) => {
                let rows: Vec<_> = rows.iter().map(deal_to_row).collect();
                SaveRequest::new(kind.wire_name(), &rows)
            }
            Collection::Representatives(rows) => {
                let rows: Vec<_> = rows.iter().map(rep_to_row).collect();
                SaveRequest::new(kind.wire_name(), &rows)
            }
        }
        .with_context(|| format!("encode {}", kind))
        .map_err(SyncError::Transport)?;

        debug!("Writing {} {} to {}", records.len(), kind, self.endpoint);
        self.client
            .post_json(self.endpoint.as_str(), &request)
            .await
            .map_err(SyncError::Transport)?;
        Ok(())
    }
}

/// Pick the storage strategy: the remote store when a URL is configured,
/// otherwise the local cache.
pub fn connect(config: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    match config.store.remote_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            info!("Using remote record store at {}", url);
            Ok(Arc::new(RemoteStore::new(config, url)?))
        }
        None => {
            info!(
                "No remote store configured, using local cache {:?} (key {})",
                config.cache.db_path, config.cache.cache_key
            );
            let store = LocalStore::open(&config.cache.db_path, &config.cache.cache_key)
                .context("Failed to open local cache")?
                .with_reference_date(today_in(config.reporting.utc_offset_minutes));
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_of_dataset() {
        let data = Dataset {
            representatives: vec![Representative::default(), Representative::default()],
            ..Default::default()
        };
        let c = Collection::of(&data, RecordKind::Representatives);
        assert_eq!(c.kind(), RecordKind::Representatives);
        assert_eq!(c.len(), 2);
        assert!(Collection::of(&data, RecordKind::Deals).is_empty());
    }

    #[test]
    fn test_remote_fetch_url_carries_action() {
        let config = AppConfig::default();
        let store = RemoteStore::new(&config, "https://script.example.com/macros/s/abc/exec").unwrap();
        assert_eq!(
            store.fetch_url().as_str(),
            "https://script.example.com/macros/s/abc/exec?action=getCRMData"
        );
        assert!(RemoteStore::new(&config, "not a url").is_err());
    }

    #[test]
    fn test_connect_without_remote_uses_local_cache() {
        let mut config = AppConfig::default();
        config.cache.db_path = std::path::PathBuf::from(":memory:");
        let store = connect(&config).unwrap();
        assert_eq!(store.name(), "local");
    }
}
