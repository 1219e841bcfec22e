use crate::error::{Error, Result};
use crate::models::{normalize_symbol, PositionInput, TrackedPosition};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable symbol -> position mapping
///
/// Inputs are expected to be validated already; symbol arguments are
/// uppercased before matching.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Fails with `DuplicatePosition` if the symbol is already tracked
    async fn add(&self, input: PositionInput) -> Result<TrackedPosition>;

    async fn list_all(&self) -> Result<Vec<TrackedPosition>>;

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<TrackedPosition>>;

    /// Replace the whole record, keeping its creation time
    async fn update(&self, symbol: &str, input: PositionInput) -> Result<TrackedPosition>;

    async fn delete(&self, symbol: &str) -> Result<()>;
}

/// Positions kept as a pretty-printed JSON array in a single file
///
/// Every write goes to a sibling temp file that is then renamed over the
/// data file. Mutations inside this process are serialized; other
/// processes writing the same file are not coordinated.
pub struct JsonPositionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonPositionStore {
    /// Open the store, creating the file (and its directory) as `[]` if missing
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage("initialize", e))?;
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };

        let exists = tokio::fs::try_exists(&store.path)
            .await
            .map_err(|e| Error::storage("initialize", e))?;
        if !exists {
            store.save(&[]).await?;
            tracing::info!("Created new storage file at {}", store.path.display());
        }

        tracing::info!("Initialized JSON repository at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<TrackedPosition>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage("load", e)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let positions: Vec<TrackedPosition> = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JSON file");
            Error::storage("load", format!("Invalid JSON format: {}", e))
        })?;

        tracing::debug!("Loaded {} stocks from storage", positions.len());
        Ok(positions)
    }

    async fn save(&self, positions: &[TrackedPosition]) -> Result<()> {
        let json =
            serde_json::to_string_pretty(positions).map_err(|e| Error::storage("save", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::storage("save", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::storage("save", e))?;

        tracing::debug!("Saved {} stocks to storage", positions.len());
        Ok(())
    }
}

#[async_trait]
impl PositionStore for JsonPositionStore {
    async fn add(&self, input: PositionInput) -> Result<TrackedPosition> {
        let _guard = self.write_lock.lock().await;
        let mut positions = self.load().await?;

        if positions.iter().any(|p| p.symbol == input.symbol) {
            tracing::warn!(symbol = %input.symbol, "Attempted to add duplicate stock");
            return Err(Error::DuplicatePosition(input.symbol));
        }

        let position = TrackedPosition::new(input, Utc::now());
        positions.push(position.clone());
        self.save(&positions).await?;

        tracing::info!(symbol = %position.symbol, "Added stock");
        Ok(position)
    }

    async fn list_all(&self) -> Result<Vec<TrackedPosition>> {
        self.load().await
    }

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<TrackedPosition>> {
        let symbol = normalize_symbol(symbol);
        let positions = self.load().await?;
        Ok(positions.into_iter().find(|p| p.symbol == symbol))
    }

    async fn update(&self, symbol: &str, input: PositionInput) -> Result<TrackedPosition> {
        let symbol = normalize_symbol(symbol);
        let _guard = self.write_lock.lock().await;
        let mut positions = self.load().await?;

        let index = positions
            .iter()
            .position(|p| p.symbol == symbol)
            .ok_or_else(|| {
                tracing::warn!(symbol = %symbol, "Stock not found for update");
                Error::PositionNotFound(symbol.clone())
            })?;

        // Renaming onto another tracked symbol would break uniqueness
        if input.symbol != symbol && positions.iter().any(|p| p.symbol == input.symbol) {
            return Err(Error::DuplicatePosition(input.symbol));
        }

        let existing = &positions[index];
        let updated = TrackedPosition {
            symbol: input.symbol,
            buy_price: input.buy_price,
            target_price: input.target_price,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        positions[index] = updated.clone();
        self.save(&positions).await?;

        tracing::info!(symbol = %symbol, "Updated stock");
        Ok(updated)
    }

    async fn delete(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let _guard = self.write_lock.lock().await;
        let mut positions = self.load().await?;

        let before = positions.len();
        positions.retain(|p| p.symbol != symbol);

        if positions.len() == before {
            tracing::warn!(symbol = %symbol, "Stock not found for deletion");
            return Err(Error::PositionNotFound(symbol));
        }

        self.save(&positions).await?;
        tracing::info!(symbol = %symbol, "Deleted stock");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, JsonPositionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPositionStore::open(dir.path().join("data/stocks.json"))
            .await
            .unwrap();
        (dir, store)
    }

    fn input(symbol: &str, buy: f64, target: f64) -> PositionInput {
        PositionInput::new(symbol, buy, target).validate().unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_empty_file() {
        let (_dir, store) = open_store().await;

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.trim(), "[]");
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_list_preserves_order() {
        let (_dir, store) = open_store().await;

        store.add(input("AAPL", 150.0, 180.0)).await.unwrap();
        store.add(input("tcs.ns", 3500.0, 4000.0)).await.unwrap();

        let positions = store.list_all().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].symbol, "AAPL");
        assert_eq!(positions[1].symbol, "TCS.NS");
    }

    #[tokio::test]
    async fn test_add_duplicate_rejected() {
        let (_dir, store) = open_store().await;

        store.add(input("AAPL", 150.0, 180.0)).await.unwrap();
        let err = store.add(input("aapl", 100.0, 200.0)).await.unwrap_err();

        assert_eq!(err, Error::DuplicatePosition("AAPL".to_string()));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_symbol_is_case_insensitive() {
        let (_dir, store) = open_store().await;
        store.add(input("INFY.NS", 1400.0, 1600.0)).await.unwrap();

        let found = store.get_by_symbol("infy.ns").await.unwrap();
        assert_eq!(found.map(|p| p.buy_price), Some(1400.0));
        assert!(store.get_by_symbol("MSFT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_and_keeps_created_at() {
        let (_dir, store) = open_store().await;
        let original = store.add(input("AAPL", 150.0, 180.0)).await.unwrap();

        let updated = store
            .update("aapl", input("AAPL", 140.0, 200.0))
            .await
            .unwrap();

        assert_eq!(updated.buy_price, 140.0);
        assert_eq!(updated.target_price, 200.0);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at >= original.updated_at);

        let stored = store.get_by_symbol("AAPL").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (_dir, store) = open_store().await;

        let err = store
            .update("MSFT", input("MSFT", 1.0, 2.0))
            .await
            .unwrap_err();
        assert_eq!(err, Error::PositionNotFound("MSFT".to_string()));
    }

    #[tokio::test]
    async fn test_update_onto_existing_symbol_is_duplicate() {
        let (_dir, store) = open_store().await;
        store.add(input("AAPL", 150.0, 180.0)).await.unwrap();
        store.add(input("MSFT", 300.0, 350.0)).await.unwrap();

        let err = store
            .update("AAPL", input("MSFT", 1.0, 2.0))
            .await
            .unwrap_err();
        assert_eq!(err, Error::DuplicatePosition("MSFT".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, store) = open_store().await;
        store.add(input("AAPL", 150.0, 180.0)).await.unwrap();

        store.delete("aapl").await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());

        let err = store.delete("AAPL").await.unwrap_err();
        assert_eq!(err, Error::PositionNotFound("AAPL".to_string()));
    }

    #[tokio::test]
    async fn test_reopen_reads_existing_data() {
        let (dir, store) = open_store().await;
        store.add(input("AAPL", 150.0, 180.0)).await.unwrap();
        drop(store);

        let reopened = JsonPositionStore::open(dir.path().join("data/stocks.json"))
            .await
            .unwrap();
        assert_eq!(reopened.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_file_is_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonPositionStore::open(&path).await.unwrap();
        let err = store.list_all().await.unwrap_err();

        assert_eq!(err.kind(), "storage_failure");
    }
}
