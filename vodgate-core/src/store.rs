//! Catalog store seam
//!
//! Persistence of the video catalog lives outside this system; renames
//! still have to keep the external store's path column in sync. The trait
//! is the whole contract, `MemoryCatalogStore` covers tests and
//! standalone runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct CatalogRecord {
    pub name: String,
    pub path: String,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_path(&self, path: &str) -> Result<Option<CatalogRecord>>;

    /// Point the record at `old_path` to `new_path` with a new display
    /// name. Returns whether a record matched.
    async fn update_path(&self, old_path: &str, new_path: &str, new_name: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    records: RwLock<HashMap<String, CatalogRecord>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CatalogRecord) {
        self.records.write().insert(record.path.clone(), record);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.records.read().get(path).cloned())
    }

    async fn update_path(&self, old_path: &str, new_path: &str, new_name: &str) -> Result<bool> {
        let mut records = self.records.write();
        if let Some(mut record) = records.remove(old_path) {
            record.path = new_path.to_string();
            record.name = new_name.to_string();
            records.insert(new_path.to_string(), record);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_path_moves_matching_record() {
        let store = MemoryCatalogStore::new();
        store.insert(CatalogRecord {
            name: "trip".to_string(),
            path: "/srv/media/alice/trip.mp4".to_string(),
        });

        let updated = store
            .update_path("/srv/media/alice/trip.mp4", "/srv/media/alice/holiday.mp4", "holiday")
            .await
            .expect("update");
        assert!(updated);

        let record = store
            .find_by_path("/srv/media/alice/holiday.mp4")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(record.name, "holiday");
    }

    #[tokio::test]
    async fn update_without_match_reports_false() {
        let store = MemoryCatalogStore::new();
        let updated = store
            .update_path("/srv/media/alice/none.mp4", "/srv/media/alice/new.mp4", "new")
            .await
            .expect("update");
        assert!(!updated);
    }
}
