use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    memory::MemoryStore, sqlite::SqliteStore, ParkingStore, StorageConfig, StorageError,
    StorageProvider, StorageResult,
};

/// Factory for creating storage instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create and initialize a store from configuration
    pub async fn create_storage(config: StorageConfig) -> StorageResult<Arc<dyn ParkingStore>> {
        debug!("Creating storage with provider: {:?}", config.provider);

        let storage: Arc<dyn ParkingStore> = match &config.provider {
            StorageProvider::Memory => {
                info!("Initializing in-memory storage");
                Arc::new(MemoryStore::new())
            }
            StorageProvider::Sqlite { path } => {
                info!("Initializing SQLite storage at: {:?}", path);
                Arc::new(SqliteStore::new(&config).await?)
            }
        };

        storage.initialize().await?;
        Ok(storage)
    }

    /// Create a store from a database URL (`memory:` or `sqlite:<path>`)
    pub async fn from_url(url: &str) -> StorageResult<Arc<dyn ParkingStore>> {
        if url == "memory:" {
            return Self::create_storage(StorageConfig::memory()).await;
        }
        match url.strip_prefix("sqlite:") {
            Some(path) if !path.is_empty() => {
                Self::create_storage(StorageConfig::sqlite(path)).await
            }
            _ => Err(StorageError::InvalidConfig(format!(
                "Unsupported database URL: {}",
                url
            ))),
        }
    }
}

/// Convenience checks layered over ParkingStore
#[async_trait]
pub trait ParkingStoreExt: ParkingStore {
    async fn space_number_available(&self, space_number: &str) -> StorageResult<bool> {
        Ok(self
            .get_parking_space_by_number(space_number.trim())
            .await?
            .is_none())
    }

    async fn household_number_available(&self, household_number: &str) -> StorageResult<bool> {
        Ok(self
            .get_household_by_number(household_number.trim())
            .await?
            .is_none())
    }
}

impl<T: ParkingStore + ?Sized> ParkingStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use parkshare_core::{ParkingSpaceCreateInput, ParkingSpaceFilter};
    use tempfile::tempdir;

    fn space_input(number: &str) -> ParkingSpaceCreateInput {
        ParkingSpaceCreateInput {
            space_number: number.to_string(),
            area: "B1".to_string(),
            status: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_factory_create_memory_storage() {
        let storage = StorageFactory::create_storage(StorageConfig::memory())
            .await
            .unwrap();
        assert_eq!(storage.backend(), StorageBackend::Memory);
        assert!(storage.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_factory_create_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("parkshare.db");

        let storage = StorageFactory::create_storage(StorageConfig::sqlite(&db_path))
            .await
            .unwrap();
        assert_eq!(storage.backend(), StorageBackend::Sqlite);
        assert!(db_path.exists());

        let spaces = storage
            .list_parking_spaces(&ParkingSpaceFilter::default())
            .await
            .unwrap();
        assert!(spaces.is_empty());
    }

    #[tokio::test]
    async fn test_factory_from_url() {
        let temp_dir = tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("test.db").display());

        let storage = StorageFactory::from_url(&url).await.unwrap();
        assert_eq!(storage.backend(), StorageBackend::Sqlite);

        let storage = StorageFactory::from_url("memory:").await.unwrap();
        assert_eq!(storage.backend(), StorageBackend::Memory);

        let err = StorageFactory::from_url("postgres://localhost/db")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_storage_ext_methods() {
        let storage = StorageFactory::create_storage(StorageConfig::memory())
            .await
            .unwrap();

        assert!(storage.space_number_available("A-01").await.unwrap());
        storage
            .create_parking_space(space_input("A-01"))
            .await
            .unwrap();
        assert!(!storage.space_number_available(" A-01 ").await.unwrap());
        assert!(storage.household_number_available("H-1").await.unwrap());
    }
}
