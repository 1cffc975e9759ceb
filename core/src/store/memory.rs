use super::{KeyValueStore, StoreError};

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Non-durable backend, everything is gone once dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
		Ok(self.entries.read().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
		self.entries.write().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.entries.write().await.remove(key);
		Ok(())
	}
}
