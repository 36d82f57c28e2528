use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    backends::{MemoryStore, memory::DEFAULT_WATCH_CAPACITY},
    r#trait::ResourceStore,
};

/// Configuration for the resource store
///
/// # Examples
///
/// Empty in-memory store:
/// ```ron
/// Herald (
///     store: Memory(seed: None),
/// )
/// ```
///
/// In-memory store seeded from a manifest:
/// ```ron
/// Herald (
///     store: Memory(
///         seed: Some("/etc/herald/seed.json"),
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    Memory {
        /// JSON manifest applied at startup
        #[serde(default)]
        seed: Option<PathBuf>,
        /// Buffered watch events per subscriber before it has to relist
        #[serde(default = "default_watch_capacity")]
        watch_capacity: usize,
    },
}

const fn default_watch_capacity() -> usize {
    DEFAULT_WATCH_CAPACITY
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory {
            seed: None,
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Build the configured store, applying any seed manifest
    ///
    /// # Errors
    /// If the seed manifest cannot be read or applied
    pub async fn build(&self) -> crate::Result<Arc<dyn ResourceStore>> {
        match self {
            Self::Memory {
                seed,
                watch_capacity,
            } => {
                let store = MemoryStore::with_watch_capacity(*watch_capacity);
                if let Some(path) = seed {
                    store.load_manifest(path).await?;
                }
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_from_ron() {
        let config: StoreConfig =
            ron::from_str(r#"Memory(seed: Some("/tmp/seed.json"))"#).expect("valid config");

        assert_eq!(
            config,
            StoreConfig::Memory {
                seed: Some(PathBuf::from("/tmp/seed.json")),
                watch_capacity: DEFAULT_WATCH_CAPACITY,
            }
        );
    }

    #[test]
    fn test_default_is_unseeded_memory() {
        let config: StoreConfig = ron::from_str("Memory(seed: None)").expect("valid config");
        assert_eq!(config, StoreConfig::default());
    }
}
