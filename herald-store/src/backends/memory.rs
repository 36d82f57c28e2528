use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use herald_common::{Kind, Object, ResourceKey, internal};
use tokio::sync::broadcast;

use crate::{
    StoreError,
    r#trait::{Change, ResourceStore, WatchEvent},
};

/// Default number of buffered watch events per subscriber
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

type Objects = BTreeMap<(Kind, ResourceKey), Object>;

/// In-memory resource store
///
/// Objects live in a `BTreeMap` behind an `RwLock`, keyed by kind and
/// `namespace/name`, so listings come back in a stable order.
///
/// # Versioning
/// Every write bumps `resourceVersion`. `generation` only moves when the spec
/// (or a secret's data) changes, and only those writes are broadcast to
/// watchers.
///
/// # Watchers
/// Events go through a `broadcast` channel. A watcher that falls behind by
/// more than the channel capacity sees `RecvError::Lagged` and is expected to
/// relist.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub(crate) objects: Arc<RwLock<Objects>>,
    events: broadcast::Sender<WatchEvent>,
}

impl MemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    /// Create a new empty store, buffering at most `capacity` events per watcher
    #[must_use]
    pub fn with_watch_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            events,
        }
    }

    /// Number of stored objects across all kinds
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every object in a JSON manifest, returning how many were read
    ///
    /// # Errors
    /// If the file cannot be read, is not a JSON list of objects, or an apply fails
    pub async fn load_manifest(&self, path: &Path) -> crate::Result<usize> {
        let content = tokio::fs::read(path).await?;
        let objects: Vec<Object> = serde_json::from_slice(&content)?;
        let count = objects.len();

        for object in objects {
            self.apply(object).await?;
        }

        internal!("Loaded {count} objects from {}", path.display());

        Ok(count)
    }

    /// Bump the resource version without changing anything else, as a
    /// concurrent writer would
    pub(crate) fn touch(&self, kind: Kind, key: &ResourceKey) -> crate::Result<()> {
        let mut objects = self.objects.write()?;
        if let Some(object) = objects.get_mut(&(kind, key.clone())) {
            object.meta_mut().resource_version += 1;
        }
        Ok(())
    }

    /// Replace an object wholesale, status included, as another client
    /// holding a newer copy would
    pub(crate) fn overwrite(&self, mut object: Object) -> crate::Result<()> {
        let kind = object.kind();
        let key = object.key();

        {
            let mut objects = self.objects.write()?;
            if let Some(existing) = objects.get_mut(&(kind, key.clone())) {
                let previous = existing.meta();
                let meta = object.meta_mut();
                meta.uid.clone_from(&previous.uid);
                meta.creation_timestamp = previous.creation_timestamp;
                meta.resource_version = previous.resource_version + 1;
                meta.generation = previous.generation + 1;
                *existing = object;
            } else {
                object.meta_mut().initialise();
                objects.insert((kind, key.clone()), object);
            }
        }

        self.notify(kind, key, Change::Applied);

        Ok(())
    }

    fn notify(&self, kind: Kind, key: ResourceKey, change: Change) {
        // Sending only fails when nobody is watching
        self.events.send(WatchEvent { kind, key, change }).ok();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, kind: Kind, key: &ResourceKey) -> crate::Result<Object> {
        self.objects
            .read()?
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })
    }

    async fn list(&self, kind: Kind, namespace: Option<&str>) -> crate::Result<Vec<Object>> {
        Ok(self
            .objects
            .read()?
            .iter()
            .filter(|((k, key), _)| {
                *k == kind && namespace.is_none_or(|ns| key.namespace == ns)
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn apply(&self, mut object: Object) -> crate::Result<Object> {
        if object.meta().namespace.is_empty() {
            object.meta_mut().namespace = "default".to_string();
        }

        let kind = object.kind();
        let key = object.key();

        {
            let mut objects = self.objects.write()?;
            if let Some(existing) = objects.get_mut(&(kind, key.clone())) {
                if !existing.spec_differs(&object) {
                    return Ok(existing.clone());
                }

                object.take_status_from(existing);
                let previous = existing.meta();
                let meta = object.meta_mut();
                meta.uid.clone_from(&previous.uid);
                meta.creation_timestamp = previous.creation_timestamp;
                meta.resource_version = previous.resource_version + 1;
                meta.generation = previous.generation + 1;
                *existing = object.clone();
            } else {
                object.meta_mut().initialise();
                objects.insert((kind, key.clone()), object.clone());
            }
        }

        self.notify(kind, key, Change::Applied);

        Ok(object)
    }

    async fn replace_status(&self, object: &Object) -> crate::Result<Object> {
        let kind = object.kind();
        if kind == Kind::Secret {
            return Err(StoreError::NoStatus(kind));
        }

        let key = object.key();
        let mut objects = self.objects.write()?;
        let existing = objects
            .get_mut(&(kind, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })?;

        let expected = object.meta().resource_version;
        let actual = existing.meta().resource_version;
        if expected != actual {
            return Err(StoreError::Conflict {
                kind,
                key,
                expected,
                actual,
            });
        }

        existing.take_status_from(object);
        existing.meta_mut().resource_version += 1;

        Ok(existing.clone())
    }

    async fn delete(&self, kind: Kind, key: &ResourceKey) -> crate::Result<()> {
        self.objects
            .write()?
            .remove(&(kind, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })?;

        self.notify(kind, key.clone(), Change::Deleted);

        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}
