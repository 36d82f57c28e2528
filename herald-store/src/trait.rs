use async_trait::async_trait;
use herald_common::{Kind, Object, Resource, ResourceKey};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Result, StoreError};

/// What happened to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Created, or its spec (or secret data) changed
    Applied,
    Deleted,
}

/// Notification sent to watchers.
///
/// Status writes never produce one, so a controller writing status does not
/// trigger itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: Kind,
    pub key: ResourceKey,
    pub change: Change,
}

/// Storage for the declared resources the controller works on.
///
/// Implementations must make `replace_status` atomic: either every status
/// field is written or none are.
#[async_trait]
pub trait ResourceStore: Send + Sync + std::fmt::Debug {
    /// Read a single object
    ///
    /// # Errors
    /// `StoreError::NotFound` if nothing exists under `key`
    async fn get(&self, kind: Kind, key: &ResourceKey) -> Result<Object>;

    /// List objects of a kind, optionally restricted to a namespace
    ///
    /// # Errors
    /// If the store cannot be read
    async fn list(&self, kind: Kind, namespace: Option<&str>) -> Result<Vec<Object>>;

    /// Create an object, or replace its spec if it already exists.
    ///
    /// The stored status is kept on update. Returns the stored object.
    ///
    /// # Errors
    /// If the store cannot be written
    async fn apply(&self, object: Object) -> Result<Object>;

    /// Replace the status of an object, checking `metadata.resourceVersion`.
    ///
    /// # Errors
    /// - `StoreError::Conflict` if the object changed since it was read
    /// - `StoreError::NotFound` if it was deleted
    /// - `StoreError::NoStatus` for kinds without a status
    async fn replace_status(&self, object: &Object) -> Result<Object>;

    /// Delete an object
    ///
    /// # Errors
    /// `StoreError::NotFound` if nothing exists under `key`
    async fn delete(&self, kind: Kind, key: &ResourceKey) -> Result<()>;

    /// Subscribe to spec changes and deletions
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;

    /// Check that the store is reachable
    ///
    /// # Errors
    /// If the store is unavailable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed access on top of [`ResourceStore`]
#[async_trait]
pub trait ResourceStoreExt: ResourceStore {
    /// Read an object as its concrete type
    ///
    /// # Errors
    /// Any error from [`ResourceStore::get`], or `KindMismatch`
    async fn fetch<R: Resource>(&self, key: &ResourceKey) -> Result<R> {
        let object = self.get(R::KIND, key).await?;
        downcast(object)
    }

    /// List objects as their concrete type
    ///
    /// # Errors
    /// Any error from [`ResourceStore::list`], or `KindMismatch`
    async fn fetch_all<R: Resource>(&self, namespace: Option<&str>) -> Result<Vec<R>> {
        self.list(R::KIND, namespace)
            .await?
            .into_iter()
            .map(downcast)
            .collect()
    }

    /// Write the status of a typed object read earlier
    ///
    /// # Errors
    /// Any error from [`ResourceStore::replace_status`], or `KindMismatch`
    async fn write_status<R: Resource>(&self, resource: R) -> Result<R> {
        let written = self.replace_status(&resource.into()).await?;
        downcast(written)
    }
}

impl<T: ResourceStore + ?Sized> ResourceStoreExt for T {}

fn downcast<R: Resource>(object: Object) -> Result<R> {
    R::try_from(object).map_err(|other| StoreError::KindMismatch {
        expected: R::KIND,
        found: other.kind(),
    })
}
