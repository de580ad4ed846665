//! Document store contract.
//!
//! # Responsibility
//! - Describe the host CRUD and flag operations the engine needs.
//!
//! # Invariants
//! - `create` returns documents in input order.
//! - `update` returns the document as stored after the write.

use crate::db::DbError;
use crate::model::document::{flag_path, ContainerRef, Document, DocumentData};
use crate::model::object_path::FieldAssignmentSet;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from document store operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Target document does not exist.
    NotFound(String),
    /// Persisted data cannot be converted to a valid document.
    InvalidData(String),
    Serialization(serde_json::Error),
    /// Connection mutex was poisoned by a panicking writer.
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(uuid) => write!(f, "document not found: {uuid}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::LockPoisoned => write!(f, "document store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Options for `DocumentStore::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Whether the host should re-render views of the document.
    pub render: bool,
}

impl UpdateOptions {
    /// Persist without triggering a re-render.
    pub fn silent() -> Self {
        Self { render: false }
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { render: true }
    }
}

/// Host document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Dereferences a uuid; `Ok(None)` when nothing is stored under it.
    async fn fetch(&self, uuid: &str) -> StoreResult<Option<Document>>;

    /// Non-suspending variant of `fetch`.
    fn fetch_sync(&self, uuid: &str) -> StoreResult<Option<Document>>;

    /// Creates embedded documents in `container`, assigning fresh ids.
    async fn create(
        &self,
        container: &ContainerRef,
        data: Vec<DocumentData>,
    ) -> StoreResult<Vec<Document>>;

    async fn update(
        &self,
        uuid: &str,
        changes: &FieldAssignmentSet,
        options: UpdateOptions,
    ) -> StoreResult<Document>;

    async fn delete(&self, uuid: &str) -> StoreResult<()>;

    /// Deletes embedded documents of `container` by id in one operation.
    async fn delete_many(&self, container: &ContainerRef, ids: &[String]) -> StoreResult<()>;

    /// Lists documents owned by `container` in creation order.
    async fn list(&self, container: &ContainerRef) -> StoreResult<Vec<Document>>;

    async fn set_flag(
        &self,
        uuid: &str,
        key: &str,
        value: Value,
        options: UpdateOptions,
    ) -> StoreResult<Document> {
        let mut changes = FieldAssignmentSet::new();
        changes.set(flag_path(key), value);
        self.update(uuid, &changes, options).await
    }

    async fn unset_flag(&self, uuid: &str, key: &str, options: UpdateOptions) -> StoreResult<Document> {
        let mut changes = FieldAssignmentSet::new();
        changes.unset(flag_path(key));
        self.update(uuid, &changes, options).await
    }
}
