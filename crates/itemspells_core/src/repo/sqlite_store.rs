//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON rows keyed by uuid.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - The connection lock is never held across an await point.
//! - Listing is deterministic: insertion order within a container.

use crate::db::{open_db, open_db_in_memory};
use crate::model::document::{new_document_id, ContainerRef, Document, DocumentData};
use crate::model::object_path::FieldAssignmentSet;
use crate::repo::document_repo::{DocumentStore, StoreError, StoreResult, UpdateOptions};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    uuid,
    id,
    container_id,
    container_kind,
    pack,
    data
FROM documents";

/// Document store over one SQLite connection.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Wraps an already migrated connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Inserts a world, compendium or embedded document as-is.
    ///
    /// Used to seed library content; fails on a duplicate uuid.
    pub fn insert(&self, document: &Document) -> StoreResult<()> {
        let conn = self.lock()?;
        insert_row(&conn, document)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn load(conn: &Connection, uuid: &str) -> StoreResult<Option<Document>> {
        let mut stmt = conn.prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let row = stmt.query_row([uuid], read_raw_row).optional()?;
        row.map(RawRow::into_document).transpose()
    }

    fn create_blocking(
        &self,
        container: &ContainerRef,
        data: Vec<DocumentData>,
    ) -> StoreResult<Vec<Document>> {
        let documents: Vec<Document> = data
            .into_iter()
            .map(|data| Document::embedded(container.clone(), new_document_id(), data))
            .collect();

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for document in &documents {
            insert_row(&tx, document)?;
        }
        tx.commit()?;

        debug!(
            "event=document_create module=store status=ok container={} count={}",
            container.id,
            documents.len()
        );
        Ok(documents)
    }

    fn update_blocking(
        &self,
        uuid: &str,
        changes: &FieldAssignmentSet,
        options: UpdateOptions,
    ) -> StoreResult<Document> {
        let conn = self.lock()?;
        let mut document =
            Self::load(&conn, uuid)?.ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        document.data = document.data.apply(changes)?;

        conn.execute(
            "UPDATE documents
             SET
                doc_type = ?1,
                name = ?2,
                data = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                document.data.doc_type.as_str(),
                document.data.name.as_str(),
                serde_json::to_string(&document.data)?,
                uuid,
            ],
        )?;

        debug!(
            "event=document_update module=store status=ok uuid={uuid} fields={} render={}",
            changes.len(),
            options.render
        );
        Ok(document)
    }

    fn delete_blocking(&self, uuid: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM documents WHERE uuid = ?1;", [uuid])?;
        if changed == 0 {
            return Err(StoreError::NotFound(uuid.to_string()));
        }
        Ok(())
    }

    fn delete_many_blocking(&self, container: &ContainerRef, ids: &[String]) -> StoreResult<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for id in ids {
            tx.execute(
                "DELETE FROM documents WHERE container_id = ?1 AND id = ?2;",
                params![container.id.as_str(), id.as_str()],
            )?;
        }
        tx.commit()?;
        debug!(
            "event=document_delete module=store status=ok container={} count={}",
            container.id,
            ids.len()
        );
        Ok(())
    }

    fn list_blocking(&self, container: &ContainerRef) -> StoreResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL} WHERE container_id = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([container.id.as_str()])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(read_raw_row(row)?.into_document()?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn fetch(&self, uuid: &str) -> StoreResult<Option<Document>> {
        self.fetch_sync(uuid)
    }

    fn fetch_sync(&self, uuid: &str) -> StoreResult<Option<Document>> {
        let conn = self.lock()?;
        Self::load(&conn, uuid)
    }

    async fn create(
        &self,
        container: &ContainerRef,
        data: Vec<DocumentData>,
    ) -> StoreResult<Vec<Document>> {
        self.create_blocking(container, data)
    }

    async fn update(
        &self,
        uuid: &str,
        changes: &FieldAssignmentSet,
        options: UpdateOptions,
    ) -> StoreResult<Document> {
        self.update_blocking(uuid, changes, options)
    }

    async fn delete(&self, uuid: &str) -> StoreResult<()> {
        self.delete_blocking(uuid)
    }

    async fn delete_many(&self, container: &ContainerRef, ids: &[String]) -> StoreResult<()> {
        self.delete_many_blocking(container, ids)
    }

    async fn list(&self, container: &ContainerRef) -> StoreResult<Vec<Document>> {
        self.list_blocking(container)
    }
}

fn insert_row(conn: &Connection, document: &Document) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO documents (
            uuid,
            id,
            container_id,
            container_kind,
            pack,
            doc_type,
            name,
            data
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            document.uuid.as_str(),
            document.id.as_str(),
            document.container.as_ref().map(|c| c.id.as_str()),
            document.container.as_ref().map(|c| c.kind.as_str()),
            document.pack.as_deref(),
            document.data.doc_type.as_str(),
            document.data.name.as_str(),
            serde_json::to_string(&document.data)?,
        ],
    )?;
    Ok(())
}

struct RawRow {
    uuid: String,
    id: String,
    container_id: Option<String>,
    container_kind: Option<String>,
    pack: Option<String>,
    data: String,
}

impl RawRow {
    fn into_document(self) -> StoreResult<Document> {
        let data: DocumentData = serde_json::from_str(&self.data).map_err(|err| {
            StoreError::InvalidData(format!("documents.data for `{}`: {err}", self.uuid))
        })?;
        let container = match (self.container_id, self.container_kind) {
            (Some(id), Some(kind)) => Some(ContainerRef { id, kind }),
            (None, None) => None,
            _ => {
                return Err(StoreError::InvalidData(format!(
                    "partial container reference on `{}`",
                    self.uuid
                )))
            }
        };
        Ok(Document {
            id: self.id,
            uuid: self.uuid,
            container,
            pack: self.pack,
            persisted: true,
            data,
        })
    }
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        uuid: row.get("uuid")?,
        id: row.get("id")?,
        container_id: row.get("container_id")?,
        container_kind: row.get("container_kind")?,
        pack: row.get("pack")?,
        data: row.get("data")?,
    })
}
