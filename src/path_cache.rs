//! SQLite-backed table mapping filesystem paths to entities.
//!
//! Paths are stored relative to the project directory of the storage root
//! they live under, so the same table resolves on every platform. A row whose
//! path is outside every root cannot be stored.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use thiserror::Error;

use crate::config::pipeline::PipelineConfiguration;
use crate::record_store::LinkReference;

#[derive(Debug, Error)]
pub enum PathCacheError {
    #[error("path cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("creating path cache directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{0}` is not under any storage root of this configuration")]
    NoMatchingRoot(PathBuf),

    #[error("root `{0}` from the path cache is not defined in the roots descriptor")]
    UnknownRoot(String),

    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// One mapping to add.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCacheRow {
    pub entity: LinkReference,
    /// Absolute path.
    pub path: PathBuf,
    pub primary: bool,
    pub metadata: Vec<Value>,
}

/// A mapping as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMapping {
    pub entity: LinkReference,
    pub root: String,
    /// `/`-separated, relative to the root's project directory; `/` is the
    /// project directory itself.
    pub relative_path: String,
    pub primary: bool,
    pub metadata: Vec<Value>,
}

/// Open handle on a configuration's path cache.
pub struct PathCache {
    conn: Connection,
    roots: Vec<(String, PathBuf)>,
}

impl PathCache {
    /// Open (creating if needed) the path cache of `pc`.
    pub fn open(pc: &PipelineConfiguration) -> Result<Self, PathCacheError> {
        let db_path = pc.path_cache_location();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS path_cache (
                entity_type TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                entity_name TEXT NOT NULL,
                root TEXT NOT NULL,
                path TEXT NOT NULL,
                primary_entity INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_path_cache_entity ON path_cache(entity_type, entity_id);
            CREATE INDEX IF NOT EXISTS idx_path_cache_path ON path_cache(root, path);
            "#,
        )?;

        // longest project directory first so nested roots win
        let mut roots: Vec<(String, PathBuf)> = pc.project_roots().into_iter().collect();
        roots.sort_by_key(|(_, p)| std::cmp::Reverse(p.components().count()));

        tracing::debug!("opened path cache {}", db_path.display());
        Ok(Self { conn, roots })
    }

    /// Append `rows`. Every path must lie under one of the roots; nothing is
    /// written if any of them does not. Duplicates are not detected.
    pub fn add_mappings(&mut self, rows: &[PathCacheRow]) -> Result<(), PathCacheError> {
        let mut resolved = Vec::with_capacity(rows.len());
        for row in rows {
            let (root, rel) = self.split_path(&row.path)?;
            resolved.push((row, root, rel, serde_json::to_string(&row.metadata)?));
        }

        let tx = self.conn.transaction()?;
        for (row, root, rel, metadata) in &resolved {
            tx.execute(
                "INSERT INTO path_cache (entity_type, entity_id, entity_name, root, path, primary_entity, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.entity.entity_type,
                    row.entity.id,
                    row.entity.name,
                    root,
                    rel,
                    row.primary,
                    metadata
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Absolute paths recorded for an entity, in insertion order.
    pub fn mappings_for_entity(&self, entity_type: &str, id: i64) -> Result<Vec<PathBuf>, PathCacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT root, path FROM path_cache WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY rowid",
        )?;
        let pairs = stmt
            .query_map(params![entity_type, id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        pairs
            .into_iter()
            .map(|(root, rel)| self.absolute(&root, &rel))
            .collect()
    }

    /// Entity recorded for an absolute path, if any.
    pub fn entity_for_path(&self, path: &Path) -> Result<Option<LinkReference>, PathCacheError> {
        let (root, rel) = match self.split_path(path) {
            Ok(split) => split,
            Err(PathCacheError::NoMatchingRoot(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let link = self
            .conn
            .query_row(
                "SELECT entity_type, entity_id, entity_name FROM path_cache WHERE root = ?1 AND path = ?2 ORDER BY rowid LIMIT 1",
                params![root, rel],
                |row| {
                    Ok(LinkReference {
                        entity_type: row.get(0)?,
                        id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(link)
    }

    /// Every stored row, in insertion order.
    pub fn rows(&self) -> Result<Vec<StoredMapping>, PathCacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_type, entity_id, entity_name, root, path, primary_entity, metadata
             FROM path_cache ORDER BY rowid",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    LinkReference {
                        entity_type: row.get(0)?,
                        id: row.get(1)?,
                        name: row.get(2)?,
                    },
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(entity, root, relative_path, primary, metadata)| {
                Ok(StoredMapping {
                    entity,
                    root,
                    relative_path,
                    primary,
                    metadata: serde_json::from_str(&metadata)?,
                })
            })
            .collect()
    }

    /// Close the database handle now instead of at drop, so the file can be
    /// moved or deleted right after.
    pub fn close(self) -> Result<(), PathCacheError> {
        self.conn.close().map_err(|(_, e)| PathCacheError::Sqlite(e))
    }

    fn split_path(&self, path: &Path) -> Result<(String, String), PathCacheError> {
        for (name, project_dir) in &self.roots {
            if let Ok(rel) = path.strip_prefix(project_dir) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                return Ok((name.clone(), format!("/{}", parts.join("/"))));
            }
        }
        Err(PathCacheError::NoMatchingRoot(path.to_path_buf()))
    }

    fn absolute(&self, root: &str, rel: &str) -> Result<PathBuf, PathCacheError> {
        let (_, project_dir) = self
            .roots
            .iter()
            .find(|(name, _)| name == root)
            .ok_or_else(|| PathCacheError::UnknownRoot(root.to_string()))?;
        Ok(rel
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(project_dir.clone(), |acc, part| acc.join(part)))
    }
}
