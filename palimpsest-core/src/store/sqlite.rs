use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{prefix_end, OrderedStore, WriteBatch, WriteOp};
use crate::error::{ProjectError, Result};

/// Schema version of the entries table layout.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    key BLOB PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID;
";

/// Project file backed by a single SQLite database.
///
/// Uses WAL mode and one transaction per batch, so a crash mid-commit leaves
/// the previous contents intact.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Create a new, empty project file. Fails if `path` already exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(ProjectError::InvalidArgument(format!(
                "{} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let meta = std::fs::metadata(parent).map_err(|e| ProjectError::from_io(e, parent))?;
            if !meta.is_dir() {
                return Err(ProjectError::NotADirectory(parent.to_path_buf()));
            }
        }

        let conn = match initialize(path) {
            Ok(conn) => conn,
            Err(err) => {
                if let Err(cleanup) = Self::remove_files(path) {
                    log::warn!(target: "store", "cannot remove {}: {}", path.display(), cleanup);
                }
                return Err(err);
            }
        };

        log::debug!(target: "store", "created {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing project file.
    pub fn open(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| ProjectError::from_io(e, path))?;
        if meta.is_dir() {
            return Err(ProjectError::InvalidArgument(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let has_schema_version: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get::<_, i64>(0),
        )? > 0;
        if !has_schema_version {
            return Err(ProjectError::InvalidFormat(format!(
                "{} is not a project file",
                path.display()
            )));
        }

        let version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        if version > SCHEMA_VERSION {
            return Err(ProjectError::Unimplemented(format!(
                "project schema version {} is newer than supported ({})",
                version, SCHEMA_VERSION
            )));
        }

        log::debug!(target: "store", "opened {} (schema v{})", path.display(), version);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the project file at `path` with its WAL and shared-memory
    /// files. Files that do not exist are skipped.
    pub fn remove_files(path: &Path) -> Result<()> {
        for file in [path.to_path_buf(), sidecar(path, "-wal"), sidecar(path, "-shm")] {
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ProjectError::from_io(e, &file)),
            }
        }
        Ok(())
    }
}

fn initialize(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        params![SCHEMA_VERSION],
    )?;
    tx.commit()?;
    Ok(conn)
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl OrderedStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(Vec<u8>, Vec<u8>)> {
            Ok((row.get(0)?, row.get(1)?))
        };
        let rows = match prefix_end(prefix) {
            Some(end) => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT key, value FROM entries WHERE key >= ?1 AND key < ?2 ORDER BY key",
                )?;
                let rows = stmt
                    .query_map(params![prefix, end], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare_cached("SELECT key, value FROM entries WHERE key >= ?1 ORDER BY key")?;
                let rows = stmt
                    .query_map(params![prefix], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        let count = batch.len();
        let tx = self.conn.transaction()?;
        {
            let mut put = tx.prepare_cached("INSERT OR REPLACE INTO entries (key, value) VALUES (?1, ?2)")?;
            let mut delete = tx.prepare_cached("DELETE FROM entries WHERE key = ?1")?;
            for (key, op) in batch {
                match op {
                    WriteOp::Put(value) => {
                        put.execute(params![key, value])?;
                    }
                    WriteOp::Delete => {
                        delete.execute(params![key])?;
                    }
                }
            }
        }
        tx.commit()?;
        log::trace!(target: "store", "committed {} writes to {}", count, self.path.display());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let SqliteStore { conn, path } = *self;
        conn.close().map_err(|(_, e)| ProjectError::from(e))?;
        log::debug!(target: "store", "closed {}", path.display());
        Ok(())
    }
}
