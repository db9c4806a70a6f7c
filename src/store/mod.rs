//! The target relational store.
//!
//! One SQLite connection per run, owned by the transaction coordinator for
//! the duration of the load. Nothing else writes through it.

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if needed) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        info!(path = %path.as_ref().display(), "Opened store");
        Ok(Self { conn })
    }

    /// An in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Applies the schema migration. Safe to re-run; all statements are
    /// IF NOT EXISTS.
    pub fn run_migrations(&self) -> Result<()> {
        info!("Running store migrations...");
        let migration_sql = include_str!("../../migrations/001_create_schema.sql");
        self.conn.execute_batch(migration_sql)?;
        info!("Store migrations completed");
        Ok(())
    }

    /// The single session the coordinator drives the load through.
    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
