//! SQLite fact store.
//!
//! RULE: Only the store talks to the database.
//! The aggregator and the engine call store methods — they never
//! execute SQL directly.

use rusqlite::Connection;

use crate::error::MetricsResult;

mod facts;
mod pass_log;
mod rollup;

pub use pass_log::PassLogEntry;

pub struct FactStore {
    conn: Connection,
}

impl FactStore {
    pub fn open(path: &str) -> MetricsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MetricsResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> MetricsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_facts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_pass_log.sql"))?;
        Ok(())
    }

    /// In-memory store with the schema applied.
    pub fn in_memory_migrated() -> MetricsResult<Self> {
        let store = Self::in_memory()?;
        store.migrate()?;
        Ok(store)
    }
}
