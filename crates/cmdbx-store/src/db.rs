//! Database connection management

use crate::errors::{from_rusqlite, io_error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path, creating parent directories
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("open_store", e))?;
    }
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection with the settings every backend expects
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(from_rusqlite)?;

    // WAL lets readers proceed alongside the single writer; the pragma
    // returns a row, so it cannot go through execute
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(from_rusqlite)?;

    Ok(())
}
