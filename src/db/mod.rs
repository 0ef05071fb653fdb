pub mod migrations;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// Opens the booking database and brings its schema up to date.
/// `":memory:"` gives a private, throwaway database.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("failed to open database at {path}"))?;

    // Reviews and notifications reference bookings; enforce it.
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
