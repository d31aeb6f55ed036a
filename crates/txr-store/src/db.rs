use rusqlite::Connection;

use crate::error::Result;

/// Initialise the TXR schema in `conn`.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout. Jobs
/// reference their sequence with `ON DELETE CASCADE`, which only takes
/// effect when the connection has `PRAGMA foreign_keys=ON`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS application (
            id          TEXT NOT NULL PRIMARY KEY,
            name        TEXT NOT NULL,
            contact     TEXT NOT NULL DEFAULT '{}',   -- JSON
            traceid     TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_type (
            id          TEXT NOT NULL PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT,
            options     TEXT NOT NULL DEFAULT '{}',   -- JSON, declared option shape
            traceid     TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sequence (
            id          TEXT NOT NULL PRIMARY KEY,
            app_id      TEXT NOT NULL REFERENCES application(id),
            app_name    TEXT NOT NULL,
            description TEXT,
            frequency   TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'INACTIVE',
            traceid     TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job (
            id          TEXT NOT NULL PRIMARY KEY,
            seq_id      TEXT NOT NULL REFERENCES sequence(id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,             -- submission order within the sequence
            \"to\"      TEXT,
            type        TEXT NOT NULL,
            options     TEXT NOT NULL DEFAULT '{}',   -- JSON
            traceid     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_job_seq ON job (seq_id, position);
        CREATE INDEX IF NOT EXISTS idx_sequence_status ON sequence (status);
        ",
    )?;
    Ok(())
}
