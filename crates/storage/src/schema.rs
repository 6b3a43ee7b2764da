use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// `parent` has no foreign key. A dangling parent ends the ancestor walk.
// `name_key` is the Unicode-lowercased name, written by the store.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS looks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid BLOB NOT NULL UNIQUE CHECK (length(uuid) = 16),
    revision_id INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
    name_key TEXT NOT NULL,
    parent INTEGER,
    weight INTEGER NOT NULL DEFAULT 1000000,
    published INTEGER NOT NULL DEFAULT 1,
    owner INTEGER,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    changed_at INTEGER NOT NULL DEFAULT (unixepoch())
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_looks_name_key ON looks (name_key);
CREATE INDEX IF NOT EXISTS idx_looks_parent ON looks (parent, weight, name_key);
CREATE INDEX IF NOT EXISTS idx_looks_order ON looks (weight, name_key);

CREATE TABLE IF NOT EXISTS look_fields (
    look_id INTEGER NOT NULL,
    field_name TEXT NOT NULL,
    value BLOB NOT NULL,
    PRIMARY KEY (look_id, field_name)
);
CREATE INDEX IF NOT EXISTS idx_look_fields_name ON look_fields (field_name, look_id);

CREATE TABLE IF NOT EXISTS look_revisions (
    revision_id INTEGER PRIMARY KEY AUTOINCREMENT,
    look_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    parent INTEGER,
    weight INTEGER NOT NULL,
    published INTEGER NOT NULL,
    fields BLOB NOT NULL,
    author INTEGER,
    log_message TEXT,
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_look_revisions_look ON look_revisions (look_id, revision_id);
CREATE INDEX IF NOT EXISTS idx_look_revisions_author ON look_revisions (author, revision_id);

CREATE TABLE IF NOT EXISTS field_definitions (
    field_name TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    kind TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
);
";
