use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    // Checkpoint every ~400KB instead of the default ~4MB — keeps WAL files small
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Force-checkpoint any stale WAL data into the main DB on startup.
    // Errors are non-fatal — in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    // Idempotent DDL; v1 databases get missing columns via ALTER TABLE below.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pets (
            id                     TEXT PRIMARY KEY,
            owner_id               TEXT NOT NULL,
            name                   TEXT NOT NULL,
            template_id            TEXT NOT NULL DEFAULT 'unknown',
            personality_prompt     TEXT NOT NULL DEFAULT '',
            traits                 TEXT NOT NULL,
            status                 TEXT NOT NULL,
            last_status_update     INTEGER NOT NULL DEFAULT 0,
            current_destination    TEXT,
            visited_landmarks      TEXT NOT NULL DEFAULT '[]',
            hatch_progress_seconds INTEGER NOT NULL DEFAULT 0,
            heat_buffer_seconds    INTEGER NOT NULL DEFAULT 0,
            last_hatch_update      INTEGER NOT NULL DEFAULT 0,
            frozen_since           INTEGER,
            hatch_answers          TEXT NOT NULL DEFAULT '[]',
            created_at             INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS memories (
            id         TEXT PRIMARY KEY,
            pet_id     TEXT NOT NULL REFERENCES pets(id),
            content    TEXT NOT NULL,
            embedding  TEXT,
            kind       TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS diaries (
            id         TEXT PRIMARY KEY,
            pet_id     TEXT NOT NULL REFERENCES pets(id),
            title      TEXT NOT NULL,
            body       TEXT NOT NULL,
            image_ref  TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pets_owner ON pets(owner_id);
        CREATE INDEX IF NOT EXISTS idx_pets_status_dest ON pets(status, current_destination);
        CREATE INDEX IF NOT EXISTS idx_mem_pet_time ON memories(pet_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_diary_pet_time ON diaries(pet_id, created_at);
        ",
    )?;

    // v1 databases predate the pets.created_at column
    if conn.prepare("SELECT created_at FROM pets LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE pets ADD COLUMN created_at INTEGER NOT NULL DEFAULT 0;")?;
        tracing::info!("migrated pets table to v{SCHEMA_VERSION}");
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &["pets", "memories", "diaries", "metadata"] {
            let count: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert!(count >= 0, "table {table} should exist");
        }
    }

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_idempotent_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap(); // should not error
    }

    #[test]
    fn test_busy_timeout_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);
    }

    #[test]
    fn test_upgrade_v1_adds_created_at() {
        let conn = Connection::open_in_memory().unwrap();

        // Simulate a v1 schema without pets.created_at
        conn.execute_batch(
            "
            CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO metadata (key, value) VALUES ('schema_version', '1');

            CREATE TABLE pets (
                id                     TEXT PRIMARY KEY,
                owner_id               TEXT NOT NULL,
                name                   TEXT NOT NULL,
                template_id            TEXT NOT NULL DEFAULT 'unknown',
                personality_prompt     TEXT NOT NULL DEFAULT '',
                traits                 TEXT NOT NULL,
                status                 TEXT NOT NULL,
                last_status_update     INTEGER NOT NULL DEFAULT 0,
                current_destination    TEXT,
                visited_landmarks      TEXT NOT NULL DEFAULT '[]',
                hatch_progress_seconds INTEGER NOT NULL DEFAULT 0,
                heat_buffer_seconds    INTEGER NOT NULL DEFAULT 0,
                last_hatch_update      INTEGER NOT NULL DEFAULT 0,
                frozen_since           INTEGER,
                hatch_answers          TEXT NOT NULL DEFAULT '[]'
            );

            INSERT INTO pets (id, owner_id, name, traits, status)
            VALUES ('p1', 'u1', 'Egg', '{}', 'egg_claimed');
            ",
        )
        .unwrap();

        initialize(&conn).unwrap();

        let created: i64 = conn
            .query_row("SELECT created_at FROM pets WHERE id = 'p1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(created, 0);
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }
}
