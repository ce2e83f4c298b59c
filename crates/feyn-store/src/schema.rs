//! Schema creation and versioned migration.
//!
//! The schema version lives in `PRAGMA user_version`. A fresh database gets
//! the current schema in one shot; an existing database is walked through
//! the numbered migrations below. Version 2 added tag support: v1 records
//! carried no `tags` column and there was no `tags` table.

use rusqlite::Connection;

use feyn_core::FeynError;

pub const SCHEMA_VERSION: i64 = 2;

pub fn init_db(conn: &Connection) -> Result<(), FeynError> {
    let version = schema_version(conn)?;

    if version == 0 {
        create_current_schema(conn)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    init_fts(conn)?;
    set_schema_version(conn, SCHEMA_VERSION)
}

fn schema_version(conn: &Connection) -> Result<i64, FeynError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| FeynError::Database(e.to_string()))
}

fn set_schema_version(conn: &Connection, version: i64) -> Result<(), FeynError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))
        .map_err(|e| FeynError::Database(e.to_string()))
}

fn create_current_schema(conn: &Connection) -> Result<(), FeynError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            knowledge TEXT NOT NULL,
            questions TEXT NOT NULL DEFAULT '[]', -- JSON array
            answer TEXT NOT NULL DEFAULT '',
            assessment TEXT, -- JSON, null until assessed
            tags TEXT NOT NULL DEFAULT '[]', -- JSON array of tag ids
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_created ON records(created_at);

        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            color TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);

        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| FeynError::Database(e.to_string()))
}

fn migrate(conn: &Connection, from: i64) -> Result<(), FeynError> {
    if from < 2 {
        // v1 -> v2: tag support. Existing records get an empty tag list;
        // NULL question lists from early writes are normalized to '[]'.
        let has_tags: bool = conn
            .prepare("SELECT COUNT(*) FROM pragma_table_info('records') WHERE name='tags'")
            .and_then(|mut s| s.query_row([], |row| row.get(0)))
            .map_err(|e| FeynError::Database(e.to_string()))?;

        if !has_tags {
            conn.execute_batch("ALTER TABLE records ADD COLUMN tags TEXT NOT NULL DEFAULT '[]'")
                .map_err(|e| FeynError::Database(e.to_string()))?;
        }

        conn.execute_batch(
            "
            UPDATE records SET questions = '[]'
                WHERE questions IS NULL OR questions = '';
            UPDATE records SET tags = '[]' WHERE tags IS NULL OR tags = '';

            CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                color TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
            ",
        )
        .map_err(|e| FeynError::Database(e.to_string()))?;
    }

    Ok(())
}

fn init_fts(conn: &Connection) -> Result<(), FeynError> {
    let fts_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='records_fts'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| FeynError::Database(e.to_string()))?;

    if !fts_exists {
        conn.execute_batch(
            "
            CREATE VIRTUAL TABLE records_fts USING fts5(
                id,
                knowledge,
                answer,
                content='records',
                content_rowid='rowid'
            );

            CREATE TRIGGER records_ai AFTER INSERT ON records BEGIN
                INSERT INTO records_fts(rowid, id, knowledge, answer)
                VALUES (new.rowid, new.id, new.knowledge, new.answer);
            END;

            CREATE TRIGGER records_ad AFTER DELETE ON records BEGIN
                INSERT INTO records_fts(records_fts, rowid, id, knowledge, answer)
                VALUES('delete', old.rowid, old.id, old.knowledge, old.answer);
            END;

            CREATE TRIGGER records_au AFTER UPDATE ON records BEGIN
                INSERT INTO records_fts(records_fts, rowid, id, knowledge, answer)
                VALUES('delete', old.rowid, old.id, old.knowledge, old.answer);
                INSERT INTO records_fts(rowid, id, knowledge, answer)
                VALUES (new.rowid, new.id, new.knowledge, new.answer);
            END;
            ",
        )
        .map_err(|e| FeynError::Database(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_fresh_db_gets_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };

        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"kv".to_string()));
        assert!(tables.contains(&"records_fts".to_string()));
    }

    #[test]
    fn test_migration_from_v1_adds_tags() {
        let conn = Connection::open_in_memory().unwrap();

        // hand-build a v1 database: no tags column, no tags table
        conn.execute_batch(
            "
            CREATE TABLE records (
                id TEXT PRIMARY KEY,
                knowledge TEXT NOT NULL,
                questions TEXT,
                answer TEXT NOT NULL DEFAULT '',
                assessment TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE kv (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO records (id, knowledge, questions, answer, created_at, updated_at)
                VALUES ('r1', 'HTTP', NULL, '', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z');
            PRAGMA user_version = 1;
            ",
        )
        .unwrap();

        init_db(&conn).unwrap();

        let (tags, questions): (String, String) = conn
            .query_row(
                "SELECT tags, questions FROM records WHERE id = 'r1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(tags, "[]");
        assert_eq!(questions, "[]");

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
