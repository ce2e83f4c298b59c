use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use feyn_core::{
    AssessmentResult, FeynError, FeynResult, KnowledgeRecord, RecordStore, Tag, TagStore,
};

use crate::schema::init_db;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> FeynResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FeynError::Database(format!("cannot create db directory: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| FeynError::Database(format!("cannot open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| FeynError::Database(e.to_string()))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> FeynResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FeynError::Database(format!("cannot open in-memory db: {e}")))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| FeynError::Database(e.to_string()))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<KnowledgeRecord> {
    let questions_json: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
    let questions: Vec<String> = serde_json::from_str(&questions_json).unwrap_or_default();

    let assessment_json: Option<String> = row.get(4)?;
    let assessment: Option<AssessmentResult> = assessment_json
        .as_deref()
        .and_then(|json| serde_json::from_str(json).ok());

    let tags_json: String = row.get::<_, Option<String>>(5)?.unwrap_or_default();
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

    Ok(KnowledgeRecord {
        id: row.get(0)?,
        knowledge: row.get(1)?,
        questions,
        answer: row.get(3)?,
        assessment,
        tags,
        created_at: parse_dt(&row.get::<_, String>(6)?),
        updated_at: parse_dt(&row.get::<_, String>(7)?),
    })
}

const RECORD_COLS: &str = "id, knowledge, questions, answer, assessment, tags, \
                           created_at, updated_at";

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_dt(&row.get::<_, String>(3)?),
    })
}

const TAG_COLS: &str = "id, name, color, created_at";

// ---------------------------------------------------------------------------
// RecordStore impl
// ---------------------------------------------------------------------------

impl RecordStore for SqliteStore {
    fn create(&self, record: KnowledgeRecord) -> FeynResult<String> {
        let questions_json = serde_json::to_string(&record.questions)?;
        let assessment_json = record
            .assessment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tags_json = serde_json::to_string(&record.tags)?;

        self.conn
            .execute(
                "INSERT INTO records (id, knowledge, questions, answer, assessment, tags,
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.knowledge,
                    questions_json,
                    record.answer,
                    assessment_json,
                    tags_json,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FeynError::Database(e.to_string()))?;

        Ok(record.id)
    }

    fn get(&self, id: &str) -> FeynResult<Option<KnowledgeRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLS} FROM records WHERE id = ?1"))
            .map_err(|e| FeynError::Database(e.to_string()))?;

        stmt.query_row(params![id], row_to_record)
            .optional()
            .map_err(|e| FeynError::Database(e.to_string()))
    }

    /// Writes all mutable fields and stamps `updated_at` with the current
    /// time.
    fn update(&self, record: &KnowledgeRecord) -> FeynResult<()> {
        let questions_json = serde_json::to_string(&record.questions)?;
        let assessment_json = record
            .assessment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tags_json = serde_json::to_string(&record.tags)?;

        let changed = self
            .conn
            .execute(
                "UPDATE records SET knowledge = ?2, questions = ?3, answer = ?4,
                 assessment = ?5, tags = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    record.id,
                    record.knowledge,
                    questions_json,
                    record.answer,
                    assessment_json,
                    tags_json,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| FeynError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FeynError::NotFound(record.id.clone()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> FeynResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])
            .map_err(|e| FeynError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FeynError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list(&self, limit: usize) -> FeynResult<Vec<KnowledgeRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {RECORD_COLS} FROM records ORDER BY created_at DESC LIMIT ?1"
            ))
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], row_to_record)
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| FeynError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    /// FTS match first; a LIKE substring scan over knowledge and answer
    /// picks up queries FTS cannot tokenize (e.g. CJK fragments).
    fn search(&self, query: &str, limit: usize) -> FeynResult<Vec<KnowledgeRecord>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let phrase = format!("\"{}\"", query.replace('"', "\"\""));
        let sql = format!(
            "SELECT {RECORD_COLS} FROM records
             WHERE id IN (
                 SELECT id FROM records_fts WHERE records_fts MATCH ?1
             )
             ORDER BY created_at DESC
             LIMIT ?2"
        );

        let mut results = Vec::new();
        let fts = self
            .conn
            .prepare(&sql)
            .and_then(|mut stmt| {
                let rows = stmt.query_map(params![phrase, limit], row_to_record)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| FeynError::Database(e.to_string()))?;
        results.extend(fts);

        if results.is_empty() {
            let pattern = format!("%{query}%");
            let sql = format!(
                "SELECT {RECORD_COLS} FROM records
                 WHERE knowledge LIKE ?1 OR answer LIKE ?1
                 ORDER BY created_at DESC
                 LIMIT ?2"
            );
            let like = self
                .conn
                .prepare(&sql)
                .and_then(|mut stmt| {
                    let rows = stmt.query_map(params![pattern, limit], row_to_record)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                })
                .map_err(|e| FeynError::Database(e.to_string()))?;
            results.extend(like);
        }

        Ok(results)
    }

    fn clear(&self) -> FeynResult<usize> {
        self.conn
            .execute("DELETE FROM records", [])
            .map_err(|e| FeynError::Database(e.to_string()))
    }

    fn count(&self) -> FeynResult<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| {
                row.get::<_, usize>(0)
            })
            .map_err(|e| FeynError::Database(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TagStore impl
// ---------------------------------------------------------------------------

impl TagStore for SqliteStore {
    fn create_tag(&self, tag: Tag) -> FeynResult<String> {
        self.conn
            .execute(
                "INSERT INTO tags (id, name, color, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![tag.id, tag.name, tag.color, tag.created_at.to_rfc3339()],
            )
            .map_err(|e| FeynError::Database(e.to_string()))?;
        Ok(tag.id)
    }

    fn get_tag(&self, id: &str) -> FeynResult<Option<Tag>> {
        self.conn
            .prepare(&format!("SELECT {TAG_COLS} FROM tags WHERE id = ?1"))
            .map_err(|e| FeynError::Database(e.to_string()))?
            .query_row(params![id], row_to_tag)
            .optional()
            .map_err(|e| FeynError::Database(e.to_string()))
    }

    fn find_tag_by_name(&self, name: &str) -> FeynResult<Option<Tag>> {
        self.conn
            .prepare(&format!("SELECT {TAG_COLS} FROM tags WHERE name = ?1"))
            .map_err(|e| FeynError::Database(e.to_string()))?
            .query_row(params![name.trim()], row_to_tag)
            .optional()
            .map_err(|e| FeynError::Database(e.to_string()))
    }

    fn list_tags(&self) -> FeynResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TAG_COLS} FROM tags ORDER BY name"))
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], row_to_tag)
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| FeynError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    fn update_tag(&self, tag: &Tag) -> FeynResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tags SET name = ?2, color = ?3 WHERE id = ?1",
                params![tag.id, tag.name, tag.color],
            )
            .map_err(|e| FeynError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FeynError::NotFound(tag.id.clone()));
        }
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> FeynResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1", params![id])
            .map_err(|e| FeynError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FeynError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_tags_by_ids(&self, ids: &[String]) -> FeynResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {TAG_COLS} FROM tags WHERE id IN ({}) ORDER BY name",
            placeholders.join(", ")
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_tag)
            .map_err(|e| FeynError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| FeynError::Database(e.to_string()))?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// IndexStore impl (kv table)
// ---------------------------------------------------------------------------

// The trait stays out of this file's scope so `get` does not collide with
// `RecordStore::get` during method resolution.
impl feyn_core::IndexStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                warn!("kv read failed for {key}: {e}");
                None
            })
    }

    fn set(&self, key: &str, value: &str) -> FeynResult<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| FeynError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> FeynResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| FeynError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feyn_core::AssessmentResult;

    fn test_store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn make_record(knowledge: &str) -> KnowledgeRecord {
        KnowledgeRecord::new(knowledge.to_string())
    }

    fn make_assessment() -> AssessmentResult {
        AssessmentResult {
            clarity: 8,
            logic: 7,
            completeness: 9,
            terminology: 3,
            overall: 8,
            terminology_list: Vec::new(),
            suggestions: vec!["多举例子".into()],
            assessed_at: Utc::now(),
            reference_answer: Some("参考讲解".into()),
        }
    }

    #[test]
    fn test_record_crud() {
        let store = test_store();
        let mut record = make_record("HTTP 协议");
        record.questions = vec!["这是什么？".into()];
        record.answer = "一种约定".into();
        record.assessment = Some(make_assessment());
        let id = store.create(record).unwrap();

        let loaded = store.get(&id).unwrap().unwrap();
        assert_eq!(loaded.knowledge, "HTTP 协议");
        assert_eq!(loaded.questions, vec!["这是什么？"]);
        let assessment = loaded.assessment.unwrap();
        assert_eq!(assessment.overall, 8);
        assert_eq!(assessment.reference_answer.as_deref(), Some("参考讲解"));

        store.delete(&id).unwrap();
        assert!(store.get(&id).unwrap().is_none());
    }

    #[test]
    fn test_update_replaces_fields() {
        let store = test_store();
        let record = make_record("DNS");
        let id = store.create(record).unwrap();

        let mut loaded = store.get(&id).unwrap().unwrap();
        loaded.answer = "把名字换成地址".into();
        loaded.assessment = Some(make_assessment());
        store.update(&loaded).unwrap();

        let reloaded = store.get(&id).unwrap().unwrap();
        assert_eq!(reloaded.answer, "把名字换成地址");
        assert!(reloaded.assessment.is_some());
        assert!(reloaded.updated_at >= loaded.updated_at);
    }

    #[test]
    fn test_update_missing_record() {
        let store = test_store();
        let record = make_record("ghost");
        assert!(matches!(
            store.update(&record),
            Err(FeynError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_missing_record() {
        let store = test_store();
        assert!(matches!(
            store.delete("no-such-id"),
            Err(FeynError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let store = test_store();

        let mut old = make_record("older");
        old.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut new = make_record("newer");
        new.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        store.create(old).unwrap();
        store.create(new).unwrap();

        let records = store.list(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].knowledge, "newer");
        assert_eq!(records[1].knowledge, "older");

        assert_eq!(store.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_fts() {
        let store = test_store();
        let mut record = make_record("TCP handshake");
        record.answer = "three way greeting".into();
        store.create(record).unwrap();
        store.create(make_record("unrelated topic")).unwrap();

        let hits = store.search("handshake", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].knowledge, "TCP handshake");

        let hits = store.search("greeting", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_like_fallback_for_cjk() {
        let store = test_store();
        store.create(make_record("超文本传输协议")).unwrap();

        let hits = store.search("传输", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].knowledge, "超文本传输协议");
    }

    #[test]
    fn test_search_empty_query() {
        let store = test_store();
        store.create(make_record("anything")).unwrap();
        assert!(store.search("  ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_clear_returns_count() {
        let store = test_store();
        store.create(make_record("a")).unwrap();
        store.create(make_record("b")).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }

    // === TagStore tests ===

    #[test]
    fn test_tag_crud() {
        let store = test_store();
        let tag = Tag::with_color("networking", Some("#3355ff".into()));
        let id = store.create_tag(tag).unwrap();

        let loaded = store.get_tag(&id).unwrap().unwrap();
        assert_eq!(loaded.name, "networking");
        assert_eq!(loaded.color.as_deref(), Some("#3355ff"));

        let by_name = store.find_tag_by_name("networking").unwrap().unwrap();
        assert_eq!(by_name.id, id);

        store.delete_tag(&id).unwrap();
        assert!(store.get_tag(&id).unwrap().is_none());
    }

    #[test]
    fn test_tag_unique_name() {
        let store = test_store();
        store.create_tag(Tag::new("dup")).unwrap();
        assert!(store.create_tag(Tag::new("dup")).is_err());
    }

    #[test]
    fn test_list_tags_sorted() {
        let store = test_store();
        store.create_tag(Tag::new("beta")).unwrap();
        store.create_tag(Tag::new("alpha")).unwrap();

        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "alpha");
        assert_eq!(tags[1].name, "beta");
    }

    #[test]
    fn test_get_tags_by_ids() {
        let store = test_store();
        let a = store.create_tag(Tag::new("a")).unwrap();
        let _b = store.create_tag(Tag::new("b")).unwrap();
        let c = store.create_tag(Tag::new("c")).unwrap();

        let tags = store
            .get_tags_by_ids(&[a.clone(), c.clone()])
            .unwrap();
        assert_eq!(tags.len(), 2);

        assert!(store.get_tags_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_rename_tag() {
        let store = test_store();
        let id = store.create_tag(Tag::new("old-name")).unwrap();
        let mut tag = store.get_tag(&id).unwrap().unwrap();
        tag.name = "new-name".into();
        store.update_tag(&tag).unwrap();

        assert!(store.find_tag_by_name("old-name").unwrap().is_none());
        assert!(store.find_tag_by_name("new-name").unwrap().is_some());
    }

    // === IndexStore tests ===

    #[test]
    fn test_kv_roundtrip() {
        use feyn_core::IndexStore;

        let store = test_store();
        assert!(IndexStore::get(&store, "model_index").is_none());

        store.set("model_index", "2").unwrap();
        assert_eq!(IndexStore::get(&store, "model_index").as_deref(), Some("2"));

        store.set("model_index", "4").unwrap();
        assert_eq!(IndexStore::get(&store, "model_index").as_deref(), Some("4"));

        store.remove("model_index").unwrap();
        assert!(IndexStore::get(&store, "model_index").is_none());
    }

    #[test]
    fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("records.db");

        let store = SqliteStore::new(&path).unwrap();
        let id = store.create(make_record("persisted")).unwrap();
        drop(store);

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap().knowledge, "persisted");
    }
}
