//! `SQLite`-backed audit store.
//!
//! Uses WAL mode so history reads and chain verification can proceed while
//! an append is in flight. Records are stored one row each; `affected_assets`
//! and `extra_context` are JSON columns.

// SQLite returns i64 for row counts; they're always non-negative here.
// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_panics_doc
)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::DateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};

use super::{AuditStore, PersistenceError, StoreStats};
use crate::record::{AuditRecord, TriggeredBy};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "id, subject_id, sequence_number, timestamp_us, action_type, \
                              description, affected_assets, triggered_by, confidence, reasoning, \
                              extra_context, content_hash, previous_hash";

/// The append-only audit store backed by `SQLite`.
pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
    #[allow(dead_code)]
    path: Option<PathBuf>,
}

impl SqliteAuditStore {
    /// Opens or creates a store at the specified path.
    ///
    /// The schema is applied on open; WAL mode is enabled for concurrent
    /// reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Applies schema and pragmas to a fresh connection.
    fn initialize_connection(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Sets the busy timeout for lock contention on the database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be applied.
    pub fn set_busy_timeout(&self, timeout_ms: u64) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.busy_timeout(std::time::Duration::from_millis(timeout_ms))?;
        Ok(())
    }
}

/// Maps one `audit_records` row to an [`AuditRecord`].
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let timestamp_us: i64 = row.get(3)?;
    let timestamp = DateTime::from_timestamp_micros(timestamp_us).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(3, timestamp_us)
    })?;

    let assets_json: String = row.get(6)?;
    let affected_assets: Vec<String> = serde_json::from_str(&assets_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let triggered_by: String = row.get(7)?;
    let triggered_by: TriggeredBy = triggered_by
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    let context_json: Option<String> = row.get(10)?;
    let extra_context = context_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(AuditRecord {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        sequence_number: row.get::<_, i64>(2)? as u64,
        timestamp,
        action_type: row.get(4)?,
        description: row.get(5)?,
        affected_assets,
        triggered_by,
        confidence: row.get(8)?,
        reasoning: row.get(9)?,
        extra_context,
        content_hash: row.get(11)?,
        previous_hash: row.get(12)?,
    })
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<(), PersistenceError> {
        let assets_json = serde_json::to_string(&record.affected_assets)?;
        let context_json = record
            .extra_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO audit_records (id, subject_id, sequence_number, timestamp_us, \
             action_type, description, affected_assets, triggered_by, confidence, reasoning, \
             extra_context, content_hash, previous_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id,
                record.subject_id,
                record.sequence_number as i64,
                record.timestamp.timestamp_micros(),
                record.action_type,
                record.description,
                assets_json,
                record.triggered_by.as_str(),
                record.confidence,
                record.reasoning,
                context_json,
                record.content_hash,
                record.previous_hash,
            ],
        )?;

        Ok(())
    }

    fn latest(&self, subject_id: &str) -> Result<Option<AuditRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM audit_records
             WHERE subject_id = ?1
             ORDER BY sequence_number DESC
             LIMIT 1"
        ))?;

        let record = stmt
            .query_row(params![subject_id], row_to_record)
            .optional()?;

        Ok(record)
    }

    fn read_chain(&self, subject_id: &str) -> Result<Vec<AuditRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM audit_records
             WHERE subject_id = ?1
             ORDER BY sequence_number ASC"
        ))?;

        let records = stmt
            .query_map(params![subject_id], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn read_recent(
        &self,
        subject_id: &str,
        limit: u64,
        action_type: Option<&str>,
    ) -> Result<Vec<AuditRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let records = if let Some(action_type) = action_type {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM audit_records
                 WHERE subject_id = ?1 AND action_type = ?2
                 ORDER BY timestamp_us DESC, sequence_number DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![subject_id, action_type, limit as i64], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM audit_records
                 WHERE subject_id = ?1
                 ORDER BY timestamp_us DESC, sequence_number DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![subject_id, limit as i64], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(records)
    }

    fn stats(&self) -> Result<StoreStats, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let record_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM audit_records", [], |row| row.get(0))?;

        let subject_count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT subject_id) FROM audit_records",
            [],
            |row| row.get(0),
        )?;

        let max_sequence_number: Option<i64> = conn.query_row(
            "SELECT MAX(sequence_number) FROM audit_records",
            [],
            |row| row.get(0),
        )?;

        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

        Ok(StoreStats {
            record_count: record_count as u64,
            subject_count: subject_count as u64,
            max_sequence_number: max_sequence_number.unwrap_or(0) as u64,
            db_size_bytes: (page_count * page_size) as u64,
        })
    }
}

#[cfg(test)]
mod unit_tests {
    use chrono::{TimeZone, Utc};
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::hash::GENESIS_HASH;

    fn record(subject: &str, seq: u64, ts_us: i64) -> AuditRecord {
        AuditRecord {
            id: format!("{subject}-{seq}"),
            subject_id: subject.to_string(),
            sequence_number: seq,
            timestamp: Utc.timestamp_micros(ts_us).unwrap(),
            action_type: "rebalance".to_string(),
            description: "test entry".to_string(),
            affected_assets: vec!["BTC".to_string(), "ETH".to_string()],
            triggered_by: TriggeredBy::AiAgent,
            confidence: Some(0.9),
            reasoning: Some("drift above threshold".to_string()),
            extra_context: None,
            content_hash: "a".repeat(64),
            previous_hash: GENESIS_HASH.to_string(),
        }
    }

    #[test]
    fn test_insert_and_latest_round_trip() {
        let store = SqliteAuditStore::in_memory().expect("failed to open store");

        let rec = record("user-1", 1, 1_700_000_000_123_456);
        store.insert(&rec).expect("failed to insert");

        let latest = store.latest("user-1").expect("failed to read").unwrap();
        assert_eq!(latest, rec);
    }

    #[test]
    fn test_latest_returns_highest_sequence() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();
        store.insert(&record("user-1", 2, 200)).unwrap();

        let latest = store.latest("user-1").unwrap().unwrap();
        assert_eq!(latest.sequence_number, 2);
    }

    #[test]
    fn test_latest_for_unknown_subject() {
        let store = SqliteAuditStore::in_memory().unwrap();
        assert!(store.latest("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();

        let mut dup = record("user-1", 1, 200);
        dup.id = "other-id".to_string();
        let result = store.insert(&dup);
        assert!(matches!(result, Err(PersistenceError::Database(_))));
    }

    #[test]
    fn test_read_chain_ascending() {
        let store = SqliteAuditStore::in_memory().unwrap();
        // Insert out of order; the chain read must sort by sequence.
        store.insert(&record("user-1", 2, 200)).unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();
        store.insert(&record("user-1", 3, 300)).unwrap();

        let chain = store.read_chain("user-1").unwrap();
        let seqs: Vec<u64> = chain.iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_read_recent_descending_with_limit() {
        let store = SqliteAuditStore::in_memory().unwrap();
        for seq in 1..=5 {
            store.insert(&record("user-1", seq, seq as i64 * 100)).unwrap();
        }

        let recent = store.read_recent("user-1", 2, None).unwrap();
        let seqs: Vec<u64> = recent.iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![5, 4]);
    }

    #[test]
    fn test_read_recent_action_type_filter() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();
        let mut alert = record("user-1", 2, 200);
        alert.action_type = "alert".to_string();
        store.insert(&alert).unwrap();

        let recent = store.read_recent("user-1", 10, Some("alert")).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action_type, "alert");
    }

    #[test]
    fn test_subjects_are_partitioned() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();
        store.insert(&record("user-2", 1, 100)).unwrap();

        assert_eq!(store.read_chain("user-1").unwrap().len(), 1);
        assert_eq!(store.read_chain("user-2").unwrap().len(), 1);
    }

    #[test]
    fn test_extra_context_round_trip() {
        let store = SqliteAuditStore::in_memory().unwrap();

        let mut context = Map::new();
        context.insert("market_condition".to_string(), json!("high_volatility"));
        context.insert("corrects".to_string(), json!("rec-0"));

        let mut rec = record("user-1", 1, 100);
        rec.extra_context = Some(context.clone());
        store.insert(&rec).unwrap();

        let read = store.latest("user-1").unwrap().unwrap();
        assert_eq!(read.extra_context, Some(context));
        assert_eq!(
            read.extra_context.as_ref().unwrap().get("corrects"),
            Some(&Value::String("rec-0".to_string()))
        );
    }

    #[test]
    fn test_stats() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&record("user-1", 1, 100)).unwrap();
        store.insert(&record("user-1", 2, 200)).unwrap();
        store.insert(&record("user-2", 1, 100)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.subject_count, 2);
        assert_eq!(stats.max_sequence_number, 2);
        assert!(stats.db_size_bytes > 0);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("audit.db");

        let store = SqliteAuditStore::open(&path).expect("failed to open store");
        store.insert(&record("user-1", 1, 100)).unwrap();
        drop(store);

        let reopened = SqliteAuditStore::open(&path).expect("failed to reopen store");
        assert_eq!(reopened.read_chain("user-1").unwrap().len(), 1);
    }
}
