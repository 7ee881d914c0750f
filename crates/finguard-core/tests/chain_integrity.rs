//! End-to-end chain integrity tests over the on-disk store.
//!
//! Tampering is driven through a second `SQLite` connection, the way a
//! direct storage edit would happen, so the verifier is exercised against
//! exactly what the ledger persists.

use finguard_core::ledger::AuditLedger;
use finguard_core::record::{AppendRequest, TriggeredBy};
use finguard_core::store::{AuditStore, SqliteAuditStore};
use finguard_core::verify::IssueKind;
use finguard_core::GENESIS_HASH;
use rusqlite::{Connection, params};
use tempfile::TempDir;

fn temp_ledger() -> (AuditLedger<SqliteAuditStore>, std::path::PathBuf, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("audit.db");
    let store = SqliteAuditStore::open(&path).expect("failed to open store");
    (AuditLedger::new(store), path, dir)
}

/// Appends the three-record history used throughout: a rebalance, a trade,
/// and an alert.
fn append_sample_chain(ledger: &AuditLedger<SqliteAuditStore>, subject: &str) {
    ledger
        .append(
            AppendRequest::new(
                subject,
                "rebalance",
                "AI-recommended rebalancing to reduce crypto exposure",
                TriggeredBy::AiAgent,
            )
            .with_assets(["BTC", "ETH", "AAPL"])
            .with_confidence(0.94)
            .with_reasoning("Bitcoin volatility increased by 32% over 7 days"),
        )
        .expect("append failed");

    ledger
        .append(
            AppendRequest::new(subject, "trade", "Executed SELL 0.42 BTC", TriggeredBy::User)
                .with_assets(["BTC"]),
        )
        .expect("append failed");

    ledger
        .append(
            AppendRequest::new(
                subject,
                "alert",
                "Portfolio drift above 2.5% threshold",
                TriggeredBy::Scheduled,
            )
            .with_confidence(0.60),
        )
        .expect("append failed");
}

#[test]
fn sequence_numbers_are_gapless_from_one() {
    let (ledger, _path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    let chain = ledger.store().read_chain("user-1").unwrap();
    let seqs: Vec<u64> = chain.iter().map(|r| r.sequence_number).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn records_link_through_content_hashes() {
    let (ledger, _path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    let chain = ledger.store().read_chain("user-1").unwrap();
    assert_eq!(chain[0].previous_hash, GENESIS_HASH);
    assert_eq!(chain[1].previous_hash, chain[0].content_hash);
    assert_eq!(chain[2].previous_hash, chain[1].content_hash);
}

#[test]
fn intact_chain_verifies_clean() {
    let (ledger, _path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    let report = ledger.verify("user-1").unwrap();
    assert!(report.valid);
    assert_eq!(report.total_records, 3);
    assert_eq!(report.verified_records, 3);
    assert!(report.issues.is_empty());
}

#[test]
fn empty_chain_is_valid() {
    let (ledger, _path, _dir) = temp_ledger();

    let report = ledger.verify("nobody").unwrap();
    assert!(report.valid);
    assert_eq!(report.total_records, 0);
    assert_eq!(report.verified_records, 0);
    assert!(report.issues.is_empty());
}

#[test]
fn chains_are_independent_across_subjects() {
    let (ledger, path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-a");
    append_sample_chain(&ledger, "user-b");

    let b_before = ledger.store().read_chain("user-b").unwrap();

    // More activity and even tampering on user-a must not affect user-b.
    ledger
        .append(AppendRequest::new("user-a", "alert", "noise", TriggeredBy::System))
        .unwrap();
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE audit_records SET description = 'doctored' \
         WHERE subject_id = 'user-a' AND sequence_number = 1",
        [],
    )
    .unwrap();

    let b_after = ledger.store().read_chain("user-b").unwrap();
    assert_eq!(b_before, b_after);

    let report_b = ledger.verify("user-b").unwrap();
    assert!(report_b.valid);
    assert!(!ledger.verify("user-a").unwrap().valid);
}

#[test]
fn tampered_description_is_detected() {
    let (ledger, path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    // Alter record 2's description directly in storage.
    let conn = Connection::open(&path).unwrap();
    let changed = conn
        .execute(
            "UPDATE audit_records SET description = 'Executed SELL 42 BTC' \
             WHERE subject_id = 'user-1' AND sequence_number = 2",
            [],
        )
        .unwrap();
    assert_eq!(changed, 1);

    let report = ledger.verify("user-1").unwrap();
    assert!(!report.valid);

    // Record 2 no longer matches its own hash.
    let mismatches: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::HashMismatch)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].sequence_number, 2);

    // No other kind of damage is reported: record 3 still points at record
    // 2's stored hash, which was not changed.
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.verified_records, 2);
}

#[test]
fn rehashed_tamper_breaks_the_chain_downstream() {
    let (ledger, path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    // A smarter attacker also rewrites record 2's stored hash. The
    // planted hash cannot match the recomputed one, and record 3's
    // declared predecessor no longer matches either.
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE audit_records SET description = 'doctored', content_hash = ?1 \
         WHERE subject_id = 'user-1' AND sequence_number = 2",
        params!["f".repeat(64)],
    )
    .unwrap();

    let report = ledger.verify("user-1").unwrap();
    assert!(!report.valid);

    let kinds: Vec<(u64, IssueKind)> = report
        .issues
        .iter()
        .map(|i| (i.sequence_number, i.kind))
        .collect();
    assert!(kinds.contains(&(2, IssueKind::HashMismatch)));
    assert!(kinds.contains(&(3, IssueKind::ChainBreak)));
}

#[test]
fn deleted_record_is_detected() {
    let (ledger, path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "DELETE FROM audit_records WHERE subject_id = 'user-1' AND sequence_number = 2",
        [],
    )
    .unwrap();

    let report = ledger.verify("user-1").unwrap();
    assert!(!report.valid);

    let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&IssueKind::SequenceGap));
    assert!(kinds.contains(&IssueKind::ChainBreak));
}

#[test]
fn tampered_confidence_is_outside_the_committed_set() {
    let (ledger, path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    // confidence is not part of the hashed field set, so editing it is
    // invisible to the hash checks. This test pins that boundary.
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE audit_records SET confidence = 0.11 \
         WHERE subject_id = 'user-1' AND sequence_number = 1",
        [],
    )
    .unwrap();

    let report = ledger.verify("user-1").unwrap();
    assert!(report.valid);
}

#[test]
fn verification_does_not_mutate_the_chain() {
    let (ledger, _path, _dir) = temp_ledger();
    append_sample_chain(&ledger, "user-1");

    let before = ledger.store().read_chain("user-1").unwrap();
    let _ = ledger.verify("user-1").unwrap();
    let _ = ledger.verify("user-1").unwrap();
    let after = ledger.store().read_chain("user-1").unwrap();

    assert_eq!(before, after);
}

#[test]
fn append_resumes_cleanly_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.db");

    {
        let ledger = AuditLedger::new(SqliteAuditStore::open(&path).unwrap());
        append_sample_chain(&ledger, "user-1");
    }

    let ledger = AuditLedger::new(SqliteAuditStore::open(&path).unwrap());
    let record = ledger
        .append(AppendRequest::new("user-1", "alert", "post-restart", TriggeredBy::System))
        .unwrap();

    assert_eq!(record.sequence_number, 4);
    assert!(ledger.verify("user-1").unwrap().valid);
}
