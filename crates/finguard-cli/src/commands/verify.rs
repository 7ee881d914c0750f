//! `finguard verify` - verify a subject's hash chain.

use anyhow::Result;
use finguard_core::ledger::AuditLedger;
use finguard_core::store::AuditStore;

/// Runs verification and returns whether the chain is valid.
pub fn run<S: AuditStore>(ledger: &AuditLedger<S>, subject: &str, format: &str) -> Result<bool> {
    let report = ledger.verify(subject)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.valid);
    }

    if report.valid {
        println!(
            "chain OK: {} record(s) verified for {subject}",
            report.total_records
        );
    } else {
        println!(
            "chain BROKEN: {}/{} record(s) clean for {subject}",
            report.verified_records, report.total_records
        );
        for issue in &report.issues {
            println!(
                "  [{}] record {} (seq {}): {}",
                issue.kind.as_str(),
                issue.record_id,
                issue.sequence_number,
                issue.detail
            );
        }
    }
    Ok(report.valid)
}
