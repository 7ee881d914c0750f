//! `finguard stats` - store statistics.

use anyhow::Result;
use finguard_core::ledger::AuditLedger;
use finguard_core::store::AuditStore;

pub fn run<S: AuditStore>(ledger: &AuditLedger<S>, format: &str) -> Result<()> {
    let stats = ledger.store().stats()?;

    if format == "json" {
        println!(
            "{}",
            serde_json::json!({
                "record_count": stats.record_count,
                "subject_count": stats.subject_count,
                "max_sequence_number": stats.max_sequence_number,
                "db_size_bytes": stats.db_size_bytes,
            })
        );
        return Ok(());
    }

    println!("records:       {}", stats.record_count);
    println!("subjects:      {}", stats.subject_count);
    println!("max sequence:  {}", stats.max_sequence_number);
    println!("db size:       {} bytes", stats.db_size_bytes);
    Ok(())
}
