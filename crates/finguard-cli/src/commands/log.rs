//! `finguard log` - list a subject's history, most recent first.

use anyhow::Result;
use finguard_core::hash::short_hash;
use finguard_core::ledger::AuditLedger;
use finguard_core::store::AuditStore;

pub fn run<S: AuditStore>(
    ledger: &AuditLedger<S>,
    subject: &str,
    limit: u64,
    action_type: Option<&str>,
    format: &str,
) -> Result<()> {
    let records = ledger.read(subject, limit, action_type)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no audit entries for {subject}");
        return Ok(());
    }

    for record in &records {
        let confidence = record
            .confidence
            .map_or_else(String::new, |c| format!("  confidence={c:.2}"));
        println!(
            "#{:<4} {}  {:<14} {:<10} {}{}",
            record.sequence_number,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.action_type,
            record.triggered_by,
            short_hash(&record.content_hash),
            confidence,
        );
        println!("      {}", record.description);
        if !record.affected_assets.is_empty() {
            println!("      assets: {}", record.affected_assets.join(", "));
        }
    }
    Ok(())
}
