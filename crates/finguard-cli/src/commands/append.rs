//! `finguard append` - append one audit entry.

use anyhow::{Context, Result, bail};
use finguard_core::ledger::AuditLedger;
use finguard_core::record::{AppendRequest, AuditRecord, TriggeredBy};
use finguard_core::store::AuditStore;

/// Parsed arguments of the append subcommand.
pub struct AppendArgs {
    pub subject: String,
    pub action: String,
    pub description: String,
    pub assets: Vec<String>,
    pub triggered_by: TriggeredBy,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub context: Option<String>,
    pub corrects: Option<String>,
}

pub fn run<S: AuditStore>(
    ledger: &AuditLedger<S>,
    args: AppendArgs,
    format: &str,
) -> Result<()> {
    let mut request = AppendRequest::new(
        args.subject,
        args.action,
        args.description,
        args.triggered_by,
    )
    .with_assets(args.assets);

    if let Some(confidence) = args.confidence {
        request = request.with_confidence(confidence);
    }
    if let Some(reasoning) = args.reasoning {
        request = request.with_reasoning(reasoning);
    }
    if let Some(context) = args.context {
        let value: serde_json::Value =
            serde_json::from_str(&context).context("--context is not valid JSON")?;
        match value {
            serde_json::Value::Object(map) => request = request.with_context(map),
            _ => bail!("--context must be a JSON object"),
        }
    }

    let record = match args.corrects {
        Some(corrected_id) => ledger.append_correction(&corrected_id, request)?,
        None => ledger.append(request)?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&record)?),
        _ => print_text(&record),
    }
    Ok(())
}

fn print_text(record: &AuditRecord) {
    println!("appended {}", record.id);
    println!("  subject:   {}", record.subject_id);
    println!("  sequence:  {}", record.sequence_number);
    println!("  action:    {}", record.action_type);
    println!("  hash:      {}", record.content_hash);
    println!("  previous:  {}", record.previous_hash);
}
