use colored::*;
use serde_json::Value;
use sfmemo_core::{ConnectionStatus, SalesforceRecord};
use sfmemo_memory::MemoReadOutcome;
use std::path::Path;

/// One-line label for a record, used in tables and pickers
pub fn format_record(record: &SalesforceRecord) -> String {
    format!("{:<14} {:<20} {}", record.object_type, record.id, record.name)
}

pub fn print_records(records: &[SalesforceRecord]) {
    if records.is_empty() {
        println!("{}", "No matching records.".yellow());
        return;
    }

    println!("{}", format!("{:<14} {:<20} {}", "Type", "Id", "Name").bold());
    for record in records {
        println!("{}", format_record(record));
    }
    println!("{} record(s)", records.len());
}

pub fn print_connection_status(status: &ConnectionStatus) {
    match status {
        ConnectionStatus::Connected => println!("Salesforce: {}", "connected".green().bold()),
        ConnectionStatus::NotAuthenticated => println!(
            "Salesforce: {} (run `sfmemo login`)",
            "not authenticated".yellow().bold()
        ),
        ConnectionStatus::Failed(reason) => {
            println!("Salesforce: {} {}", "connection failed:".red().bold(), reason)
        }
    }
}

/// Title and sync state of a memo, from its parsed document
pub fn memo_summary(original: &Value) -> (String, Option<String>) {
    let title = original
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("(untitled)")
        .to_string();
    let synced_id = original
        .pointer("/syncStatus/sfNoteId")
        .and_then(Value::as_str)
        .map(str::to_string);
    (title, synced_id)
}

pub fn print_memo_line(path: &Path, outcome: &MemoReadOutcome) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match outcome.original() {
        Some(original) => {
            let (title, synced_id) = memo_summary(original);
            let state = match synced_id {
                Some(id) => format!("synced {}", id).green(),
                None => "draft".yellow(),
            };
            println!("{}  {}  [{}]", name.cyan(), title, state);
        }
        None => println!("{}  {}", name.cyan(), outcome.display_text().red()),
    }
}

pub fn print_memo(outcome: &MemoReadOutcome) {
    match outcome {
        MemoReadOutcome::Loaded(memo) => {
            println!("{}", memo.content);
            if !memo.metadata.is_empty() {
                println!();
                println!("{}", "Metadata:".cyan());
                for (key, value) in &memo.metadata {
                    let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                    println!("  {}: {}", key, shown);
                }
            }
            if let Some((_, Some(id))) = outcome.original().map(memo_summary) {
                println!("  {}: {}", "pushed as".green(), id);
            }
        }
        other => println!("{}", other.display_text().red()),
    }
}
