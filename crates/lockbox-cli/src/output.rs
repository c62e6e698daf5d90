//! Output formatting.

use crate::commands::OutputFormat;
use lockbox_service::{AccessCodeView, CommandOutcome, SweepReport};
use lockbox_storage::models::{LockActivity, Page, SmartLock};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "message": message })),
        OutputFormat::Table => println!("{}", message),
    }
}

pub fn print_lock(lock: &SmartLock, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(lock),
        OutputFormat::Table => {
            println!("Lock {} ({})", lock.id, lock.name);
            println!("  Provider:  {} / {}", lock.provider.display_name(), lock.provider_lock_id);
            println!("  Status:    {}", lock.status);
            if let Some(level) = lock.battery_level {
                println!("  Battery:   {}%", level);
            }
            if let Some(at) = lock.last_synced_at {
                println!("  Synced:    {}", at.to_rfc3339());
            }
            if let Some(error) = &lock.error_message {
                println!("  Error:     {}", error);
            }
            if lock.is_local_only() {
                println!("  Mode:      local only");
            }
        }
    }
}

pub fn print_codes(codes: &[AccessCodeView], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(codes),
        OutputFormat::Table => {
            println!(
                "{:>6}  {:<12}  {:<10}  {:<8}  {:<25}  {:<25}  {}",
                "ID", "CODE", "TYPE", "STATUS", "FROM", "UNTIL", "USES"
            );
            for code in codes {
                let until = code
                    .valid_until
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                let uses = match code.max_uses {
                    Some(max) => format!("{}/{}", code.uses_count, max),
                    None => code.uses_count.to_string(),
                };
                let status = if code.provider_rejected {
                    format!("{}!", code.status)
                } else {
                    code.status.to_string()
                };
                println!(
                    "{:>6}  {:<12}  {:<10}  {:<8}  {:<25}  {:<25}  {}",
                    code.id,
                    code.code,
                    code.code_type,
                    status,
                    code.valid_from.to_rfc3339(),
                    until,
                    uses
                );
            }
        }
    }
}

pub fn print_activity(page: &Page<LockActivity>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(page),
        OutputFormat::Table => {
            for entry in &page.items {
                let code = entry
                    .access_code_id
                    .map(|id| format!(" code={id}"))
                    .unwrap_or_default();
                println!(
                    "{}  {:<13}{}  {}",
                    entry.occurred_at.to_rfc3339(),
                    entry.event_type,
                    code,
                    entry.metadata.0
                );
            }
            println!(
                "-- {} of {} entries{}",
                page.items.len(),
                page.total,
                if page.has_more() { ", more available" } else { "" }
            );
        }
    }
}

pub fn print_outcome(outcome: &CommandOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => {
            let mark = if outcome.success { "ok" } else { "FAILED" };
            println!("[{}] {} ({})", mark, outcome.message, outcome.status);
        }
    }
}

pub fn print_sweep(report: &SweepReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            println!("Expired:   {}", report.expired);
            println!(
                "Resynced:  {} of {} ({} failed)",
                report.resync.activated, report.resync.attempted, report.resync.failed
            );
        }
    }
}
