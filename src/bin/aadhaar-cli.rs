#![forbid(unsafe_code)]
//! Interactive terminal session against an in-process ledger

use aadhaarchain::history::HistoryQuery;
use aadhaarchain::service::{VerificationOutcome, VerificationService};
use aadhaarchain::transaction::{normalize_subject_id, TransactionRecord};
use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

const TRANSACTION_TYPES: [&str; 4] = ["AUTH", "UPDATE", "KYC", "ESIGN"];

#[derive(Parser, Debug)]
#[command(name = "aadhaar-cli", about = "Verify Aadhaar transactions from the terminal")]
struct Args {
    /// Leading zero hex characters required of each sealed block
    #[arg(short, long, default_value_t = 2)]
    difficulty: usize,
}

fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label.bright_cyan());
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask until the input normalizes to a 12-digit Aadhaar number.
fn read_subject_id() -> io::Result<Option<String>> {
    loop {
        let Some(input) = prompt("Enter your Aadhaar number (q to quit): ")? else {
            return Ok(None);
        };
        if input.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match normalize_subject_id(&input) {
            Ok(subject_id) => {
                println!("{} {}", "✅ Aadhaar number validated:".green(), subject_id.bold());
                return Ok(Some(subject_id));
            }
            Err(e) => {
                println!("{}", format!("❌ {}", e).red());
                println!("{}", "Please try again.".yellow());
            }
        }
    }
}

fn read_transaction_type() -> io::Result<Option<String>> {
    let label = format!("Transaction type [{}] (default UPDATE): ", TRANSACTION_TYPES.join("/"));
    Ok(prompt(&label)?.map(|input| {
        if input.is_empty() {
            "UPDATE".to_string()
        } else {
            input.to_uppercase()
        }
    }))
}

fn print_history(records: &[TransactionRecord], total_items: usize) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Recorded At").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.recorded_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
            Cell::new(&record.transaction_type),
            Cell::new(record.verification_status).fg(TableColor::Green),
        ]);
    }

    println!();
    println!("{}", format!("📜 Transaction history ({} total)", total_items).bright_magenta().bold());
    println!("{table}");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let service = VerificationService::new(args.difficulty)?;

    println!("{}", "AadhaarChain Verification".bright_cyan().bold());
    println!("{}", "-------------------------".bright_cyan());
    println!();

    while let Some(subject_id) = read_subject_id()? {
        let issued = service.issue_credential(&subject_id)?;
        // No delivery channel here, so the code is shown directly.
        println!("{} {}", "🔐 Your OTP (valid 60s):".yellow(), issued.code.bold());

        let Some(code) = prompt("Enter OTP: ")? else { break };
        let Some(transaction_type) = read_transaction_type()? else { break };

        let outcome = service.submit(&subject_id, &transaction_type, &code);
        if let VerificationOutcome::Verified(block) = &outcome {
            println!("{}", format!("✅ {}", outcome.message()).green().bold());
            println!("   Block: {}  nonce {}", block.content_hash.dimmed(), block.nonce);
        } else {
            println!("{}", format!("❌ {}", outcome.message()).red().bold());
        }

        let page = service.query_history(&subject_id, &HistoryQuery::default())?;
        print_history(&page.transactions, page.total_items);
        println!();
    }

    match service.verify_integrity() {
        Ok(()) => println!("{}", format!("⛓️  Chain intact ({} blocks)", service.blockchain().len()).green()),
        Err(e) => println!("{}", format!("⚠️  {}", e).red()),
    }
    Ok(())
}
