use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::application::{CashbookService, NewEntry, StatementReport, parse_instant};
use crate::domain::Entry;
use crate::io::Exporter;

/// Cashbook - ledgers with running balances and printable statements
#[derive(Parser)]
#[command(name = "cashbook")]
#[command(about = "Keep cashbooks and print collapsed statements")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "cashbook.db")]
    pub database: String,

    /// User acting on the cashbooks
    #[arg(short, long, env = "CASHBOOK_USER", global = true)]
    pub user: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Cashbook management commands
    #[command(subcommand)]
    Cashbook(CashbookCommands),

    /// Record an entry in a cashbook
    Entry {
        /// Cashbook ID
        cashbook: i64,

        /// Amount, negative for money going out (e.g. "12.50" or "-3")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// Reason code, e.g. income-sales, expense-goods, day-opening
        #[arg(short, long)]
        reason: String,

        /// Posting text
        #[arg(short, long, default_value = "")]
        text: String,

        /// Tax rate as decimal or fraction (e.g. "0.19" or "19/100")
        #[arg(long)]
        tax: Option<String>,

        /// Posting reference (receipt number, statement id, ...)
        #[arg(long)]
        reference: Option<String>,

        /// Posting reference date (YYYY-MM-DD)
        #[arg(long)]
        reference_date: Option<String>,

        /// Date of the entry (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List entries of a cashbook
    Entries {
        /// Cashbook ID
        cashbook: i64,

        /// Number of entries to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of entries to show (at most 50)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a collapsed statement for a date range
    Statement {
        /// Cashbook ID
        cashbook: i64,

        /// Start of the range (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        begin: String,

        /// End of the range, inclusive (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: StatementFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CashbookCommands {
    /// Create a new cashbook
    Create {
        /// Cashbook name
        name: String,

        /// Currency code (e.g., EUR, USD)
        #[arg(short, long, default_value = "EUR")]
        currency: String,

        /// Account this cashbook is about
        #[arg(short, long)]
        account: Option<String>,
    },

    /// List your cashbooks
    List,

    /// Show detailed cashbook information
    Show {
        /// Cashbook ID
        id: i64,
    },

    /// Delete a cashbook and all its entries
    Delete {
        /// Cashbook ID
        id: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatementFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    /// Install the global tracing subscriber. `RUST_LOG` wins over `--verbose`.
    pub fn init_logging(&self) {
        let default_level = if self.verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cashbook={}", default_level)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub async fn run(self) -> Result<()> {
        let user = self.user.clone();
        let command = match self.command {
            Commands::Init => {
                CashbookService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
                return Ok(());
            }
            command => command,
        };

        let user = user.context("No user given. Pass --user or set CASHBOOK_USER")?;
        let service = CashbookService::connect(&self.database).await?;

        match command {
            Commands::Init => {}

            Commands::Cashbook(cashbook_cmd) => {
                run_cashbook_command(&service, &user, cashbook_cmd).await?;
            }

            Commands::Entry {
                cashbook,
                amount,
                reason,
                text,
                tax,
                reference,
                reference_date,
                date,
            } => {
                let datetime = match date {
                    Some(date_str) => parse_instant(&date_str, false)?,
                    None => Utc::now(),
                };

                let mut new_entry =
                    NewEntry::parse(datetime, &amount, &reason, tax.as_deref())?.with_text(text);
                if let Some(reference) = reference {
                    new_entry = new_entry.with_reference(reference);
                }
                if let Some(date_str) = reference_date {
                    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").with_context(
                        || format!("Invalid reference date '{}'. Use YYYY-MM-DD", date_str),
                    )?;
                    new_entry = new_entry.with_reference_date(date);
                }

                let entry = service.record_entry(&user, cashbook, new_entry).await?;
                println!(
                    "Recorded entry {}: {} {} (balance {})",
                    entry.id, entry.reason, entry.amount_raw, entry.balance_raw
                );
            }

            Commands::Entries {
                cashbook,
                offset,
                limit,
            } => {
                let entries = service.list_entries(&user, cashbook, offset, limit).await?;
                print_entries(&entries);
            }

            Commands::Statement {
                cashbook,
                begin,
                end,
                format,
                output,
            } => {
                let report = service.statement(&user, cashbook, &begin, &end).await?;
                match output {
                    Some(path) => {
                        let file = std::fs::File::create(&path)
                            .with_context(|| format!("Failed to create {}", path))?;
                        let count = write_statement(&report, format, file)?;
                        eprintln!("Exported {} statement lines to {}", count, path);
                    }
                    None => {
                        write_statement(&report, format, std::io::stdout().lock())?;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn run_cashbook_command(
    service: &CashbookService,
    user: &str,
    cmd: CashbookCommands,
) -> Result<()> {
    match cmd {
        CashbookCommands::Create {
            name,
            currency,
            account,
        } => {
            let cashbook = service
                .create_cashbook(user, name, account, &currency)
                .await?;
            println!(
                "Created cashbook: {} ({}, id {})",
                cashbook.name, cashbook.currency, cashbook.id
            );
        }

        CashbookCommands::List => {
            let cashbooks = service.list_cashbooks(user).await?;
            if cashbooks.is_empty() {
                println!("No cashbooks found.");
            } else {
                println!("{:<6} {:<24} {:<20} {:<8}", "ID", "NAME", "ACCOUNT", "CURRENCY");
                println!("{}", "-".repeat(60));
                for cashbook in cashbooks {
                    println!(
                        "{:<6} {:<24} {:<20} {:<8}",
                        cashbook.id,
                        cashbook.name,
                        cashbook.account.as_deref().unwrap_or("-"),
                        cashbook.currency
                    );
                }
            }
        }

        CashbookCommands::Show { id } => {
            let info = service.get_cashbook_info(user, id).await?;
            let cashbook = &info.cashbook;

            println!("Cashbook: {}", cashbook.name);
            println!("  ID:             {}", cashbook.id);
            if let Some(account) = &cashbook.account {
                println!("  Account:        {}", account);
            }
            println!("  Currency:       {}", cashbook.currency);
            println!("  Owner:          {}", cashbook.owner);
            println!();
            println!("  Balance:        {}", info.balance);
            println!("  Entries:        {}", info.entry_count);
            if let Some(last) = info.last_activity {
                println!("  Last activity:  {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        CashbookCommands::Delete { id } => {
            let cashbook = service.delete_cashbook(user, id).await?;
            println!("Deleted cashbook: {} (id {})", cashbook.name, cashbook.id);
        }
    }

    Ok(())
}

fn print_entries(entries: &[Entry]) {
    if entries.is_empty() {
        println!("No entries found.");
        return;
    }

    println!(
        "{:<6} {:<20} {:<22} {:>12} {:>12}  {}",
        "ID", "DATE", "REASON", "AMOUNT", "BALANCE", "TEXT"
    );
    println!("{}", "-".repeat(90));
    for entry in entries {
        println!(
            "{:<6} {:<20} {:<22} {:>12} {:>12}  {}",
            entry.id,
            entry.datetime.format("%Y-%m-%d %H:%M:%S"),
            entry.reason,
            entry.amount_raw,
            entry.balance_raw,
            entry.text
        );
    }
}

fn write_statement<W: std::io::Write>(
    report: &StatementReport,
    format: StatementFormat,
    mut writer: W,
) -> Result<usize> {
    let exporter = Exporter::new(report);
    match format {
        StatementFormat::Json => exporter.export_statement_json(writer),
        StatementFormat::Csv => exporter.export_statement_csv(writer),
        StatementFormat::Table => {
            let cashbook = &report.cashbook;
            writeln!(writer, "Statement: {} ({})", cashbook.name, cashbook.currency)?;
            writeln!(
                writer,
                "Period: {} to {}",
                report.begin.format("%Y-%m-%d %H:%M:%S"),
                report.end.format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(writer)?;
            writeln!(
                writer,
                "{:<25} {:<22} {:>10} {:>10} {:>12} {:>6}  {}",
                "DATE", "REASON", "DEBIT", "CREDIT", "BALANCE", "TAX", "TEXT"
            )?;
            writeln!(writer, "{}", "-".repeat(100))?;
            for line in &report.lines {
                writeln!(
                    writer,
                    "{:<25} {:<22} {:>10} {:>10} {:>12.2} {:>6}  {}",
                    line.date,
                    line.reason,
                    line.debit().map(|d| format!("{:.2}", d)).unwrap_or_default(),
                    line.credit().map(|c| format!("{:.2}", c)).unwrap_or_default(),
                    line.balance,
                    line.tax
                        .map(|t| format!("{:.2}", t))
                        .unwrap_or_default(),
                    line.text
                )?;
            }
            writeln!(writer, "{}", "-".repeat(100))?;
            writeln!(writer, "{:<25} {:>22}", "TOTAL", report.total)?;
            if let Some(closing) = report.closing_balance {
                writeln!(writer, "{:<25} {:>22}", "CLOSING BALANCE", closing)?;
            }
            Ok(report.lines.len())
        }
    }
}
