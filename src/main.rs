//! Command line client for the cashbook bookkeeping service.
//!
//! Every subcommand maps onto one [Ledger] operation; this binary only
//! parses arguments, calls the service, and prints what comes back.

use std::{process, sync::OnceLock};

use clap::{Parser, Subcommand};
use numfmt::{Formatter, Precision};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use cashbook_rs::{
    Cashbook, CashbookId, Error, IncomeSpent, Ledger, Transaction, TransactionKind,
};

/// A personal bookkeeping tool: cashbooks, cash in / cash out transactions,
/// and balance summaries stored in a local SQLite database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "cashbook.db")]
    db_path: String,

    /// Print results as JSON instead of tables.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new cashbook.
    Create {
        /// The name of the new cashbook.
        name: String,
    },
    /// List cashbooks with balances derived from the transaction log.
    List {
        /// Use the cached totals columns instead of recomputing from the log.
        #[arg(long)]
        cached: bool,
    },
    /// Rename a cashbook.
    Rename {
        /// The ID of the cashbook to rename.
        id: CashbookId,
        /// The new name.
        name: String,
    },
    /// Delete a cashbook and every transaction it owns.
    Delete {
        /// The ID of the cashbook to delete.
        id: CashbookId,
    },
    /// Record a transaction against a cashbook.
    Add {
        /// The ID of the cashbook the money moved in or out of.
        cashbook_id: CashbookId,
        /// "in" for money received, "out" for money spent.
        kind: String,
        /// How much money moved. Must be greater than zero.
        amount: f64,
        /// What the money was for.
        #[arg(short, long, default_value = "")]
        description: String,
        /// When the money moved, as an RFC 3339 timestamp. Defaults to now.
        #[arg(long)]
        date: Option<String>,
    },
    /// List a cashbook's transactions, most recent first.
    Transactions {
        /// The ID of the cashbook to list.
        cashbook_id: CashbookId,
    },
    /// Show total income and spending across every cashbook.
    Summary,
    /// Drop and recreate both tables, erasing all data.
    Reset {
        /// Skip the confirmation check.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let ledger = match Ledger::open(&args.db_path) {
        Ok(ledger) => ledger,
        Err(error) => {
            tracing::error!("could not open {}: {error}", args.db_path);
            process::exit(1);
        }
    };

    if let Err(error) = run(args.command, args.json, &ledger).await {
        tracing::error!("{error}");
        process::exit(1);
    }
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                ),
        )
        .init();
}

async fn run(command: Command, json: bool, ledger: &Ledger) -> Result<(), Error> {
    match command {
        Command::Create { name } => {
            let cashbook = ledger.create_cashbook(&name).await?;

            if json {
                print_json(&cashbook);
            } else {
                println!("Created cashbook {} ({})", cashbook.name, cashbook.id);
            }
        }
        Command::List { cached } => {
            let cashbooks = if cached {
                ledger.list_cashbooks().await?
            } else {
                ledger.list_cashbooks_with_balances().await?
            };

            if json {
                print_json(&cashbooks);
            } else {
                print_cashbook_table(&cashbooks);
            }
        }
        Command::Rename { id, name } => {
            ledger.rename_cashbook(id, &name).await?;

            println!("Renamed cashbook {id} to {name}");
        }
        Command::Delete { id } => {
            ledger.delete_cashbook(id).await?;

            println!("Deleted cashbook {id} and its transactions");
        }
        Command::Add {
            cashbook_id,
            kind,
            amount,
            description,
            date,
        } => {
            let kind = parse_kind(&kind)?;
            let mut builder =
                Transaction::build(cashbook_id, kind, amount).description(&description);

            if let Some(raw_date) = date {
                let date = match OffsetDateTime::parse(&raw_date, &Rfc3339) {
                    Ok(date) => date,
                    Err(error) => {
                        eprintln!("could not parse --date {raw_date:?}: {error}");
                        process::exit(2);
                    }
                };
                builder = builder.date(date);
            }

            let transaction = ledger.create_transaction(builder).await?;

            if json {
                print_json(&transaction);
            } else {
                println!(
                    "Recorded {} of {} against cashbook {}",
                    transaction.kind,
                    currency(transaction.amount),
                    transaction.cashbook_id
                );
            }
        }
        Command::Transactions { cashbook_id } => {
            let transactions = ledger.list_transactions(cashbook_id).await?;

            if json {
                print_json(&transactions);
            } else {
                print_transaction_table(&transactions);
            }
        }
        Command::Summary => {
            let totals = ledger.total_income_and_spent().await?;

            if json {
                print_json(&totals);
            } else {
                print_summary(&totals);
            }
        }
        Command::Reset { yes } => {
            if !yes {
                eprintln!("This erases every cashbook and transaction. Re-run with --yes to confirm.");
                process::exit(2);
            }

            ledger.reset().await?;

            println!("All data erased");
        }
    }

    Ok(())
}

fn parse_kind(raw: &str) -> Result<TransactionKind, Error> {
    match raw {
        "in" => Ok(TransactionKind::CashIn),
        "out" => Ok(TransactionKind::CashOut),
        other => other.parse(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("value should serialise as JSON")
    );
}

fn print_cashbook_table(cashbooks: &[Cashbook]) {
    if cashbooks.is_empty() {
        println!("No cashbooks yet");
        return;
    }

    println!(
        "{:>6}  {:<24} {:>14} {:>14} {:>14}",
        "ID", "NAME", "IN", "OUT", "NET"
    );
    for cashbook in cashbooks {
        println!(
            "{:>6}  {:<24} {:>14} {:>14} {:>14}",
            cashbook.id,
            cashbook.name.as_ref(),
            currency(cashbook.total_in),
            currency(cashbook.total_out),
            currency(cashbook.net_balance),
        );
    }
}

fn print_transaction_table(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions yet");
        return;
    }

    println!(
        "{:>6}  {:<20} {:<8} {:>14}  {}",
        "ID", "DATE", "TYPE", "AMOUNT", "DESCRIPTION"
    );
    for transaction in transactions {
        let date = transaction
            .date
            .format(&Rfc3339)
            .unwrap_or_else(|_| transaction.date.to_string());

        println!(
            "{:>6}  {:<20} {:<8} {:>14}  {}",
            transaction.id,
            date,
            transaction.kind.as_str(),
            currency(transaction.amount),
            transaction.description,
        );
    }
}

fn print_summary(totals: &IncomeSpent) {
    println!("Income: {}", currency(totals.total_income));
    println!("Spent:  {}", currency(totals.total_spent));
    println!(
        "Net:    {}",
        currency(totals.total_income - totals.total_spent)
    );
}

fn currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "$0.00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12.30" is rendered as "12.3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b'.' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}
