//! Runs the Bama Dairy reconciliation against the configured database and
//! prints the report. Trusted shells only; there is no token check.

use chrono::NaiveDate;
use clap::Parser;
use herdbook::commands::reconcile::{run_reconciliation, ReconcilePlan};
use herdbook::config::{self, AppConfig};
use herdbook::db;
use herdbook::error::{HerdbookResult, TRACE_LINES};
use herdbook::store::PgHerdStore;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "reconcile", version, about = "Upsert the Bama Dairy figures and backfill missing days")]
struct Args {
    /// First day to backfill (defaults to BACKFILL_START)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last day to backfill (defaults to today)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Date the fixed readings and sales are recorded under
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

async fn run(args: Args) -> HerdbookResult<Vec<String>> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    let pool = db::init_pool(&config.database_url).await?;
    db::init_database(&pool).await?;
    let store = PgHerdStore::new(pool);

    let mut plan = ReconcilePlan::bama_dairy(args.start_date.unwrap_or(config.backfill_start));
    if let Some(date) = args.date {
        plan.date = date;
    }
    plan.backfill_end = args.end_date;

    let today = chrono::Local::now().date_naive();
    plan.check_backfill_span(today, config.max_backfill_days)?;
    let report = run_reconciliation(&store, &plan, today).await?;
    Ok(report.lines())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    config::init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Reconciliation aborted: {}", e);
            println!("Error: {}", e);
            for line in e.trace(TRACE_LINES).iter().skip(1) {
                println!("  caused by: {}", line);
            }
            ExitCode::FAILURE
        }
    }
}
