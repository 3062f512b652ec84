use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::commands::dashboard::{farm_daily_summary, DailyReport};
use crate::commands::production::{
    backfill_history, upsert_daily_readings, BackfillReport, DailyReading,
};
use crate::commands::sales::{upsert_sales_entries, SalesEntry};
use crate::db::Farm;
use crate::error::{HerdbookError, HerdbookResult};
use crate::models::{NewFarm, UpsertTally};
use crate::state::AppState;
use crate::store::HerdStore;

/// Everything one reconciliation run writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub farm: NewFarm,
    pub date: NaiveDate,
    pub readings: Vec<DailyReading>,
    pub sales: Vec<SalesEntry>,
    pub backfill_start: NaiveDate,
    /// Defaults to the run date.
    pub backfill_end: Option<NaiveDate>,
}

impl ReconcilePlan {
    /// Rejects a backfill range covering more than `max_days` days. An
    /// inverted range is empty and always passes.
    pub fn check_backfill_span(&self, today: NaiveDate, max_days: u32) -> HerdbookResult<()> {
        let end = self.backfill_end.unwrap_or(today);
        let days = (end - self.backfill_start).num_days() + 1;
        if days > i64::from(max_days) {
            return Err(HerdbookError::Validation(format!(
                "backfill range {} to {} covers {} days, the limit is {}",
                self.backfill_start, end, days, max_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub farm: Farm,
    pub date: NaiveDate,
    pub production: UpsertTally,
    pub sales: UpsertTally,
    pub backfill_start: NaiveDate,
    pub backfill_end: NaiveDate,
    pub backfill: BackfillReport,
    pub summary: DailyReport,
}

impl ReconcileReport {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Farm: {} (id {})", self.farm.name, self.farm.farm_id),
            format!("Date: {}", self.date),
            tally_line("Production records", &self.production),
        ];
        lines.extend(failure_lines(&self.production));
        lines.push(tally_line("Sales records", &self.sales));
        lines.extend(failure_lines(&self.sales));
        lines.push(format!(
            "Backfill {} to {}: {} records created for {} cows ({} without history, {} failed)",
            self.backfill_start,
            self.backfill_end,
            self.backfill.created,
            self.backfill.cows_backfilled,
            self.backfill.cows_without_history,
            self.backfill.failed.len(),
        ));
        lines.extend(
            self.backfill
                .failed
                .iter()
                .map(|f| format!("  ! {}: {}", f.key, f.error)),
        );
        lines.push(format!(
            "Totals for {}: {} litres from {} records, {} sales, revenue {}",
            self.summary.date,
            self.summary.summary.total_production,
            self.summary.summary.production_records,
            self.summary.summary.sales_count,
            self.summary.summary.total_revenue,
        ));
        lines
    }

    pub fn message(&self) -> String {
        self.lines().join("\n")
    }
}

fn tally_line(label: &str, tally: &UpsertTally) -> String {
    format!(
        "{}: {} created, {} updated, {} failed",
        label, tally.created, tally.updated, tally.failed
    )
}

fn failure_lines(tally: &UpsertTally) -> impl Iterator<Item = String> + '_ {
    tally
        .failures
        .iter()
        .map(|f| format!("  ! {}: {}", f.key, f.error))
}

/// Finds or creates the farm, upserts the plan's date, backfills history up
/// to `today` (or the plan's end) and summarises the date.
///
/// Per-record failures are tallied; anything else aborts the run.
pub async fn run_reconciliation(
    store: &dyn HerdStore,
    plan: &ReconcilePlan,
    today: NaiveDate,
) -> HerdbookResult<ReconcileReport> {
    let farm = store.find_or_create_farm(&plan.farm).await?;
    tracing::info!(farm = %farm.name, date = %plan.date, "reconciliation started");

    let production = upsert_daily_readings(store, &farm, plan.date, &plan.readings, today).await;
    let sales = upsert_sales_entries(store, &farm, plan.date, &plan.sales).await;

    let backfill_end = plan.backfill_end.unwrap_or(today);
    let backfill = backfill_history(store, farm.farm_id, plan.backfill_start, backfill_end).await?;

    let summary = farm_daily_summary(store, &farm, plan.date).await?;

    tracing::info!(
        farm = %farm.name,
        production_failed = production.failed,
        sales_failed = sales.failed,
        backfilled = backfill.created,
        "reconciliation finished"
    );

    Ok(ReconcileReport {
        date: plan.date,
        farm,
        production,
        sales,
        backfill_start: plan.backfill_start,
        backfill_end,
        backfill,
        summary,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct PopulateParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// `POST /api/admin/populate`. The token is checked by the route's middleware.
pub async fn populate_data(
    State(state): State<AppState>,
    Query(params): Query<PopulateParams>,
) -> HerdbookResult<Json<Value>> {
    let today = chrono::Local::now().date_naive();
    let mut plan = ReconcilePlan::bama_dairy(
        params.start_date.unwrap_or(state.config.backfill_start),
    );
    plan.backfill_end = params.end_date;
    plan.check_backfill_span(today, state.config.max_backfill_days)?;

    let report = run_reconciliation(state.store.as_ref(), &plan, today).await?;

    Ok(Json(json!({
        "success": true,
        "message": report.message(),
        "data": report,
    })))
}
