use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::{DailySummary, Farm};
use crate::error::{HerdbookError, HerdbookResult};
use crate::state::AppState;
use crate::store::HerdStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub farm_id: i32,
    pub farm: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: DailySummary,
}

pub async fn farm_daily_summary(
    store: &dyn HerdStore,
    farm: &Farm,
    date: NaiveDate,
) -> HerdbookResult<DailyReport> {
    let summary = store.daily_summary(farm.farm_id, date).await?;
    Ok(DailyReport {
        farm_id: farm.farm_id,
        farm: farm.name.clone(),
        date,
        summary,
    })
}

#[derive(Deserialize)]
pub struct DailyReportParams {
    pub farm: String,
    pub date: Option<NaiveDate>,
}

pub async fn get_daily_report(
    State(state): State<AppState>,
    Query(params): Query<DailyReportParams>,
) -> HerdbookResult<Json<Value>> {
    let date = params
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let farm = state
        .store
        .find_farm(&params.farm)
        .await?
        .ok_or_else(|| HerdbookError::NotFound(format!("farm '{}'", params.farm.trim())))?;

    let report = farm_daily_summary(state.store.as_ref(), &farm, date).await?;
    Ok(Json(json!({ "success": true, "data": report })))
}
