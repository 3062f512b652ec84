use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{FromRow, Pool, Postgres};
use std::str::FromStr;

use crate::error::{HerdbookError, HerdbookResult};

pub type DbPool = Pool<Postgres>;

pub const COW_STATUS_ACTIVE: &str = "active";

pub async fn init_pool_with_options(opts: PgConnectOptions) -> HerdbookResult<DbPool> {
    // connect_lazy_with does not touch the server until the first query.
    Ok(PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .idle_timeout(std::time::Duration::from_secs(120))
        .max_lifetime(std::time::Duration::from_secs(300))
        .connect_lazy_with(opts))
}

pub async fn init_pool(database_url: &str) -> HerdbookResult<DbPool> {
    let opts = PgConnectOptions::from_str(database_url)
        .map_err(|e| HerdbookError::Config(format!("Invalid DB URL: {}", e)))?
        .ssl_mode(PgSslMode::Prefer);

    init_pool_with_options(opts).await
}

pub async fn init_database(pool: &DbPool) -> HerdbookResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Farm {
    pub farm_id: i32,
    pub name: String,
    pub location: Option<String>,
    pub size_acres: Option<Decimal>,
    #[sqlx(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Cow {
    pub cow_id: i32,
    pub farm_id: i32,
    pub name: String,
    pub tag_number: String,
    pub breed: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: String,
    #[sqlx(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Cow {
    pub fn is_active(&self) -> bool {
        self.status == COW_STATUS_ACTIVE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProductionRecord {
    pub record_id: i32,
    pub cow_id: i32,
    pub farm_id: i32,
    pub production_date: NaiveDate,
    pub morning_production: Decimal,
    pub noon_production: Decimal,
    pub evening_production: Decimal,
    pub total_production: Decimal,
    #[sqlx(default)]
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SalesRecord {
    pub sales_record_id: i32,
    pub farm_id: i32,
    pub sale_date: NaiveDate,
    pub buyer: String,
    pub milk_sold: Decimal,
    pub cash_sales: Decimal,
    pub mpesa_sales: Decimal,
    pub total_sales: Decimal,
    #[sqlx(default)]
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Read-side totals for one farm and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailySummary {
    pub total_production: Decimal,
    pub production_records: i64,
    pub sales_count: i64,
    pub total_revenue: Decimal,
}
