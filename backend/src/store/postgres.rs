use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{query, query_as, query_scalar};

use super::HerdStore;
use crate::db::{Cow, DailySummary, DbPool, Farm, ProductionRecord, COW_STATUS_ACTIVE};
use crate::error::HerdbookResult;
use crate::models::{NewCow, NewFarm, NewProductionRecord, NewSalesRecord, UpsertOutcome};

/// `HerdStore` over PostgreSQL. Identity keys are backed by unique
/// constraints and every upsert is a single `INSERT ... ON CONFLICT`.
#[derive(Clone)]
pub struct PgHerdStore {
    pool: DbPool,
}

impl PgHerdStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn outcome(inserted: bool) -> UpsertOutcome {
    if inserted {
        UpsertOutcome::Created
    } else {
        UpsertOutcome::Updated
    }
}

#[async_trait]
impl HerdStore for PgHerdStore {
    async fn find_or_create_farm(&self, farm: &NewFarm) -> HerdbookResult<Farm> {
        farm.validate()?;

        // DO NOTHING keeps the first writer's attributes; the SELECT then
        // returns whichever row won.
        query(
            "INSERT INTO farms (name, location, size_acres) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(farm.name.trim())
        .bind(&farm.location)
        .bind(farm.size_acres)
        .execute(&self.pool)
        .await?;

        let row = query_as::<_, Farm>("SELECT * FROM farms WHERE name = $1")
            .bind(farm.name.trim())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_farm(&self, name: &str) -> HerdbookResult<Option<Farm>> {
        let row = query_as::<_, Farm>("SELECT * FROM farms WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_or_create_cow(&self, cow: &NewCow) -> HerdbookResult<Cow> {
        cow.validate()?;

        query(
            "INSERT INTO cows (farm_id, name, tag_number, breed, date_of_birth, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (farm_id, name) DO NOTHING",
        )
        .bind(cow.farm_id)
        .bind(&cow.name)
        .bind(&cow.tag_number)
        .bind(&cow.breed)
        .bind(cow.date_of_birth)
        .bind(&cow.status)
        .execute(&self.pool)
        .await?;

        let row = query_as::<_, Cow>("SELECT * FROM cows WHERE farm_id = $1 AND name = $2")
            .bind(cow.farm_id)
            .bind(&cow.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn active_cows(&self, farm_id: i32) -> HerdbookResult<Vec<Cow>> {
        let rows = query_as::<_, Cow>(
            "SELECT * FROM cows WHERE farm_id = $1 AND status = $2 ORDER BY cow_id",
        )
        .bind(farm_id)
        .bind(COW_STATUS_ACTIVE)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_production(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<UpsertOutcome> {
        record.values.validate()?;

        // xmax is 0 only for a freshly inserted tuple.
        let inserted: bool = query_scalar(
            "INSERT INTO production_records
                (cow_id, farm_id, production_date, morning_production, noon_production,
                 evening_production, total_production)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (cow_id, farm_id, production_date) DO UPDATE SET
                morning_production = EXCLUDED.morning_production,
                noon_production = EXCLUDED.noon_production,
                evening_production = EXCLUDED.evening_production,
                total_production = EXCLUDED.total_production,
                updated_at = CURRENT_TIMESTAMP
             RETURNING (xmax = 0)",
        )
        .bind(record.cow_id)
        .bind(record.farm_id)
        .bind(record.production_date)
        .bind(record.values.morning)
        .bind(record.values.noon)
        .bind(record.values.evening)
        .bind(record.values.total)
        .fetch_one(&self.pool)
        .await?;

        Ok(outcome(inserted))
    }

    async fn create_production_if_absent(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<bool> {
        record.values.validate()?;

        let result = query(
            "INSERT INTO production_records
                (cow_id, farm_id, production_date, morning_production, noon_production,
                 evening_production, total_production)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (cow_id, farm_id, production_date) DO NOTHING",
        )
        .bind(record.cow_id)
        .bind(record.farm_id)
        .bind(record.production_date)
        .bind(record.values.morning)
        .bind(record.values.noon)
        .bind(record.values.evening)
        .bind(record.values.total)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn production_history(&self, cow_id: i32) -> HerdbookResult<Vec<ProductionRecord>> {
        let rows = query_as::<_, ProductionRecord>(
            "SELECT * FROM production_records WHERE cow_id = $1 ORDER BY production_date",
        )
        .bind(cow_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_sales(&self, record: &NewSalesRecord) -> HerdbookResult<UpsertOutcome> {
        record.validate()?;

        let inserted: bool = query_scalar(
            "INSERT INTO sales_records
                (farm_id, sale_date, buyer, milk_sold, cash_sales, mpesa_sales, total_sales)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (farm_id, sale_date, buyer) DO UPDATE SET
                milk_sold = EXCLUDED.milk_sold,
                cash_sales = EXCLUDED.cash_sales,
                mpesa_sales = EXCLUDED.mpesa_sales,
                total_sales = EXCLUDED.total_sales,
                updated_at = CURRENT_TIMESTAMP
             RETURNING (xmax = 0)",
        )
        .bind(record.farm_id)
        .bind(record.sale_date)
        .bind(&record.buyer)
        .bind(record.milk_sold)
        .bind(record.cash_sales)
        .bind(record.mpesa_sales)
        .bind(record.total_sales())
        .fetch_one(&self.pool)
        .await?;

        Ok(outcome(inserted))
    }

    async fn daily_summary(&self, farm_id: i32, date: NaiveDate) -> HerdbookResult<DailySummary> {
        let sql = r#"
            SELECT
                (SELECT COALESCE(SUM(total_production), 0) FROM production_records
                    WHERE farm_id = $1 AND production_date = $2) as total_production,
                (SELECT COUNT(*) FROM production_records
                    WHERE farm_id = $1 AND production_date = $2) as production_records,
                (SELECT COUNT(*) FROM sales_records
                    WHERE farm_id = $1 AND sale_date = $2) as sales_count,
                (SELECT COALESCE(SUM(total_sales), 0) FROM sales_records
                    WHERE farm_id = $1 AND sale_date = $2) as total_revenue
        "#;

        let summary = query_as::<_, DailySummary>(sql)
            .bind(farm_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        Ok(summary)
    }
}
