//! Persistence for farms, cows, production and sales records.
//!
//! Every write is addressed by the record's identity key. Implementations must
//! guarantee at most one row per key even under concurrent writers.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::{Cow, DailySummary, Farm, ProductionRecord};
use crate::error::HerdbookResult;
use crate::models::{NewCow, NewFarm, NewProductionRecord, NewSalesRecord, UpsertOutcome};

pub mod memory;
pub mod postgres;

pub use memory::MemoryHerdStore;
pub use postgres::PgHerdStore;

#[async_trait]
pub trait HerdStore: Send + Sync {
    /// Looks up a farm by name, creating it from `farm` when absent.
    async fn find_or_create_farm(&self, farm: &NewFarm) -> HerdbookResult<Farm>;

    async fn find_farm(&self, name: &str) -> HerdbookResult<Option<Farm>>;

    /// Looks up `(cow.name, cow.farm_id)`. The other attributes of `cow`,
    /// including its tag number, are used only when the cow is created.
    async fn find_or_create_cow(&self, cow: &NewCow) -> HerdbookResult<Cow>;

    async fn active_cows(&self, farm_id: i32) -> HerdbookResult<Vec<Cow>>;

    /// Inserts or overwrites the record at `(cow, farm, production_date)`.
    async fn upsert_production(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<UpsertOutcome>;

    /// Inserts the record only when its key is free. Returns whether a row
    /// was written; an existing row is never touched.
    async fn create_production_if_absent(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<bool>;

    /// All of a cow's records, oldest first.
    async fn production_history(&self, cow_id: i32) -> HerdbookResult<Vec<ProductionRecord>>;

    /// Inserts or overwrites the record at `(farm, sale_date, buyer)`.
    async fn upsert_sales(&self, record: &NewSalesRecord) -> HerdbookResult<UpsertOutcome>;

    async fn daily_summary(&self, farm_id: i32, date: NaiveDate) -> HerdbookResult<DailySummary>;
}
