use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::HerdStore;
use crate::db::{Cow, DailySummary, Farm, ProductionRecord, SalesRecord};
use crate::error::{HerdbookError, HerdbookResult};
use crate::models::{NewCow, NewFarm, NewProductionRecord, NewSalesRecord, UpsertOutcome};

#[derive(Default)]
struct Tables {
    farms: Vec<Farm>,
    cows: Vec<Cow>,
    production: BTreeMap<(i32, i32, NaiveDate), ProductionRecord>,
    sales: BTreeMap<(i32, NaiveDate, String), SalesRecord>,
    next_id: i32,
    #[cfg(test)]
    failing_cows: HashSet<i32>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    #[cfg(test)]
    fn check_cow_available(&self, cow_id: i32) -> HerdbookResult<()> {
        if self.failing_cows.contains(&cow_id) {
            return Err(HerdbookError::Internal(format!(
                "store unavailable for cow {}",
                cow_id
            )));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_cow_available(&self, _cow_id: i32) -> HerdbookResult<()> {
        Ok(())
    }
}

fn production_row(record_id: i32, record: &NewProductionRecord, now: NaiveDateTime) -> ProductionRecord {
    ProductionRecord {
        record_id,
        cow_id: record.cow_id,
        farm_id: record.farm_id,
        production_date: record.production_date,
        morning_production: record.values.morning,
        noon_production: record.values.noon,
        evening_production: record.values.evening,
        total_production: record.values.total,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

/// `HerdStore` held in process memory. One mutex guards all tables, so
/// identity keys stay unique under concurrent callers.
#[derive(Default)]
pub struct MemoryHerdStore {
    tables: Mutex<Tables>,
}

impl MemoryHerdStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> HerdbookResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| HerdbookError::Internal("memory store lock poisoned".into()))
    }

    pub fn production_records(&self) -> HerdbookResult<Vec<ProductionRecord>> {
        Ok(self.tables()?.production.values().cloned().collect())
    }

    pub fn sales_records(&self) -> HerdbookResult<Vec<SalesRecord>> {
        Ok(self.tables()?.sales.values().cloned().collect())
    }
}

#[cfg(test)]
impl MemoryHerdStore {
    /// Makes every production read or write for `cow_id` fail from now on.
    pub fn inject_cow_failure(&self, cow_id: i32) -> HerdbookResult<()> {
        self.tables()?.failing_cows.insert(cow_id);
        Ok(())
    }

    pub fn set_cow_status(&self, cow_id: i32, status: &str) -> HerdbookResult<()> {
        let mut tables = self.tables()?;
        let cow = tables
            .cows
            .iter_mut()
            .find(|c| c.cow_id == cow_id)
            .ok_or_else(|| HerdbookError::NotFound(format!("cow {}", cow_id)))?;
        cow.status = status.to_string();
        Ok(())
    }

    pub fn farm_count(&self) -> HerdbookResult<usize> {
        Ok(self.tables()?.farms.len())
    }

    pub fn cow_count(&self) -> HerdbookResult<usize> {
        Ok(self.tables()?.cows.len())
    }
}

#[async_trait]
impl HerdStore for MemoryHerdStore {
    async fn find_or_create_farm(&self, farm: &NewFarm) -> HerdbookResult<Farm> {
        farm.validate()?;
        let name = farm.name.trim();
        let mut tables = self.tables()?;
        if let Some(existing) = tables.farms.iter().find(|f| f.name == name) {
            return Ok(existing.clone());
        }
        let row = Farm {
            farm_id: tables.next_id(),
            name: name.to_string(),
            location: farm.location.clone(),
            size_acres: farm.size_acres,
            created_at: Some(Utc::now().naive_utc()),
        };
        tables.farms.push(row.clone());
        Ok(row)
    }

    async fn find_farm(&self, name: &str) -> HerdbookResult<Option<Farm>> {
        let name = name.trim();
        Ok(self.tables()?.farms.iter().find(|f| f.name == name).cloned())
    }

    async fn find_or_create_cow(&self, cow: &NewCow) -> HerdbookResult<Cow> {
        cow.validate()?;
        let mut tables = self.tables()?;
        if let Some(existing) = tables
            .cows
            .iter()
            .find(|c| c.farm_id == cow.farm_id && c.name == cow.name)
        {
            return Ok(existing.clone());
        }
        if !tables.farms.iter().any(|f| f.farm_id == cow.farm_id) {
            return Err(HerdbookError::NotFound(format!("farm {}", cow.farm_id)));
        }
        let row = Cow {
            cow_id: tables.next_id(),
            farm_id: cow.farm_id,
            name: cow.name.clone(),
            tag_number: cow.tag_number.clone(),
            breed: Some(cow.breed.clone()),
            date_of_birth: cow.date_of_birth,
            status: cow.status.clone(),
            created_at: Some(Utc::now().naive_utc()),
        };
        tables.cows.push(row.clone());
        Ok(row)
    }

    async fn active_cows(&self, farm_id: i32) -> HerdbookResult<Vec<Cow>> {
        Ok(self
            .tables()?
            .cows
            .iter()
            .filter(|c| c.farm_id == farm_id && c.is_active())
            .cloned()
            .collect())
    }

    async fn upsert_production(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<UpsertOutcome> {
        record.values.validate()?;
        let mut tables = self.tables()?;
        tables.check_cow_available(record.cow_id)?;
        let now = Utc::now().naive_utc();
        let key = (record.cow_id, record.farm_id, record.production_date);

        if let Some(existing) = tables.production.get_mut(&key) {
            existing.morning_production = record.values.morning;
            existing.noon_production = record.values.noon;
            existing.evening_production = record.values.evening;
            existing.total_production = record.values.total;
            existing.updated_at = Some(now);
            return Ok(UpsertOutcome::Updated);
        }

        let row = production_row(tables.next_id(), record, now);
        tables.production.insert(key, row);
        Ok(UpsertOutcome::Created)
    }

    async fn create_production_if_absent(
        &self,
        record: &NewProductionRecord,
    ) -> HerdbookResult<bool> {
        record.values.validate()?;
        let mut tables = self.tables()?;
        tables.check_cow_available(record.cow_id)?;
        let key = (record.cow_id, record.farm_id, record.production_date);
        if tables.production.contains_key(&key) {
            return Ok(false);
        }

        let now = Utc::now().naive_utc();
        let row = production_row(tables.next_id(), record, now);
        tables.production.insert(key, row);
        Ok(true)
    }

    async fn production_history(&self, cow_id: i32) -> HerdbookResult<Vec<ProductionRecord>> {
        let tables = self.tables()?;
        tables.check_cow_available(cow_id)?;
        let mut rows: Vec<ProductionRecord> = tables
            .production
            .values()
            .filter(|r| r.cow_id == cow_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.production_date);
        Ok(rows)
    }

    async fn upsert_sales(&self, record: &NewSalesRecord) -> HerdbookResult<UpsertOutcome> {
        record.validate()?;
        let mut tables = self.tables()?;
        let now = Utc::now().naive_utc();
        let key = (record.farm_id, record.sale_date, record.buyer.clone());

        if let Some(existing) = tables.sales.get_mut(&key) {
            existing.milk_sold = record.milk_sold;
            existing.cash_sales = record.cash_sales;
            existing.mpesa_sales = record.mpesa_sales;
            existing.total_sales = record.total_sales();
            existing.updated_at = Some(now);
            return Ok(UpsertOutcome::Updated);
        }

        let row = SalesRecord {
            sales_record_id: tables.next_id(),
            farm_id: record.farm_id,
            sale_date: record.sale_date,
            buyer: record.buyer.clone(),
            milk_sold: record.milk_sold,
            cash_sales: record.cash_sales,
            mpesa_sales: record.mpesa_sales,
            total_sales: record.total_sales(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.sales.insert(key, row);
        Ok(UpsertOutcome::Created)
    }

    async fn daily_summary(&self, farm_id: i32, date: NaiveDate) -> HerdbookResult<DailySummary> {
        let tables = self.tables()?;
        let production: Vec<&ProductionRecord> = tables
            .production
            .values()
            .filter(|r| r.farm_id == farm_id && r.production_date == date)
            .collect();
        let sales: Vec<&SalesRecord> = tables
            .sales
            .values()
            .filter(|r| r.farm_id == farm_id && r.sale_date == date)
            .collect();

        Ok(DailySummary {
            total_production: production
                .iter()
                .map(|r| r.total_production)
                .sum::<Decimal>(),
            production_records: production.len() as i64,
            sales_count: sales.len() as i64,
            total_revenue: sales.iter().map(|r| r.total_sales).sum::<Decimal>(),
        })
    }
}
