use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::Farm;
use crate::models::{NewSalesRecord, UpsertTally};
use crate::store::HerdStore;

/// Milk sold to one buyer during one part of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesEntry {
    pub time_label: String,
    pub milk_sold: Decimal,
    pub cash_sales: Decimal,
    pub mpesa_sales: Decimal,
    pub buyer: String,
}

impl SalesEntry {
    pub fn to_record(&self, farm_id: i32, date: NaiveDate) -> NewSalesRecord {
        NewSalesRecord::new(
            farm_id,
            date,
            &self.buyer,
            self.milk_sold,
            self.cash_sales,
            self.mpesa_sales,
        )
    }
}

/// Upserts one sales record per entry at `(farm, date, buyer)`. Failing
/// entries are counted and skipped.
pub async fn upsert_sales_entries(
    store: &dyn HerdStore,
    farm: &Farm,
    date: NaiveDate,
    entries: &[SalesEntry],
) -> UpsertTally {
    let mut tally = UpsertTally::default();

    for entry in entries {
        let record = entry.to_record(farm.farm_id, date);
        match store.upsert_sales(&record).await {
            Ok(outcome) => {
                tracing::debug!(
                    session = %entry.time_label,
                    buyer = %record.buyer,
                    total = %record.total_sales(),
                    ?outcome,
                    "sales record saved"
                );
                tally.record(outcome);
            }
            Err(e) => {
                tracing::warn!(session = %entry.time_label, buyer = %record.buyer, "failed to save sales record: {}", e);
                tally.fail(format!("{} / {} @ {}", entry.time_label, record.buyer, date), &e);
            }
        }
    }

    tally
}
