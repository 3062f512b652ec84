use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::Farm;
use crate::error::HerdbookResult;
use crate::models::{NewCow, NewProductionRecord, ProductionValues, UpsertOutcome, UpsertTally};
use crate::store::HerdStore;

/// One cow's milk for one day, as reported. Missing sessions count as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub cow_name: String,
    pub morning: Option<Decimal>,
    pub noon: Option<Decimal>,
    pub evening: Option<Decimal>,
}

impl DailyReading {
    pub fn new(
        cow_name: &str,
        morning: Option<Decimal>,
        noon: Option<Decimal>,
        evening: Option<Decimal>,
    ) -> Self {
        Self {
            cow_name: cow_name.to_string(),
            morning,
            noon,
            evening,
        }
    }

    pub fn values(&self) -> ProductionValues {
        ProductionValues::from_optional(self.morning, self.noon, self.evening)
    }
}

/// Upserts one production record per reading at `(cow, farm, date)`,
/// creating cows on first sight. A failing reading is counted and skipped;
/// this never returns an error.
pub async fn upsert_daily_readings(
    store: &dyn HerdStore,
    farm: &Farm,
    date: NaiveDate,
    readings: &[DailyReading],
    today: NaiveDate,
) -> UpsertTally {
    let mut tally = UpsertTally::default();

    for reading in readings {
        match upsert_reading(store, farm, date, reading, today).await {
            Ok(outcome) => {
                tracing::debug!(cow = %reading.cow_name, %date, ?outcome, "production record saved");
                tally.record(outcome);
            }
            Err(e) => {
                tracing::warn!(cow = %reading.cow_name, %date, "failed to save production record: {}", e);
                tally.fail(format!("{} @ {}", reading.cow_name.trim(), date), &e);
            }
        }
    }

    tally
}

async fn upsert_reading(
    store: &dyn HerdStore,
    farm: &Farm,
    date: NaiveDate,
    reading: &DailyReading,
    today: NaiveDate,
) -> HerdbookResult<UpsertOutcome> {
    let values = reading.values();
    // Checked before the cow lookup so a bad reading never creates a cow.
    values.validate()?;

    let cow = store
        .find_or_create_cow(&NewCow::for_reading(farm.farm_id, &reading.cow_name, today))
        .await?;

    store
        .upsert_production(&NewProductionRecord {
            cow_id: cow.cow_id,
            farm_id: farm.farm_id,
            production_date: date,
            values,
        })
        .await
}
