use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::db::{Cow, ProductionRecord};
use crate::error::HerdbookResult;
use crate::models::{round_volume, NewProductionRecord, ProductionValues, RecordFailure};
use crate::store::HerdStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    pub created: usize,
    pub cows_backfilled: usize,
    pub cows_without_history: usize,
    pub failed: Vec<RecordFailure>,
}

/// Per-session means over a cow's history, each rounded to one decimal.
///
/// The total is the rounded sum of the rounded session means, not the mean of
/// the stored totals; the two can differ by a tenth.
pub fn session_averages(history: &[ProductionRecord]) -> Option<ProductionValues> {
    if history.is_empty() {
        return None;
    }
    let count = Decimal::from(history.len() as u64);
    let mean = |field: fn(&ProductionRecord) -> Decimal| {
        round_volume(history.iter().map(field).sum::<Decimal>() / count)
    };

    Some(ProductionValues::new(
        mean(|r| r.morning_production),
        mean(|r| r.noon_production),
        mean(|r| r.evening_production),
    ))
}

/// Creates a record from the cow's averages on every date in
/// `[start, end]` that has none. Existing records are never touched.
///
/// Cows without history are skipped. A store failure while handling one cow
/// stops that cow only; what it already created stays, and the failure is
/// reported. Failing to list the farm's cows aborts.
pub async fn backfill_history(
    store: &dyn HerdStore,
    farm_id: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> HerdbookResult<BackfillReport> {
    let mut report = BackfillReport::default();
    if start > end {
        tracing::info!(%start, %end, "empty backfill range");
        return Ok(report);
    }

    for cow in store.active_cows(farm_id).await? {
        let mut created = 0;
        match backfill_cow(store, &cow, start, end, &mut created).await {
            Ok(true) => report.cows_backfilled += 1,
            Ok(false) => {
                tracing::debug!(cow = %cow.name, "no production history, skipping backfill");
                report.cows_without_history += 1;
            }
            Err(e) => {
                tracing::warn!(cow = %cow.name, created, "backfill stopped for cow: {}", e);
                report.failed.push(RecordFailure {
                    key: cow.name.clone(),
                    error: e.to_string(),
                });
            }
        }
        report.created += created;
    }

    tracing::info!(
        created = report.created,
        cows = report.cows_backfilled,
        failed = report.failed.len(),
        "backfill finished"
    );
    Ok(report)
}

/// Returns `false` when the cow has no history to average.
async fn backfill_cow(
    store: &dyn HerdStore,
    cow: &Cow,
    start: NaiveDate,
    end: NaiveDate,
    created: &mut usize,
) -> HerdbookResult<bool> {
    let history = store.production_history(cow.cow_id).await?;
    let Some(values) = session_averages(&history) else {
        return Ok(false);
    };
    let existing: HashSet<NaiveDate> = history.iter().map(|r| r.production_date).collect();

    for date in start.iter_days().take_while(|d| *d <= end) {
        if existing.contains(&date) {
            continue;
        }
        let record = NewProductionRecord {
            cow_id: cow.cow_id,
            farm_id: cow.farm_id,
            production_date: date,
            values,
        };
        if store.create_production_if_absent(&record).await? {
            *created += 1;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Farm;
    use crate::models::{NewCow, NewFarm};
    use crate::store::MemoryHerdStore;

    fn d(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, n).unwrap()
    }

    async fn farm(store: &MemoryHerdStore) -> Farm {
        store
            .find_or_create_farm(&NewFarm {
                name: "Bama Dairy Farm".into(),
                location: None,
                size_acres: None,
            })
            .await
            .unwrap()
    }

    async fn cow(store: &MemoryHerdStore, farm: &Farm, name: &str) -> Cow {
        store
            .find_or_create_cow(&NewCow::for_reading(farm.farm_id, name, day(24)))
            .await
            .unwrap()
    }

    async fn record(store: &MemoryHerdStore, cow: &Cow, date: NaiveDate, values: ProductionValues) {
        store
            .upsert_production(&NewProductionRecord {
                cow_id: cow.cow_id,
                farm_id: cow.farm_id,
                production_date: date,
                values,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_two_record_scenario() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        let kokwet = cow(&store, &farm, "KOKWET").await;
        record(&store, &kokwet, day(1), ProductionValues::new(d(10, 0), d(5, 0), d(5, 0))).await;
        record(&store, &kokwet, day(2), ProductionValues::new(d(8, 0), d(5, 0), d(3, 0))).await;

        let averages = session_averages(&store.production_history(kokwet.cow_id).await.unwrap()).unwrap();
        assert_eq!(averages.morning, d(90, 1));
        assert_eq!(averages.noon, d(50, 1));
        assert_eq!(averages.evening, d(40, 1));
        assert_eq!(averages.total, d(180, 1));

        let report = backfill_history(&store, farm.farm_id, day(10), day(12)).await.unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.cows_backfilled, 1);

        let filled: Vec<_> = store
            .production_records()
            .unwrap()
            .into_iter()
            .filter(|r| r.production_date >= day(10))
            .collect();
        assert_eq!(filled.len(), 3);
        for r in filled {
            assert_eq!(r.morning_production, d(90, 1));
            assert_eq!(r.noon_production, d(50, 1));
            assert_eq!(r.evening_production, d(40, 1));
            assert_eq!(r.total_production, d(180, 1));
        }
    }

    #[test]
    fn test_average_total_uses_rounded_sessions() {
        // Session means 1.05 / 1.05 / 1.05 round to 1.1 each, so the total is
        // 3.3, while the mean of the stored totals (3.2 and 3.1) is 3.15.
        let make = |m: i64, n: i64, e: i64, total: i64| ProductionRecord {
            record_id: 0,
            cow_id: 1,
            farm_id: 1,
            production_date: day(1),
            morning_production: d(m, 1),
            noon_production: d(n, 1),
            evening_production: d(e, 1),
            total_production: d(total, 1),
            created_at: None,
            updated_at: None,
        };
        let history = vec![make(11, 11, 10, 32), make(10, 10, 11, 31)];

        let averages = session_averages(&history).unwrap();
        assert_eq!(averages.morning, d(11, 1));
        assert_eq!(averages.noon, d(11, 1));
        assert_eq!(averages.evening, d(11, 1));
        assert_eq!(averages.total, d(33, 1));
        assert_ne!(averages.total, d(315, 2));
    }

    #[tokio::test]
    async fn test_existing_dates_are_never_overwritten() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        let kokwet = cow(&store, &farm, "KOKWET").await;
        record(&store, &kokwet, day(1), ProductionValues::new(d(10, 0), d(5, 0), d(5, 0))).await;
        record(&store, &kokwet, day(3), ProductionValues::new(d(8, 0), d(5, 0), d(3, 0))).await;

        let report = backfill_history(&store, farm.farm_id, day(1), day(4)).await.unwrap();
        assert_eq!(report.created, 2);

        let records = store.production_records().unwrap();
        assert_eq!(records.len(), 4);
        let day_three = records.iter().find(|r| r.production_date == day(3)).unwrap();
        assert_eq!(day_three.morning_production, d(8, 0));
        assert_eq!(day_three.total_production, d(16, 0));

        // A second pass over the same range finds nothing to do.
        let again = backfill_history(&store, farm.farm_id, day(1), day(4)).await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(store.production_records().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_cow_without_history_is_skipped() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        cow(&store, &farm, "NEWBORN").await;

        let report = backfill_history(&store, farm.farm_id, day(1), day(20)).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.cows_without_history, 1);
        assert!(store.production_records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_cows_are_ignored() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        let sold = cow(&store, &farm, "SOLD").await;
        record(&store, &sold, day(1), ProductionValues::new(d(10, 0), d(5, 0), d(5, 0))).await;
        store.set_cow_status(sold.cow_id, "sold").unwrap();

        let report = backfill_history(&store, farm.farm_id, day(2), day(5)).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(store.production_records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_range_creates_nothing() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        let kokwet = cow(&store, &farm, "KOKWET").await;
        record(&store, &kokwet, day(1), ProductionValues::new(d(10, 0), d(5, 0), d(5, 0))).await;

        let report = backfill_history(&store, farm.farm_id, day(10), day(5)).await.unwrap();
        assert_eq!(report, BackfillReport::default());
    }

    #[tokio::test]
    async fn test_failing_cow_is_isolated() {
        let store = MemoryHerdStore::new();
        let farm = farm(&store).await;
        let broken = cow(&store, &farm, "BROKEN").await;
        let healthy = cow(&store, &farm, "HEALTHY").await;
        record(&store, &broken, day(1), ProductionValues::new(d(10, 0), d(5, 0), d(5, 0))).await;
        record(&store, &healthy, day(1), ProductionValues::new(d(8, 0), d(5, 0), d(3, 0))).await;
        store.inject_cow_failure(broken.cow_id).unwrap();

        let report = backfill_history(&store, farm.farm_id, day(2), day(4)).await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "BROKEN");
        assert_eq!(report.cows_backfilled, 1);
        assert_eq!(report.created, 3);
        let healthy_rows = store
            .production_records()
            .unwrap()
            .into_iter()
            .filter(|r| r.cow_id == healthy.cow_id)
            .count();
        assert_eq!(healthy_rows, 4);
    }
}
