//! The Bama Dairy Farm figures for 24 April 2025.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::commands::production::DailyReading;
use crate::commands::reconcile::ReconcilePlan;
use crate::commands::sales::SalesEntry;
use crate::models::NewFarm;

pub const FARM_NAME: &str = "Bama Dairy Farm";

// (cow, morning, noon, evening) in tenths of a litre; None means not milked.
const HERD_READINGS: &[(&str, Option<i64>, Option<i64>, Option<i64>)] = &[
    ("KOKWET", Some(98), Some(80), Some(90)),
    ("NALEPO", Some(102), Some(75), Some(88)),
    ("CHEPTOO", Some(84), Some(60), Some(72)),
    ("MALAIKA", Some(110), Some(86), Some(94)),
    ("ZAWADI", Some(76), None, Some(69)),
    ("BAHATI", Some(91), Some(70), Some(85)),
    ("SIFA", Some(65), Some(52), Some(60)),
    ("NJERI", Some(88), Some(73), Some(80)),
];

// (time label, litres sold in tenths, cash, M-Pesa, buyer)
const SALES: &[(&str, i64, i64, i64, &str)] = &[
    ("Morning", 1200, 3000, 4200, "Brookside Dairy"),
    ("Noon", 400, 1400, 1000, "Local Hotel"),
    ("Evening", 950, 2500, 3200, "Village Customers"),
];

fn tenths(value: i64) -> Decimal {
    Decimal::new(value, 1)
}

pub fn reading_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 24).unwrap_or_default()
}

impl ReconcilePlan {
    pub fn bama_dairy(backfill_start: NaiveDate) -> Self {
        let readings = HERD_READINGS
            .iter()
            .map(|&(name, morning, noon, evening)| {
                DailyReading::new(name, morning.map(tenths), noon.map(tenths), evening.map(tenths))
            })
            .collect();

        let sales = SALES
            .iter()
            .map(|&(label, litres, cash, mpesa, buyer)| SalesEntry {
                time_label: label.to_string(),
                milk_sold: tenths(litres),
                cash_sales: Decimal::from(cash),
                mpesa_sales: Decimal::from(mpesa),
                buyer: buyer.to_string(),
            })
            .collect();

        Self {
            farm: NewFarm {
                name: FARM_NAME.to_string(),
                location: Some("Nakuru, Kenya".to_string()),
                size_acres: Some(Decimal::from(25)),
            },
            date: reading_date(),
            readings,
            sales,
            backfill_start,
            backfill_end: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bama_plan_contents() {
        let plan = ReconcilePlan::bama_dairy(reading_date());
        assert_eq!(plan.farm.name, FARM_NAME);
        assert_eq!(plan.date, NaiveDate::from_ymd_opt(2025, 4, 24).unwrap());
        assert_eq!(plan.sales.len(), 3);

        let kokwet = plan.readings.iter().find(|r| r.cow_name == "KOKWET").unwrap();
        assert_eq!(kokwet.values().total, Decimal::new(268, 1));

        let zawadi = plan.readings.iter().find(|r| r.cow_name == "ZAWADI").unwrap();
        assert_eq!(zawadi.noon, None);
        assert_eq!(zawadi.values().total, Decimal::new(145, 1));
    }
}
