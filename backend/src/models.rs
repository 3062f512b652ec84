//! Write-side inputs for the herd tables.
//!
//! Derived fields (`total_production`, `total_sales`) are computed by the
//! constructors here and never accepted from callers.

use chrono::{Months, NaiveDate};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::db::COW_STATUS_ACTIVE;
use crate::error::{HerdbookError, HerdbookResult};

pub const DEFAULT_BREED: &str = "Friesian";

/// Rounds a volume to one decimal place, halves away from zero.
pub fn round_volume(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a session volume, litres sold or a money amount to the two decimal
/// places the tables store, halves away from zero.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_amounts(values: [(&str, Decimal); 3]) -> HerdbookResult<()> {
    for (label, value) in values {
        if value < Decimal::ZERO {
            return Err(HerdbookError::Validation(format!(
                "{} must be greater than or equal to 0 (got {})",
                label, value
            )));
        }
        if round_amount(value) != value {
            return Err(HerdbookError::Validation(format!(
                "{} has more than two decimal places (got {})",
                label, value
            )));
        }
    }
    Ok(())
}

/// Uppercased name, whitespace removed, plus a random suffix in 100..=999.
pub fn generate_tag_number<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    let stem: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    format!("{}{}", stem, rng.random_range(100..=999))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFarm {
    pub name: String,
    pub location: Option<String>,
    pub size_acres: Option<Decimal>,
}

impl NewFarm {
    pub fn validate(&self) -> HerdbookResult<()> {
        if self.name.trim().is_empty() {
            return Err(HerdbookError::Validation("farm name can't be blank".into()));
        }
        Ok(())
    }
}

/// Attributes used only when the cow does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCow {
    pub farm_id: i32,
    pub name: String,
    pub tag_number: String,
    pub breed: String,
    pub date_of_birth: Option<NaiveDate>,
    pub status: String,
}

impl NewCow {
    /// Defaults for a cow first seen in a reading on `today`.
    pub fn for_reading(farm_id: i32, name: &str, today: NaiveDate) -> Self {
        Self {
            farm_id,
            name: name.trim().to_string(),
            tag_number: generate_tag_number(name, &mut rand::rng()),
            breed: DEFAULT_BREED.to_string(),
            date_of_birth: today.checked_sub_months(Months::new(36)),
            status: COW_STATUS_ACTIVE.to_string(),
        }
    }

    pub fn validate(&self) -> HerdbookResult<()> {
        if self.name.is_empty() {
            return Err(HerdbookError::Validation("cow name can't be blank".into()));
        }
        Ok(())
    }
}

/// The three milking sessions of one day and their derived total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionValues {
    pub morning: Decimal,
    pub noon: Decimal,
    pub evening: Decimal,
    pub total: Decimal,
}

impl ProductionValues {
    /// Sessions are rounded to two places before the total is derived, so the
    /// stored total always matches the stored sessions.
    pub fn new(morning: Decimal, noon: Decimal, evening: Decimal) -> Self {
        let (morning, noon, evening) = (
            round_amount(morning),
            round_amount(noon),
            round_amount(evening),
        );
        Self {
            morning,
            noon,
            evening,
            total: round_volume(morning + noon + evening),
        }
    }

    /// Missing sessions count as zero.
    pub fn from_optional(
        morning: Option<Decimal>,
        noon: Option<Decimal>,
        evening: Option<Decimal>,
    ) -> Self {
        Self::new(
            morning.unwrap_or(Decimal::ZERO),
            noon.unwrap_or(Decimal::ZERO),
            evening.unwrap_or(Decimal::ZERO),
        )
    }

    pub fn validate(&self) -> HerdbookResult<()> {
        check_amounts([
            ("morning_production", self.morning),
            ("noon_production", self.noon),
            ("evening_production", self.evening),
        ])?;
        if self.total != round_volume(self.morning + self.noon + self.evening) {
            return Err(HerdbookError::Validation(format!(
                "total_production {} does not match its sessions",
                self.total
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProductionRecord {
    pub cow_id: i32,
    pub farm_id: i32,
    pub production_date: NaiveDate,
    pub values: ProductionValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSalesRecord {
    pub farm_id: i32,
    pub sale_date: NaiveDate,
    pub buyer: String,
    pub milk_sold: Decimal,
    pub cash_sales: Decimal,
    pub mpesa_sales: Decimal,
    total_sales: Decimal,
}

impl NewSalesRecord {
    pub fn new(
        farm_id: i32,
        sale_date: NaiveDate,
        buyer: &str,
        milk_sold: Decimal,
        cash_sales: Decimal,
        mpesa_sales: Decimal,
    ) -> Self {
        let (milk_sold, cash_sales, mpesa_sales) = (
            round_amount(milk_sold),
            round_amount(cash_sales),
            round_amount(mpesa_sales),
        );
        Self {
            farm_id,
            sale_date,
            buyer: buyer.trim().to_string(),
            milk_sold,
            cash_sales,
            mpesa_sales,
            total_sales: cash_sales + mpesa_sales,
        }
    }

    pub fn total_sales(&self) -> Decimal {
        self.total_sales
    }

    pub fn validate(&self) -> HerdbookResult<()> {
        if self.buyer.is_empty() {
            return Err(HerdbookError::Validation("buyer can't be blank".into()));
        }
        check_amounts([
            ("milk_sold", self.milk_sold),
            ("cash_sales", self.cash_sales),
            ("mpesa_sales", self.mpesa_sales),
        ])?;
        if self.total_sales != self.cash_sales + self.mpesa_sales {
            return Err(HerdbookError::Validation(format!(
                "total_sales {} does not match cash and M-Pesa",
                self.total_sales
            )));
        }
        Ok(())
    }
}

/// Whether an upsert inserted a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// One record that could not be written, keyed for the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub key: String,
    pub error: String,
}

/// Counts from a best-effort batch of upserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpsertTally {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<RecordFailure>,
}

impl UpsertTally {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub fn fail(&mut self, key: impl Into<String>, error: &HerdbookError) {
        self.failed += 1;
        self.failures.push(RecordFailure {
            key: key.into(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn d(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    #[test]
    fn test_total_is_rounded_sum() {
        let values = ProductionValues::new(d(98, 1), d(80, 1), d(90, 1));
        assert_eq!(values.total, d(268, 1));

        // 1.25 + 1.0 + 1.0 = 3.25 -> 3.3 (half away from zero, not banker's 3.2)
        let values = ProductionValues::new(d(125, 2), d(1, 0), d(1, 0));
        assert_eq!(values.total, d(33, 1));
    }

    #[test]
    fn test_missing_sessions_default_to_zero() {
        let values = ProductionValues::from_optional(Some(d(5, 0)), None, None);
        assert_eq!(values.noon, Decimal::ZERO);
        assert_eq!(values.evening, Decimal::ZERO);
        assert_eq!(values.total, d(5, 0));
    }

    #[test]
    fn test_negative_session_is_rejected() {
        let values = ProductionValues::new(d(-1, 0), d(1, 0), d(1, 0));
        assert!(matches!(values.validate(), Err(HerdbookError::Validation(_))));
        assert!(ProductionValues::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_total_sales_is_derived() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 24).unwrap();
        let record = NewSalesRecord::new(1, date, " Brookside ", d(40, 0), d(1200, 0), d(800, 0));
        assert_eq!(record.total_sales(), d(2000, 0));
        assert_eq!(record.buyer, "Brookside");
        assert!(record.validate().is_ok());

        let blank = NewSalesRecord::new(1, date, "  ", d(40, 0), d(1, 0), d(1, 0));
        assert!(blank.validate().is_err());

        let negative = NewSalesRecord::new(1, date, "x", d(40, 0), d(-1, 0), d(1, 0));
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_amounts_are_kept_to_stored_precision() {
        // 0.149 is stored as 0.15, so the total must come from 0.15.
        let values = ProductionValues::new(d(149, 3), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(values.morning, d(15, 2));
        assert_eq!(values.total, d(2, 1));
        assert!(values.validate().is_ok());

        let date = NaiveDate::from_ymd_opt(2025, 4, 24).unwrap();
        let record = NewSalesRecord::new(1, date, "Kiosk", d(5, 3), d(5, 3), d(5, 3));
        assert_eq!(record.milk_sold, d(1, 2));
        assert_eq!(record.cash_sales, d(1, 2));
        assert_eq!(record.mpesa_sales, d(1, 2));
        assert_eq!(record.total_sales(), d(2, 2));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_unrounded_values_are_rejected() {
        let values = ProductionValues {
            morning: d(149, 3),
            noon: Decimal::ZERO,
            evening: Decimal::ZERO,
            total: d(1, 1),
        };
        assert!(matches!(values.validate(), Err(HerdbookError::Validation(_))));

        let mismatched = ProductionValues {
            total: d(99, 0),
            ..ProductionValues::new(d(1, 0), d(1, 0), d(1, 0))
        };
        assert!(matches!(mismatched.validate(), Err(HerdbookError::Validation(_))));

        let date = NaiveDate::from_ymd_opt(2025, 4, 24).unwrap();
        let mut record = NewSalesRecord::new(1, date, "Kiosk", d(1, 0), d(1, 0), d(1, 0));
        record.cash_sales = d(1005, 3);
        assert!(matches!(record.validate(), Err(HerdbookError::Validation(_))));
        record.cash_sales = d(5, 0);
        assert!(matches!(record.validate(), Err(HerdbookError::Validation(_))));
    }

    #[test]
    fn test_tag_number_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let tag = generate_tag_number("Mama  Kokwet", &mut rng);
        assert!(tag.starts_with("MAMAKOKWET"));
        let suffix: u32 = tag["MAMAKOKWET".len()..].parse().unwrap();
        assert!((100..=999).contains(&suffix));
    }

    #[test]
    fn test_new_cow_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 24).unwrap();
        let cow = NewCow::for_reading(3, " Kokwet ", today);
        assert_eq!(cow.name, "Kokwet");
        assert_eq!(cow.breed, DEFAULT_BREED);
        assert_eq!(cow.status, COW_STATUS_ACTIVE);
        assert_eq!(cow.date_of_birth, NaiveDate::from_ymd_opt(2022, 4, 24));
        assert!(cow.tag_number.starts_with("KOKWET"));
    }
}
