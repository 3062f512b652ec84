pub mod backfill;
pub mod reading;

pub use backfill::*;
pub use reading::*;
