pub mod dashboard;
pub mod production;
pub mod reconcile;
pub mod sales;
pub mod seed;
pub mod system;
