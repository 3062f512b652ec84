//! Dairy production and sales reconciliation.
//!
//! The core lives in [`commands`]: upserting one day's readings and sales,
//! backfilling missing days from per-cow averages, and summarising a day.
//! [`store::HerdStore`] is the persistence seam; [`routes`] exposes the run
//! over HTTP and `src/bin/reconcile.rs` runs it from a shell.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
mod business_logic_tests;
