//! Component cash-flow models, depreciation schedules and case loading

mod amortization;
mod data;
pub mod loader;

pub use amortization::AmortizationPlan;
pub use data::{CashFlow, Component, Driver, InflationMode};
pub use loader::CaseFile;
