//! Project-level aggregation and metric evaluation

pub mod aggregate;
pub mod metrics;

pub use aggregate::{combine, project_length, ProjectCashflows, ProjectFlow};
pub use metrics::{evaluate, irr, npv, profitability_index, MetricResult};
