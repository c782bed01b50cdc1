//! Target-metric search over the project multiplier

mod engine;

pub use engine::{SearchSolution, SearchTarget, TargetMetric, TargetSearch};
