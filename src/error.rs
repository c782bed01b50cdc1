//! Error taxonomy for the economic analysis library
//!
//! Undefined metrics (IRR with no sign change, PI with a zero investment
//! portion) are not errors: they propagate as `None` inside `MetricResult`.

use thiserror::Error;

/// Errors surfaced to the caller of an analysis run
#[derive(Debug, Error)]
pub enum EconError {
    /// Bad model parameters, unresolved driver variables, or malformed input
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A component's operating window is not a whole number of lifetimes
    /// and the truncation policy is strict
    #[error(
        "component \"{component}\" lifetime {lifetime} does not evenly divide \
         its {window}-period operating window (horizon {horizon}); \
         set a truncation policy or adjust the project time"
    )]
    IncompatibleHorizon {
        component: String,
        lifetime: usize,
        window: usize,
        horizon: usize,
    },

    /// Bracket expansion exhausted without finding a sign change
    #[error(
        "no bracket found for target search: objective has the same sign over \
         [{lo:.6e}, {hi:.6e}] after {expansions} expansions"
    )]
    NoBracketFound {
        lo: f64,
        hi: f64,
        expansions: usize,
    },

    /// Iteration budget exhausted (or the metric became undefined mid-search);
    /// carries the best multiplier seen so the caller can retry from it
    #[error(
        "target search did not converge after {iterations} iterations; \
         best multiplier {best_multiplier:.9e} with residual {residual:.3e}"
    )]
    ConvergenceFailure {
        iterations: usize,
        best_multiplier: f64,
        residual: f64,
    },
}

impl EconError {
    /// Convenience constructor for configuration errors
    pub fn config(msg: impl Into<String>) -> Self {
        EconError::InvalidConfiguration(msg.into())
    }
}
