//! Target-metric multiplier search
//!
//! Finds the multiplier applied to the mult-target flows such that a chosen
//! metric of the combined project series matches a target value. Bracketing
//! by geometric expansion from a seed, then bisection refined by secant
//! steps; bisection guarantees convergence once a bracket exists, the
//! secant step accelerates it on well-behaved objectives.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::EconError;
use crate::project::aggregate::ProjectCashflows;
use crate::project::metrics::{self, MetricResult};

/// Metric driven toward the target value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMetric {
    #[serde(rename = "NPV")]
    Npv,
    #[serde(rename = "IRR")]
    Irr,
    #[serde(rename = "PI")]
    ProfitabilityIndex,
}

/// Search request: which metric, what value, and the iteration budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTarget {
    pub metric: TargetMetric,

    /// Desired metric value
    pub value: f64,

    /// Convergence tolerance on the metric residual
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Refinement iteration budget
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Starting multiplier for bracket expansion
    #[serde(default = "default_seed")]
    pub seed: f64,

    /// Geometric expansion factor per bracketing step
    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: f64,

    /// Bracketing step budget
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    100
}

fn default_seed() -> f64 {
    1.0
}

fn default_expansion_factor() -> f64 {
    2.0
}

fn default_max_expansions() -> usize {
    10
}

impl SearchTarget {
    /// Target with default tolerances and bracketing controls
    pub fn new(metric: TargetMetric, value: f64) -> Self {
        Self {
            metric,
            value,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            seed: default_seed(),
            expansion_factor: default_expansion_factor(),
            max_expansions: default_max_expansions(),
        }
    }

    /// Check numeric sanity of the request
    pub fn validate(&self) -> Result<(), EconError> {
        if !self.value.is_finite() {
            return Err(EconError::config("search target value must be finite"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(EconError::config(format!(
                "search tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.seed.is_finite() && self.seed > 0.0) {
            return Err(EconError::config(format!(
                "search seed must be a positive multiplier, got {}",
                self.seed
            )));
        }
        if !(self.expansion_factor.is_finite() && self.expansion_factor > 1.0) {
            return Err(EconError::config(format!(
                "bracket expansion factor must exceed 1, got {}",
                self.expansion_factor
            )));
        }
        if self.max_expansions == 0 {
            return Err(EconError::config("bracket expansion budget must be at least 1"));
        }
        Ok(())
    }
}

/// Result of a converged search
#[derive(Debug, Clone, Serialize)]
pub struct SearchSolution {
    /// Multiplier achieving the target
    pub multiplier: f64,
    /// Metrics of the combined series at that multiplier
    pub metrics: MetricResult,
    /// Refinement iterations used (0 when an endpoint hit during bracketing)
    pub iterations: usize,
}

/// Sign-change interval handed from bracketing to refinement
#[derive(Debug, Clone, Copy)]
struct Bracket {
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
}

/// Search state machine; terminal states are Converged and Failed
#[derive(Debug)]
enum Phase {
    Bracketing,
    Refining(Bracket),
    Converged { multiplier: f64, iterations: usize },
    Failed(EconError),
}

/// Target search over one set of expanded project flows
pub struct TargetSearch<'a> {
    flows: &'a ProjectCashflows,
    discount_rate: f64,
}

impl<'a> TargetSearch<'a> {
    pub fn new(flows: &'a ProjectCashflows, discount_rate: f64) -> Self {
        Self {
            flows,
            discount_rate,
        }
    }

    /// Solve for the multiplier matching the target
    pub fn search(&self, target: &SearchTarget) -> Result<SearchSolution, EconError> {
        target.validate()?;
        if !self.flows.has_mult_target() {
            return Err(EconError::config(
                "target search requested but no cash flows have mult_target=true",
            ));
        }

        let mut phase = Phase::Bracketing;
        loop {
            phase = match phase {
                Phase::Bracketing => {
                    debug!("bracketing from seed {:.6e}", target.seed);
                    self.bracket_phase(target)
                }
                Phase::Refining(bracket) => {
                    debug!(
                        "refining inside [{:.6e}, {:.6e}]",
                        bracket.a.min(bracket.b),
                        bracket.a.max(bracket.b)
                    );
                    self.refine_phase(target, bracket)
                }
                Phase::Converged {
                    multiplier,
                    iterations,
                } => {
                    let result = metrics::evaluate(&self.flows.fcff(multiplier), self.discount_rate);
                    info!(
                        "search converged: multiplier {multiplier:.9e} after {iterations} iterations"
                    );
                    return Ok(SearchSolution {
                        multiplier,
                        metrics: result,
                        iterations,
                    });
                }
                Phase::Failed(err) => return Err(err),
            };
        }
    }

    /// Objective residual `metric(fcff(m)) - target`; `None` when the metric
    /// is undefined or non-finite at this multiplier
    fn objective(&self, multiplier: f64, target: &SearchTarget) -> Option<f64> {
        let series = self.flows.fcff(multiplier);
        let value = match target.metric {
            TargetMetric::Npv => Some(metrics::npv(&series, self.discount_rate)),
            TargetMetric::Irr => metrics::irr(&series),
            TargetMetric::ProfitabilityIndex => {
                metrics::profitability_index(&series, self.discount_rate)
            }
        };
        value.map(|v| v - target.value).filter(|f| f.is_finite())
    }

    /// Expand geometrically around the seed until the objective changes sign
    fn bracket_phase(&self, target: &SearchTarget) -> Phase {
        let seed = target.seed;
        let f_seed = self.objective(seed, target);
        if let Some(f) = f_seed {
            if f.abs() < target.tolerance {
                return Phase::Converged {
                    multiplier: seed,
                    iterations: 0,
                };
            }
        }

        // last finite sample on each side of the seed; undefined samples
        // never become a bracket end
        let mut low = f_seed.map(|f| (seed, f));
        let mut high = low;
        let mut lo_probe = seed;
        let mut hi_probe = seed;

        for step in 1..=target.max_expansions {
            lo_probe /= target.expansion_factor;
            hi_probe *= target.expansion_factor;

            if let Some(f) = self.objective(lo_probe, target) {
                if f.abs() < target.tolerance {
                    return Phase::Converged {
                        multiplier: lo_probe,
                        iterations: 0,
                    };
                }
                low = Some((lo_probe, f));
            }
            if let Some(f) = self.objective(hi_probe, target) {
                if f.abs() < target.tolerance {
                    return Phase::Converged {
                        multiplier: hi_probe,
                        iterations: 0,
                    };
                }
                high = Some((hi_probe, f));
            }

            if let (Some((a, fa)), Some((b, fb))) = (low, high) {
                if fa * fb < 0.0 {
                    debug!("bracket after {step} expansions: [{a:.6e}, {b:.6e}]");
                    return Phase::Refining(Bracket { a, b, fa, fb });
                }
            }
        }

        Phase::Failed(EconError::NoBracketFound {
            lo: lo_probe,
            hi: hi_probe,
            expansions: target.max_expansions,
        })
    }

    /// Shrink the bracket until the residual is inside tolerance
    fn refine_phase(&self, target: &SearchTarget, bracket: Bracket) -> Phase {
        let Bracket {
            mut a,
            mut b,
            mut fa,
            mut fb,
        } = bracket;
        if a > b {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut best = if fa.abs() <= fb.abs() { (a, fa) } else { (b, fb) };

        for iteration in 1..=target.max_iterations {
            // secant proposal, falling back to the midpoint whenever the
            // step is degenerate or leaves the bracket
            let mut candidate = if (fb - fa).abs() > f64::EPSILON {
                b - fb * (b - a) / (fb - fa)
            } else {
                0.5 * (a + b)
            };
            if !candidate.is_finite() || candidate <= a || candidate >= b {
                candidate = 0.5 * (a + b);
            }

            let Some(fc) = self.objective(candidate, target) else {
                // metric went undefined inside the bracket
                return Phase::Failed(EconError::ConvergenceFailure {
                    iterations: iteration,
                    best_multiplier: best.0,
                    residual: best.1.abs(),
                });
            };

            if fc.abs() < best.1.abs() {
                best = (candidate, fc);
            }
            debug!("iteration {iteration}: multiplier {candidate:.9e}, residual {fc:.3e}");

            if fc.abs() < target.tolerance {
                return Phase::Converged {
                    multiplier: candidate,
                    iterations: iteration,
                };
            }

            if fa * fc < 0.0 {
                b = candidate;
                fb = fc;
            } else {
                a = candidate;
                fa = fc;
            }
        }

        Phase::Failed(EconError::ConvergenceFailure {
            iterations: target.max_iterations,
            best_multiplier: best.0,
            residual: best.1.abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::aggregate::ProjectFlow;
    use crate::project::metrics::npv;
    use approx::assert_relative_eq;

    /// capex of 100 up front, searchable sales of 50 per period after
    fn test_flows() -> ProjectCashflows {
        ProjectCashflows {
            horizon: 4,
            flows: vec![
                ProjectFlow {
                    component: "plant".into(),
                    cashflow: "capex".into(),
                    mult_target: false,
                    values: vec![-100.0, 0.0, 0.0, 0.0],
                },
                ProjectFlow {
                    component: "plant".into(),
                    cashflow: "sales".into(),
                    mult_target: true,
                    values: vec![0.0, 50.0, 50.0, 50.0],
                },
            ],
        }
    }

    #[test]
    fn test_recovers_known_npv_multiplier() {
        let flows = test_flows();
        let known = 1.3;
        let target_npv = npv(&flows.fcff(known), 0.10);

        let search = TargetSearch::new(&flows, 0.10);
        let solution = search
            .search(&SearchTarget::new(TargetMetric::Npv, target_npv))
            .unwrap();

        assert_relative_eq!(solution.multiplier, known, epsilon = 1e-4);
        assert_relative_eq!(solution.metrics.npv, target_npv, epsilon = 1e-4);
    }

    #[test]
    fn test_irr_target() {
        let flows = test_flows();
        let search = TargetSearch::new(&flows, 0.10);

        let solution = search
            .search(&SearchTarget::new(TargetMetric::Irr, 0.15))
            .unwrap();

        let achieved = solution.metrics.irr.unwrap();
        assert_relative_eq!(achieved, 0.15, epsilon = 1e-4);
    }

    #[test]
    fn test_pi_target() {
        let flows = test_flows();
        let search = TargetSearch::new(&flows, 0.10);

        // PI = 1 means discounted returns exactly repay the investment
        let solution = search
            .search(&SearchTarget::new(TargetMetric::ProfitabilityIndex, 1.0))
            .unwrap();

        assert_relative_eq!(solution.metrics.pi.unwrap(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(solution.metrics.npv, 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_unreachable_target_reports_no_bracket() {
        let flows = test_flows();
        let search = TargetSearch::new(&flows, 0.10);

        // NPV is bounded below by -100 for positive multipliers
        let err = search
            .search(&SearchTarget::new(TargetMetric::Npv, -200.0))
            .unwrap_err();
        assert!(matches!(err, EconError::NoBracketFound { .. }));
    }

    #[test]
    fn test_exhausted_iteration_budget_carries_best_effort() {
        let flows = test_flows();
        let search = TargetSearch::new(&flows, 0.10);

        let mut target = SearchTarget::new(TargetMetric::Npv, 0.0);
        target.tolerance = 1e-12;
        target.max_iterations = 0;

        let err = search.search(&target).unwrap_err();
        match err {
            EconError::ConvergenceFailure {
                best_multiplier,
                residual,
                ..
            } => {
                assert!(best_multiplier.is_finite());
                assert!(residual.is_finite());
            }
            other => panic!("expected ConvergenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_requires_a_mult_target_flow() {
        let mut flows = test_flows();
        flows.flows[1].mult_target = false;

        let search = TargetSearch::new(&flows, 0.10);
        let err = search
            .search(&SearchTarget::new(TargetMetric::Npv, 0.0))
            .unwrap_err();
        assert!(matches!(err, EconError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_bad_request() {
        let flows = test_flows();
        let search = TargetSearch::new(&flows, 0.10);

        let mut target = SearchTarget::new(TargetMetric::Npv, 0.0);
        target.tolerance = -1.0;
        assert!(search.search(&target).is_err());

        let mut target = SearchTarget::new(TargetMetric::Npv, 0.0);
        target.seed = 0.0;
        assert!(search.search(&target).is_err());
    }
}
