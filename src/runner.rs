//! Host-facing analysis entry point
//!
//! Construct a runner once per analysis run from validated settings and
//! components, then invoke it per case. Cases share no mutable state, so a
//! batch may be evaluated from parallel tasks without locking.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::EconError;
use crate::project::{aggregate, metrics, MetricResult, ProjectCashflows};
use crate::search::{SearchSolution, SearchTarget, TargetSearch};
use crate::settings::GlobalSettings;

/// One analysis case: host-supplied variables plus an optional search target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCase {
    pub name: String,

    /// Variable values referenced by cash-flow drivers
    #[serde(default)]
    pub variables: HashMap<String, f64>,

    /// When set, solve for the multiplier instead of direct evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<SearchTarget>,
}

impl AnalysisCase {
    /// Direct-evaluation case with no variables
    pub fn evaluation(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
            target: None,
        }
    }
}

/// Outcome of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub case: String,
    /// Metrics of the combined series (at the solved multiplier in search mode)
    pub metrics: MetricResult,
    /// Solved multiplier, search mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    /// Refinement iterations, search mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
}

/// Stateless per-run analysis engine
#[derive(Debug, Clone)]
pub struct AnalysisRunner {
    settings: GlobalSettings,
    components: Vec<Component>,
}

impl AnalysisRunner {
    /// Validate the configuration and build a runner
    ///
    /// Amortization plans are expanded into concrete patterns here, so each
    /// case evaluation works on fully resolved components.
    pub fn new(
        settings: GlobalSettings,
        mut components: Vec<Component>,
    ) -> Result<Self, EconError> {
        settings.validate()?;
        if components.is_empty() {
            return Err(EconError::config("an analysis run needs at least one component"));
        }
        let mut seen = std::collections::HashSet::new();
        for comp in &mut components {
            if !seen.insert(comp.name.clone()) {
                return Err(EconError::config(format!(
                    "component names must be unique, \"{}\" appears twice",
                    comp.name
                )));
            }
            comp.resolve_patterns()?;
            comp.validate()?;
        }
        Ok(Self {
            settings,
            components,
        })
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Expand all flows onto the project horizon for one case
    fn project(&self, variables: &HashMap<String, f64>) -> Result<ProjectCashflows, EconError> {
        aggregate::combine(&self.settings, &self.components, variables)
    }

    /// Direct evaluation: metrics of the combined series at multiplier 1
    pub fn evaluate(&self, variables: &HashMap<String, f64>) -> Result<MetricResult, EconError> {
        let flows = self.project(variables)?;
        Ok(metrics::evaluate(&flows.total(), self.settings.discount_rate))
    }

    /// Search mode: solve for the multiplier achieving the target
    pub fn solve(
        &self,
        target: &SearchTarget,
        variables: &HashMap<String, f64>,
    ) -> Result<SearchSolution, EconError> {
        let flows = self.project(variables)?;
        TargetSearch::new(&flows, self.settings.discount_rate).search(target)
    }

    /// Run one case in its requested mode
    pub fn run_case(&self, case: &AnalysisCase) -> Result<CaseReport, EconError> {
        info!("running case \"{}\"", case.name);
        match &case.target {
            Some(target) => {
                let solution = self.solve(target, &case.variables)?;
                Ok(CaseReport {
                    case: case.name.clone(),
                    metrics: solution.metrics,
                    multiplier: Some(solution.multiplier),
                    iterations: Some(solution.iterations),
                })
            }
            None => Ok(CaseReport {
                case: case.name.clone(),
                metrics: self.evaluate(&case.variables)?,
                multiplier: None,
                iterations: None,
            }),
        }
    }

    /// Run a batch of independent cases, failing on the first error
    pub fn run_cases(&self, cases: &[AnalysisCase]) -> Result<Vec<CaseReport>, EconError> {
        cases.iter().map(|case| self.run_case(case)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CashFlow;
    use crate::search::TargetMetric;
    use approx::assert_relative_eq;

    fn test_runner() -> AnalysisRunner {
        let comp = Component::new("plant", 4)
            .with_cash_flow(CashFlow::from_pattern("capex", vec![-100.0, 0.0, 0.0, 0.0]))
            .with_cash_flow(
                CashFlow::from_pattern("sales", vec![0.0, 50.0, 50.0, 50.0]).with_mult_target(),
            );
        AnalysisRunner::new(GlobalSettings::new(0.10), vec![comp]).unwrap()
    }

    #[test]
    fn test_direct_evaluation() {
        let runner = test_runner();
        let metrics = runner.evaluate(&HashMap::new()).unwrap();

        assert_relative_eq!(metrics.npv, 24.3425, epsilon = 1e-3);
        assert_relative_eq!(metrics.irr.unwrap(), 0.234, epsilon = 1e-3);
        assert_relative_eq!(metrics.pi.unwrap(), 1.2434, epsilon = 1e-3);
    }

    #[test]
    fn test_search_case_reports_multiplier() {
        let runner = test_runner();
        let case = AnalysisCase {
            name: "breakeven".into(),
            variables: HashMap::new(),
            target: Some(SearchTarget::new(TargetMetric::Npv, 0.0)),
        };

        let report = runner.run_case(&case).unwrap();
        let multiplier = report.multiplier.unwrap();
        // 124.34 * m = 100 at breakeven
        assert_relative_eq!(multiplier, 100.0 / 124.3426, epsilon = 1e-4);
        assert_relative_eq!(report.metrics.npv, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_batch_runs_all_cases() {
        let runner = test_runner();
        let cases = vec![
            AnalysisCase::evaluation("base"),
            AnalysisCase {
                name: "breakeven".into(),
                variables: HashMap::new(),
                target: Some(SearchTarget::new(TargetMetric::Npv, 0.0)),
            },
        ];

        let reports = runner.run_cases(&cases).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].multiplier.is_none());
        assert!(reports[1].multiplier.is_some());
    }

    #[test]
    fn test_rejects_duplicate_component_names() {
        let comp = Component::new("plant", 2)
            .with_cash_flow(CashFlow::from_pattern("net", vec![-1.0, 2.0]));
        let err =
            AnalysisRunner::new(GlobalSettings::new(0.10), vec![comp.clone(), comp]).unwrap_err();
        assert!(matches!(err, EconError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_amortization_plans_resolve_at_construction() {
        use crate::component::AmortizationPlan;

        let mut depreciation = CashFlow::from_pattern("depreciation", vec![]);
        depreciation.amortization = Some(AmortizationPlan::Macrs {
            class_years: 3,
            start_value: 100.0,
        });
        let comp = Component::new("asset", 5).with_cash_flow(depreciation);

        let runner = AnalysisRunner::new(GlobalSettings::new(0.05), vec![comp]).unwrap();
        let alpha = &runner.components()[0].cash_flows[0].alpha;
        assert_eq!(alpha.len(), 5);
        assert_relative_eq!(alpha.iter().sum::<f64>(), 100.0, epsilon = 1e-6);
    }
}
