//! Aggregation of component cash flows onto the project horizon
//!
//! Each component's lifetime pattern is cycled over its operating window
//! (rebuild on each cycle start) and adjusted for tax and inflation per
//! project period, then all contributions are summed period-by-period.

use std::collections::HashMap;

use log::debug;

use crate::component::{CashFlow, Component, InflationMode};
use crate::error::EconError;
use crate::settings::{GlobalSettings, TruncationPolicy};

fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

/// Analysis horizon: the explicit project time, else the least common
/// multiple of the component lifetimes
pub fn project_length(
    settings: &GlobalSettings,
    components: &[Component],
) -> Result<usize, EconError> {
    if let Some(periods) = settings.project_time {
        return Ok(periods);
    }
    if components.is_empty() {
        return Err(EconError::config(
            "cannot derive a project horizon from an empty component set",
        ));
    }
    let horizon = components.iter().fold(1, |acc, c| lcm(acc, c.lifetime));
    debug!("project horizon from lifetime lcm: {horizon} periods");
    Ok(horizon)
}

/// One cash flow expanded onto the project horizon
#[derive(Debug, Clone)]
pub struct ProjectFlow {
    pub component: String,
    pub cashflow: String,
    pub mult_target: bool,
    pub values: Vec<f64>,
}

/// All expanded flows of a run, kept per flow so mult-target flows can be
/// rescaled without re-expansion
#[derive(Debug, Clone)]
pub struct ProjectCashflows {
    pub horizon: usize,
    pub flows: Vec<ProjectFlow>,
}

impl ProjectCashflows {
    /// Free cash flow to the firm per period, with mult-target flows scaled
    /// by the multiplier
    pub fn fcff(&self, multiplier: f64) -> Vec<f64> {
        let mut total = vec![0.0; self.horizon];
        for flow in &self.flows {
            let m = if flow.mult_target { multiplier } else { 1.0 };
            for (acc, value) in total.iter_mut().zip(&flow.values) {
                *acc += m * value;
            }
        }
        total
    }

    /// Combined series at the nominal multiplier
    pub fn total(&self) -> Vec<f64> {
        self.fcff(1.0)
    }

    /// Whether any flow responds to the search multiplier
    pub fn has_mult_target(&self) -> bool {
        self.flows.iter().any(|f| f.mult_target)
    }
}

/// Expand and combine all components over the analysis horizon
pub fn combine(
    settings: &GlobalSettings,
    components: &[Component],
    variables: &HashMap<String, f64>,
) -> Result<ProjectCashflows, EconError> {
    let horizon = project_length(settings, components)?;
    let mut flows = Vec::new();

    for comp in components {
        let tax = comp.tax_rate(settings);
        let inflation = comp.inflation_rate(settings);

        for cf in &comp.cash_flows {
            let values = expand_flow(comp, cf, horizon, tax, inflation, settings.truncation, variables)?;
            flows.push(ProjectFlow {
                component: comp.name.clone(),
                cashflow: cf.name.clone(),
                mult_target: cf.mult_target,
                values,
            });
        }
    }

    Ok(ProjectCashflows { horizon, flows })
}

/// Expand a single cash flow over its operating window within the horizon
fn expand_flow(
    comp: &Component,
    cf: &CashFlow,
    horizon: usize,
    tax: f64,
    inflation: f64,
    truncation: TruncationPolicy,
    variables: &HashMap<String, f64>,
) -> Result<Vec<f64>, EconError> {
    let life = comp.lifetime;
    let start = comp.start_period;

    let mut values = vec![0.0; horizon];
    if start >= horizon {
        log::warn!(
            "component \"{}\" starts at period {start}, beyond the {horizon}-period horizon",
            comp.name
        );
        return Ok(values);
    }

    // last period the component exists; repetitions = 0 means rebuild
    // until the horizon
    let end = if comp.repetitions == 0 {
        horizon
    } else {
        horizon.min(start + life * comp.repetitions)
    };

    let window = end - start;
    if window % life != 0 && truncation == TruncationPolicy::Strict {
        return Err(EconError::IncompatibleHorizon {
            component: comp.name.clone(),
            lifetime: life,
            window,
            horizon,
        });
    }

    let driver = cf.resolve_driver(variables)?;
    let lifetime_amounts = cf.evaluate(driver, 1.0);
    if lifetime_amounts.len() != life {
        return Err(EconError::config(format!(
            "cash flow \"{}\" of \"{}\" has {} amounts for a lifetime of {life}",
            cf.name,
            comp.name,
            lifetime_amounts.len()
        )));
    }

    let tax_mult = if cf.taxable { 1.0 - tax } else { 1.0 };
    debug!(
        "expanding \"{}|{}\": window [{start}, {end}), tax multiplier {tax_mult}",
        comp.name, cf.name
    );

    for (t, slot) in values.iter_mut().enumerate().take(end).skip(start) {
        let relative = (t - start) % life;
        let inflation_adj = match cf.inflation {
            InflationMode::Real => (1.0 + inflation).powi(-(t as i32)),
            InflationMode::Nominal | InflationMode::None => 1.0,
        };
        *slot = lifetime_amounts[relative] * tax_mult * inflation_adj;
    }

    Ok(values)
}
