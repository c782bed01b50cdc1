//! Component and cash-flow model definitions
//!
//! A cash flow follows the scaling law `C[t] = m * alpha[t] * (D / D')^x`
//! where `m` is the search multiplier (for mult-target flows), `alpha` the
//! base per-period amounts, `D` the driver, `D'` the reference driver level
//! and `x` the economy-of-scale exponent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::amortization::AmortizationPlan;
use crate::error::EconError;
use crate::settings::GlobalSettings;

/// Source of a cash flow's driver value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Driver {
    /// Fixed scalar known at configuration time
    Fixed(f64),
    /// Named variable supplied by the host per analysis case
    Variable(String),
}

impl Default for Driver {
    fn default() -> Self {
        Driver::Fixed(1.0)
    }
}

impl Driver {
    /// Resolve against the case variables
    pub fn resolve(&self, variables: &HashMap<String, f64>) -> Result<f64, EconError> {
        match self {
            Driver::Fixed(value) => Ok(*value),
            Driver::Variable(name) => variables.get(name).copied().ok_or_else(|| {
                EconError::config(format!(
                    "driver variable \"{name}\" not found among case variables"
                ))
            }),
        }
    }
}

/// Inflation treatment of a cash flow during project expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InflationMode {
    /// Deflate by `(1 + inflation)^-t` at project period `t`
    Real,
    /// Not supported; treated as `None` with a warning at validation
    Nominal,
    /// No inflation adjustment
    #[default]
    None,
}

/// A single cash flow belonging to a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlow {
    /// Name, unique within the component
    pub name: String,

    /// Base per-period amounts over one component lifetime
    /// (negative = expense, positive = revenue)
    #[serde(default)]
    pub alpha: Vec<f64>,

    /// Generate `alpha` from a depreciation plan instead of listing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization: Option<AmortizationPlan>,

    /// Driver quantity `D`
    #[serde(default)]
    pub driver: Driver,

    /// Reference driver level `D'` at which `alpha` is accurate
    #[serde(default = "default_reference")]
    pub reference: f64,

    /// Economy-of-scale exponent `x`
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Whether the tax multiplier `(1 - tax)` applies
    #[serde(default)]
    pub taxable: bool,

    /// Inflation treatment
    #[serde(default)]
    pub inflation: InflationMode,

    /// Whether the target-search multiplier scales this flow
    #[serde(default)]
    pub mult_target: bool,
}

fn default_reference() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

impl CashFlow {
    /// Create a flow with the given base pattern and neutral scaling
    pub fn from_pattern(name: impl Into<String>, alpha: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            alpha,
            amortization: None,
            driver: Driver::default(),
            reference: 1.0,
            scale: 1.0,
            taxable: false,
            inflation: InflationMode::None,
            mult_target: false,
        }
    }

    /// Mark this flow as scaled by the search multiplier
    pub fn with_mult_target(mut self) -> Self {
        self.mult_target = true;
        self
    }

    /// Resolve this flow's driver against the case variables
    pub fn resolve_driver(&self, variables: &HashMap<String, f64>) -> Result<f64, EconError> {
        self.driver.resolve(variables)
    }

    /// Evaluate the lifetime amounts under a trial multiplier
    ///
    /// The multiplier only applies to mult-target flows; all other flows are
    /// insensitive to it.
    pub fn evaluate(&self, driver: f64, multiplier: f64) -> Vec<f64> {
        let m = if self.mult_target { multiplier } else { 1.0 };
        let scaling = (driver / self.reference).powf(self.scale);
        self.alpha.iter().map(|a| m * a * scaling).collect()
    }
}

/// One physical component of the project, owning its cash flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Name, unique within the run
    pub name: String,

    /// Lifetime of one build in periods
    pub lifetime: usize,

    /// First project period in which the component operates
    #[serde(default)]
    pub start_period: usize,

    /// Number of lifetime cycles; 0 = rebuild until the horizon
    #[serde(default)]
    pub repetitions: usize,

    /// Component-level tax rate override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,

    /// Component-level inflation rate override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflation: Option<f64>,

    /// Cash flows evaluated for this component
    #[serde(default)]
    pub cash_flows: Vec<CashFlow>,
}

impl Component {
    /// Create a component with no cash flows yet
    pub fn new(name: impl Into<String>, lifetime: usize) -> Self {
        Self {
            name: name.into(),
            lifetime,
            start_period: 0,
            repetitions: 0,
            tax: None,
            inflation: None,
            cash_flows: Vec::new(),
        }
    }

    /// Add a cash flow (builder style)
    pub fn with_cash_flow(mut self, cash_flow: CashFlow) -> Self {
        self.cash_flows.push(cash_flow);
        self
    }

    /// Effective tax rate, falling back to the global default
    pub fn tax_rate(&self, settings: &GlobalSettings) -> f64 {
        self.tax.unwrap_or(settings.tax)
    }

    /// Effective inflation rate, falling back to the global default
    pub fn inflation_rate(&self, settings: &GlobalSettings) -> f64 {
        self.inflation.unwrap_or(settings.inflation)
    }

    /// Expand amortization plans into concrete `alpha` patterns
    ///
    /// A flow may carry either an explicit pattern or a plan, not both.
    pub fn resolve_patterns(&mut self) -> Result<(), EconError> {
        for cf in &mut self.cash_flows {
            if let Some(plan) = cf.amortization.take() {
                if !cf.alpha.is_empty() {
                    return Err(EconError::config(format!(
                        "cash flow \"{}\" of \"{}\" has both an alpha pattern and an \
                         amortization plan",
                        cf.name, self.name
                    )));
                }
                cf.alpha = plan.expand(self.lifetime)?;
            }
        }
        Ok(())
    }

    /// Check structural invariants and rate bounds
    pub fn validate(&self) -> Result<(), EconError> {
        if self.lifetime == 0 {
            return Err(EconError::config(format!(
                "component \"{}\" must have a lifetime of at least 1 period",
                self.name
            )));
        }
        for rate in [self.tax, self.inflation].into_iter().flatten() {
            if !rate.is_finite() || rate < -1.0 {
                return Err(EconError::config(format!(
                    "component \"{}\" has a rate override outside [-1, inf): {rate}",
                    self.name
                )));
            }
        }
        if self.cash_flows.is_empty() {
            return Err(EconError::config(format!(
                "component \"{}\" has no cash flows",
                self.name
            )));
        }
        for cf in &self.cash_flows {
            if cf.amortization.is_some() {
                return Err(EconError::config(format!(
                    "cash flow \"{}\" of \"{}\" has an unexpanded amortization plan; \
                     call resolve_patterns first",
                    cf.name, self.name
                )));
            }
            if cf.alpha.len() != self.lifetime {
                return Err(EconError::config(format!(
                    "cash flow \"{}\" of \"{}\" has {} amounts but the component \
                     lifetime is {}",
                    cf.name,
                    self.name,
                    cf.alpha.len(),
                    self.lifetime
                )));
            }
            if !cf.alpha.iter().all(|a| a.is_finite()) {
                return Err(EconError::config(format!(
                    "cash flow \"{}\" of \"{}\" contains non-finite amounts",
                    cf.name, self.name
                )));
            }
            if cf.reference == 0.0 || !cf.reference.is_finite() {
                return Err(EconError::config(format!(
                    "cash flow \"{}\" of \"{}\" has a zero or non-finite reference driver",
                    cf.name, self.name
                )));
            }
            if cf.inflation == InflationMode::Nominal {
                log::warn!(
                    "cash flow \"{}\" of \"{}\": nominal inflation is not supported, \
                     treating as no adjustment",
                    cf.name,
                    self.name
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_component() -> Component {
        Component::new("plant", 4)
            .with_cash_flow(CashFlow::from_pattern("capex", vec![-100.0, 0.0, 0.0, 0.0]))
            .with_cash_flow(CashFlow::from_pattern("sales", vec![0.0, 50.0, 50.0, 50.0]).with_mult_target())
    }

    #[test]
    fn test_evaluate_is_linear_in_multiplier() {
        let comp = test_component();
        let sales = &comp.cash_flows[1];

        let at_one = sales.evaluate(1.0, 1.0);
        let at_three = sales.evaluate(1.0, 3.0);
        for (a, b) in at_one.iter().zip(&at_three) {
            assert_relative_eq!(*b, a * 3.0);
        }

        // non-target flows ignore the multiplier
        let capex = &comp.cash_flows[0];
        assert_eq!(capex.evaluate(1.0, 1.0), capex.evaluate(1.0, 5.0));
    }

    #[test]
    fn test_scaling_law() {
        let mut cf = CashFlow::from_pattern("vom", vec![10.0, 10.0]);
        cf.reference = 2.0;
        cf.scale = 0.5;

        // (8 / 2)^0.5 = 2
        let amounts = cf.evaluate(8.0, 1.0);
        assert_relative_eq!(amounts[0], 20.0);
    }

    #[test]
    fn test_driver_resolution() {
        let mut variables = HashMap::new();
        variables.insert("production_cost".to_string(), 42.0);

        assert_eq!(Driver::Fixed(7.0).resolve(&variables).unwrap(), 7.0);
        assert_eq!(
            Driver::Variable("production_cost".into())
                .resolve(&variables)
                .unwrap(),
            42.0
        );
        assert!(Driver::Variable("missing".into()).resolve(&variables).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut comp = test_component();
        assert!(comp.validate().is_ok());

        comp.cash_flows[0].alpha.pop();
        assert!(comp.validate().is_err());

        let empty = Component::new("empty", 0);
        assert!(empty.validate().is_err());

        let mut bad_ref = test_component();
        bad_ref.cash_flows[1].reference = 0.0;
        assert!(bad_ref.validate().is_err());
    }

    #[test]
    fn test_component_overrides_fall_back_to_global() {
        let settings = GlobalSettings {
            tax: 0.3,
            inflation: 0.02,
            ..GlobalSettings::new(0.08)
        };

        let mut comp = test_component();
        assert_relative_eq!(comp.tax_rate(&settings), 0.3);
        assert_relative_eq!(comp.inflation_rate(&settings), 0.02);

        comp.tax = Some(0.1);
        assert_relative_eq!(comp.tax_rate(&settings), 0.1);
    }

    #[test]
    fn test_parses_driver_forms_from_json() {
        let cf: CashFlow = serde_json::from_str(
            r#"{"name": "fuel", "alpha": [1.0, 2.0], "driver": "fuel_price", "mult_target": true}"#,
        )
        .unwrap();
        assert!(matches!(cf.driver, Driver::Variable(ref v) if v == "fuel_price"));
        assert!(cf.mult_target);

        let cf: CashFlow =
            serde_json::from_str(r#"{"name": "fuel", "alpha": [1.0], "driver": 3.5}"#).unwrap();
        assert!(matches!(cf.driver, Driver::Fixed(v) if v == 3.5));
    }
}
