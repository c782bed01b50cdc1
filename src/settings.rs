//! Global run settings shared by every component of an analysis

use serde::{Deserialize, Serialize};

use crate::error::EconError;

/// Policy for components whose operating window is not a whole number
/// of lifetime cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Reject the configuration
    #[default]
    Strict,
    /// Cut the final partial cycle
    Truncate,
}

/// Global economic settings for an analysis run
///
/// Tax and inflation act as defaults; individual components may override
/// them. The project horizon defaults to the least common multiple of the
/// component lifetimes when `project_time` is not given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Firm discount rate per period (decimal, e.g. 0.08)
    pub discount_rate: f64,

    /// Default tax rate applied to taxable cash flows
    #[serde(default)]
    pub tax: f64,

    /// Default inflation rate per period
    #[serde(default)]
    pub inflation: f64,

    /// Explicit analysis horizon in periods
    #[serde(default)]
    pub project_time: Option<usize>,

    /// How to treat lifetimes that do not evenly divide the horizon
    #[serde(default)]
    pub truncation: TruncationPolicy,
}

impl GlobalSettings {
    /// Create settings with the given discount rate and all defaults
    pub fn new(discount_rate: f64) -> Self {
        Self {
            discount_rate,
            tax: 0.0,
            inflation: 0.0,
            project_time: None,
            truncation: TruncationPolicy::default(),
        }
    }

    /// Check rate bounds; a rate at or below -100% makes discount factors
    /// non-finite or meaningless
    pub fn validate(&self) -> Result<(), EconError> {
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(EconError::config(format!(
                "discount rate must be finite and greater than -1, got {}",
                self.discount_rate
            )));
        }
        if !self.tax.is_finite() || self.tax < -1.0 {
            return Err(EconError::config(format!(
                "tax rate must be finite and at least -1, got {}",
                self.tax
            )));
        }
        if !self.inflation.is_finite() || self.inflation <= -1.0 {
            return Err(EconError::config(format!(
                "inflation rate must be finite and greater than -1, got {}",
                self.inflation
            )));
        }
        if self.project_time == Some(0) {
            return Err(EconError::config("project time must be at least 1 period"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GlobalSettings::new(0.08);
        assert_eq!(settings.tax, 0.0);
        assert_eq!(settings.inflation, 0.0);
        assert!(settings.project_time.is_none());
        assert_eq!(settings.truncation, TruncationPolicy::Strict);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rates() {
        let mut settings = GlobalSettings::new(-1.0);
        assert!(settings.validate().is_err());

        settings.discount_rate = 0.05;
        settings.inflation = -1.5;
        assert!(settings.validate().is_err());

        settings.inflation = 0.02;
        settings.tax = f64::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parses_from_json() {
        let settings: GlobalSettings = serde_json::from_str(
            r#"{"discount_rate": 0.10, "tax": 0.25, "project_time": 30, "truncation": "truncate"}"#,
        )
        .unwrap();
        assert_eq!(settings.discount_rate, 0.10);
        assert_eq!(settings.tax, 0.25);
        assert_eq!(settings.project_time, Some(30));
        assert_eq!(settings.truncation, TruncationPolicy::Truncate);
    }
}
