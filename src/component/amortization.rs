//! Depreciation schedules usable as cash-flow patterns
//!
//! MACRS percentage tables for the standard property classes, plus custom
//! percentage plans. Percentages are applied from period 1; period 0 is the
//! acquisition period and carries no depreciation.

use serde::{Deserialize, Serialize};

use crate::error::EconError;

/// MACRS half-year convention percentages by property class (class years ->
/// class years + 1 entries, in percent)
const MACRS_3: [f64; 4] = [33.33, 44.45, 14.81, 7.41];
const MACRS_5: [f64; 6] = [20.00, 32.00, 19.20, 11.52, 11.52, 5.76];
const MACRS_7: [f64; 8] = [14.29, 24.49, 17.49, 12.49, 8.93, 8.92, 8.93, 4.46];
const MACRS_10: [f64; 11] = [
    10.00, 18.00, 14.40, 11.52, 9.22, 7.37, 6.55, 6.55, 6.56, 6.55, 3.28,
];
const MACRS_15: [f64; 16] = [
    5.0, 9.5, 8.55, 7.7, 6.93, 6.23, 5.9, 5.9, 5.91, 5.9, 5.91, 5.9, 5.91, 5.9, 5.91, 2.95,
];
const MACRS_20: [f64; 21] = [
    3.750, 7.219, 6.677, 6.177, 5.713, 5.285, 4.888, 4.522, 4.462, 4.461, 4.462, 4.461, 4.462,
    4.461, 4.462, 4.461, 4.462, 4.461, 4.462, 4.461, 2.231,
];

fn macrs_percentages(class_years: usize) -> Option<&'static [f64]> {
    match class_years {
        3 => Some(&MACRS_3),
        5 => Some(&MACRS_5),
        7 => Some(&MACRS_7),
        10 => Some(&MACRS_10),
        15 => Some(&MACRS_15),
        20 => Some(&MACRS_20),
        _ => None,
    }
}

/// Depreciation plan attached to a cash flow in place of an explicit pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum AmortizationPlan {
    /// Standard MACRS class (3, 5, 7, 10, 15 or 20 years)
    Macrs { class_years: usize, start_value: f64 },
    /// Custom percentage plan (entries in percent)
    Custom {
        percentages: Vec<f64>,
        start_value: f64,
    },
}

impl AmortizationPlan {
    /// Expand into a per-period pattern of the component lifetime
    pub fn expand(&self, lifetime: usize) -> Result<Vec<f64>, EconError> {
        let (percentages, start_value) = match self {
            AmortizationPlan::Macrs {
                class_years,
                start_value,
            } => {
                let pcts = macrs_percentages(*class_years).ok_or_else(|| {
                    EconError::config(format!(
                        "MACRS class of {class_years} years is not allowed \
                         (expected 3, 5, 7, 10, 15 or 20)"
                    ))
                })?;
                (pcts.to_vec(), *start_value)
            }
            AmortizationPlan::Custom {
                percentages,
                start_value,
            } => (percentages.clone(), *start_value),
        };

        // period 0 holds no depreciation, so the plan needs lifetime - 1 slots
        if percentages.len() + 1 > lifetime {
            return Err(EconError::config(format!(
                "amortization plan spans {} periods but the component lifetime \
                 is only {lifetime}",
                percentages.len() + 1
            )));
        }

        let mut alpha = vec![0.0; lifetime];
        for (i, pct) in percentages.iter().enumerate() {
            alpha[i + 1] = pct / 100.0 * start_value;
        }
        Ok(alpha)
    }
}
