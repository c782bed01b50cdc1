//! Economic metric evaluation: NPV, IRR, Profitability Index
//!
//! All functions are pure; rates are per-period decimals. Undefined metrics
//! (IRR with no sign change, PI with no investment portion) come back as
//! `None` rather than errors.

use serde::{Deserialize, Serialize};

/// Metrics computed from one aggregated project series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    /// Net present value at the firm discount rate
    pub npv: f64,
    /// Internal rate of return; `None` when the series has no sign change
    /// or root finding fails
    pub irr: Option<f64>,
    /// Profitability index; `None` when the investment portion is zero
    pub pi: Option<f64>,
}

/// Net present value of a series at the given per-period rate
///
/// Period 0 is undiscounted: `sum_t series[t] / (1 + rate)^t`.
pub fn npv(series: &[f64], rate: f64) -> f64 {
    series
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Internal rate of return via Newton-Raphson with a bisection fallback
pub fn irr(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }

    if series.iter().all(|&cf| cf.abs() < 1e-10) {
        return Some(0.0);
    }

    // a root requires at least one sign change
    let has_positive = series.iter().any(|&cf| cf > 1e-10);
    let has_negative = series.iter().any(|&cf| cf < -1e-10);
    if !has_positive || !has_negative {
        return None;
    }

    let mut rate = 0.05;
    let tolerance = 1e-10;
    let max_iterations = 1000;

    for _ in 0..max_iterations {
        let (value, derivative) = npv_and_derivative(series, rate);

        if derivative.abs() < 1e-20 {
            // flat derivative, switch to bisection
            return irr_bisection(series);
        }

        let new_rate = (rate - value / derivative).clamp(-0.99, 10.0);

        if (new_rate - rate).abs() < tolerance {
            return Some(new_rate);
        }

        rate = new_rate;
    }

    // Newton-Raphson didn't converge
    irr_bisection(series)
}

/// NPV and its derivative with respect to the rate
fn npv_and_derivative(series: &[f64], rate: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut derivative = 0.0;

    for (t, &cf) in series.iter().enumerate() {
        value += cf / (1.0 + rate).powi(t as i32);
        if t > 0 {
            derivative -= (t as f64) * cf / (1.0 + rate).powi(t as i32 + 1);
        }
    }

    (value, derivative)
}

/// Fallback IRR search by bisection over [-0.99, 10.0]
fn irr_bisection(series: &[f64]) -> Option<f64> {
    let mut low = -0.99_f64;
    let mut high = 10.0_f64;
    let tolerance = 1e-10;
    let max_iterations = 1000;

    if npv(series, low) * npv(series, high) > 0.0 {
        return None;
    }

    for _ in 0..max_iterations {
        let mid = (low + high) / 2.0;
        let value = npv(series, mid);

        if value.abs() < tolerance || (high - low) / 2.0 < tolerance {
            return Some(mid);
        }

        if value * npv(series, low) < 0.0 {
            high = mid;
        } else {
            low = mid;
        }
    }

    None
}

/// Profitability index: discounted returns over discounted investment
///
/// `NPV(positive portion) / |NPV(negative portion)|`, `None` when the
/// investment portion discounts to zero.
pub fn profitability_index(series: &[f64], rate: f64) -> Option<f64> {
    let positives: Vec<f64> = series.iter().map(|&cf| cf.max(0.0)).collect();
    let negatives: Vec<f64> = series.iter().map(|&cf| cf.min(0.0)).collect();

    let investment = npv(&negatives, rate).abs();
    if investment < 1e-10 {
        return None;
    }

    Some(npv(&positives, rate) / investment)
}

/// Evaluate all metrics for one series
pub fn evaluate(series: &[f64], discount_rate: f64) -> MetricResult {
    MetricResult {
        npv: npv(series, discount_rate),
        irr: irr(series),
        pi: profitability_index(series, discount_rate),
    }
}
