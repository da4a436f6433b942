//! Internal rate of return of an annual cash-flow stream
//!
//! Cash flow `t` falls at the start of year `t`; negative values are money paid
//! in, positive values money paid out.

const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: usize = 200;
const RATE_BOUNDS: (f64, f64) = (-0.99, 10.0);

/// Annual rate at which the stream's NPV is zero.
///
/// Newton steps from 5% first; bisection over [-99%, 1000%] when Newton stalls
/// or lands on a bound. `None` without both an inflow and an outflow, or when
/// no root lies inside the bounds.
pub fn calculate_irr(cashflows: &[f64]) -> Option<f64> {
    let has_inflow = cashflows.iter().any(|&cf| cf > 1e-10);
    let has_outflow = cashflows.iter().any(|&cf| cf < -1e-10);
    if !(has_inflow && has_outflow) {
        return None;
    }

    newton(cashflows).or_else(|| bisect(cashflows))
}

/// NPV at an annual rate, evaluated in Horner form
pub fn npv_at_rate(cashflows: &[f64], rate: f64) -> f64 {
    let growth = 1.0 + rate;
    cashflows.iter().rev().fold(0.0, |acc, &cf| acc / growth + cf)
}

/// d(NPV)/d(rate)
fn npv_slope(cashflows: &[f64], rate: f64) -> f64 {
    let growth = 1.0 + rate;
    cashflows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, &cf)| -(t as f64) * cf / growth.powi(t as i32 + 1))
        .sum()
}

fn newton(cashflows: &[f64]) -> Option<f64> {
    let (low, high) = RATE_BOUNDS;
    let mut rate = 0.05;

    for _ in 0..MAX_ITERATIONS {
        let slope = npv_slope(cashflows, rate);
        if slope.abs() < 1e-20 {
            return None;
        }

        let next = (rate - npv_at_rate(cashflows, rate) / slope).clamp(low, high);
        if (next - rate).abs() < TOLERANCE {
            // A clamped fixed point is not a root
            return (next > low && next < high).then_some(next);
        }
        rate = next;
    }

    None
}

fn bisect(cashflows: &[f64]) -> Option<f64> {
    let (mut low, mut high) = RATE_BOUNDS;
    let mut npv_low = npv_at_rate(cashflows, low);
    if npv_low * npv_at_rate(cashflows, high) > 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        let npv_mid = npv_at_rate(cashflows, mid);
        if npv_mid.abs() < TOLERANCE || high - low < 2.0 * TOLERANCE {
            return Some(mid);
        }

        if (npv_mid < 0.0) == (npv_low < 0.0) {
            low = mid;
            npv_low = npv_mid;
        } else {
            high = mid;
        }
    }

    Some(0.5 * (low + high))
}
