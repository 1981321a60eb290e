//! Black-Scholes price and Greeks.

use crate::numerics::{norm_cdf, norm_pdf};
use crate::options::contract::OptionType;
use crate::options::types::Greeks;

const T_MIN: f64 = 1e-6;
const SIGMA_MIN: f64 = 1e-3;
const SIGMA_MAX: f64 = 5.0;
const DAYS_PER_YEAR: f64 = 365.25;

fn clamp_inputs(t: f64, sigma: f64) -> (f64, f64) {
    (t.max(T_MIN), sigma.clamp(SIGMA_MIN, SIGMA_MAX))
}

fn d1_d2(s: f64, k: f64, t: f64, sigma: f64, r: f64, q: f64) -> (f64, f64) {
    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    (d1, d2)
}

/// Discounted intrinsic value, used by the implied-vol solver to reject
/// targets below the no-arbitrage floor.
pub fn discounted_intrinsic(s: f64, k: f64, t: f64, r: f64, q: f64, option_type: OptionType) -> f64 {
    let fwd = s * (-q * t).exp();
    let disc_k = k * (-r * t).exp();
    match option_type {
        OptionType::Call => (fwd - disc_k).max(0.0),
        OptionType::Put => (disc_k - fwd).max(0.0),
    }
}

/// Black-Scholes European option price.
pub fn bs_price(s: f64, k: f64, t: f64, sigma: f64, r: f64, q: f64, option_type: OptionType) -> f64 {
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 {
        return 0.0;
    }
    let (t, sigma) = clamp_inputs(t, sigma);
    let (d1, d2) = d1_d2(s, k, t, sigma, r, q);
    match option_type {
        OptionType::Call => s * (-q * t).exp() * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2),
        OptionType::Put => k * (-r * t).exp() * norm_cdf(-d2) - s * (-q * t).exp() * norm_cdf(-d1),
    }
}

/// Put-call parity residual `(C - P) - (S e^{-qT} - K e^{-rT})`. Should be
/// within 1e-6 of zero for matched call/put prices over reasonable inputs.
pub fn put_call_parity(s: f64, k: f64, t: f64, sigma: f64, r: f64, q: f64) -> f64 {
    let call = bs_price(s, k, t, sigma, r, q, OptionType::Call);
    let put = bs_price(s, k, t, sigma, r, q, OptionType::Put);
    (call - put) - (s * (-q * t).exp() - k * (-r * t).exp())
}

/// Full Greeks in a single pass, sharing `d1`/`d2` across all five.
pub fn bs_greeks(s: f64, k: f64, t: f64, sigma: f64, r: f64, q: f64, option_type: OptionType) -> Greeks {
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 {
        return Greeks::ZERO;
    }
    let (t, sigma) = clamp_inputs(t, sigma);
    let sqrt_t = t.sqrt();
    let (d1, d2) = d1_d2(s, k, t, sigma, r, q);
    let disc_q = (-q * t).exp();
    let disc_r = (-r * t).exp();
    let pdf_d1 = norm_pdf(d1);

    let (delta, rho_sign_cdf) = match option_type {
        OptionType::Call => (disc_q * norm_cdf(d1), norm_cdf(d2)),
        OptionType::Put => (disc_q * (norm_cdf(d1) - 1.0), -norm_cdf(-d2)),
    };

    let gamma = disc_q * pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * disc_q * pdf_d1 * sqrt_t / 100.0;

    let theta_continuous = match option_type {
        OptionType::Call => {
            -s * disc_q * pdf_d1 * sigma / (2.0 * sqrt_t) - r * k * disc_r * norm_cdf(d2)
                + q * s * disc_q * norm_cdf(d1)
        }
        OptionType::Put => {
            -s * disc_q * pdf_d1 * sigma / (2.0 * sqrt_t) + r * k * disc_r * norm_cdf(-d2)
                - q * s * disc_q * norm_cdf(-d1)
        }
    };
    let theta = theta_continuous / DAYS_PER_YEAR;

    let rho = match option_type {
        OptionType::Call => t * k * disc_r * rho_sign_cdf / 100.0,
        OptionType::Put => t * k * disc_r * rho_sign_cdf / 100.0,
    };

    Greeks::new(delta, gamma, theta, vega, rho)
}
