//! Implied volatility solver: Newton-Raphson from a Brenner-Subrahmanyam
//! seed, falling back to bisection when vega is too flat to trust.

use crate::numerics::root_find::{newton_bisection, RootFindError};
use crate::options::black_scholes::{bs_greeks, bs_price, discounted_intrinsic};
use crate::options::contract::OptionType;

const SIGMA_LO: f64 = 1e-3;
const SIGMA_HI: f64 = 5.0;
const PRICE_TOL: f64 = 1e-7;
const NEWTON_ITERS: usize = 10;
const MAX_BISECTION_ITERS: usize = 100;

/// Brenner-Subrahmanyam initial volatility guess, clamped to a sane range.
fn seed_guess(price: f64, s: f64, t: f64) -> f64 {
    let raw = (2.0 * std::f64::consts::PI / t).sqrt() * price / s;
    raw.clamp(0.1, 1.0)
}

/// Solve for the implied volatility that reprices `target_price` under
/// Black-Scholes. Returns `f64::NAN` if the target is below the no-arbitrage
/// intrinsic floor or the solver does not converge.
pub fn implied_volatility(
    target_price: f64,
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    q: f64,
    option_type: OptionType,
) -> f64 {
    if target_price <= 0.0 || s <= 0.0 || k <= 0.0 || t <= 0.0 {
        return f64::NAN;
    }
    let intrinsic = discounted_intrinsic(s, k, t, r, q, option_type);
    if target_price < intrinsic {
        return f64::NAN;
    }

    let x0 = seed_guess(target_price, s, t);
    let f = |sigma: f64| bs_price(s, k, t, sigma, r, q, option_type) - target_price;
    let fprime = |sigma: f64| bs_greeks(s, k, t, sigma, r, q, option_type).vega * 100.0;

    match newton_bisection(
        f,
        fprime,
        x0,
        (SIGMA_LO, SIGMA_HI),
        PRICE_TOL,
        NEWTON_ITERS,
        MAX_BISECTION_ITERS,
    ) {
        Ok(sigma) => sigma,
        Err(RootFindError::NotBracketed { .. }) | Err(RootFindError::NonConvergent { .. }) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn round_trips_a_known_vol() {
        let (s, k, t, r, q) = (100.0, 105.0, 0.25, 0.05, 0.01);
        for sigma in [0.1, 0.2, 0.35, 0.6] {
            let price = bs_price(s, k, t, sigma, r, q, OptionType::Call);
            let iv = implied_volatility(price, s, k, t, r, q, OptionType::Call);
            assert!(!iv.is_nan(), "sigma={sigma} produced NaN IV");
            assert_abs_diff_eq!(iv, sigma, epsilon = 1e-5);
        }
    }

    #[test]
    fn round_trips_for_puts_too() {
        let (s, k, t, r, q) = (100.0, 95.0, 0.5, 0.03, 0.0);
        let sigma = 0.3;
        let price = bs_price(s, k, t, sigma, r, q, OptionType::Put);
        let iv = implied_volatility(price, s, k, t, r, q, OptionType::Put);
        assert_abs_diff_eq!(iv, sigma, epsilon = 1e-5);
    }

    #[test]
    fn below_intrinsic_is_nan() {
        let iv = implied_volatility(0.0001, 100.0, 50.0, 0.25, 0.05, 0.0, OptionType::Call);
        assert!(iv.is_nan());
    }

    #[test]
    fn non_positive_inputs_are_nan() {
        assert!(implied_volatility(5.0, 0.0, 100.0, 0.25, 0.05, 0.0, OptionType::Call).is_nan());
        assert!(implied_volatility(5.0, 100.0, 100.0, 0.0, 0.05, 0.0, OptionType::Call).is_nan());
    }
}
