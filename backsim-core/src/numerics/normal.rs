//! Standard normal CDF and PDF, used throughout the Black-Scholes layer.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

fn standard_normal() -> Normal {
    // Mean 0, std dev 1; unwrap is safe, the parameters are constants.
    Normal::new(0.0, 1.0).expect("standard normal parameters are always valid")
}

/// Standard normal cumulative distribution function `N(x)`.
pub fn norm_cdf(x: f64) -> f64 {
    if x <= -6.0 {
        return 0.0;
    }
    if x >= 6.0 {
        return 1.0;
    }
    standard_normal().cdf(x)
}

/// Standard normal probability density function `n(x)`.
pub fn norm_pdf(x: f64) -> f64 {
    standard_normal().pdf(x)
}
