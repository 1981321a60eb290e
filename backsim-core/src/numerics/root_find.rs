//! A small generic root finder: Newton-Raphson with a bisection fallback.
//!
//! Used by the implied-volatility solver, kept free of any options-specific
//! types so it can be tested and reasoned about on its own.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RootFindError {
    #[error("target is not bracketed by f(lo)={f_lo} and f(hi)={f_hi}")]
    NotBracketed { f_lo: f64, f_hi: f64 },
    #[error("failed to converge after {iterations} iterations, best residual {residual}")]
    NonConvergent { iterations: usize, residual: f64 },
}

/// Find `x` such that `f(x) ≈ 0`, starting Newton-Raphson from `x0` using
/// `fprime` for the derivative, falling back to bisection within `bracket`
/// (inclusive, `f` must change sign across it) whenever a Newton step would
/// leave the bracket, the derivative is too flat to trust, or Newton has not
/// converged within `newton_iters` steps.
///
/// `f` and `fprime` should be cheap; both are called once per iteration.
pub fn newton_bisection<F, D>(
    f: F,
    fprime: D,
    x0: f64,
    bracket: (f64, f64),
    tol: f64,
    newton_iters: usize,
    max_iters: usize,
) -> Result<f64, RootFindError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let (mut lo, mut hi) = bracket;
    let mut f_lo = f(lo);
    let mut f_hi = f(hi);

    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(RootFindError::NotBracketed { f_lo, f_hi });
    }

    let mut x = x0.clamp(lo, hi);
    let mut last_residual = f64::MAX;

    // Newton phase.
    for _ in 0..newton_iters {
        let fx = f(x);
        last_residual = fx.abs();
        if last_residual < tol {
            return Ok(x);
        }
        let dfx = fprime(x);
        if dfx.abs() < 1e-10 {
            break;
        }
        let next = x - fx / dfx;
        if next.is_finite() && next > lo && next < hi {
            x = next;
        } else {
            break;
        }
    }

    // Narrow the bracket using whatever we know so far, then bisect.
    if f(x).signum() == f_lo.signum() {
        lo = x;
        f_lo = f(lo);
    } else {
        hi = x;
        f_hi = f(hi);
    }
    let _ = f_hi;

    for iter in 0..max_iters {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        last_residual = f_mid.abs();
        if last_residual < tol {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
        } else {
            hi = mid;
        }
        if iter == max_iters - 1 {
            return Err(RootFindError::NonConvergent {
                iterations: newton_iters + max_iters,
                residual: last_residual,
            });
        }
    }

    Err(RootFindError::NonConvergent {
        iterations: newton_iters + max_iters,
        residual: last_residual,
    })
}
