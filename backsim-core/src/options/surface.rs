//! Volatility surface: a rectangular grid in (time-to-expiry, strike),
//! interpolated bilinearly in total variance rather than in vol directly,
//! which keeps the surface closer to calendar-arbitrage-free than linear
//! interpolation in sigma.

use crate::error::BacktestError;

const T_FLOOR: f64 = 1e-6;
const FALLBACK_VOL: f64 = 0.20;

#[derive(Debug, Clone)]
pub struct VolSurface {
    taus: Vec<f64>,
    strikes: Vec<f64>,
    /// `vols[i][j]` is sigma at `(taus[i], strikes[j])`.
    vols: Vec<Vec<f64>>,
}

impl VolSurface {
    /// Construct a surface from a complete grid. Both axes must be strictly
    /// increasing and every vol must be finite and positive.
    pub fn new(taus: Vec<f64>, strikes: Vec<f64>, vols: Vec<Vec<f64>>) -> Result<Self, BacktestError> {
        if taus.len() < 1 || strikes.len() < 1 {
            return Err(BacktestError::input("volatility surface needs at least one tau and one strike"));
        }
        if vols.len() != taus.len() || vols.iter().any(|row| row.len() != strikes.len()) {
            return Err(BacktestError::input("volatility surface matrix shape mismatch"));
        }
        if !taus.windows(2).all(|w| w[0] < w[1]) {
            return Err(BacktestError::input("surface tau axis must be strictly increasing"));
        }
        if !strikes.windows(2).all(|w| w[0] < w[1]) {
            return Err(BacktestError::input("surface strike axis must be strictly increasing"));
        }
        if vols.iter().flatten().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(BacktestError::input("surface vols must be finite and positive"));
        }
        Ok(VolSurface { taus, strikes, vols })
    }

    /// Bilinear-in-variance lookup at `(t, k)`. Out-of-range inputs clamp to
    /// the nearest grid edge rather than extrapolating.
    pub fn get_volatility(&self, t: f64, k: f64) -> f64 {
        let t = t.max(T_FLOOR);
        let (ti, ti1, wt) = bracket(&self.taus, t);
        let (ki, ki1, wk) = bracket(&self.strikes, k);

        let variance_at = |i: usize, j: usize| -> f64 {
            let sigma = self.vols[i][j];
            sigma * sigma * self.taus[i]
        };

        let v00 = variance_at(ti, ki);
        let v10 = variance_at(ti1, ki);
        let v01 = variance_at(ti, ki1);
        let v11 = variance_at(ti1, ki1);

        let v = (1.0 - wt) * (1.0 - wk) * v00
            + wt * (1.0 - wk) * v10
            + (1.0 - wt) * wk * v01
            + wt * wk * v11;

        (v / t).max(0.0).sqrt()
    }

    pub fn taus(&self) -> &[f64] {
        &self.taus
    }

    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }
}

/// Clamped bracket lookup: returns `(lo_index, hi_index, weight)` where
/// `weight` is 0 at the lower grid point and 1 at the upper one. When `x`
/// is outside the axis range, both indices collapse to the nearest edge and
/// weight is 0.
fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let n = axis.len();
    if n == 1 || x <= axis[0] {
        return (0, 0, 0.0);
    }
    if x >= axis[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..n - 1 {
        if x >= axis[i] && x <= axis[i + 1] {
            let w = (x - axis[i]) / (axis[i + 1] - axis[i]);
            return (i, i + 1, w);
        }
    }
    (n - 1, n - 1, 0.0)
}

/// Builds a [`VolSurface`] from scattered `(tau, strike, sigma)` observations
/// (e.g. implied vols computed per traded option). Unset grid cells are
/// filled from the nearest observed neighbour by an expanding search; an
/// entirely empty input falls back to a flat 20% surface.
#[derive(Debug, Default)]
pub struct VolSurfaceBuilder {
    points: Vec<(f64, f64, f64)>,
}

impl VolSurfaceBuilder {
    pub fn new() -> Self {
        VolSurfaceBuilder::default()
    }

    pub fn add_point(&mut self, tau: f64, strike: f64, sigma: f64) -> &mut Self {
        if tau.is_finite() && strike.is_finite() && sigma.is_finite() && sigma > 0.0 {
            self.points.push((tau, strike, sigma));
        }
        self
    }

    pub fn build(&self) -> VolSurface {
        if self.points.is_empty() {
            return VolSurface {
                taus: vec![1.0 / DAYS_PER_YEAR_F],
                strikes: vec![1.0],
                vols: vec![vec![FALLBACK_VOL]],
            };
        }

        let mut taus: Vec<f64> = self.points.iter().map(|p| p.0).collect();
        let mut strikes: Vec<f64> = self.points.iter().map(|p| p.1).collect();
        sort_dedup(&mut taus);
        sort_dedup(&mut strikes);

        let mut vols = vec![vec![f64::NAN; strikes.len()]; taus.len()];
        for &(tau, strike, sigma) in &self.points {
            if let (Some(i), Some(j)) = (index_of(&taus, tau), index_of(&strikes, strike)) {
                vols[i][j] = sigma;
            }
        }

        fill_nearest_neighbour(&mut vols, &taus, &strikes);

        VolSurface { taus, strikes, vols }
    }
}

const DAYS_PER_YEAR_F: f64 = 365.25;

fn sort_dedup(xs: &mut Vec<f64>) {
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    xs.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
}

fn index_of(axis: &[f64], x: f64) -> Option<usize> {
    axis.iter().position(|&v| (v - x).abs() < 1e-12)
}

fn fill_nearest_neighbour(vols: &mut [Vec<f64>], taus: &[f64], strikes: &[f64]) {
    let rows = taus.len();
    let cols = strikes.len();
    for i in 0..rows {
        for j in 0..cols {
            if !vols[i][j].is_nan() {
                continue;
            }
            let mut found = None;
            let mut radius = 1;
            while found.is_none() && radius < rows.max(cols) + 1 {
                'search: for di in -(radius as isize)..=(radius as isize) {
                    for dj in -(radius as isize)..=(radius as isize) {
                        let ni = i as isize + di;
                        let nj = j as isize + dj;
                        if ni >= 0 && (ni as usize) < rows && nj >= 0 && (nj as usize) < cols {
                            let v = vols[ni as usize][nj as usize];
                            if !v.is_nan() {
                                found = Some(v);
                                break 'search;
                            }
                        }
                    }
                }
                radius += 1;
            }
            vols[i][j] = found.unwrap_or(FALLBACK_VOL);
        }
    }
}
