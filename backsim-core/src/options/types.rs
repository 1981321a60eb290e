//! Shared option-math value types.

use std::ops::{Add, Mul, Sub};

/// First-order option sensitivities. Theta is per calendar day, vega per
/// one vol-point (0.01 of sigma), rho per one rate-point (0.01 of r).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl Greeks {
    pub const ZERO: Greeks = Greeks {
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
        rho: 0.0,
    };

    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Greeks {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }
}

impl Add for Greeks {
    type Output = Greeks;
    fn add(self, rhs: Greeks) -> Greeks {
        Greeks {
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            theta: self.theta + rhs.theta,
            vega: self.vega + rhs.vega,
            rho: self.rho + rhs.rho,
        }
    }
}

impl Sub for Greeks {
    type Output = Greeks;
    fn sub(self, rhs: Greeks) -> Greeks {
        Greeks {
            delta: self.delta - rhs.delta,
            gamma: self.gamma - rhs.gamma,
            theta: self.theta - rhs.theta,
            vega: self.vega - rhs.vega,
            rho: self.rho - rhs.rho,
        }
    }
}

impl Mul<f64> for Greeks {
    type Output = Greeks;
    fn mul(self, scalar: f64) -> Greeks {
        Greeks {
            delta: self.delta * scalar,
            gamma: self.gamma * scalar,
            theta: self.theta * scalar,
            vega: self.vega * scalar,
            rho: self.rho * scalar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_componentwise() {
        let a = Greeks::new(1.0, 2.0, 3.0, 4.0, 5.0);
        let b = Greeks::new(0.5, 0.5, 0.5, 0.5, 0.5);
        let sum = a + b;
        assert_eq!(sum.delta, 1.5);
        assert_eq!(sum.rho, 5.5);
        let diff = a - b;
        assert_eq!(diff.gamma, 1.5);
        let scaled = a * 2.0;
        assert_eq!(scaled.theta, 6.0);
    }
}
