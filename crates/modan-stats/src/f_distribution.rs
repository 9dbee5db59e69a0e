//! F distribution (Fisher-Snedecor).

use crate::special::regularized_beta;

/// F distribution with `d1` numerator and `d2` denominator degrees of freedom.
///
/// Only the cumulative and survival functions are provided; they are what the
/// multivariate tests need to turn an approximate F statistic into a p-value.
///
/// # Examples
///
/// ```
/// use modan_stats::f_distribution::FDistribution;
///
/// // F(2, 2) has the closed-form survival function 1 / (1 + x)
/// let f = FDistribution::new(2.0, 2.0).unwrap();
/// assert!((f.sf(3.0) - 0.25).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FDistribution {
    d1: f64,
    d2: f64,
}

impl FDistribution {
    /// Creates a new F distribution.
    ///
    /// Returns `None` unless both degrees of freedom are finite and positive.
    #[must_use]
    pub fn new(d1: f64, d2: f64) -> Option<Self> {
        let valid = |d: f64| d.is_finite() && d > 0.0;
        (valid(d1) && valid(d2)).then_some(Self { d1, d2 })
    }

    /// Numerator degrees of freedom.
    #[must_use]
    pub fn dfn(&self) -> f64 {
        self.d1
    }

    /// Denominator degrees of freedom.
    #[must_use]
    pub fn dfd(&self) -> f64 {
        self.d2
    }

    /// Cumulative distribution function `P(X <= x)`.
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0.0 {
            return 0.0;
        }
        if x.is_infinite() {
            return 1.0;
        }
        let t = self.d1 * x / (self.d1 * x + self.d2);
        regularized_beta(self.d1 / 2.0, self.d2 / 2.0, t)
    }

    /// Survival function `P(X > x)`, computed directly to keep precision in the tail.
    #[must_use]
    pub fn sf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0.0 {
            return 1.0;
        }
        if x.is_infinite() {
            return 0.0;
        }
        let t = self.d2 / (self.d1 * x + self.d2);
        regularized_beta(self.d2 / 2.0, self.d1 / 2.0, t)
    }
}
