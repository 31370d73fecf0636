//! Parametric portfolio value-at-risk.
//!
//! `sigma^2 = w' S w` with `S[i][j] = corr[i*n + j] * vol[i] * vol[j]`, and
//! `VaR = z * sqrt(sigma^2 * horizon_days)`. The correlation matrix is
//! taken as given; symmetry and unit diagonal are not checked.

use arrayvec::ArrayVec;

use crate::error::EngineError;
use crate::fixed::Scale;

/// Assets whose `w * vol` products fit in the stack scratch.
pub const MAX_STACK_ASSETS: usize = 256;

/// VaR model parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VarModel {
    /// One-sided normal quantile.
    pub z_score: f64,
    /// Holding period in days.
    pub horizon_days: f64,
}

impl Default for VarModel {
    fn default() -> Self {
        Self {
            z_score: Self::Z_99,
            horizon_days: 1.0,
        }
    }
}

impl VarModel {
    /// 99% one-sided normal quantile.
    pub const Z_99: f64 = 2.326348;

    pub fn new(z_score: f64, horizon_days: f64) -> Result<Self, EngineError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(z_score) || !valid(horizon_days) {
            return Err(EngineError::InvalidParameter);
        }
        Ok(Self {
            z_score,
            horizon_days,
        })
    }

    /// VaR in position units. NaN on inconsistent slice lengths or NaN
    /// inputs; zero for an empty portfolio.
    pub fn var(&self, positions: &[f32], correlations: &[f32], volatilities: &[f32]) -> f64 {
        let variance = portfolio_variance(positions, correlations, volatilities);
        self.z_score * (variance * self.horizon_days).sqrt()
    }

    /// VaR encoded at `scale`. NaN is `InvalidParameter`, values beyond
    /// the u64 range are `Overflow`.
    pub fn var_fixed(
        &self,
        positions: &[f32],
        correlations: &[f32],
        volatilities: &[f32],
        scale: Scale,
    ) -> Result<u64, EngineError> {
        scale.encode(self.var(positions, correlations, volatilities))
    }
}

/// `w' S w`, accumulated in f64.
pub fn portfolio_variance(positions: &[f32], correlations: &[f32], volatilities: &[f32]) -> f64 {
    let n = positions.len();
    if volatilities.len() != n || correlations.len() != n * n {
        return f64::NAN;
    }

    let weighted = |i: usize| positions[i] as f64 * volatilities[i] as f64;

    if n <= MAX_STACK_ASSETS {
        let mut scratch: ArrayVec<f64, MAX_STACK_ASSETS> = ArrayVec::new();
        scratch.extend((0..n).map(weighted));
        quadratic_form(n, correlations, |i| scratch[i])
    } else {
        quadratic_form(n, correlations, weighted)
    }
}

#[inline(always)]
fn quadratic_form(n: usize, correlations: &[f32], wv: impl Fn(usize) -> f64) -> f64 {
    let mut sum = 0.0f64;
    for (i, row) in correlations.chunks_exact(n.max(1)).take(n).enumerate() {
        let wi = wv(i);
        let mut inner = 0.0f64;
        for (j, &c) in row.iter().enumerate() {
            inner += c as f64 * wv(j);
        }
        sum += wi * inner;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_asset() {
        let model = VarModel::default();
        let var = model.var(&[100.0], &[1.0], &[0.02]);
        assert!((var - 2.326348 * 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_two_assets_correlated() {
        // perfectly correlated: sigma = 100*0.1 + 50*0.2 = 20
        let var = VarModel::default().var(&[100.0, 50.0], &[1.0, 1.0, 1.0, 1.0], &[0.1, 0.2]);
        assert!((var - 2.326348 * 20.0).abs() < 1e-4);

        // uncorrelated: sigma = sqrt(10^2 + 10^2)
        let var = VarModel::default().var(&[100.0, 50.0], &[1.0, 0.0, 0.0, 1.0], &[0.1, 0.2]);
        assert!((var - 2.326348 * 200f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_horizon_scales_by_root() {
        let one = VarModel::default().var(&[10.0], &[1.0], &[0.5]);
        let four = VarModel::new(VarModel::Z_99, 4.0).unwrap().var(&[10.0], &[1.0], &[0.5]);
        assert!((four - 2.0 * one).abs() < 1e-9);
    }

    #[test]
    fn test_nan_and_shape() {
        let model = VarModel::default();
        assert!(model.var(&[f32::NAN], &[1.0], &[0.1]).is_nan());
        assert!(model.var(&[1.0, 2.0], &[1.0], &[0.1, 0.1]).is_nan());
        assert_eq!(model.var(&[], &[], &[]), 0.0);
    }

    #[test]
    fn test_var_fixed() {
        let model = VarModel::default();
        let scale = Scale::new(6).unwrap();
        assert_eq!(model.var_fixed(&[100.0], &[1.0], &[0.5], scale), Ok(116_317_400));
        assert_eq!(
            model.var_fixed(&[f32::NAN], &[1.0], &[0.5], scale),
            Err(EngineError::InvalidParameter)
        );
        assert_eq!(
            model.var_fixed(&[f32::MAX], &[1.0], &[1.0], Scale::CANONICAL),
            Err(EngineError::Overflow)
        );
    }

    #[test]
    fn test_large_portfolio_matches_stack_path() {
        let n = MAX_STACK_ASSETS + 4;
        let positions = vec![1.0f32; n];
        let vols = vec![0.01f32; n];
        let mut corr = vec![0.0f32; n * n];
        for i in 0..n {
            corr[i * n + i] = 1.0;
        }
        let variance = portfolio_variance(&positions, &corr, &vols);
        let expected = n as f64 * (0.01f32 as f64).powi(2);
        assert!((variance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_model_validation() {
        assert!(VarModel::new(0.0, 1.0).is_err());
        assert!(VarModel::new(2.0, f64::INFINITY).is_err());
        assert!(VarModel::new(1.645, 10.0).is_ok());
    }
}
