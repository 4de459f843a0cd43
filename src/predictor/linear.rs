//! Ordinary least-squares style linear regression.
use super::RegressionModel;
use anyhow::{Result, ensure};
use serde::Deserialize;

/// A fitted linear model: `intercept + Σ coefficient_i × x_i`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearRegressor {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    #[serde(default)]
    intercept: f64,
}

impl LinearRegressor {
    /// Create a new linear model, checking there is one coefficient per feature
    pub fn new(feature_names: Vec<String>, coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self {
            feature_names,
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the model is well formed
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.coefficients.len() == self.feature_names.len(),
            "Linear model has {} coefficients but {} feature names",
            self.coefficients.len(),
            self.feature_names.len()
        );
        ensure!(
            self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite()),
            "Linear model parameters must be finite"
        );

        Ok(())
    }
}

impl RegressionModel for LinearRegressor {
    fn name(&self) -> &'static str {
        "linear regression"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(coefficient, x)| coefficient * x)
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{i}")).collect()
    }

    #[test]
    fn test_predict() {
        let model = LinearRegressor::new(names(3), vec![1.0, -2.0, 0.5], 4.0).unwrap();
        assert_eq!(model.predict(&[1.0, 1.0, 2.0]), 4.0);
        assert_eq!(model.predict(&[0.0, 0.0, 0.0]), 4.0);
        assert_eq!(model.n_features(), 3);
    }

    #[test]
    fn test_new_wrong_coefficient_count() {
        assert!(LinearRegressor::new(names(2), vec![1.0], 0.0).is_err());
    }

    #[test]
    fn test_new_non_finite() {
        assert!(LinearRegressor::new(names(1), vec![f64::NAN], 0.0).is_err());
    }
}
