//! Inverse power transforms, which map model output back onto the original ROI scale.
use anyhow::{Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

/// The power transform family used when the model was trained
#[derive(Debug, Clone, Copy, PartialEq, DeserializeLabeledStringEnum)]
pub enum PowerMethod {
    /// Yeo-Johnson, defined for all real inputs
    #[string = "yeo-johnson"]
    YeoJohnson,
    /// Box-Cox, defined for positive inputs only
    #[string = "box-cox"]
    BoxCox,
}

/// A fitted single-column power transform.
///
/// If `mean` and `scale` are given, the transformed target was also standardised and this is
/// undone before inverting the power transform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PowerTransformer {
    method: PowerMethod,
    lambda: f64,
    mean: Option<f64>,
    scale: Option<f64>,
}

impl PowerTransformer {
    /// Create a transform without standardisation
    pub fn new(method: PowerMethod, lambda: f64) -> Self {
        Self {
            method,
            lambda,
            mean: None,
            scale: None,
        }
    }

    /// Return a copy which also undoes standardisation with the given mean and scale
    pub fn with_standardisation(self, mean: f64, scale: f64) -> Self {
        Self {
            mean: Some(mean),
            scale: Some(scale),
            ..self
        }
    }

    /// Check the parameters are usable
    pub fn validate(&self) -> Result<()> {
        ensure!(self.lambda.is_finite(), "Power transform lambda must be finite");
        ensure!(
            self.mean.is_some() == self.scale.is_some(),
            "Power transform mean and scale must be given together"
        );
        if let (Some(mean), Some(scale)) = (self.mean, self.scale) {
            ensure!(
                mean.is_finite() && scale.is_finite() && scale > 0.0,
                "Invalid standardisation parameters (mean: {mean}, scale: {scale})"
            );
        }

        Ok(())
    }

    /// Map a value on the transformed scale back to the original scale
    pub fn inverse(&self, value: f64) -> f64 {
        let value = match (self.mean, self.scale) {
            (Some(mean), Some(scale)) => value * scale + mean,
            _ => value,
        };

        match self.method {
            PowerMethod::YeoJohnson => yeo_johnson_inverse(value, self.lambda),
            PowerMethod::BoxCox => box_cox_inverse(value, self.lambda),
        }
    }
}

fn yeo_johnson_inverse(x: f64, lambda: f64) -> f64 {
    if x >= 0.0 {
        if lambda.abs() < f64::EPSILON {
            x.exp_m1()
        } else {
            (x * lambda + 1.0).powf(1.0 / lambda) - 1.0
        }
    } else if (lambda - 2.0).abs() > f64::EPSILON {
        1.0 - (-(2.0 - lambda) * x + 1.0).powf(1.0 / (2.0 - lambda))
    } else {
        -(-x).exp_m1()
    }
}

fn box_cox_inverse(x: f64, lambda: f64) -> f64 {
    if lambda.abs() < f64::EPSILON {
        x.exp()
    } else {
        (x * lambda + 1.0).powf(1.0 / lambda)
    }
}
