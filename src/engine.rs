//! The ROI engine bundles the feature constants and the optional trained model.
//!
//! An engine is immutable once loaded and is `Send + Sync`, so one instance can be shared behind
//! an [`std::sync::Arc`] by any number of threads.
use crate::constants::FeatureConstants;
use crate::predictor::RoiPredictor;
use crate::property::PropertyConfig;
use crate::roi::{RoiResult, compute_roi};
use crate::sensitivity::{self, SensitivityMode, SensitivityRanges, SensitivityResult};
use crate::units::Percent;
use anyhow::{Context, Result};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::path::Path;

/// The ROI figure a sensitivity sweep is evaluated on
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    clap::ValueEnum,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum RoiMetric {
    /// ROI without smart-feature savings
    #[string = "traditional"]
    Traditional,
    /// ROI with smart-feature savings
    #[default]
    #[string = "smart"]
    Smart,
    /// ROI from the trained model
    #[string = "predicted"]
    Predicted,
}

/// Computes ROI figures for properties.
#[derive(Debug)]
pub struct RoiEngine {
    constants: FeatureConstants,
    predictor: Option<RoiPredictor>,
}

impl RoiEngine {
    /// Create an engine from its parts
    pub fn new(constants: FeatureConstants, predictor: Option<RoiPredictor>) -> Self {
        Self {
            constants,
            predictor,
        }
    }

    /// Create an engine with no trained model
    pub fn deterministic(constants: FeatureConstants) -> Self {
        Self::new(constants, None)
    }

    /// Load constants and the trained model from a model directory
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let predictor = RoiPredictor::from_path(model_dir)
            .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
        let constants = FeatureConstants::from_path(model_dir)?;

        Ok(Self::new(constants, Some(predictor)))
    }

    /// The feature constants
    pub fn constants(&self) -> &FeatureConstants {
        &self.constants
    }

    /// The trained model, if any
    pub fn predictor(&self) -> Option<&RoiPredictor> {
        self.predictor.as_ref()
    }

    /// Compute traditional and smart ROI, plus predicted ROI if a model is loaded
    pub fn compute_roi(&self, property: &PropertyConfig) -> Result<RoiResult> {
        let result = compute_roi(
            property.market_price,
            property.monthly_rent,
            &property.smart_features,
            &self.constants,
        );

        match &self.predictor {
            Some(predictor) => Ok(result.with_prediction(predictor.predict_roi(property)?)),
            None => Ok(result),
        }
    }

    /// Predict ROI with the trained model.
    ///
    /// Fails if no model is loaded or the model and encoder disagree.
    pub fn predict_roi(&self, property: &PropertyConfig) -> Result<Percent> {
        let predictor = self
            .predictor
            .as_ref()
            .context("Predicted ROI requires a trained model")?;

        Ok(predictor.predict_roi(property)?)
    }

    /// Compute a single ROI metric
    pub fn evaluate(&self, property: &PropertyConfig, metric: RoiMetric) -> Result<Percent> {
        let deterministic = || {
            compute_roi(
                property.market_price,
                property.monthly_rent,
                &property.smart_features,
                &self.constants,
            )
        };

        match metric {
            RoiMetric::Traditional => Ok(deterministic().traditional_roi),
            RoiMetric::Smart => Ok(deterministic().smart_roi),
            RoiMetric::Predicted => self.predict_roi(property),
        }
    }

    /// Rank variables by their impact on the chosen ROI metric
    pub fn run_sensitivity(
        &self,
        baseline: &PropertyConfig,
        ranges: &SensitivityRanges,
        mode: SensitivityMode,
        metric: RoiMetric,
    ) -> Result<SensitivityResult> {
        if metric == RoiMetric::Predicted {
            // Fail before sweeping rather than on the first evaluation
            self.predict_roi(baseline)?;
        }

        sensitivity::run_sensitivity(baseline, ranges, mode, |property| {
            self.evaluate(property, metric)
        })
    }
}
