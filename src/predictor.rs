//! The ROI predictor: a pre-trained regression model plus the inverse of the power transform
//! applied to its training target.
//!
//! Model artifacts live together in a model directory:
//!
//! * `model_features.json` - the trained column list (see [`crate::encoder`])
//! * `roi_model.json` - the regression model
//! * `roi_transformer.json` - the target power transform (optional; identity if absent)
use crate::encoder::{EncodedFeatures, FeatureEncoder};
use crate::error::{FeatureMismatchError, check_columns_match};
use crate::input::read_json;
use crate::property::PropertyConfig;
use crate::units::Percent;
use anyhow::{Context, Result, ensure};
use log::info;
use serde::Deserialize;
use std::fmt::Debug;
use std::path::Path;

pub mod ensemble;
pub mod linear;
pub mod transform;
use ensemble::{Aggregation, RegressionTree, TreeEnsemble};
use linear::LinearRegressor;
use transform::PowerTransformer;

/// The file name for the regression model
pub const MODEL_FILE_NAME: &str = "roi_model.json";

/// The file name for the target power transform
pub const TRANSFORMER_FILE_NAME: &str = "roi_transformer.json";

/// A fitted regression model evaluated on a single row at a time.
pub trait RegressionModel: Debug + Send + Sync {
    /// A short description of the model type, for logging
    fn name(&self) -> &'static str;

    /// The feature columns the model was trained on, in order
    fn feature_names(&self) -> &[String];

    /// The number of features the model expects
    fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    /// Evaluate the model. `row` must have exactly [`Self::n_features`] values.
    fn predict(&self, row: &[f64]) -> f64;
}

/// The contents of a model file
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ModelFile {
    LinearRegression(LinearRegressor),
    RandomForestRegressor {
        feature_names: Vec<String>,
        trees: Vec<RegressionTree>,
    },
    GradientBoostingRegressor {
        feature_names: Vec<String>,
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    },
}

impl ModelFile {
    fn into_model(self) -> Result<Box<dyn RegressionModel>> {
        let model: Box<dyn RegressionModel> = match self {
            Self::LinearRegression(model) => {
                model.validate()?;
                Box::new(model)
            }
            Self::RandomForestRegressor {
                feature_names,
                trees,
            } => Box::new(TreeEnsemble::new(feature_names, trees, Aggregation::Mean)?),
            Self::GradientBoostingRegressor {
                feature_names,
                init,
                learning_rate,
                trees,
            } => Box::new(TreeEnsemble::new(
                feature_names,
                trees,
                Aggregation::Boosted {
                    init,
                    learning_rate,
                },
            )?),
        };

        Ok(model)
    }
}

/// Read a regression model from a JSON file
pub fn read_model(file_path: &Path) -> Result<Box<dyn RegressionModel>> {
    let file: ModelFile = read_json(file_path)?;
    file.into_model()
        .with_context(|| format!("Invalid model in {}", file_path.display()))
}

/// Read a power transform from a JSON file, if the file exists
pub fn read_transformer(file_path: &Path) -> Result<Option<PowerTransformer>> {
    if !file_path.is_file() {
        return Ok(None);
    }

    let transformer: PowerTransformer = read_json(file_path)?;
    transformer
        .validate()
        .with_context(|| format!("Invalid power transform in {}", file_path.display()))?;

    Ok(Some(transformer))
}

/// Predicts ROI for a property using a trained model.
///
/// Immutable after construction, apart from the encoder's unseen-category counter.
#[derive(Debug)]
pub struct RoiPredictor {
    encoder: FeatureEncoder,
    model: Box<dyn RegressionModel>,
    transformer: Option<PowerTransformer>,
}

impl RoiPredictor {
    /// Pair an encoder with a model.
    ///
    /// Fails if the encoder's columns differ from the model's in number, name or order.
    pub fn new(
        encoder: FeatureEncoder,
        model: Box<dyn RegressionModel>,
        transformer: Option<PowerTransformer>,
    ) -> Result<Self, FeatureMismatchError> {
        check_columns_match(model.feature_names(), encoder.columns())?;

        Ok(Self {
            encoder,
            model,
            transformer,
        })
    }

    /// Load all model artifacts from a model directory
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        ensure!(
            model_dir.is_dir(),
            "Model directory {} does not exist",
            model_dir.display()
        );

        let encoder = FeatureEncoder::from_path(model_dir)?;
        let model = read_model(&model_dir.join(MODEL_FILE_NAME))?;
        let transformer = read_transformer(&model_dir.join(TRANSFORMER_FILE_NAME))?;
        info!(
            "Loaded {} model with {} features from {}",
            model.name(),
            model.n_features(),
            model_dir.display()
        );
        if transformer.is_none() {
            info!("No {TRANSFORMER_FILE_NAME} found; model output is used as is");
        }

        let predictor = Self::new(encoder, model, transformer)
            .with_context(|| format!("Model artifacts in {} disagree", model_dir.display()))?;

        Ok(predictor)
    }

    /// The feature encoder
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// The regression model
    pub fn model(&self) -> &dyn RegressionModel {
        self.model.as_ref()
    }

    /// Predict ROI from an already-encoded feature vector
    pub fn predict_encoded(
        &self,
        features: &EncodedFeatures,
    ) -> Result<Percent, FeatureMismatchError> {
        check_columns_match(self.model.feature_names(), features.columns())?;

        let raw = self.model.predict(features.values());
        let roi = match &self.transformer {
            Some(transformer) => transformer.inverse(raw),
            None => raw,
        };

        Ok(Percent(roi))
    }

    /// Encode a property and predict its ROI.
    ///
    /// Returns zero for properties without a positive market price.
    pub fn predict_roi(&self, property: &PropertyConfig) -> Result<Percent, FeatureMismatchError> {
        if !property.has_valid_price() {
            return Ok(Percent(0.0));
        }

        self.predict_encoded(&self.encoder.encode(property))
    }
}
