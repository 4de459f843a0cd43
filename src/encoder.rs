//! The feature encoder: turns a [`PropertyConfig`] into the numeric row the trained regression
//! model expects.
//!
//! The encoder is built once from the trained model's column list. Each column is resolved to
//! either a numeric field of the property or a `(categorical field, category)` pair, so encoding a
//! property is a handful of indexed writes into a zeroed vector.
//!
//! Categorical columns are named `<field>_<category>`, e.g. `location_suburb_Borrowdale` or
//! `property_type_Villa - 4 Bed`. A category with no column (either the reference category dropped
//! at training time, or one never seen in training) encodes as all zeros. Unseen categories are
//! logged and counted but never abort the computation. A field left blank also encodes as all
//! zeros but is not reported as unseen.
use crate::error::FeatureMismatchError;
use crate::feature::SmartFeature;
use crate::input::read_json;
use crate::property::PropertyConfig;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use strum::IntoEnumIterator;

/// The file name for the trained model's column list
pub const FEATURE_SCHEMA_FILE_NAME: &str = "model_features.json";

/// The column name used for the market price when the model was trained
pub const PRICE_COLUMN: &str = "sale_price_usd";

/// A numeric property attribute copied straight into the feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumericField {
    StandSize,
    BuildingSize,
    Bedrooms,
    Bathrooms,
    MarketPrice,
    Feature(SmartFeature),
}

impl NumericField {
    /// All numeric fields, each of which must appear in the schema
    fn all() -> impl Iterator<Item = NumericField> {
        [
            Self::StandSize,
            Self::BuildingSize,
            Self::Bedrooms,
            Self::Bathrooms,
            Self::MarketPrice,
        ]
        .into_iter()
        .chain(SmartFeature::iter().map(Self::Feature))
    }

    fn column_name(self) -> String {
        match self {
            Self::StandSize => "stand_size_sqm".into(),
            Self::BuildingSize => "building_size_sqm".into(),
            Self::Bedrooms => "bedrooms".into(),
            Self::Bathrooms => "bathrooms".into(),
            Self::MarketPrice => PRICE_COLUMN.into(),
            Self::Feature(feature) => feature.column_name(),
        }
    }

    fn value(self, property: &PropertyConfig) -> f64 {
        match self {
            Self::StandSize => property.stand_size_sqm,
            Self::BuildingSize => property.building_size_sqm,
            Self::Bedrooms => property.bedrooms as f64,
            Self::Bathrooms => property.bathrooms as f64,
            Self::MarketPrice => property.market_price.value(),
            Self::Feature(feature) => property.smart_features.get(feature).0,
        }
    }
}

/// A categorical property attribute which is one-hot encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CategoricalField {
    /// The suburb the property is located in
    LocationSuburb,
    /// The type of property
    PropertyType,
}

impl CategoricalField {
    fn value(self, property: &PropertyConfig) -> &str {
        match self {
            Self::LocationSuburb => &property.location_suburb,
            Self::PropertyType => &property.property_type,
        }
    }

    /// If `column` is a one-hot column for this field, the category it represents
    fn category_of<'a>(self, column: &'a str) -> Option<&'a str> {
        column
            .strip_prefix(&self.to_string())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|category| !category.is_empty())
    }
}

/// Categories that were dropped as the baseline when the model was trained.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReferenceCategories {
    /// Reference suburb
    pub location_suburb: Option<String>,
    /// Reference property type
    pub property_type: Option<String>,
}

impl ReferenceCategories {
    fn get(&self, field: CategoricalField) -> Option<&str> {
        match field {
            CategoricalField::LocationSuburb => self.location_suburb.as_deref(),
            CategoricalField::PropertyType => self.property_type.as_deref(),
        }
    }
}

/// The ordered list of columns the regression model was trained on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "FeatureSchemaFile")]
pub struct FeatureSchema {
    /// Column names in training order
    pub columns: Vec<String>,
    /// Reference (dropped-first) categories, which are known but have no column
    pub reference_categories: ReferenceCategories,
}

/// The schema file is either a bare list of columns or an object with extra metadata.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureSchemaFile {
    Columns(Vec<String>),
    Full {
        columns: Vec<String>,
        #[serde(default)]
        reference_categories: ReferenceCategories,
    },
}

impl From<FeatureSchemaFile> for FeatureSchema {
    fn from(file: FeatureSchemaFile) -> Self {
        match file {
            FeatureSchemaFile::Columns(columns) => Self::new(columns),
            FeatureSchemaFile::Full {
                columns,
                reference_categories,
            } => Self {
                columns,
                reference_categories,
            },
        }
    }
}

impl FeatureSchema {
    /// Create a schema with no reference categories
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            reference_categories: ReferenceCategories::default(),
        }
    }

    /// Read the schema from a model directory
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<FeatureSchema> {
        read_json(&model_dir.as_ref().join(FEATURE_SCHEMA_FILE_NAME))
    }
}

/// Known categories for one categorical field
#[derive(Debug, Default)]
struct Vocabulary {
    columns: HashMap<String, usize>,
    reference: Option<String>,
}

/// A feature vector in the column order of a particular schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl EncodedFeatures {
    /// Pair a row of values with the columns they correspond to.
    ///
    /// Fails unless there is exactly one value per column.
    pub fn new(columns: Arc<[String]>, values: Vec<f64>) -> Result<Self, FeatureMismatchError> {
        if values.len() != columns.len() {
            return Err(FeatureMismatchError::Width {
                expected: columns.len(),
                actual: values.len(),
            });
        }

        Ok(Self { columns, values })
    }

    /// The column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The values, one per column
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value of a named column, if present
    pub fn get(&self, column: &str) -> Option<f64> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(self.values[index])
    }
}

/// Encodes properties into the trained model's feature layout.
#[derive(Debug)]
pub struct FeatureEncoder {
    columns: Arc<[String]>,
    numeric: Vec<(NumericField, usize)>,
    vocabularies: IndexMap<CategoricalField, Vocabulary>,
    unseen_categories: AtomicU64,
}

impl FeatureEncoder {
    /// Build the encoder's lookup tables from a schema.
    ///
    /// Fails if any column can't be mapped onto a property attribute, appears twice, or if a
    /// numeric attribute has no column.
    pub fn new(schema: &FeatureSchema) -> Result<Self, FeatureMismatchError> {
        let numeric_names: Vec<_> = NumericField::all()
            .map(|field| (field.column_name(), field))
            .collect();
        let mut numeric = Vec::new();
        let mut vocabularies: IndexMap<_, _> = CategoricalField::iter()
            .map(|field| {
                let vocabulary = Vocabulary {
                    reference: schema.reference_categories.get(field).map(String::from),
                    ..Vocabulary::default()
                };
                (field, vocabulary)
            })
            .collect();

        if let Some(column) = schema.columns.iter().duplicates().next() {
            return Err(FeatureMismatchError::DuplicateColumn(column.clone()));
        }

        for (index, column) in schema.columns.iter().enumerate() {
            if let Some((_, field)) = numeric_names.iter().find(|(name, _)| name == column) {
                numeric.push((*field, index));
                continue;
            }

            let category = vocabularies
                .iter_mut()
                .find_map(|(field, vocabulary)| Some((field.category_of(column)?, vocabulary)));
            match category {
                Some((category, vocabulary)) => {
                    vocabulary.columns.insert(category.to_string(), index);
                }
                None => return Err(FeatureMismatchError::UnknownColumn(column.clone())),
            }
        }

        if let Some((name, _)) = numeric_names
            .iter()
            .find(|(name, _)| !schema.columns.contains(name))
        {
            return Err(FeatureMismatchError::MissingColumn(name.clone()));
        }

        Ok(Self {
            columns: schema.columns.clone().into(),
            numeric,
            vocabularies,
            unseen_categories: AtomicU64::new(0),
        })
    }

    /// Load the schema from a model directory and build an encoder for it
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let schema = FeatureSchema::from_path(&model_dir)?;
        let encoder = Self::new(&schema).with_context(|| {
            format!(
                "Invalid feature schema in {}",
                model_dir.as_ref().join(FEATURE_SCHEMA_FILE_NAME).display()
            )
        })?;

        Ok(encoder)
    }

    /// The columns this encoder produces, in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The number of columns this encoder produces
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// The known categories for a field (excluding the reference category)
    pub fn categories(&self, field: CategoricalField) -> impl Iterator<Item = &str> {
        self.vocabularies[&field].columns.keys().map(String::as_str)
    }

    /// The number of unseen categorical values encountered since the encoder was built
    pub fn unseen_category_count(&self) -> u64 {
        self.unseen_categories.load(Ordering::Relaxed)
    }

    /// Encode a property into a feature vector
    pub fn encode(&self, property: &PropertyConfig) -> EncodedFeatures {
        let mut values = vec![0.0; self.width()];
        for (field, index) in &self.numeric {
            values[*index] = field.value(property);
        }

        for (field, vocabulary) in &self.vocabularies {
            let category = field.value(property);
            if let Some(index) = vocabulary.columns.get(category) {
                values[*index] = 1.0;
            } else if !category.is_empty() && vocabulary.reference.as_deref() != Some(category) {
                self.unseen_categories.fetch_add(1, Ordering::Relaxed);
                warn!("Unseen {field} category '{category}' will be encoded as all zeros");
            }
        }

        EncodedFeatures {
            columns: Arc::clone(&self.columns),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{feature_schema, property};
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn schema_with(extra: &[&str]) -> FeatureSchema {
        let mut schema = feature_schema();
        schema.columns.extend(extra.iter().map(ToString::to_string));
        schema
    }

    #[rstest]
    fn test_encode_numeric_and_flags(feature_schema: FeatureSchema, property: PropertyConfig) {
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        let encoded = encoder.encode(&property);

        assert_eq!(encoded.columns(), feature_schema.columns.as_slice());
        assert_eq!(encoded.get("stand_size_sqm"), Some(500.0));
        assert_eq!(encoded.get("building_size_sqm"), Some(200.0));
        assert_eq!(encoded.get("bedrooms"), Some(3.0));
        assert_eq!(encoded.get("bathrooms"), Some(2.0));
        assert_eq!(encoded.get(PRICE_COLUMN), Some(120_000.0));
        assert_eq!(encoded.get("has_solar"), Some(1.0));
        assert_eq!(encoded.get("has_ev_charging"), Some(0.0));
    }

    #[rstest]
    fn test_encode_one_hot(feature_schema: FeatureSchema, property: PropertyConfig) {
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        let encoded = encoder.encode(&property);

        assert_eq!(encoded.get("location_suburb_Borrowdale"), Some(1.0));
        assert_eq!(encoded.get("location_suburb_Pokugara"), Some(0.0));
        assert_eq!(encoded.get("property_type_Villa - 4 Bed"), Some(1.0));
        assert_eq!(encoded.get("property_type_Apartment - 2 Bed"), Some(0.0));
        assert_eq!(encoder.unseen_category_count(), 0);

        // Exactly one hot column per field
        let hot: f64 = encoded
            .columns()
            .iter()
            .zip(encoded.values())
            .filter(|(column, _)| column.starts_with("location_suburb_"))
            .map(|(_, value)| value)
            .sum();
        assert_eq!(hot, 1.0);
    }

    #[rstest]
    fn test_encode_unseen_category(feature_schema: FeatureSchema, mut property: PropertyConfig) {
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        property.location_suburb = "Atlantis".into();
        let encoded = encoder.encode(&property);

        let suburb_total: f64 = encoded
            .columns()
            .iter()
            .zip(encoded.values())
            .filter(|(column, _)| column.starts_with("location_suburb_"))
            .map(|(_, value)| value)
            .sum();
        assert_eq!(suburb_total, 0.0);
        assert_eq!(encoded.get("property_type_Villa - 4 Bed"), Some(1.0));
        assert_eq!(encoder.unseen_category_count(), 1);

        encoder.encode(&property);
        assert_eq!(encoder.unseen_category_count(), 2);
    }

    #[rstest]
    fn test_encode_reference_category(
        mut feature_schema: FeatureSchema,
        mut property: PropertyConfig,
    ) {
        feature_schema.reference_categories.location_suburb = Some("Avondale".into());
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        property.location_suburb = "Avondale".into();
        encoder.encode(&property);
        assert_eq!(encoder.unseen_category_count(), 0);
    }

    #[rstest]
    fn test_encode_blank_categories(feature_schema: FeatureSchema, property: PropertyConfig) {
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        let property = PropertyConfig::new(property.market_price, property.monthly_rent);
        let encoded = encoder.encode(&property);

        assert_eq!(encoded.get("location_suburb_Borrowdale"), Some(0.0));
        assert_eq!(encoded.get("property_type_Villa - 4 Bed"), Some(0.0));
        assert_eq!(encoder.unseen_category_count(), 0);
    }

    #[rstest]
    fn test_encode_fractional_adoption(feature_schema: FeatureSchema, property: PropertyConfig) {
        use crate::units::Dimensionless;

        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        let property = property.with_smart_features(
            property
                .smart_features
                .with(SmartFeature::SmartLocks, Dimensionless(0.5)),
        );
        assert_eq!(encoder.encode(&property).get("has_smart_locks"), Some(0.5));
    }

    #[rstest]
    #[case(&["garage_spaces"], FeatureMismatchError::UnknownColumn("garage_spaces".into()))]
    #[case(&["location_suburb_"], FeatureMismatchError::UnknownColumn("location_suburb_".into()))]
    #[case(&["bedrooms"], FeatureMismatchError::DuplicateColumn("bedrooms".into()))]
    fn test_new_invalid_schema(#[case] extra: &[&str], #[case] expected: FeatureMismatchError) {
        assert_eq!(
            FeatureEncoder::new(&schema_with(extra)).unwrap_err(),
            expected
        );
    }

    #[rstest]
    fn test_new_missing_column(mut feature_schema: FeatureSchema) {
        feature_schema.columns.retain(|column| column != "has_solar");
        assert_eq!(
            FeatureEncoder::new(&feature_schema).unwrap_err(),
            FeatureMismatchError::MissingColumn("has_solar".into())
        );
    }

    #[rstest]
    fn test_categories(feature_schema: FeatureSchema) {
        let encoder = FeatureEncoder::new(&feature_schema).unwrap();
        let mut suburbs: Vec<_> = encoder.categories(CategoricalField::LocationSuburb).collect();
        suburbs.sort_unstable();
        assert_eq!(suburbs, ["Borrowdale", "Pokugara"]);
    }

    #[test]
    fn test_schema_file_formats() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(FEATURE_SCHEMA_FILE_NAME);

        fs::write(&file_path, r#"["bedrooms", "location_suburb_Borrowdale"]"#).unwrap();
        let schema = FeatureSchema::from_path(dir.path()).unwrap();
        assert_eq!(schema.columns, ["bedrooms", "location_suburb_Borrowdale"]);
        assert_eq!(schema.reference_categories, ReferenceCategories::default());

        fs::write(
            &file_path,
            r#"{"columns": ["bedrooms"], "reference_categories": {"property_type": "Flat"}}"#,
        )
        .unwrap();
        let schema = FeatureSchema::from_path(dir.path()).unwrap();
        assert_eq!(schema.columns, ["bedrooms"]);
        assert_eq!(
            schema.reference_categories.property_type.as_deref(),
            Some("Flat")
        );
    }
}
