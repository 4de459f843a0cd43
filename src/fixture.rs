//! Fixtures for tests

use crate::constants::FeatureConstants;
use crate::encoder::{FeatureEncoder, FeatureSchema, PRICE_COLUMN};
use crate::feature::{FeatureAdoption, SmartFeature};
use crate::predictor::linear::LinearRegressor;
use crate::predictor::{RegressionModel, RoiPredictor};
use crate::property::PropertyConfig;
use crate::units::{Money, MoneyPerMonth};
use rstest::fixture;
use strum::IntoEnumIterator;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn constants() -> FeatureConstants {
    FeatureConstants::default()
}

/// A 120k villa in Borrowdale renting for 1000/month with solar only
#[fixture]
pub fn property() -> PropertyConfig {
    PropertyConfig {
        smart_features: FeatureAdoption::from_present([SmartFeature::Solar]),
        bedrooms: 3,
        bathrooms: 2,
        stand_size_sqm: 500.0,
        building_size_sqm: 200.0,
        location_suburb: "Borrowdale".into(),
        property_type: "Villa - 4 Bed".into(),
        ..PropertyConfig::new(Money(120_000.0), MoneyPerMonth(1000.0))
    }
}

#[fixture]
pub fn feature_schema() -> FeatureSchema {
    let mut columns: Vec<String> = [
        "stand_size_sqm",
        "building_size_sqm",
        "bedrooms",
        "bathrooms",
        PRICE_COLUMN,
    ]
    .into_iter()
    .map(String::from)
    .collect();
    columns.extend(SmartFeature::iter().map(SmartFeature::column_name));
    columns.extend(
        [
            "location_suburb_Borrowdale",
            "location_suburb_Pokugara",
            "property_type_Villa - 4 Bed",
            "property_type_Apartment - 2 Bed",
        ]
        .into_iter()
        .map(String::from),
    );

    FeatureSchema::new(columns)
}

/// A linear model with a handful of non-zero coefficients
pub fn linear_model(schema: &FeatureSchema) -> Box<dyn RegressionModel> {
    let coefficients = schema
        .columns
        .iter()
        .map(|column| match column.as_str() {
            "has_solar" => 0.5,
            "location_suburb_Borrowdale" => 0.25,
            PRICE_COLUMN => -0.00001,
            _ => 0.0,
        })
        .collect();

    Box::new(LinearRegressor::new(schema.columns.clone(), coefficients, 2.0).unwrap())
}

#[fixture]
pub fn predictor(feature_schema: FeatureSchema) -> RoiPredictor {
    RoiPredictor::new(
        FeatureEncoder::new(&feature_schema).unwrap(),
        linear_model(&feature_schema),
        None,
    )
    .unwrap()
}
