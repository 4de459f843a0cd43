//! Defines the `PropertyConfig` struct, which represents the contents of `property.toml`.
use crate::feature::FeatureAdoption;
use crate::input::{check_non_negative, input_err_msg, read_toml};
use crate::units::{Money, MoneyPerMonth};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The file name for property descriptions
pub const PROPERTY_FILE_NAME: &str = "property.toml";

/// A property to simulate, the unit of input for every ROI calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    /// Purchase/valuation price
    pub market_price: Money,
    /// Expected monthly rental income
    pub monthly_rent: MoneyPerMonth,
    /// Adoption level of each smart feature
    #[serde(default)]
    pub smart_features: FeatureAdoption,
    /// Number of bedrooms
    #[serde(default)]
    pub bedrooms: u32,
    /// Number of bathrooms
    #[serde(default)]
    pub bathrooms: u32,
    /// Size of the plot in square metres
    #[serde(default)]
    pub stand_size_sqm: f64,
    /// Size of the building in square metres
    #[serde(default)]
    pub building_size_sqm: f64,
    /// The suburb the property is located in
    #[serde(default)]
    pub location_suburb: String,
    /// The type of property (e.g. "Villa - 4 Bed")
    #[serde(default)]
    pub property_type: String,
}

impl PropertyConfig {
    /// Create a property with the given price and rent and nothing else specified
    pub fn new(market_price: Money, monthly_rent: MoneyPerMonth) -> Self {
        Self {
            market_price,
            monthly_rent,
            smart_features: FeatureAdoption::none(),
            bedrooms: 0,
            bathrooms: 0,
            stand_size_sqm: 0.0,
            building_size_sqm: 0.0,
            location_suburb: String::new(),
            property_type: String::new(),
        }
    }

    /// Read a property description from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the property file
    ///
    /// # Returns
    ///
    /// The property as a [`PropertyConfig`] or an error if the file is invalid
    pub fn from_path(file_path: &Path) -> Result<PropertyConfig> {
        let property: PropertyConfig = read_toml(file_path)?;
        property
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(property)
    }

    /// Check that the property's values are usable.
    ///
    /// A market price of zero is accepted: ROI is defined to be zero in that case.
    pub fn validate(&self) -> Result<()> {
        check_non_negative("market_price", self.market_price.value())?;
        check_non_negative("monthly_rent", self.monthly_rent.value())?;
        check_non_negative("stand_size_sqm", self.stand_size_sqm)?;
        check_non_negative("building_size_sqm", self.building_size_sqm)?;
        self.smart_features.validate()?;

        Ok(())
    }

    /// Whether an ROI ratio is defined for this property
    pub fn has_valid_price(&self) -> bool {
        self.market_price > Money(0.0)
    }

    /// Return a copy with a different market price
    pub fn with_market_price(&self, market_price: Money) -> Self {
        Self {
            market_price,
            ..self.clone()
        }
    }

    /// Return a copy with a different monthly rent
    pub fn with_monthly_rent(&self, monthly_rent: MoneyPerMonth) -> Self {
        Self {
            monthly_rent,
            ..self.clone()
        }
    }

    /// Return a copy with different smart feature adoption
    pub fn with_smart_features(&self, smart_features: FeatureAdoption) -> Self {
        Self {
            smart_features,
            ..self.clone()
        }
    }
}
