//! Defines the `FeatureConstants` struct: smart-feature savings and expense rates.
//!
//! These are fixed business constants rather than learned parameters. They are loaded once, from
//! an optional `constants.toml` file in the model directory, and never mutated afterwards.
use crate::feature::SmartFeature;
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use crate::units::{Dimensionless, MoneyPerMonth, PerYear};
use anyhow::{Context, Result, ensure};
use log::info;
use serde::Deserialize;
use std::path::Path;
use strum::IntoEnumIterator;

const CONSTANTS_FILE_NAME: &str = "constants.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_unit_param_default!(default_tax_rate, PerYear, 0.01);
define_unit_param_default!(default_maintenance_rate, PerYear, 0.015);
define_unit_param_default!(default_insurance_rate, PerYear, 0.004);
define_unit_param_default!(default_solar_savings, MoneyPerMonth, 80.0);
define_unit_param_default!(default_water_recycling_savings, MoneyPerMonth, 25.0);
define_unit_param_default!(default_smart_locks_savings, MoneyPerMonth, 10.0);
define_unit_param_default!(default_smart_thermostats_savings, MoneyPerMonth, 15.0);
define_unit_param_default!(default_integrated_security_savings, MoneyPerMonth, 30.0);
define_unit_param_default!(default_ev_charging_savings, MoneyPerMonth, 20.0);

fn default_agent_fee_rate() -> Dimensionless {
    Dimensionless(0.10)
}

/// Annual operating expense rates.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ExpenseRates {
    /// Property tax as a fraction of market price per year
    #[serde(default = "default_tax_rate")]
    pub property_tax: PerYear,
    /// Maintenance as a fraction of market price per year
    #[serde(default = "default_maintenance_rate")]
    pub maintenance: PerYear,
    /// Insurance as a fraction of market price per year
    #[serde(default = "default_insurance_rate")]
    pub insurance: PerYear,
    /// Letting agent fees as a fraction of annual rent
    #[serde(default = "default_agent_fee_rate")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub agent_fee: Dimensionless,
}

impl Default for ExpenseRates {
    fn default() -> Self {
        Self {
            property_tax: default_tax_rate(),
            maintenance: default_maintenance_rate(),
            insurance: default_insurance_rate(),
            agent_fee: default_agent_fee_rate(),
        }
    }
}

/// Monthly savings delivered by each smart feature at full adoption.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct FeatureSavings {
    /// Solar panels
    #[serde(default = "default_solar_savings")]
    pub solar: MoneyPerMonth,
    /// Water recycling
    #[serde(default = "default_water_recycling_savings")]
    pub water_recycling: MoneyPerMonth,
    /// Smart locks
    #[serde(default = "default_smart_locks_savings")]
    pub smart_locks: MoneyPerMonth,
    /// Smart thermostats
    #[serde(default = "default_smart_thermostats_savings")]
    pub smart_thermostats: MoneyPerMonth,
    /// Integrated security
    #[serde(default = "default_integrated_security_savings")]
    pub integrated_security: MoneyPerMonth,
    /// EV charging
    #[serde(default = "default_ev_charging_savings")]
    pub ev_charging: MoneyPerMonth,
}

impl Default for FeatureSavings {
    fn default() -> Self {
        Self {
            solar: default_solar_savings(),
            water_recycling: default_water_recycling_savings(),
            smart_locks: default_smart_locks_savings(),
            smart_thermostats: default_smart_thermostats_savings(),
            integrated_security: default_integrated_security_savings(),
            ev_charging: default_ev_charging_savings(),
        }
    }
}

impl FeatureSavings {
    /// The monthly saving for a feature at full adoption
    pub fn get(&self, feature: SmartFeature) -> MoneyPerMonth {
        match feature {
            SmartFeature::Solar => self.solar,
            SmartFeature::WaterRecycling => self.water_recycling,
            SmartFeature::SmartLocks => self.smart_locks,
            SmartFeature::SmartThermostats => self.smart_thermostats,
            SmartFeature::IntegratedSecurity => self.integrated_security,
            SmartFeature::EvCharging => self.ev_charging,
        }
    }
}

/// Process-wide constants for the deterministic financial model.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct FeatureConstants {
    /// Expense rates
    #[serde(default)]
    pub expenses: ExpenseRates,
    /// Per-feature monthly savings
    #[serde(default)]
    pub savings: FeatureSavings,
}

impl FeatureConstants {
    /// Read constants from the specified model directory.
    ///
    /// If the directory contains no `constants.toml`, the canonical values are used.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model artifacts
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<FeatureConstants> {
        let file_path = model_dir.as_ref().join(CONSTANTS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(FeatureConstants::default());
        }

        let constants: FeatureConstants = read_toml(&file_path)?;
        constants
            .validate()
            .with_context(|| input_err_msg(&file_path))?;
        info!("Loaded feature constants from {}", file_path.display());

        Ok(constants)
    }

    /// Validate constants after reading in file
    fn validate(&self) -> Result<()> {
        let rates = [
            ("property_tax", self.expenses.property_tax.value()),
            ("maintenance", self.expenses.maintenance.value()),
            ("insurance", self.expenses.insurance.value()),
        ];
        for (name, rate) in rates {
            ensure!(
                rate.is_finite() && rate >= 0.0,
                "{name} rate must be a finite number greater than or equal to zero"
            );
        }

        // NB: savings are allowed to be zero, but never negative, so smart ROI can't drop below
        // traditional ROI
        for feature in SmartFeature::iter() {
            let saving = self.savings.get(feature);
            ensure!(
                saving.is_finite() && saving >= MoneyPerMonth(0.0),
                "Savings for {feature} must be a finite number greater than or equal to zero"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_canonical_defaults() {
        let constants = FeatureConstants::default();
        assert_eq!(constants.expenses.property_tax, PerYear(0.01));
        assert_eq!(constants.expenses.maintenance, PerYear(0.015));
        assert_eq!(constants.expenses.insurance, PerYear(0.004));
        assert_eq!(constants.expenses.agent_fee, Dimensionless(0.10));
        assert_eq!(constants.savings.get(SmartFeature::Solar), MoneyPerMonth(80.0));
        assert_eq!(
            constants.savings.get(SmartFeature::EvCharging),
            MoneyPerMonth(20.0)
        );
    }

    #[test]
    fn test_from_path_no_file() {
        let dir = tempdir().unwrap();
        assert_eq!(
            FeatureConstants::from_path(dir.path()).unwrap(),
            FeatureConstants::default()
        );
    }

    #[test]
    fn test_from_path_partial_override() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CONSTANTS_FILE_NAME)).unwrap();
            writeln!(file, "[savings]\nsolar = 100.0\n\n[expenses]\ninsurance = 0.005").unwrap();
        }

        let constants = FeatureConstants::from_path(dir.path()).unwrap();
        assert_eq!(constants.savings.solar, MoneyPerMonth(100.0));
        assert_eq!(constants.savings.smart_locks, MoneyPerMonth(10.0));
        assert_eq!(constants.expenses.insurance, PerYear(0.005));
        assert_eq!(constants.expenses.property_tax, PerYear(0.01));
    }

    #[test]
    fn test_from_path_negative_savings() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CONSTANTS_FILE_NAME)).unwrap();
            writeln!(file, "[savings]\nsolar = -5.0").unwrap();
        }

        assert!(FeatureConstants::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_from_path_invalid_agent_fee() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CONSTANTS_FILE_NAME)).unwrap();
            writeln!(file, "[expenses]\nagent_fee = 1.5").unwrap();
        }

        assert!(FeatureConstants::from_path(dir.path()).is_err());
    }
}
