//! Smart features and their adoption levels.
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// A smart feature which can be fitted to a property.
///
/// The declaration order is significant: it is the order used for feature columns, savings
/// breakdowns and sensitivity sweeps.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SmartFeature {
    /// Rooftop solar panels
    Solar,
    /// Grey-water recycling system
    WaterRecycling,
    /// Smart door locks
    SmartLocks,
    /// Smart heating/cooling thermostats
    SmartThermostats,
    /// Integrated security system
    IntegratedSecurity,
    /// Electric vehicle charging point
    EvCharging,
}

impl SmartFeature {
    /// Human-readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Self::Solar => "Solar Adoption",
            Self::WaterRecycling => "Water Recycling",
            Self::SmartLocks => "Smart Locks",
            Self::SmartThermostats => "Smart Thermostats",
            Self::IntegratedSecurity => "Integrated Security",
            Self::EvCharging => "EV Charging",
        }
    }

    /// Name of the binary column for this feature in the trained model's schema
    pub fn column_name(self) -> String {
        format!("has_{self}")
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A value for a feature in an input file: either a flag or an adoption fraction.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum AdoptionValue {
    /// The feature is either fully present or absent
    Flag(bool),
    /// The fraction of the feature's benefit which is realised
    Fraction(f64),
}

impl AdoptionValue {
    fn as_fraction(self) -> f64 {
        match self {
            Self::Flag(flag) => {
                if flag {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Fraction(value) => value,
        }
    }
}

/// The adoption fraction of each smart feature, each in the range [0, 1].
///
/// Boolean flags are represented as 0.0 (absent) or 1.0 (present). Features not mentioned in
/// an input file default to absent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<SmartFeature, AdoptionValue>",
    into = "IndexMap<SmartFeature, f64>"
)]
pub struct FeatureAdoption([Dimensionless; SmartFeature::COUNT]);

impl FeatureAdoption {
    /// Adoption with no features present
    pub fn none() -> Self {
        Self::default()
    }

    /// Adoption with every feature fully present
    pub fn all() -> Self {
        Self([Dimensionless(1.0); SmartFeature::COUNT])
    }

    /// Create from a list of features which are present
    pub fn from_present<I>(features: I) -> Self
    where
        I: IntoIterator<Item = SmartFeature>,
    {
        let mut adoption = Self::none();
        for feature in features {
            adoption.0[feature.index()] = Dimensionless(1.0);
        }
        adoption
    }

    /// The adoption fraction for a feature
    pub fn get(&self, feature: SmartFeature) -> Dimensionless {
        self.0[feature.index()]
    }

    /// Return a copy with one feature's adoption replaced
    pub fn with(mut self, feature: SmartFeature, fraction: Dimensionless) -> Self {
        self.0[feature.index()] = fraction;
        self
    }

    /// Whether a feature counts as present (i.e. has any adoption at all)
    pub fn is_present(&self, feature: SmartFeature) -> bool {
        self.get(feature) > Dimensionless(0.0)
    }

    /// Iterate over features and their adoption fractions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (SmartFeature, Dimensionless)> + '_ {
        SmartFeature::iter().map(|feature| (feature, self.get(feature)))
    }

    /// Check that every adoption fraction lies in [0, 1]
    pub fn validate(&self) -> Result<()> {
        for (feature, fraction) in self.iter() {
            check_fraction(feature, fraction.0)?;
        }

        Ok(())
    }
}

fn check_fraction(feature: SmartFeature, value: f64) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "Adoption for {feature} must be between 0 and 1 (got {value})"
    );

    Ok(())
}

impl TryFrom<IndexMap<SmartFeature, AdoptionValue>> for FeatureAdoption {
    type Error = anyhow::Error;

    fn try_from(map: IndexMap<SmartFeature, AdoptionValue>) -> Result<Self> {
        let mut adoption = Self::none();
        for (feature, value) in map {
            let fraction = value.as_fraction();
            check_fraction(feature, fraction)?;
            adoption = adoption.with(feature, Dimensionless(fraction));
        }

        Ok(adoption)
    }
}

impl From<FeatureAdoption> for IndexMap<SmartFeature, f64> {
    fn from(adoption: FeatureAdoption) -> Self {
        adoption
            .iter()
            .map(|(feature, fraction)| (feature, fraction.0))
            .collect()
    }
}
