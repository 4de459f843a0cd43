//! The sensitivity engine, which ranks variables by how much they move ROI (tornado chart data).
//!
//! Each variable is moved to the low and high ends of its range while every other variable is
//! held at its baseline value. The ROI metric is evaluated at both ends and the absolute
//! difference is the variable's impact.
//!
//! Monthly rent and market price are always swept over caller-supplied ranges. Smart features
//! are swept over adoption fractions whose lower bound depends on the [`SensitivityMode`].
use crate::feature::SmartFeature;
use crate::property::PropertyConfig;
use crate::units::{Dimensionless, Money, MoneyPerMonth, Percent};
use anyhow::{Result, ensure};
use serde::Serialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;
use strum::IntoEnumIterator;

/// The default fractional spread either side of baseline for rent and price ranges
pub const DEFAULT_SPREAD: f64 = 0.3;

/// How smart-feature adoption is swept
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
pub enum SensitivityMode {
    /// Sweep every feature from absent to fully adopted
    #[default]
    #[string = "full_impact"]
    #[value(name = "full_impact")]
    FullImpact,
    /// Sweep every feature from its baseline adoption to fully adopted
    #[string = "what_if"]
    #[value(name = "what_if")]
    WhatIf,
}

/// A variable which can be swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum SensitivityVariable {
    /// Monthly rental income
    MonthlyRent,
    /// Market price of the property
    MarketPrice,
    /// Adoption of a smart feature
    Feature(SmartFeature),
}

impl SensitivityVariable {
    /// All variables in reporting order
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::MonthlyRent, Self::MarketPrice]
            .into_iter()
            .chain(SmartFeature::iter().map(Self::Feature))
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::MonthlyRent => "Monthly Rent",
            Self::MarketPrice => "Market Price",
            Self::Feature(feature) => feature.label(),
        }
    }
}

impl fmt::Display for SensitivityVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<SensitivityVariable> for String {
    fn from(variable: SensitivityVariable) -> Self {
        variable.label().to_string()
    }
}

/// An inclusive range for a swept variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange<T> {
    /// The low end
    pub low: T,
    /// The high end
    pub high: T,
}

impl<T> SweepRange<T> {
    /// Create a new range
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }
}

/// Ranges for the variables which don't depend on the sweep mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityRanges {
    /// Range for monthly rent
    pub monthly_rent: SweepRange<MoneyPerMonth>,
    /// Range for market price
    pub market_price: SweepRange<Money>,
}

impl SensitivityRanges {
    /// Ranges of `baseline × (1 ± spread)` for rent and price.
    ///
    /// # Arguments
    ///
    /// * `baseline` - The property being analysed
    /// * `spread` - Fractional spread, e.g. 0.3 for ±30%
    pub fn around_baseline(baseline: &PropertyConfig, spread: f64) -> Result<Self> {
        ensure!(
            (0.0..1.0).contains(&spread),
            "Sensitivity spread must be at least 0 and less than 1 (got {spread})"
        );

        let low = Dimensionless(1.0 - spread);
        let high = Dimensionless(1.0 + spread);
        let rent = baseline.monthly_rent;
        let price = baseline.market_price;
        Ok(Self {
            monthly_rent: SweepRange::new(rent * low, rent * high),
            market_price: SweepRange::new(price * low, price * high),
        })
    }
}

/// The effect of sweeping one variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityEntry {
    /// The variable which was swept
    pub variable: SensitivityVariable,
    /// ROI with the variable at the low end of its range
    pub roi_at_low: Percent,
    /// ROI with the variable at the high end of its range
    pub roi_at_high: Percent,
    /// Absolute difference between the two
    pub impact: Percent,
}

/// Sensitivity entries sorted by descending impact
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityResult(Vec<SensitivityEntry>);

impl SensitivityResult {
    /// Iterate over the entries in order
    pub fn iter(&self) -> impl Iterator<Item = &SensitivityEntry> {
        self.0.iter()
    }

    /// The entries in order
    pub fn entries(&self) -> &[SensitivityEntry] {
        &self.0
    }

    /// The entry for a particular variable
    pub fn get(&self, variable: SensitivityVariable) -> Option<&SensitivityEntry> {
        self.0.iter().find(|entry| entry.variable == variable)
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The two ends of one variable's sweep
enum SweepPoints {
    Rent(SweepRange<MoneyPerMonth>),
    Price(SweepRange<Money>),
    Feature(SmartFeature, SweepRange<Dimensionless>),
}

impl SweepPoints {
    fn for_variable(
        variable: SensitivityVariable,
        baseline: &PropertyConfig,
        ranges: &SensitivityRanges,
        mode: SensitivityMode,
    ) -> Self {
        match variable {
            SensitivityVariable::MonthlyRent => Self::Rent(ranges.monthly_rent),
            SensitivityVariable::MarketPrice => Self::Price(ranges.market_price),
            SensitivityVariable::Feature(feature) => {
                let low = match mode {
                    SensitivityMode::FullImpact => Dimensionless(0.0),
                    SensitivityMode::WhatIf => baseline.smart_features.get(feature),
                };
                Self::Feature(feature, SweepRange::new(low, Dimensionless(1.0)))
            }
        }
    }

    fn is_degenerate(&self) -> bool {
        match self {
            Self::Rent(range) => range.low == range.high,
            Self::Price(range) => range.low == range.high,
            Self::Feature(_, range) => range.low == range.high,
        }
    }

    /// The low and high variants of the baseline property
    fn apply(&self, baseline: &PropertyConfig) -> (PropertyConfig, PropertyConfig) {
        match self {
            Self::Rent(range) => (
                baseline.with_monthly_rent(range.low),
                baseline.with_monthly_rent(range.high),
            ),
            Self::Price(range) => (
                baseline.with_market_price(range.low),
                baseline.with_market_price(range.high),
            ),
            Self::Feature(feature, range) => {
                let adoption = baseline.smart_features;
                (
                    baseline.with_smart_features(adoption.with(*feature, range.low)),
                    baseline.with_smart_features(adoption.with(*feature, range.high)),
                )
            }
        }
    }
}

/// Sweep every variable and rank them by impact on the chosen ROI metric.
///
/// `evaluate` computes the metric for a property. Any error it returns aborts the sweep.
///
/// # Arguments
///
/// * `baseline` - The property to perturb
/// * `ranges` - Ranges for rent and price
/// * `mode` - How smart-feature adoption is swept
/// * `evaluate` - Computes ROI for a perturbed property
///
/// # Returns
///
/// One entry per variable, sorted by descending impact. Ties keep the order of
/// [`SensitivityVariable::all`].
pub fn run_sensitivity<F, E>(
    baseline: &PropertyConfig,
    ranges: &SensitivityRanges,
    mode: SensitivityMode,
    mut evaluate: F,
) -> Result<SensitivityResult, E>
where
    F: FnMut(&PropertyConfig) -> Result<Percent, E>,
{
    let mut entries = Vec::new();
    for variable in SensitivityVariable::all() {
        let points = SweepPoints::for_variable(variable, baseline, ranges, mode);
        let (low, high) = points.apply(baseline);
        let roi_at_low = evaluate(&low)?;
        let roi_at_high = if points.is_degenerate() {
            roi_at_low
        } else {
            evaluate(&high)?
        };

        entries.push(SensitivityEntry {
            variable,
            roi_at_low,
            roi_at_high,
            impact: (roi_at_high - roi_at_low).abs(),
        });
    }

    // Stable, so ties keep declaration order
    entries.sort_by(|a, b| b.impact.0.total_cmp(&a.impact.0));

    Ok(SensitivityResult(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FeatureConstants;
    use crate::feature::FeatureAdoption;
    use crate::fixture::{constants, property};
    use crate::roi::compute_roi;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::convert::Infallible;

    fn smart_roi(
        constants: &FeatureConstants,
    ) -> impl FnMut(&PropertyConfig) -> Result<Percent, Infallible> {
        move |property| {
            Ok(compute_roi(
                property.market_price,
                property.monthly_rent,
                &property.smart_features,
                constants,
            )
            .smart_roi)
        }
    }

    #[rstest]
    fn test_around_baseline(property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        assert_approx_eq!(
            MoneyPerMonth,
            ranges.monthly_rent.low,
            MoneyPerMonth(700.0),
            epsilon = 1e-9
        );
        assert_approx_eq!(
            MoneyPerMonth,
            ranges.monthly_rent.high,
            MoneyPerMonth(1300.0),
            epsilon = 1e-9
        );
        assert_approx_eq!(Money, ranges.market_price.low, Money(84_000.0), epsilon = 1e-6);
        assert_approx_eq!(Money, ranges.market_price.high, Money(156_000.0), epsilon = 1e-6);
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.0)]
    #[case(f64::NAN)]
    fn test_around_baseline_invalid(property: PropertyConfig, #[case] spread: f64) {
        assert!(SensitivityRanges::around_baseline(&property, spread).is_err());
    }

    #[rstest]
    fn test_sorted_descending(constants: FeatureConstants, property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let result =
            run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, smart_roi(&constants))
                .unwrap();

        assert_eq!(result.len(), 8);
        assert!(
            result
                .entries()
                .windows(2)
                .all(|pair| pair[0].impact >= pair[1].impact)
        );
    }

    #[rstest]
    fn test_full_impact_solar(constants: FeatureConstants, property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let with_solar =
            run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, smart_roi(&constants))
                .unwrap();
        let without_solar = property.with_smart_features(FeatureAdoption::none());
        let without_solar = run_sensitivity(
            &without_solar,
            &ranges,
            SensitivityMode::FullImpact,
            smart_roi(&constants),
        )
        .unwrap();

        let variable = SensitivityVariable::Feature(SmartFeature::Solar);
        let entry = with_solar.get(variable).unwrap();
        assert_eq!(entry, without_solar.get(variable).unwrap());

        // 0% solar is the traditional ROI; 100% adds 960/year on 120k
        assert_approx_eq!(Percent, entry.roi_at_low, Percent(6.1), epsilon = 1e-10);
        assert_approx_eq!(Percent, entry.roi_at_high, Percent(6.9), epsilon = 1e-10);
        assert_approx_eq!(Percent, entry.impact, Percent(0.8), epsilon = 1e-10);
    }

    #[rstest]
    fn test_what_if_low_is_baseline(constants: FeatureConstants, property: PropertyConfig) {
        let property = property.with_smart_features(
            FeatureAdoption::none().with(SmartFeature::EvCharging, Dimensionless(0.5)),
        );
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let result =
            run_sensitivity(&property, &ranges, SensitivityMode::WhatIf, smart_roi(&constants))
                .unwrap();

        // Solar is absent in the baseline, so its sweep is the same as in full impact mode
        let solar = result
            .get(SensitivityVariable::Feature(SmartFeature::Solar))
            .unwrap();
        assert_approx_eq!(Percent, solar.impact, Percent(0.8), epsilon = 1e-10);

        // Half of EV charging's 240/year is already realised
        let ev = result
            .get(SensitivityVariable::Feature(SmartFeature::EvCharging))
            .unwrap();
        assert_approx_eq!(Percent, ev.impact, Percent(0.1), epsilon = 1e-10);
    }

    #[rstest]
    fn test_what_if_fully_adopted_has_no_impact(
        constants: FeatureConstants,
        property: PropertyConfig,
    ) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let result =
            run_sensitivity(&property, &ranges, SensitivityMode::WhatIf, smart_roi(&constants))
                .unwrap();
        let solar = result
            .get(SensitivityVariable::Feature(SmartFeature::Solar))
            .unwrap();
        assert_eq!(solar.impact, Percent(0.0));
        assert_eq!(solar.roi_at_low, solar.roi_at_high);
    }

    #[rstest]
    fn test_rent_and_price_same_in_both_modes(
        constants: FeatureConstants,
        property: PropertyConfig,
    ) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let full =
            run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, smart_roi(&constants))
                .unwrap();
        let what_if =
            run_sensitivity(&property, &ranges, SensitivityMode::WhatIf, smart_roi(&constants))
                .unwrap();
        for variable in [
            SensitivityVariable::MonthlyRent,
            SensitivityVariable::MarketPrice,
        ] {
            assert_eq!(full.get(variable), what_if.get(variable));
        }
    }

    #[rstest]
    fn test_degenerate_range(constants: FeatureConstants, property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.0).unwrap();
        let result =
            run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, smart_roi(&constants))
                .unwrap();
        for variable in [
            SensitivityVariable::MonthlyRent,
            SensitivityVariable::MarketPrice,
        ] {
            assert_eq!(result.get(variable).unwrap().impact, Percent(0.0));
        }
    }

    #[rstest]
    fn test_ties_keep_declaration_order(property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let result = run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, |_| {
            Ok::<_, Infallible>(Percent(1.0))
        })
        .unwrap();
        let variables: Vec<_> = result.iter().map(|entry| entry.variable).collect();
        assert_eq!(variables, SensitivityVariable::all().collect::<Vec<_>>());
    }

    #[rstest]
    fn test_error_aborts_sweep(property: PropertyConfig) {
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let mut calls = 0;
        let result = run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, |_| {
            calls += 1;
            Err("model failure")
        });
        assert_eq!(result, Err("model failure"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = SensitivityVariable::all().map(|v| v.to_string()).collect();
        assert_eq!(
            labels,
            [
                "Monthly Rent",
                "Market Price",
                "Solar Adoption",
                "Water Recycling",
                "Smart Locks",
                "Smart Thermostats",
                "Integrated Security",
                "EV Charging"
            ]
        );
    }
}
