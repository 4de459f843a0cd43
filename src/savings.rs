//! The savings model: what smart features are worth to the owner.
use crate::constants::FeatureSavings;
use crate::feature::FeatureAdoption;
use crate::units::{Money, MoneyPerMonth, MoneyPerYear};
use serde::Serialize;

/// Savings delivered by a property's smart features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Savings {
    /// Total monthly savings
    pub monthly: MoneyPerMonth,
    /// Total annual savings
    pub annual: MoneyPerYear,
}

impl Savings {
    /// The cumulative savings over a number of years
    pub fn lifetime(&self, years: u32) -> Money {
        self.annual.over_years(years)
    }
}

/// Calculates the savings for the given feature adoption.
///
/// Each feature contributes its full monthly saving scaled by its adoption fraction.
pub fn compute_savings(adoption: &FeatureAdoption, constants: &FeatureSavings) -> Savings {
    let monthly: MoneyPerMonth = adoption
        .iter()
        .map(|(feature, fraction)| constants.get(feature) * fraction)
        .sum();

    Savings {
        monthly,
        annual: monthly.annualise(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::SmartFeature;
    use crate::units::Dimensionless;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(FeatureAdoption::none(), 0.0)]
    #[case(FeatureAdoption::from_present([SmartFeature::Solar]), 80.0)]
    #[case(FeatureAdoption::from_present([SmartFeature::SmartLocks, SmartFeature::EvCharging]), 30.0)]
    #[case(FeatureAdoption::all(), 180.0)]
    #[case(FeatureAdoption::none().with(SmartFeature::Solar, Dimensionless(0.5)), 40.0)]
    fn test_compute_savings(#[case] adoption: FeatureAdoption, #[case] expected_monthly: f64) {
        let savings = compute_savings(&adoption, &FeatureSavings::default());
        assert_approx_eq!(MoneyPerMonth, savings.monthly, MoneyPerMonth(expected_monthly));
        assert_approx_eq!(
            MoneyPerYear,
            savings.annual,
            MoneyPerYear(expected_monthly * 12.0)
        );
    }

    #[test]
    fn test_lifetime_savings() {
        let savings = compute_savings(
            &FeatureAdoption::from_present([SmartFeature::Solar]),
            &FeatureSavings::default(),
        );
        assert_approx_eq!(Money, savings.lifetime(5), Money(4800.0));
        assert_approx_eq!(Money, savings.lifetime(10), Money(9600.0));
    }
}
