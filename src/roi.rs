//! The deterministic ROI calculator.
//!
//! Combines the expense and savings models into two headline figures:
//!
//! * **Traditional ROI**: net rental yield ignoring smart-feature savings
//! * **Smart ROI**: net rental yield with smart-feature savings added to income
//!
//! Both are percentages of the market price. If the market price is not positive, ROI is defined
//! to be zero rather than being treated as an error.
use crate::constants::FeatureConstants;
use crate::expense::{ExpenseBreakdown, compute_expenses};
use crate::feature::FeatureAdoption;
use crate::savings::{Savings, compute_savings};
use crate::units::{Money, MoneyPerMonth, MoneyPerYear, Percent};
use serde::Serialize;

/// The result of a single ROI simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiResult {
    /// ROI without smart-feature savings
    pub traditional_roi: Percent,
    /// ROI including smart-feature savings
    pub smart_roi: Percent,
    /// ROI estimated by the trained regression model, if one is loaded
    pub predicted_roi: Option<Percent>,
    /// Annual rental income
    pub annual_rent: MoneyPerYear,
    /// Savings from smart features
    pub savings: Savings,
    /// Annual operating expenses
    pub expense_breakdown: ExpenseBreakdown,
}

impl RoiResult {
    /// Return a copy with the model's predicted ROI filled in
    pub fn with_prediction(self, predicted_roi: Percent) -> Self {
        Self {
            predicted_roi: Some(predicted_roi),
            ..self
        }
    }

    /// Annual savings from smart features
    pub fn annual_savings(&self) -> MoneyPerYear {
        self.savings.annual
    }

    /// Net annual income before smart-feature savings
    pub fn net_income(&self) -> MoneyPerYear {
        self.annual_rent - self.expense_breakdown.total
    }

    /// Net annual income including smart-feature savings
    pub fn net_income_with_savings(&self) -> MoneyPerYear {
        self.annual_rent + self.savings.annual - self.expense_breakdown.total
    }
}

/// Express an annual net income as a percentage yield on the price.
///
/// Returns zero when the price is not positive.
pub fn yield_on_price(net_income: MoneyPerYear, price: Money) -> Percent {
    if price > Money(0.0) {
        Percent::from(net_income / price)
    } else {
        Percent(0.0)
    }
}

/// Calculates traditional and smart ROI for a property.
///
/// The predicted ROI is left unset; it is filled in by the predictor when a trained model is
/// available.
///
/// # Arguments
///
/// * `price` - Market price of the property
/// * `monthly_rent` - Expected monthly rent
/// * `adoption` - Adoption fraction of each smart feature
/// * `constants` - Expense rates and per-feature savings
pub fn compute_roi(
    price: Money,
    monthly_rent: MoneyPerMonth,
    adoption: &FeatureAdoption,
    constants: &FeatureConstants,
) -> RoiResult {
    let annual_rent = monthly_rent.annualise();
    let expenses = compute_expenses(price, monthly_rent, &constants.expenses);
    let savings = compute_savings(adoption, &constants.savings);

    let traditional_roi = yield_on_price(annual_rent - expenses.total, price);
    let smart_roi = yield_on_price(annual_rent + savings.annual - expenses.total, price);

    RoiResult {
        traditional_roi,
        smart_roi,
        predicted_roi: None,
        annual_rent,
        savings,
        expense_breakdown: expenses,
    }
}
