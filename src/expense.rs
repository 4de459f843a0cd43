//! The expense model: annual operating costs of a rental property.
use crate::constants::ExpenseRates;
use crate::units::{Money, MoneyPerMonth, MoneyPerYear};
use serde::Serialize;

/// A breakdown of annual operating expenses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
    /// Property tax
    pub tax: MoneyPerYear,
    /// Maintenance
    pub maintenance: MoneyPerYear,
    /// Insurance
    pub insurance: MoneyPerYear,
    /// Letting agent fees
    pub agent_fees: MoneyPerYear,
    /// Sum of the above
    pub total: MoneyPerYear,
}

/// Calculates the annual operating expenses for a property.
///
/// Tax, maintenance and insurance scale with the market price; agent fees scale with the annual
/// rent. Inputs are expected to be non-negative.
pub fn compute_expenses(
    price: Money,
    monthly_rent: MoneyPerMonth,
    rates: &ExpenseRates,
) -> ExpenseBreakdown {
    let annual_rent = monthly_rent.annualise();
    let tax = price * rates.property_tax;
    let maintenance = price * rates.maintenance;
    let insurance = price * rates.insurance;
    let agent_fees = annual_rent * rates.agent_fee;

    ExpenseBreakdown {
        tax,
        maintenance,
        insurance,
        agent_fees,
        total: tax + maintenance + insurance + agent_fees,
    }
}
