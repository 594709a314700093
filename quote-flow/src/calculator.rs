//! DIME (Debt, Income, Mortgage, Education) coverage suggestion.

use serde::{Deserialize, Serialize};

use crate::conversation::Dependent;
use crate::rules::{self, MIN_FACE_AMOUNT};

pub const INCOME_MULTIPLIER: f64 = 10.0;
/// Present-day cost of a four-year degree.
pub const COLLEGE_COST_ESTIMATE: f64 = 100_000.0;
pub const COLLEGE_COST_INFLATION: f64 = 0.03;
pub const COLLEGE_AGE: u32 = 18;
pub const COVERAGE_ROUNDING: f64 = 50_000.0;

pub const DEFAULT_TERM: u32 = 20;
pub const EXTENDED_TERM: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageBreakdown {
    pub debt_coverage: f64,
    pub income_coverage: f64,
    pub education_coverage: f64,
    /// Sum of the components, rounded up to the next 50,000.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSuggestion {
    pub suggested_amount: u64,
    pub breakdown: CoverageBreakdown,
}

pub fn calculate_dime_coverage(
    income: Option<u64>,
    total_debt: Option<u64>,
    mortgage_balance: Option<u64>,
    dependents: &[Dependent],
    age: u32,
) -> CoverageSuggestion {
    let debt_coverage = total_debt.unwrap_or(0) as f64 + mortgage_balance.unwrap_or(0) as f64;
    let income_coverage = income.unwrap_or(0) as f64 * INCOME_MULTIPLIER;
    let education_coverage = education_costs(dependents);

    let raw = debt_coverage + income_coverage + education_coverage;
    let total = (raw / COVERAGE_ROUNDING).ceil() * COVERAGE_ROUNDING;

    // An unsupported age has no ceiling, which pins the suggestion to the floor.
    let ceiling = rules::face_amount_ceiling(age).unwrap_or(0);
    let suggested_amount = (total as u64).min(ceiling).max(MIN_FACE_AMOUNT);

    CoverageSuggestion {
        suggested_amount,
        breakdown: CoverageBreakdown {
            debt_coverage,
            income_coverage,
            education_coverage,
            total,
        },
    }
}

/// College cost per dependent, inflated to the year they turn 18. Dependents
/// already 18 or older count at today's cost.
pub fn education_costs(dependents: &[Dependent]) -> f64 {
    dependents
        .iter()
        .map(|dependent| {
            let years_until_college = COLLEGE_AGE.saturating_sub(dependent.age);
            COLLEGE_COST_ESTIMATE * (1.0 + COLLEGE_COST_INFLATION).powi(years_until_college as i32)
        })
        .sum()
}

/// Suggested term in years. Young dependents may extend the term, but the
/// age caps are applied last and always win.
pub fn suggest_term_length(age: u32, dependents: &[Dependent]) -> u32 {
    let mut term = DEFAULT_TERM;

    if let Some(youngest) = dependents.iter().map(|d| d.age).min() {
        let years_to_adulthood = i64::from(COLLEGE_AGE) - i64::from(youngest);
        if years_to_adulthood > i64::from(DEFAULT_TERM) {
            term = EXTENDED_TERM;
        }
    }

    if age > 50 {
        term = term.min(20);
    }
    if age > 55 {
        term = term.min(10);
    }
    term
}
