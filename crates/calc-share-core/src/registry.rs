//! Calculator registry and connection graph.
//!
//! Each calculator declares which shared fields it can import and which it
//! can export. The graph derived from those declarations answers "who could
//! use my data"; it reflects declared structure only and never consults the
//! stored values.
//!
//! # Example
//!
//! ```ignore
//! use calc_share_core::registry::default_registry;
//!
//! let registry = default_registry();
//! for config in registry.get_connected("bbq-planner") {
//!     println!("{} can use BBQ Planner values", config.name);
//! }
//! ```

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Result, ShareError};
use crate::fields::SharedField;

/// Static declaration of one calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatorConfig {
    /// Machine id, unique within a registry.
    pub id: String,
    /// Display name used as provenance.
    pub name: String,
    pub imports: Vec<SharedField>,
    pub exports: Vec<SharedField>,
}

impl CalculatorConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        imports: impl IntoIterator<Item = SharedField>,
        exports: impl IntoIterator<Item = SharedField>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            imports: imports.into_iter().collect(),
            exports: exports.into_iter().collect(),
        }
    }

    pub fn can_import(&self, field: SharedField) -> bool {
        self.imports.contains(&field)
    }

    pub fn can_export(&self, field: SharedField) -> bool {
        self.exports.contains(&field)
    }
}

/// Registry of calculators in registration order.
#[derive(Debug, Clone, Default)]
pub struct CalculatorRegistry {
    configs: Vec<CalculatorConfig>,
}

impl CalculatorRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn from_configs(configs: impl IntoIterator<Item = CalculatorConfig>) -> Result<Self> {
        let configs: Vec<CalculatorConfig> = configs.into_iter().collect();
        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.id.as_str()) {
                return Err(ShareError::DuplicateCalculatorId(config.id.clone()));
            }
        }
        Ok(Self { configs })
    }

    pub fn get_config(&self, id: &str) -> Option<&CalculatorConfig> {
        self.configs.iter().find(|config| config.id == id)
    }

    /// Every other calculator that imports at least one field `source_id`
    /// exports. Empty for unknown sources.
    pub fn get_connected(&self, source_id: &str) -> Vec<&CalculatorConfig> {
        let Some(source) = self.get_config(source_id) else {
            return Vec::new();
        };
        self.configs
            .iter()
            .filter(|config| config.id != source.id)
            .filter(|config| config.imports.iter().any(|f| source.can_export(*f)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalculatorConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

static DEFAULT_REGISTRY: OnceLock<CalculatorRegistry> = OnceLock::new();

/// The built-in calculator registry, built on first access.
pub fn default_registry() -> &'static CalculatorRegistry {
    DEFAULT_REGISTRY.get_or_init(|| CalculatorRegistry {
        configs: builtin_configs(),
    })
}

fn builtin_configs() -> Vec<CalculatorConfig> {
    use SharedField as F;

    vec![
        CalculatorConfig::new(
            "salary-calculator",
            "Salary Calculator",
            [F::Currency],
            [F::AnnualIncome, F::MonthlyIncome, F::HourlyRate, F::Currency],
        ),
        CalculatorConfig::new(
            "tax-bracket-calculator",
            "Tax Bracket Calculator",
            [F::AnnualIncome, F::Currency],
            [F::AnnualIncome, F::MonthlyIncome],
        ),
        CalculatorConfig::new(
            "budget-planner",
            "Budget Planner",
            [F::MonthlyIncome, F::Currency],
            [F::MonthlyExpenses, F::MonthlySavings],
        ),
        CalculatorConfig::new(
            "savings-goal-calculator",
            "Savings Goal Calculator",
            [F::MonthlySavings, F::Currency],
            [F::SavingsGoal],
        ),
        CalculatorConfig::new(
            "loan-calculator",
            "Loan Calculator",
            [F::LoanAmount, F::InterestRate, F::AnnualIncome, F::Currency],
            [F::LoanAmount, F::InterestRate, F::LoanTermYears],
        ),
        CalculatorConfig::new(
            "mortgage-calculator",
            "Mortgage Calculator",
            [
                F::HomePrice,
                F::DownPayment,
                F::InterestRate,
                F::LoanTermYears,
                F::AnnualIncome,
                F::Currency,
            ],
            [F::HomePrice, F::DownPayment, F::LoanAmount, F::InterestRate],
        ),
        CalculatorConfig::new(
            "home-affordability-calculator",
            "Home Affordability Calculator",
            [F::AnnualIncome, F::MonthlyExpenses, F::DownPayment, F::Currency],
            [F::HomePrice, F::DownPayment],
        ),
        CalculatorConfig::new(
            "bbq-planner",
            "BBQ Planner",
            [F::GuestCount, F::Currency],
            [F::GuestCount, F::EventBudget],
        ),
        CalculatorConfig::new(
            "party-budget-calculator",
            "Party Budget Calculator",
            [F::GuestCount, F::EventBudget, F::Currency],
            [F::GuestCount, F::EventBudget],
        ),
        CalculatorConfig::new(
            "pricing-strategy-calculator",
            "Pricing Strategy Calculator",
            [F::Currency],
            [F::Currency],
        ),
        CalculatorConfig::new(
            "bmi-calculator",
            "BMI Calculator",
            [F::HeightCm, F::WeightKg, F::Age, F::Gender],
            [F::Bmi, F::HeightCm, F::WeightKg, F::Age, F::Gender],
        ),
        CalculatorConfig::new(
            "calorie-calculator",
            "Calorie Calculator",
            [F::HeightCm, F::WeightKg, F::Age, F::Gender],
            [F::WeightKg],
        ),
        CalculatorConfig::new("soap-lye-calculator", "Soap Lye Calculator", [], []),
    ]
}
