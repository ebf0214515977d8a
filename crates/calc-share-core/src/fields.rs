//! Field registry: the closed vocabulary of shared values.
//!
//! Every calculator refers to shared values through [`SharedField`], so a
//! producer and a consumer never need to know each other's local input names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A semantic value that calculators agree to exchange.
///
/// Serialized as its camelCase key (e.g. `annualIncome`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SharedField {
    // Income / salary
    AnnualIncome,
    MonthlyIncome,
    HourlyRate,
    // Expenses / savings
    MonthlyExpenses,
    MonthlySavings,
    SavingsGoal,
    // Loan / home
    LoanAmount,
    InterestRate,
    LoanTermYears,
    HomePrice,
    DownPayment,
    // Event
    GuestCount,
    EventBudget,
    // Health / body
    Age,
    WeightKg,
    HeightCm,
    Gender,
    Bmi,
    // Preferences
    Currency,
}

/// The declared type of a shared field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Currency,
    Gender,
}

impl SharedField {
    /// Every recognized field, in registry order.
    pub const ALL: [SharedField; 19] = [
        Self::AnnualIncome,
        Self::MonthlyIncome,
        Self::HourlyRate,
        Self::MonthlyExpenses,
        Self::MonthlySavings,
        Self::SavingsGoal,
        Self::LoanAmount,
        Self::InterestRate,
        Self::LoanTermYears,
        Self::HomePrice,
        Self::DownPayment,
        Self::GuestCount,
        Self::EventBudget,
        Self::Age,
        Self::WeightKg,
        Self::HeightCm,
        Self::Gender,
        Self::Bmi,
        Self::Currency,
    ];

    /// Wire name used as the document key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AnnualIncome => "annualIncome",
            Self::MonthlyIncome => "monthlyIncome",
            Self::HourlyRate => "hourlyRate",
            Self::MonthlyExpenses => "monthlyExpenses",
            Self::MonthlySavings => "monthlySavings",
            Self::SavingsGoal => "savingsGoal",
            Self::LoanAmount => "loanAmount",
            Self::InterestRate => "interestRate",
            Self::LoanTermYears => "loanTermYears",
            Self::HomePrice => "homePrice",
            Self::DownPayment => "downPayment",
            Self::GuestCount => "guestCount",
            Self::EventBudget => "eventBudget",
            Self::Age => "age",
            Self::WeightKg => "weightKg",
            Self::HeightCm => "heightCm",
            Self::Gender => "gender",
            Self::Bmi => "bmi",
            Self::Currency => "currency",
        }
    }

    /// Look up a field by wire name. Unknown names yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Human-readable label for banners.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AnnualIncome => "Annual Income",
            Self::MonthlyIncome => "Monthly Income",
            Self::HourlyRate => "Hourly Rate",
            Self::MonthlyExpenses => "Monthly Expenses",
            Self::MonthlySavings => "Monthly Savings",
            Self::SavingsGoal => "Savings Goal",
            Self::LoanAmount => "Loan Amount",
            Self::InterestRate => "Interest Rate",
            Self::LoanTermYears => "Loan Term (Years)",
            Self::HomePrice => "Home Price",
            Self::DownPayment => "Down Payment",
            Self::GuestCount => "Number of Guests",
            Self::EventBudget => "Event Budget",
            Self::Age => "Age",
            Self::WeightKg => "Weight (kg)",
            Self::HeightCm => "Height (cm)",
            Self::Gender => "Gender",
            Self::Bmi => "BMI",
            Self::Currency => "Currency",
        }
    }

    /// Declared value type.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Currency => FieldKind::Currency,
            Self::Gender => FieldKind::Gender,
            _ => FieldKind::Number,
        }
    }
}

impl fmt::Display for SharedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Label for a raw key, falling back to the key itself when unknown.
pub fn field_label(key: &str) -> &str {
    SharedField::from_key(key).map_or(key, |field| field.label())
}

/// Currency preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// A shared field's value.
///
/// Serialized untagged, so the wire value is a bare JSON number or string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Currency(Currency),
    Gender(Gender),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Number(_) => FieldKind::Number,
            Self::Currency(_) => FieldKind::Currency,
            Self::Gender(_) => FieldKind::Gender,
        }
    }

    /// Whether this value may be stored under `field`.
    pub fn fits(&self, field: SharedField) -> bool {
        self.kind() == field.kind() && self.as_number().is_none_or(f64::is_finite)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Currency(c) => f.write_str(c.code()),
            Self::Gender(Gender::Male) => f.write_str("male"),
            Self::Gender(Gender::Female) => f.write_str("female"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Currency> for FieldValue {
    fn from(value: Currency) -> Self {
        Self::Currency(value)
    }
}

impl From<Gender> for FieldValue {
    fn from(value: Gender) -> Self {
        Self::Gender(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_serde() {
        for field in SharedField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
            assert_eq!(SharedField::from_key(field.key()), Some(field));
        }
    }

    #[test]
    fn test_unknown_key_label_falls_back_to_key() {
        assert_eq!(field_label("guestCount"), "Number of Guests");
        assert_eq!(field_label("shoeSize"), "shoeSize");
        assert_eq!(SharedField::from_key("shoeSize"), None);
    }

    #[test]
    fn test_values_deserialize_by_shape() {
        let v: FieldValue = serde_json::from_str("50").unwrap();
        assert_eq!(v, FieldValue::Number(50.0));
        let v: FieldValue = serde_json::from_str("\"GBP\"").unwrap();
        assert_eq!(v, FieldValue::Currency(Currency::Gbp));
        let v: FieldValue = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(v, FieldValue::Gender(Gender::Female));
        assert!(serde_json::from_str::<FieldValue>("\"JPY\"").is_err());
    }

    #[test]
    fn test_fits_checks_kind_and_finiteness() {
        assert!(FieldValue::Number(3.5).fits(SharedField::Bmi));
        assert!(!FieldValue::Number(f64::NAN).fits(SharedField::Bmi));
        assert!(!FieldValue::Number(1.0).fits(SharedField::Currency));
        assert!(FieldValue::Currency(Currency::Eur).fits(SharedField::Currency));
        assert!(!FieldValue::Gender(Gender::Male).fits(SharedField::Currency));
    }
}
