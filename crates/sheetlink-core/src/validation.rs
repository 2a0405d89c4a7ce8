//! Data validation rules

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A data validation rule applied to a range
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationRule {
    pub kind: ValidationKind,
    pub operator: ValidationOperator,
    /// First bound expression (minimum, comparison value, or custom formula)
    pub formula1: String,
    /// Second bound expression for two-value operators
    pub formula2: String,
    /// Dropdown entries for list validation
    pub dropdown: Vec<String>,
    pub show_input_message: bool,
    pub input_title: String,
    pub input_message: String,
    pub show_error_message: bool,
    pub error_title: String,
    pub error_message: String,
}

impl DataValidationRule {
    fn new(kind: ValidationKind) -> Self {
        Self {
            kind,
            operator: ValidationOperator::Between,
            formula1: String::new(),
            formula2: String::new(),
            dropdown: Vec::new(),
            show_input_message: false,
            input_title: String::new(),
            input_message: String::new(),
            show_error_message: false,
            error_title: String::new(),
            error_message: String::new(),
        }
    }

    /// Dropdown list validation
    pub fn list<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = Self::new(ValidationKind::List);
        rule.dropdown = entries.into_iter().map(Into::into).collect();
        rule
    }

    /// Whole-number validation
    pub fn whole_number<S: Into<String>>(operator: ValidationOperator, formula1: S) -> Self {
        let mut rule = Self::new(ValidationKind::Whole);
        rule.operator = operator;
        rule.formula1 = formula1.into();
        rule
    }

    /// Decimal validation
    pub fn decimal<S: Into<String>>(operator: ValidationOperator, formula1: S) -> Self {
        let mut rule = Self::new(ValidationKind::Decimal);
        rule.operator = operator;
        rule.formula1 = formula1.into();
        rule
    }

    /// Date validation
    pub fn date<S: Into<String>>(operator: ValidationOperator, formula1: S) -> Self {
        let mut rule = Self::new(ValidationKind::Date);
        rule.operator = operator;
        rule.formula1 = formula1.into();
        rule
    }

    /// Time validation
    pub fn time<S: Into<String>>(operator: ValidationOperator, formula1: S) -> Self {
        let mut rule = Self::new(ValidationKind::Time);
        rule.operator = operator;
        rule.formula1 = formula1.into();
        rule
    }

    /// Text-length validation
    pub fn text_length<S: Into<String>>(operator: ValidationOperator, formula1: S) -> Self {
        let mut rule = Self::new(ValidationKind::TextLength);
        rule.operator = operator;
        rule.formula1 = formula1.into();
        rule
    }

    /// Custom-formula validation (the operator is ignored by hosts)
    pub fn custom<S: Into<String>>(formula: S) -> Self {
        let mut rule = Self::new(ValidationKind::Custom);
        rule.formula1 = formula.into();
        rule
    }

    /// Set the second bound for Between/NotBetween operators
    pub fn with_formula2<S: Into<String>>(mut self, formula2: S) -> Self {
        self.formula2 = formula2.into();
        self
    }

    /// Attach an input prompt shown when the cell is selected
    pub fn with_input_message<T: Into<String>, M: Into<String>>(
        mut self,
        title: T,
        message: M,
    ) -> Self {
        self.show_input_message = true;
        self.input_title = title.into();
        self.input_message = message.into();
        self
    }

    /// Attach an error alert shown on invalid entry
    pub fn with_error_message<T: Into<String>, M: Into<String>>(
        mut self,
        title: T,
        message: M,
    ) -> Self {
        self.show_error_message = true;
        self.error_title = title.into();
        self.error_message = message.into();
        self
    }
}

/// Validation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationKind {
    #[default]
    List,
    Whole,
    Decimal,
    Date,
    Time,
    TextLength,
    Custom,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKind::List => "list",
            ValidationKind::Whole => "whole",
            ValidationKind::Decimal => "decimal",
            ValidationKind::Date => "date",
            ValidationKind::Time => "time",
            ValidationKind::TextLength => "textLength",
            ValidationKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list" => Ok(ValidationKind::List),
            "whole" => Ok(ValidationKind::Whole),
            "decimal" => Ok(ValidationKind::Decimal),
            "date" => Ok(ValidationKind::Date),
            "time" => Ok(ValidationKind::Time),
            "textLength" => Ok(ValidationKind::TextLength),
            "custom" => Ok(ValidationKind::Custom),
            _ => Err(Error::invalid(format!("validation kind: {s}"))),
        }
    }
}

/// Comparison operators for bounded validation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationOperator {
    #[default]
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl ValidationOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOperator::Between => "between",
            ValidationOperator::NotBetween => "notBetween",
            ValidationOperator::Equal => "equal",
            ValidationOperator::NotEqual => "notEqual",
            ValidationOperator::GreaterThan => "greaterThan",
            ValidationOperator::LessThan => "lessThan",
            ValidationOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            ValidationOperator::LessThanOrEqual => "lessThanOrEqual",
        }
    }

    /// True for operators that take two bound expressions
    pub fn requires_two_values(&self) -> bool {
        matches!(
            self,
            ValidationOperator::Between | ValidationOperator::NotBetween
        )
    }

    /// Parse a caller-supplied operator name, defaulting to Between on
    /// anything unrecognized (original behavior; callers pass free text).
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for ValidationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "between" => Ok(ValidationOperator::Between),
            "notBetween" => Ok(ValidationOperator::NotBetween),
            "equal" => Ok(ValidationOperator::Equal),
            "notEqual" => Ok(ValidationOperator::NotEqual),
            "greaterThan" => Ok(ValidationOperator::GreaterThan),
            "lessThan" => Ok(ValidationOperator::LessThan),
            "greaterThanOrEqual" => Ok(ValidationOperator::GreaterThanOrEqual),
            "lessThanOrEqual" => Ok(ValidationOperator::LessThanOrEqual),
            _ => Err(Error::invalid(format!("validation operator: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_builder() {
        let rule = DataValidationRule::list(["Yes", "No"]);
        assert_eq!(rule.kind, ValidationKind::List);
        assert_eq!(rule.dropdown, vec!["Yes", "No"]);
    }

    #[test]
    fn test_whole_number_between() {
        let rule = DataValidationRule::whole_number(ValidationOperator::Between, "1")
            .with_formula2("100")
            .with_error_message("Out of range", "Enter a number from 1 to 100");
        assert_eq!(rule.kind, ValidationKind::Whole);
        assert_eq!(rule.formula1, "1");
        assert_eq!(rule.formula2, "100");
        assert!(rule.show_error_message);
        assert!(rule.operator.requires_two_values());
    }

    #[test]
    fn test_operator_parse_or_default() {
        assert_eq!(
            ValidationOperator::parse_or_default("greaterThan"),
            ValidationOperator::GreaterThan
        );
        assert_eq!(
            ValidationOperator::parse_or_default("bogus"),
            ValidationOperator::Between
        );
    }
}
