//! # Case Classification
//!
//! The two closed vocabularies a complaint is classified by. One definition
//! each, exhaustive `match` everywhere.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The category of incident a complaint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Theft of property.
    Theft,
    /// Physical assault.
    Assault,
    /// Fraud or deception for gain.
    Fraud,
    /// Harassment of a person.
    Harassment,
    /// Damage to property.
    Vandalism,
    /// Unlawful entry with intent.
    Burglary,
    /// Anything not covered above.
    Other,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 7] = [
        Self::Theft,
        Self::Assault,
        Self::Fraud,
        Self::Harassment,
        Self::Vandalism,
        Self::Burglary,
        Self::Other,
    ];

    /// The canonical name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theft => "Theft",
            Self::Assault => "Assault",
            Self::Fraud => "Fraud",
            Self::Harassment => "Harassment",
            Self::Vandalism => "Vandalism",
            Self::Burglary => "Burglary",
            Self::Other => "Other",
        }
    }

    /// Parse a category name, ignoring ASCII case.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ValidationError::UnknownCategory(name.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How severe the reported incident is. Ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Severity {
    /// Minor incident.
    Low,
    /// Default severity when the reporting officer does not choose one.
    #[default]
    Medium,
    /// Serious incident.
    High,
    /// Requires immediate attention.
    Critical,
}

impl Severity {
    /// All severities from lowest to highest.
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// The canonical name of this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Parse a severity name, ignoring ASCII case.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ValidationError::UnknownSeverity(name.to_string()))
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("theft").unwrap(), Category::Theft);
        assert_eq!(Category::parse(" BURGLARY ").unwrap(), Category::Burglary);
    }

    #[test]
    fn category_parse_rejects_unknown() {
        let err = Category::parse("Arson").unwrap_err();
        assert_eq!(err.field(), Some("category"));
        assert!(err.to_string().contains("Arson"));
    }

    #[test]
    fn category_names_round_trip_through_display() {
        for c in Category::ALL {
            assert_eq!(Category::parse(&c.to_string()).unwrap(), c);
        }
    }

    #[test]
    fn severity_defaults_to_medium() {
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_parse_rejects_unknown() {
        assert!(matches!(
            Severity::parse("Extreme"),
            Err(ValidationError::UnknownSeverity(_))
        ));
    }

    #[test]
    fn serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&Category::Harassment).unwrap(), "\"Harassment\"");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"Critical\"");
    }
}
