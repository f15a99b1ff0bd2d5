//! Fixed code-to-label lookups for categorical trip columns.
//!
//! A code outside the table maps to an absent label (`null`), never an error.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{TransformError, TransformResult};

/// Rate code labels, codes 1 to 6.
pub const RATE_CODE_LABELS: [&str; 6] = [
    "Standard rate",
    "JFK",
    "Newark",
    "Nassua or Westchester",
    "Negotiated fare",
    "Group ride",
];

/// Payment type labels, codes 0 to 5.
pub const PAYMENT_TYPE_LABELS: [&str; 6] = [
    "Credit card",
    "Cash",
    "No charge",
    "Dispute",
    "Unkown",
    "Voided trip",
];

/// An explicit integer code to label mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLookup {
    name: String,
    labels: BTreeMap<i64, String>,
}

impl CodeLookup {
    /// Build a lookup from `(code, label)` pairs. Repeated codes are rejected.
    pub fn from_entries<'a>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (i64, &'a str)>,
    ) -> TransformResult<Self> {
        let name = name.into();
        let mut labels = BTreeMap::new();

        for (code, label) in entries {
            if labels.insert(code, label.to_string()).is_some() {
                return Err(TransformError::InvalidLookup {
                    name,
                    message: format!("code {} defined twice", code),
                });
            }
        }

        Ok(Self { name, labels })
    }

    /// Build a lookup from consecutive labels starting at `first_code`.
    pub fn sequential(name: impl Into<String>, first_code: i64, labels: &[&str]) -> TransformResult<Self> {
        Self::from_entries(
            name,
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| (first_code + i as i64, *label)),
        )
    }

    /// Rate codes: 1 = "Standard rate" .. 6 = "Group ride".
    pub fn rate_codes() -> TransformResult<Self> {
        Self::sequential("ratecode", 1, &RATE_CODE_LABELS)
    }

    /// Payment types: 0 = "Credit card" .. 5 = "Voided trip".
    pub fn payment_types() -> TransformResult<Self> {
        Self::sequential("payment_type", 0, &PAYMENT_TYPE_LABELS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for an integer code.
    pub fn label(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    /// Label for a cell, `null` when the cell is not a known code.
    pub fn label_cell(&self, cell: &Value) -> Value {
        code_of(cell)
            .and_then(|code| self.label(code))
            .map(|label| Value::String(label.to_string()))
            .unwrap_or(Value::Null)
    }

    /// Labels for a whole column.
    pub fn label_column(&self, cells: &[Value]) -> Vec<Value> {
        cells.iter().map(|c| self.label_cell(c)).collect()
    }
}

/// Read an integral code from a cell.
///
/// Accepts integers and floats with no fractional part (`1.0`). Strings are
/// never codes, even numeric ones.
pub fn code_of(cell: &Value) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rate_code_labels() {
        let lookup = CodeLookup::rate_codes().unwrap();
        assert_eq!(lookup.len(), 6);
        assert_eq!(lookup.label(1), Some("Standard rate"));
        assert_eq!(lookup.label(4), Some("Nassua or Westchester"));
        assert_eq!(lookup.label(6), Some("Group ride"));
        assert_eq!(lookup.label(7), None);
        assert_eq!(lookup.label(0), None);
    }

    #[test]
    fn test_payment_type_labels() {
        let lookup = CodeLookup::payment_types().unwrap();
        assert_eq!(lookup.label(0), Some("Credit card"));
        assert_eq!(lookup.label(4), Some("Unkown"));
        assert_eq!(lookup.label(5), Some("Voided trip"));
        assert_eq!(lookup.label(6), None);
    }

    #[test]
    fn test_label_cell_variants() {
        let lookup = CodeLookup::rate_codes().unwrap();
        assert_eq!(lookup.label_cell(&json!(2)), json!("JFK"));
        assert_eq!(lookup.label_cell(&json!(2.0)), json!("JFK"));
        assert_eq!(lookup.label_cell(&json!("3")), Value::Null);
        assert_eq!(lookup.label_cell(&json!(2.5)), Value::Null);
        assert_eq!(lookup.label_cell(&json!(99)), Value::Null);
        assert_eq!(lookup.label_cell(&Value::Null), Value::Null);
        assert_eq!(lookup.label_cell(&json!("cash")), Value::Null);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let err = CodeLookup::from_entries("broken", [(1, "a"), (1, "b")]).unwrap_err();
        assert!(matches!(err, TransformError::InvalidLookup { ref name, .. } if name == "broken"));
    }
}
