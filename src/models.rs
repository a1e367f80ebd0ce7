use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar cell of a record as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            FieldValue::Number(n) => Some(*n != 0.0),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            // 85000 rather than 85000.0
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::String(s) => FieldValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::from(n as i64),
            FieldValue::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// One row returned by the API: a contract, an order, a facility or a transaction.
///
/// Field access never fails; an absent field reads as its default, which is
/// the empty string unless the screen declares otherwise (see [`FieldDef`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter used by the built-in sample data
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// String form of a field, empty when absent or null
    pub fn text(&self, field: &str) -> String {
        self.get(field).map(ToString::to_string).unwrap_or_default()
    }

    /// String form of a field, or `default` when absent, null or blank
    pub fn text_or(&self, field: &str, default: &str) -> String {
        match self.get(field) {
            Some(value) if !value.is_null() => {
                let text = value.to_string();
                if text.is_empty() {
                    default.to_string()
                } else {
                    text
                }
            }
            _ => default.to_string(),
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn id(&self) -> String {
        self.text("id")
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A field a screen knows about, with its display label and absent-value default
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub default: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            default: "",
        }
    }

    pub const fn with_default(name: &'static str, label: &'static str, default: &'static str) -> Self {
        Self {
            name,
            label,
            default,
        }
    }

    pub fn read(&self, record: &Record) -> String {
        record.text_or(self.name, self.default)
    }
}

/// The `{success, data, message}` wrapper used by every API response
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// The payload when the server reported success and sent one
    pub fn into_data(self) -> Result<T, Option<String>> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message),
        }
    }
}

/// Distinct non-empty string values of a field, in first-seen order
pub fn distinct_values(records: &[Record], field: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for record in records {
        let value = record.text(field);
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserialization() {
        let json = r#"{
            "id": "CONT-001",
            "totalCost": 85000,
            "ratio": 0.5,
            "deliveryDate": null,
            "isActive": true,
            "tags": ["a", "b"]
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id(), "CONT-001");
        assert_eq!(record.text("totalCost"), "85000");
        assert_eq!(record.text("ratio"), "0.5");
        assert_eq!(record.text("deliveryDate"), "");
        assert!(record.flag("isActive"));
        assert_eq!(record.text("tags"), r#"["a","b"]"#);
        assert_eq!(record.number("totalCost"), Some(85000.0));
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let record = Record::new().with("deliveryDate", FieldValue::Null);
        let def = FieldDef::with_default("deliveryDate", "Delivery date", "not delivered");

        assert_eq!(def.read(&record), "not delivered");
        assert_eq!(record.text("missing"), "");
        assert_eq!(record.text_or("missing", "-"), "-");
        assert!(!record.flag("missing"));
    }

    #[test]
    fn test_record_serializes_integral_numbers_as_integers() {
        let record = Record::new().with("quantity", 3i64).with("name", "A");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"A","quantity":3}"#);
    }

    #[test]
    fn test_envelope_into_data() {
        let ok: Envelope<Vec<Record>> =
            serde_json::from_str(r#"{"success": true, "data": [{"id": "1"}]}"#).unwrap();
        assert_eq!(ok.into_data().unwrap().len(), 1);

        let failed: Envelope<Vec<Record>> =
            serde_json::from_str(r#"{"success": false, "message": "boom"}"#).unwrap();
        assert_eq!(failed.into_data().unwrap_err().as_deref(), Some("boom"));

        let missing: Envelope<Vec<Record>> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(missing.into_data().unwrap_err(), None);
    }

    #[test]
    fn test_distinct_values_keeps_first_seen_order() {
        let records = vec![
            Record::new().with("supplier", "B"),
            Record::new().with("supplier", "A"),
            Record::new().with("supplier", "B"),
            Record::new(),
        ];
        assert_eq!(distinct_values(&records, "supplier"), vec!["B", "A"]);
    }
}
