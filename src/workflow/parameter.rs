//! Typed node options.
//!
//! A [`Parameter`] is declared once per node type as a template and cloned
//! into every node instance. Assigning a value never validates it; validation
//! is an explicit pass so that flow-variable substitution can rewrite several
//! values before anything is checked.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, TabflowError};

/// Semantic type of a parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterType {
    String,
    Boolean,
    Integer,
    /// Path to an external resource.
    File,
    /// One of a fixed set of strings.
    Enum,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Parameter {
    /// display label
    label: String,
    /// semantic type
    #[serde(rename = "type")]
    kind: ParameterType,
    /// default value, `Some(Value::Null)` marks an optional parameter
    default: Option<Value>,
    /// human readable description
    docstring: String,
    /// allowed values for enum parameters
    #[serde(skip_serializing_if = "Vec::is_empty")]
    choices: Vec<String>,
    /// assigned value
    #[serde(skip)]
    value: Option<Value>,
}

impl Parameter {
    fn new(
        label: &str,
        kind: ParameterType,
    ) -> Self {
        Self {
            label: label.to_string(),
            kind,
            default: None,
            docstring: String::new(),
            choices: Vec::new(),
            value: None,
        }
    }

    pub fn string(label: &str) -> Self {
        Self::new(label, ParameterType::String)
    }

    pub fn boolean(label: &str) -> Self {
        Self::new(label, ParameterType::Boolean)
    }

    pub fn integer(label: &str) -> Self {
        Self::new(label, ParameterType::Integer)
    }

    pub fn file(label: &str) -> Self {
        Self::new(label, ParameterType::File)
    }

    pub fn choice(
        label: &str,
        choices: &[&str],
    ) -> Self {
        let mut param = Self::new(label, ParameterType::Enum);
        param.choices = choices.iter().map(|c| c.to_string()).collect();
        param
    }

    pub fn with_default<T: Into<Value>>(
        mut self,
        default: T,
    ) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark the parameter optional: unset reads as `null` and validates.
    pub fn optional(mut self) -> Self {
        self.default = Some(Value::Null);
        self
    }

    pub fn with_docstring(
        mut self,
        docstring: &str,
    ) -> Self {
        self.docstring = docstring.to_string();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ParameterType {
        self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Explicitly assigned value, ignoring the default.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Declared with [`Parameter::optional`].
    pub fn is_optional(&self) -> bool {
        matches!(self.default, Some(Value::Null))
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value<T: Into<Value>>(
        &mut self,
        value: T,
    ) {
        self.value = Some(value.into());
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// The assigned value, else the default.
    pub fn get_value(&self) -> Result<&Value> {
        self.value
            .as_ref()
            .or(self.default.as_ref())
            .ok_or_else(|| TabflowError::Parameter(format!("'{}' has neither a value nor a default", self.label)))
    }

    /// Full check: the effective value exists (unless optional) and conforms to the type.
    pub fn validate(&self) -> Result<()> {
        let value = match self.get_value() {
            Ok(v) => v,
            Err(_) => return Err(TabflowError::ParameterValidation(format!("'{}' is required", self.label))),
        };
        if value.is_null() && !self.is_optional() {
            return Err(TabflowError::ParameterValidation(format!("'{}' is required", self.label)));
        }
        self.check_value(value)
    }

    /// Type check of the assigned value only; a missing value passes.
    ///
    /// Used when a node is stored in a graph, where required values may still
    /// arrive through flow variables at run time.
    pub fn check_type(&self) -> Result<()> {
        match &self.value {
            Some(v) => self.check_value(v),
            None => Ok(()),
        }
    }

    fn check_value(
        &self,
        value: &Value,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        let ok = match self.kind {
            ParameterType::String => parse_text(value).is_some(),
            ParameterType::Boolean => parse_bool(value).is_some(),
            ParameterType::Integer => parse_i64(value).is_some(),
            ParameterType::File => parse_text(value).is_some_and(|s| !s.trim().is_empty()),
            ParameterType::Enum => parse_text(value).is_some_and(|s| self.choices.iter().any(|c| *c == s)),
        };

        if ok {
            return Ok(());
        }

        let expected = match self.kind {
            ParameterType::Enum => format!("one of [{}]", self.choices.join(", ")),
            ParameterType::File => "a non-empty file path".to_string(),
            kind => format!("a {}", kind.as_ref()),
        };
        Err(TabflowError::ParameterValidation(format!("'{}' expects {}, got {}", self.label, expected, value)))
    }

    /// String view of the effective value.
    pub fn as_str(&self) -> Result<String> {
        match self.get_value()? {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Err(TabflowError::Parameter(format!("'{}' is not set", self.label))),
            other => Ok(other.to_string()),
        }
    }

    /// Like [`Parameter::as_str`], but `null` and the empty string read as `None`.
    pub fn as_opt_str(&self) -> Result<Option<String>> {
        match self.get_value()? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Ok(Some(other.to_string())),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        let value = self.get_value()?;
        parse_bool(value).ok_or_else(|| TabflowError::Parameter(format!("'{}' is not a boolean: {}", self.label, value)))
    }

    pub fn as_i64(&self) -> Result<i64> {
        let value = self.get_value()?;
        parse_i64(value).ok_or_else(|| TabflowError::Parameter(format!("'{}' is not an integer: {}", self.label, value)))
    }
}

/// Booleans arrive natively from the UI and as strings from flow variables.
fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Scalars read as text: flow variables may carry numbers into string options.
fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_get_value_prefers_assigned_value() {
        let mut param = Parameter::string("Delimiter").with_default(",");
        assert_eq!(param.get_value().unwrap(), &json!(","));

        param.set_value(";");
        assert_eq!(param.get_value().unwrap(), &json!(";"));

        param.clear_value();
        assert_eq!(param.as_str().unwrap(), ",");
    }

    #[test]
    fn test_get_value_without_value_or_default() {
        let param = Parameter::string("Join Column");
        let err = param.get_value().unwrap_err();
        assert!(matches!(err, TabflowError::Parameter(_)));
    }

    #[test]
    fn test_validate_required() {
        let mut param = Parameter::file("File");
        assert!(matches!(param.validate(), Err(TabflowError::ParameterValidation(_))));
        // unset is fine for a storage-time check
        assert!(param.check_type().is_ok());

        param.set_value("data.csv");
        assert!(param.validate().is_ok());
    }

    #[test]
    fn test_validate_explicit_null_on_required() {
        let mut param = Parameter::string("Value");
        param.set_value(Value::Null);
        assert!(param.validate().is_err());

        let mut optional = Parameter::string("Columns").optional();
        assert!(optional.validate().is_ok());
        optional.set_value(Value::Null);
        assert!(optional.validate().is_ok());
        assert_eq!(optional.as_opt_str().unwrap(), None);
    }

    #[test]
    fn test_validate_explicit_null_overrides_default() {
        let mut param = Parameter::string("Delimiter").with_default(",");
        assert!(param.validate().is_ok());

        param.set_value(Value::Null);
        let err = param.validate().unwrap_err();
        assert_eq!(err, TabflowError::ParameterValidation("'Delimiter' is required".to_string()));
    }

    #[test]
    fn test_string_accepts_scalars() {
        let mut param = Parameter::string("Value");
        param.set_value(10);
        assert!(param.validate().is_ok());
        assert_eq!(param.as_str().unwrap(), "10");

        param.set_value(false);
        assert!(param.validate().is_ok());
        assert_eq!(param.as_str().unwrap(), "false");

        let mut file = Parameter::file("File");
        file.set_value(2024);
        assert!(file.validate().is_ok());

        let mut choice = Parameter::choice("Year", &["2023", "2024"]);
        choice.set_value(2024);
        assert!(choice.validate().is_ok());
        choice.set_value(1999);
        assert!(choice.validate().is_err());
    }

    #[test]
    fn test_validate_boolean() {
        let mut param = Parameter::boolean("Write Index").with_default(true);
        assert!(param.validate().is_ok());

        param.set_value("FALSE");
        assert!(param.validate().is_ok());
        assert!(!param.as_bool().unwrap());

        param.set_value(3);
        let err = param.validate().unwrap_err();
        assert!(err.to_string().contains("Write Index"));
        assert!(param.check_type().is_err());
    }

    #[test]
    fn test_validate_integer_accepts_numeric_string() {
        let mut param = Parameter::integer("Limit");
        param.set_value("10");
        assert!(param.validate().is_ok());
        assert_eq!(param.as_i64().unwrap(), 10);

        param.set_value("ten");
        assert!(param.validate().is_err());
        assert!(param.as_i64().is_err());
    }

    #[test]
    fn test_validate_enum() {
        let mut param = Parameter::choice("Aggregation", &["mean", "sum"]).with_default("mean");
        assert!(param.validate().is_ok());

        param.set_value("median");
        let err = param.validate().unwrap_err();
        assert!(err.to_string().contains("one of [mean, sum]"));
    }

    #[test]
    fn test_validate_file_rejects_blank() {
        let mut param = Parameter::file("File");
        param.set_value("  ");
        assert!(param.validate().is_err());
    }

    #[test]
    fn test_string_rejects_non_string() {
        let mut param = Parameter::string("Variable Name");
        param.set_value(json!({"a": 1}));
        assert!(param.validate().is_err());
    }

    #[test]
    fn test_template_serializes_without_value() {
        let mut param = Parameter::choice("How", &["inner", "left"]).with_default("inner").with_docstring("Join type");
        param.set_value("left");
        let v = serde_json::to_value(&param).unwrap();
        assert_eq!(
            v,
            json!({
                "label": "How",
                "type": "enum",
                "default": "inner",
                "docstring": "Join type",
                "choices": ["inner", "left"],
            })
        );
    }
}
