//! `{{$name$}}` references to flow variables inside string option values.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{Result, TabflowError, workflow::node::FlowVariable};

/// Format: `{{$VAR_NAME$}}`
const FLOW_VAR_TEMPLATE_PATTERN: &str = r"\{\{\$([^$]+)\$\}\}";

static FLOW_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(FLOW_VAR_TEMPLATE_PATTERN).expect("flow variable pattern is valid"));

pub fn has_references(template: &str) -> bool {
    FLOW_VAR_RE.is_match(template)
}

/// Replace every `{{$name$}}` with the value of the visible flow variable.
///
/// When several visible variables share a name the last one wins, matching
/// the substitution order. Every unresolved name is reported in one error.
pub fn resolve_template(
    template: &str,
    flow_vars: &[FlowVariable],
) -> Result<String> {
    let mut result = template.to_string();
    let mut errors: Vec<String> = Vec::new();

    for caps in FLOW_VAR_RE.captures_iter(template) {
        let full_match = &caps[0];
        let var_name = caps[1].trim();

        match flow_vars.iter().rev().find(|v| v.name == var_name) {
            Some(var) => {
                result = result.replace(full_match, &value_to_string(&var.value));
            }
            None => {
                errors.push(format!("flow variable '{}' not found", var_name));
            }
        }
    }

    if !errors.is_empty() {
        return Err(TabflowError::Parameter(errors.join(", ")));
    }

    Ok(result)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resolve_template_no_variables() {
        let result = resolve_template("hello world", &[]).unwrap();
        assert_eq!(result, "hello world");
        assert!(!has_references("hello {{world}}"));
    }

    #[test]
    fn test_resolve_template_single() {
        let vars = vec![FlowVariable::new("region", "emea")];
        let result = resolve_template("sales_{{$region$}}.csv", &vars).unwrap();
        assert_eq!(result, "sales_emea.csv");
    }

    #[test]
    fn test_resolve_template_multiple() {
        let vars = vec![FlowVariable::new("dir", "/tmp"), FlowVariable::new("name", "out")];
        let result = resolve_template("{{$dir$}}/{{$name$}}.csv", &vars).unwrap();
        assert_eq!(result, "/tmp/out.csv");
    }

    #[test]
    fn test_resolve_template_non_string_value() {
        let vars = vec![FlowVariable::new("limit", json!(10)), FlowVariable::new("flag", json!(true))];
        let result = resolve_template("{{$limit$}}-{{$flag$}}", &vars).unwrap();
        assert_eq!(result, "10-true");
    }

    #[test]
    fn test_resolve_template_later_variable_wins() {
        let vars = vec![FlowVariable::new("sep", ","), FlowVariable::new("sep", ";")];
        assert_eq!(resolve_template("{{$sep$}}", &vars).unwrap(), ";");
    }

    #[test]
    fn test_resolve_template_missing_variables() {
        let vars = vec![FlowVariable::new("a", "1")];
        let err = resolve_template("{{$a$}} {{$b$}} {{$c$}}", &vars).unwrap_err();
        assert!(matches!(err, TabflowError::Parameter(_)));
        let msg = err.to_string();
        assert!(msg.contains("'b' not found"));
        assert!(msg.contains("'c' not found"));
    }
}
