//! Environment references in tool parameters.
//!
//! Only values that are exactly `${NAME}` are substitutions. Partial
//! references such as `prefix-${NAME}` and non-string values pass through.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

fn exact_reference(value: &str) -> Option<&str> {
    value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty() && !name.contains(['{', '}', '$']))
}

/// Resolve one env value. An unset variable resolves to `None` and a
/// warning is logged.
pub fn resolve_value(key: &str, value: &Value) -> Option<Value> {
    match value.as_str().and_then(exact_reference) {
        Some(name) => match std::env::var(name) {
            Ok(resolved) => Some(Value::String(resolved)),
            Err(_) => {
                tracing::warn!(
                    "[Env] Environment variable '{}' referenced by '{}' is not set",
                    name,
                    key
                );
                None
            }
        },
        None => Some(value.clone()),
    }
}

/// Resolve a whole env mapping. Keys whose variable is unset map to `Null`.
pub fn resolve_env_map(env: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    env.iter()
        .map(|(k, v)| (k.clone(), resolve_value(k, v).unwrap_or(Value::Null)))
        .collect()
}

/// Names referenced by `${NAME}` anywhere in `input`; handy for diagnostics.
pub fn referenced_names(input: &str) -> Vec<String> {
    match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re
            .captures_iter(input)
            .map(|caps| caps[1].to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_reference_resolves() {
        std::env::set_var("AGENTRY_ENV_TEST_TOKEN", "s3cret");
        assert_eq!(
            resolve_value("TOKEN", &json!("${AGENTRY_ENV_TEST_TOKEN}")),
            Some(json!("s3cret"))
        );
        std::env::remove_var("AGENTRY_ENV_TEST_TOKEN");
    }

    #[test]
    fn test_unset_reference_is_absent() {
        assert_eq!(
            resolve_value("TOKEN", &json!("${AGENTRY_ENV_DEFINITELY_UNSET}")),
            None
        );
        let mut env = BTreeMap::new();
        env.insert("TOKEN".to_string(), json!("${AGENTRY_ENV_DEFINITELY_UNSET}"));
        assert_eq!(resolve_env_map(&env)["TOKEN"], Value::Null);
    }

    #[test]
    fn test_partial_and_non_string_pass_through() {
        assert_eq!(
            resolve_value("URL", &json!("http://${HOST}/x")),
            Some(json!("http://${HOST}/x"))
        );
        assert_eq!(resolve_value("PORT", &json!(8080)), Some(json!(8080)));
        assert_eq!(resolve_value("EMPTY", &json!("${}")), Some(json!("${}")));
    }

    #[test]
    fn test_referenced_names() {
        assert_eq!(
            referenced_names("${A} and ${B_2} but not $C"),
            vec!["A".to_string(), "B_2".to_string()]
        );
    }
}
