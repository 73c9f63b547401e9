//! Argument extraction shared by the tools.
//!
//! Each helper yields a ready-made `ToolResult::Error` on bad input so a tool
//! can bail with `match .. { Err(e) => return e }`.

use crate::registry::ToolResult;
use serde_json::Value;
use std::str::FromStr;

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolResult> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolResult::error(format!("Missing required parameter: {}", key)))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

pub(crate) fn optional_usize(args: &Value, key: &str) -> Result<Option<usize>, ToolResult> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ToolResult::error(format!("Parameter {} must be a non-negative integer", key))),
    }
}

pub(crate) fn optional_f64(args: &Value, key: &str) -> Result<Option<f64>, ToolResult> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| ToolResult::error(format!("Parameter {} must be a number", key))),
    }
}

/// A string list given either as a JSON array or a comma-separated string.
pub(crate) fn string_list(args: &Value, key: &str) -> Option<Vec<String>> {
    match args.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .collect(),
        ),
        Value::String(s) => Some(s.split(',').map(|k| k.trim().to_string()).collect()),
        _ => None,
    }
}

pub(crate) fn required_list(args: &Value, key: &str) -> Result<Vec<String>, ToolResult> {
    string_list(args, key)
        .ok_or_else(|| ToolResult::error(format!("Missing required parameter: {}", key)))
}

/// Parse an optional enum-valued parameter, `T::default()` when absent.
pub(crate) fn parsed_or_default<T>(args: &Value, key: &str) -> Result<T, ToolResult>
where
    T: FromStr<Err = crisisgraph_core::Error> + Default,
{
    match optional_str(args, key) {
        Some(s) => s.parse().map_err(ToolResult::from),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisisgraph_core::Direction;
    use serde_json::json;

    #[test]
    fn lists_accept_array_or_csv() {
        let a = json!({"k": ["gdpr", " breach "]});
        let b = json!({"k": "gdpr, breach"});
        assert_eq!(string_list(&a, "k").unwrap(), vec!["gdpr", "breach"]);
        assert_eq!(string_list(&b, "k").unwrap(), vec!["gdpr", "breach"]);
        assert!(string_list(&json!({"k": 3}), "k").is_none());
        assert!(required_list(&json!({}), "k").is_err());
    }

    #[test]
    fn numbers_are_validated() {
        assert_eq!(optional_usize(&json!({"d": 3}), "d").unwrap(), Some(3));
        assert_eq!(optional_usize(&json!({}), "d").unwrap(), None);
        assert!(optional_usize(&json!({"d": -1}), "d").is_err());
        assert!(optional_f64(&json!({"c": "high"}), "c").is_err());
    }

    #[test]
    fn enum_parameters() {
        let d: Direction = parsed_or_default(&json!({"direction": "in"}), "direction").unwrap();
        assert_eq!(d, Direction::In);
        let d: Direction = parsed_or_default(&json!({}), "direction").unwrap();
        assert_eq!(d, Direction::Both);
        assert!(parsed_or_default::<Direction>(&json!({"direction": "up"}), "direction").is_err());
    }
}
