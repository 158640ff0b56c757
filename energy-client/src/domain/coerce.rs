use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a loosely-typed JSON value into a finite `f64`, falling back to zero.
///
/// Rules:
/// - numbers are taken as-is;
/// - strings are trimmed and parsed, an empty string counts as zero;
/// - anything else (null, bool, arrays, objects) is zero;
/// - non-finite results (`NaN`, `inf`) are zero.
pub fn parse_or_zero(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_str(s),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn parse_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Some(0.0)
    } else {
        trimmed.parse().ok()
    }
}

/// `deserialize_with` adapter for numeric fields that may arrive as strings,
/// nulls or garbage.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(parse_or_zero).unwrap_or(0.0))
}

/// Opaque identifiers come back as either JSON strings or numbers. A `null`
/// identifier becomes the empty string.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_or_zero(&json!(12.5)), 12.5);
        assert_eq!(parse_or_zero(&json!(140)), 140.0);
    }

    #[test]
    fn numeric_strings_are_parsed() {
        assert_eq!(parse_or_zero(&json!("100")), 100.0);
        assert_eq!(parse_or_zero(&json!("  42.25 ")), 42.25);
        assert_eq!(parse_or_zero(&json!("")), 0.0);
    }

    #[test]
    fn garbage_becomes_zero() {
        assert_eq!(parse_or_zero(&json!("abc")), 0.0);
        assert_eq!(parse_or_zero(&json!(null)), 0.0);
        assert_eq!(parse_or_zero(&json!(true)), 0.0);
        assert_eq!(parse_or_zero(&json!({"units": 3})), 0.0);
        assert_eq!(parse_or_zero(&json!("NaN")), 0.0);
        assert_eq!(parse_or_zero(&json!("inf")), 0.0);
    }

    #[derive(Deserialize)]
    struct Keyed {
        #[serde(default, deserialize_with = "string_or_number")]
        id: String,
    }

    #[test]
    fn identifiers_accept_strings_numbers_and_null() {
        let id = |v: Value| serde_json::from_value::<Keyed>(v).unwrap().id;
        assert_eq!(id(json!({"id": 12})), "12");
        assert_eq!(id(json!({"id": "r-3"})), "r-3");
        assert_eq!(id(json!({"id": null})), "");
        assert_eq!(id(json!({})), "");
        assert!(serde_json::from_value::<Keyed>(json!({"id": [1]})).is_err());
    }
}
