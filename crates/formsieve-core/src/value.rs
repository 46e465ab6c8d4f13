//! Helpers for the loosely typed JSON values that flow through the pipeline.

use serde_json::Value;

/// Render a value the way it appears in form input.
///
/// Arrays are joined with `,`, `null` renders as an empty string.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// `null`, `""` and `[]` count as empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Truthiness used by the `checked` / `notChecked` conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// String comparison used by choice lists and conditions, so `5` equals `"5"`.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    to_text(a) == to_text(b)
}

/// Build a JSON number from a float, keeping integral values as integers.
pub fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_rendering() {
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!(12)), "12");
        assert_eq!(to_text(&json!(1.5)), "1.5");
        assert_eq!(to_text(&json!(["a", 2])), "a,2");
    }

    #[test]
    fn emptiness_and_truthiness() {
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&json!(0)));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!(false)));
    }

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(number(200.0), json!(200));
        assert_eq!(number(2.5), json!(2.5));
        assert!(loosely_equal(&json!(5), &json!("5")));
    }
}
