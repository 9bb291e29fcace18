use serde_json::Value;

/// Render a JSON value as a CSV cell.
///
/// Strings are taken verbatim, null becomes an empty cell, and every other
/// value uses its compact JSON text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Cell text for an optional value; absent renders empty
pub fn optional_cell_text(value: Option<&Value>) -> String {
    value.map(cell_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(cell_text(&json!("Tesseract")), "Tesseract");
        assert_eq!(cell_text(&json!(96)), "96");
        assert_eq!(cell_text(&json!(87.5)), "87.5");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_nested_values_use_json_text() {
        assert_eq!(cell_text(&json!(["en", "hi"])), r#"["en","hi"]"#);
        assert_eq!(cell_text(&json!({"psm": 3})), r#"{"psm":3}"#);
        assert_eq!(optional_cell_text(None), "");
    }
}
