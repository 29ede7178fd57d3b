//! Conversions between text fields and typed cells

use serde_json::{Number, Value};

/// Field values read as missing when type inference is on
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Turn a raw text field into a typed cell
///
/// Empty fields always become null. With `infer` set, fields equal to one of
/// `na_values` are null too, and integers, floats and `true`/`false` (any
/// case) are recognised; anything else stays a string.
pub fn infer_cell(raw: &str, infer: bool, na_values: &[String]) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if !infer {
        return Value::String(raw.to_string());
    }
    if na_values.iter().any(|na| na == raw) {
        return Value::Null;
    }

    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Render a cell as a text field; null is the empty string
pub fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
