use serde_json::Value;

/// Print just the key answer from the output.
///
/// Looks for well-known fields in priority order inside the result (and the
/// nested `appraisal` block of a full run), then falls back to the first field.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "npv",
        "irr",
        "payback_years",
        "path",
        "balancing_adjustment",
        "disposal_for_pool",
    ];

    let Value::Object(map) = result_obj else {
        return format_minimal(result_obj);
    };

    let scopes = [map.get("appraisal").and_then(Value::as_object), Some(map)];
    for scope in scopes.into_iter().flatten() {
        for key in &priority_keys {
            if let Some(val) = scope.get(*key) {
                if !val.is_null() {
                    return format_minimal(val);
                }
            }
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{}: {}", key, format_minimal(val)),
        None => "{}".to_string(),
    }
}

/// Tagged metrics print their value, or N/A with the reason.
pub(crate) fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(map) => match map.get("status").and_then(Value::as_str) {
            Some("defined") => map.get("value").map(format_minimal).unwrap_or_default(),
            Some("undefined") => match map.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("N/A ({})", reason.replace('_', " ")),
                None => "N/A".to_string(),
            },
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
