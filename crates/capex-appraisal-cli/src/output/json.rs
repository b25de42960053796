use serde_json::Value;

/// Pretty-print JSON to stdout. Decimal amounts arrive as strings and are
/// left untouched so no precision is lost.
pub fn print_json(value: &Value) {
    match render(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

fn render(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_strings_are_preserved() {
        let text = render(&json!({ "npv": "-154594.2954716207909295813" })).unwrap();
        assert!(text.contains("\"-154594.2954716207909295813\""));
    }
}
