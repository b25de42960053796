use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::minimal::format_minimal;

/// Format output as tables using the tabled crate.
///
/// Scalar fields and tagged metrics go in a Field/Value table; arrays of rows
/// and nested sections get their own titled tables.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_section(None, result);
                print_envelope_notes(map);
            } else {
                print_section(None, value);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_section(title: Option<&str>, value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", format_minimal(value));
        return;
    };

    let mut scalars = Builder::default();
    scalars.push_record(["Field", "Value"]);
    let mut has_scalars = false;
    let mut nested: Vec<(String, &Value)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.iter().any(Value::is_object) => {
                nested.push((qualify(title, key), val));
            }
            Value::Object(inner) if !is_metric(inner) => {
                nested.push((qualify(title, key), val));
            }
            _ => {
                scalars.push_record([key.as_str(), &format_value(val)]);
                has_scalars = true;
            }
        }
    }

    if has_scalars {
        if let Some(t) = title {
            println!("\n{}", t);
        }
        println!("{}", Table::from(scalars));
    }

    for (name, val) in nested {
        match val {
            Value::Array(arr) => {
                println!("\n{}", name);
                print_array_table(arr);
            }
            _ => print_section(Some(name.as_str()), val),
        }
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn qualify(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(p) => format!("{}.{}", p, key),
        None => key.to_string(),
    }
}

fn is_metric(map: &Map<String, Value>) -> bool {
    map.contains_key("status")
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        _ => format_minimal(value),
    }
}
