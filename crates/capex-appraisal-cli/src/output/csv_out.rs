use serde_json::Value;
use std::io;

use super::minimal::format_minimal;

/// Write output as CSV to stdout.
///
/// A bare array of rows becomes a table; anything else is flattened to
/// `field,value` pairs with dotted paths (`appraisal.npv`, `rows.2.allowance`).
pub fn print_csv(value: &Value) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(value, stdout.lock()).map_err(io::Error::from)
}

fn write_csv<W: io::Write>(value: &Value, out: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match body {
        Value::Array(arr) if arr.iter().all(Value::is_object) && !arr.is_empty() => {
            write_array_csv(&mut wtr, arr)?;
        }
        _ => {
            wtr.write_record(["field", "value"])?;
            for (field, val) in flatten(body) {
                wtr.write_record([field.as_str(), val.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_minimal).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    }
    Ok(())
}

fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) if !map.contains_key("status") => {
            for (key, val) in map {
                flatten_into(join(key), val, out);
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                flatten_into(join(&i.to_string()), val, out);
            }
        }
        _ => out.push((prefix, format_minimal(value))),
    }
}
