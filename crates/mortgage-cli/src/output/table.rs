use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Arrays of records printed as their own tables under the summary.
const SECTION_KEYS: [(&str, &str); 6] = [
    ("yearlyData", "Yearly summary"),
    ("yearly", "Yearly summary"),
    ("overpayments", "Overpayments"),
    ("candidates", "Candidate strategies"),
    ("interestComparison", "Cumulative interest"),
    ("optimizedOverpayments", "Chosen plan"),
];

/// Format output as tables: scalar fields first, then one table per record list.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_tables(result, map);
            } else {
                print_result_tables(value, &Map::new());
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Value, envelope: &Map<String, Value>) {
    let Value::Object(res_map) = result else {
        println!("{}", result);
        return;
    };

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in res_map {
        match val {
            Value::Array(items) if key == "schedule" => {
                builder.push_record([key.as_str(), &format!("{} payments", items.len())]);
            }
            Value::Array(_) if is_section(key) => {}
            Value::Object(inner) if key == "scheduleSummary" || key == "best" => {
                for (k, v) in inner {
                    if !v.is_array() {
                        builder.push_record([format!("{key}.{k}"), format_value(v)]);
                    }
                }
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    let nested = res_map
        .get("scheduleSummary")
        .and_then(Value::as_object)
        .into_iter()
        .flatten();
    for (key, val) in res_map.iter().chain(nested) {
        if let (Some(title), Value::Array(items)) = (section_title(key), val) {
            if !items.is_empty() {
                println!("\n{}:", title);
                print_array_table(items);
            }
        }
    }

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

fn is_section(key: &str) -> bool {
    section_title(key).is_some()
}

fn section_title(key: &str) -> Option<&'static str> {
    SECTION_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, title)| *title)
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first
            .iter()
            .filter(|(_, v)| !v.is_array())
            .map(|(k, _)| k.clone())
            .collect();
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

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
