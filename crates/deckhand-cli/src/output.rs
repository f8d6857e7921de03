use crate::cli::OutputFormat;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let value = serde_json::to_value(value)?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            print_as_table(&value);
        }
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn print_as_table(value: &Value) {
    match value {
        Value::Array(rows) => {
            if rows.is_empty() {
                println!("No resources found.");
                return;
            }
            let headers = column_names(rows);
            let mut builder = Builder::default();
            builder.push_record(headers.iter().map(String::as_str));
            for row in rows {
                builder.push_record(headers.iter().map(|h| cell(row.get(h))));
            }
            println!("{}", builder.build().with(Style::rounded()).to_string());
            println!("Total: {}", rows.len());
        }
        Value::Object(fields) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, field) in fields {
                builder.push_record([key.clone(), cell(Some(field))]);
            }
            println!("{}", builder.build().with(Style::rounded()).to_string());
        }
        other => println!("{}", cell(Some(other))),
    }
}

/// Keys of the first object row; rows are homogeneous.
fn column_names(rows: &[Value]) -> Vec<String> {
    rows.first()
        .and_then(Value::as_object)
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_else(|| vec!["value".to_string()])
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
