use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Print a single record: JSON object, two-column table or `key: value`
/// lines.
pub fn print_record<T: Serialize>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, val) in fields(value) {
                table.add_row(vec![key, val]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, val) in fields(value) {
                println!("{key}: {val}");
            }
        }
    }
}

/// Print a list of records with the given column headers.
pub fn print_rows<T: Serialize>(headers: &[&str], rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(headers.to_vec());
            for row in rows {
                table.add_row(fields(row).into_iter().map(|(_, v)| v).collect::<Vec<_>>());
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                let line = fields(row)
                    .into_iter()
                    .map(|(_, v)| v)
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("{line}");
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Flatten a serialized struct into display pairs, in field order.
fn fields<T: Serialize>(value: &T) -> Vec<(String, String)> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(key, val)| {
                let text = match val {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => "-".to_string(),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect(),
        Ok(other) => vec![("value".to_string(), other.to_string())],
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        port: &'static str,
        position: i32,
        note: Option<String>,
    }

    #[test]
    fn fields_keep_declaration_order_and_render_nulls() {
        let pairs = fields(&Sample {
            port: "A",
            position: -90,
            note: None,
        });
        assert_eq!(
            pairs,
            vec![
                ("port".to_string(), "A".to_string()),
                ("position".to_string(), "-90".to_string()),
                ("note".to_string(), "-".to_string()),
            ]
        );
    }
}
