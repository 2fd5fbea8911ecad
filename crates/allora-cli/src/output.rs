// crates/allora-cli/src/output.rs
//
// Output formatting for the Allora CLI: tables for operators, JSON for
// scripts.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print `rows` as a table, or `data` as JSON.
pub fn emit<T: Tabled, S: Serialize>(format: OutputFormat, rows: &[T], data: &S) {
    match format {
        OutputFormat::Table => println!("{}", format_table(rows)),
        OutputFormat::Json => println!("{}", format_json(data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        #[tabled(rename = "Actor")]
        actor: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    #[test]
    fn test_table_uses_renamed_headers() {
        let rows = vec![Row { actor: "worker0".to_string(), value: "0.5".to_string() }];
        let table = format_table(&rows);
        assert!(table.contains("Actor"));
        assert!(table.contains("worker0"));
    }

    #[test]
    fn test_json_is_pretty() {
        let rows = vec![Row { actor: "worker0".to_string(), value: "0.5".to_string() }];
        let json = format_json(&rows);
        assert!(json.contains("\n"));
        assert!(json.contains("\"actor\": \"worker0\""));
    }
}
