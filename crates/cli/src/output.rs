//! Output formatting for CLI
//!
//! Rendering returns strings so commands and tests share one code path;
//! the `print_*` functions only write them out.

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    Json,
    Yaml,
    /// `Header: value` lines, records separated by `---`
    Plain,
}

/// Rows and headers of a value shown in table or plain output
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

const EMPTY_LIST: &str = "No entries.";

/// Render one record
pub fn render_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(item).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(item).unwrap_or_default(),
        OutputFormat::Table | OutputFormat::Plain => render_rows(std::slice::from_ref(item), format),
    }
}

/// Render a list of records
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(items).unwrap_or_default(),
        OutputFormat::Table | OutputFormat::Plain if items.is_empty() => EMPTY_LIST.to_string(),
        OutputFormat::Table | OutputFormat::Plain => render_rows(items, format),
    }
}

fn render_rows<T: TableDisplay>(items: &[T], format: OutputFormat) -> String {
    if format == OutputFormat::Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(T::headers());
        for item in items {
            table.add_row(item.row());
        }
        return table.to_string();
    }

    items
        .iter()
        .map(|item| {
            T::headers()
                .iter()
                .zip(item.row())
                .map(|(header, value)| format!("{}: {}", header, value))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    println!("{}", render_item(item, format).trim_end());
}

pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    println!("{}", render_list(items, format).trim_end());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Errors go to stderr so piped JSON/YAML stays parseable
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

pub fn print_warning(message: &str) {
    eprintln!("{}  {}", "⚠️".yellow(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Entry {
        session: &'static str,
        spec: &'static str,
    }

    impl TableDisplay for Entry {
        fn headers() -> Vec<&'static str> {
            vec!["Session", "Spec"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.session.to_string(), self.spec.to_string()]
        }
    }

    fn entries() -> Vec<Entry> {
        vec![
            Entry { session: "abc", spec: "login.spec.ts" },
            Entry { session: "def", spec: "cart.spec.ts" },
        ]
    }

    #[test]
    fn test_plain_list_separates_records() {
        assert_eq!(
            render_list(&entries(), OutputFormat::Plain),
            "Session: abc\nSpec: login.spec.ts\n---\nSession: def\nSpec: cart.spec.ts"
        );
    }

    #[test]
    fn test_yaml_and_json_lists() {
        let yaml = render_list(&entries(), OutputFormat::Yaml);
        assert!(yaml.starts_with("- session: abc\n  spec: login.spec.ts\n"), "{yaml}");

        let json: serde_json::Value =
            serde_json::from_str(&render_list(&entries(), OutputFormat::Json)).unwrap();
        assert_eq!(json[1]["session"], "def");
    }

    #[test]
    fn test_empty_list() {
        let none: Vec<Entry> = Vec::new();
        assert_eq!(render_list(&none, OutputFormat::Table), EMPTY_LIST);
        assert_eq!(render_list(&none, OutputFormat::Json), "[]");
        assert_eq!(render_list(&none, OutputFormat::Yaml).trim_end(), "[]");
    }

    #[test]
    fn test_table_item_has_headers_and_values() {
        let table = render_item(&entries()[0], OutputFormat::Table);
        for cell in ["Session", "Spec", "abc", "login.spec.ts"] {
            assert!(table.contains(cell), "{table}");
        }
    }
}
