use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use portal::{Department, FieldDefinition, Publication, Record, Report, UserSummary};

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be displayed as a table
pub trait TableDisplay {
    fn headers(&self) -> Vec<String>;
    fn rows(&self) -> Vec<Vec<String>>;
    fn to_compact(&self) -> String;
}

/// One row of a homogeneous listing
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    fn compact(&self) -> String {
        self.cells().join(" ")
    }
}

impl<T: TableRow> TableDisplay for Vec<T> {
    fn headers(&self) -> Vec<String> {
        T::HEADERS.iter().map(|header| header.to_string()).collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.iter().map(TableRow::cells).collect()
    }

    fn to_compact(&self) -> String {
        self.iter().map(TableRow::compact).collect::<Vec<_>>().join("\n")
    }
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    pub fn is_json(&self) -> bool {
        self.options.output_format == OutputFormat::Json
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let rows = data.rows();
                if rows.is_empty() {
                    self.info("No items found");
                    return Ok(());
                }
                let mut table = self.create_table();
                self.add_table_header(&mut table, data.headers());
                for row in rows {
                    table.add_row(row);
                }
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Emit a serializable value in JSON mode only
    pub fn json<T: Serialize>(&self, data: &T) -> Result<()> {
        if self.is_json() && !self.options.quiet {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        Ok(())
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.success)
            } else {
                format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
            };
            println!("{output}");
        }
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    /// Display a warning message
    pub fn warning(&self, message: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.warning)
            } else {
                format!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning))
            };
            println!("{output}");
        }
    }

    /// Display verbose information (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.arrow)
            } else {
                format!("{} {}", ICONS.arrow.color(THEME.muted), message.color(THEME.muted))
            };
            eprintln!("{output}");
        }
    }

    /// Display info message with color and icon
    pub fn info(&self, message: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.info)
            } else {
                format!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info))
            };
            println!("{output}");
        }
    }

    /// Display a heading
    pub fn heading(&self, text: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.len()))
            } else {
                format!("\n{}", text.color(THEME.primary).bold())
            };
            println!("{output}");
        }
    }

    /// Display a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    /// Display indented text with a prefix icon
    pub fn indented(&self, icon: &str, text: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("  {icon} {text}")
            } else {
                format!("  {} {text}", icon.color(THEME.muted))
            };
            println!("{output}");
        }
    }

    /// Create a themed table
    pub fn create_table(&self) -> Table {
        let mut table = Table::new();

        if !self.options.no_color {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        }

        table
    }

    /// Add themed header to table
    pub fn add_table_header(&self, table: &mut Table, headers: Vec<String>) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|h| {
                let cell = Cell::new(h).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(header_cells);
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

impl TableRow for FieldDefinition {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Label", "Type", "Input", "Required", "Options"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.field_name.clone(),
            self.field_label.clone(),
            self.field_type.to_string(),
            self.input_kind.unwrap_or(self.field_type.input_kind()).as_str().to_string(),
            yes_no(self.is_required),
            self.option_list().join(", "),
        ]
    }

    fn compact(&self) -> String {
        format!("{}:{}", self.field_name, self.field_type)
    }
}

impl TableRow for UserSummary {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Email",
        "Role",
        "Department",
        "Publications",
        "Patents",
        "Commercializations",
    ];

    fn cells(&self) -> Vec<String> {
        let user = &self.user;
        vec![
            user.id.to_string(),
            user.name.clone(),
            user.email.clone(),
            user.role.to_string(),
            user.department.clone().unwrap_or_default(),
            self.publication_count.to_string(),
            self.patent_count.to_string(),
            self.commercialization_count.to_string(),
        ]
    }

    fn compact(&self) -> String {
        let user = &self.user;
        format!(
            "{} {} <{}> {} ({} pub, {} pat, {} com)",
            user.id, user.name, user.email, user.role, self.publication_count, self.patent_count, self.commercialization_count
        )
    }
}

impl TableRow for Department {
    const HEADERS: &'static [&'static str] = &["ID", "Name"];

    fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }
}

impl TableRow for Publication {
    const HEADERS: &'static [&'static str] = &["ID", "Title", "Authors", "Year", "Citations"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.authors.clone(),
            self.year.clone(),
            self.citations.clone(),
        ]
    }

    fn compact(&self) -> String {
        format!("{} {}", self.id, self.title)
    }
}

/// Records of one table; columns come from the stored rows.
#[derive(Serialize)]
#[serde(transparent)]
pub struct RecordList(pub Vec<Record>);

impl TableDisplay for RecordList {
    fn headers(&self) -> Vec<String> {
        self.0
            .first()
            .map(|record| record.values.iter().map(|(column, _)| column.clone()).collect())
            .unwrap_or_default()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.0
            .iter()
            .map(|record| record.values.iter().map(|(_, value)| value.to_display_string()).collect())
            .collect()
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|record| {
                record
                    .values
                    .iter()
                    .map(|(column, value)| format!("{column}={value}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TableDisplay for Report {
    fn headers(&self) -> Vec<String> {
        self.headers.clone()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows.clone()
    }

    fn to_compact(&self) -> String {
        format!("{} report: {} row(s)", self.kind, self.rows.len())
    }
}
