//! Printing reports in the format chosen with `--output`.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Table, presets};
use serde::Serialize;

use blockfield::Scope;

use crate::theme::{Notice, PALETTE};

#[derive(Clone, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// One table per report
    #[default]
    Table,
    /// Pretty JSON, for scripts
    Json,
    /// One line per report
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// A report the CLI can print as a table or a single line.
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

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

    pub fn display<T>(&self, report: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }
        let text = match self.options.output_format {
            OutputFormat::Json => serde_json::to_string_pretty(report)?,
            OutputFormat::Table => report.to_table(&self.options).to_string(),
            OutputFormat::Compact => report.to_compact(),
        };
        println!("{text}");
        Ok(())
    }

    /// Print a one-line message. Failures go to stderr and ignore `--quiet`;
    /// traces need `--verbose`; everything else is skipped for JSON output.
    pub fn notice(&self, notice: Notice, message: &str) {
        let line = self.paint(notice, message);
        match notice {
            Notice::Failure => eprintln!("{line}"),
            Notice::Trace if self.options.verbose && !self.options.quiet => eprintln!("{line}"),
            Notice::Trace => {}
            _ if self.options.quiet || self.is_json() => {}
            _ => println!("{line}"),
        }
    }

    /// A section title, underlined when colour is off.
    pub fn heading(&self, text: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        if self.options.no_color {
            println!("\n{text}\n{}", "-".repeat(text.chars().count()));
        } else {
            println!("\n{}", text.color(PALETTE.heading).bold());
        }
    }

    /// A `label: value` line, e.g. a derived key or a handler response.
    pub fn labelled(&self, label: &str, value: &str) {
        if self.options.quiet {
            return;
        }
        if self.options.no_color {
            println!("{label}: {value}");
        } else {
            println!("{}: {value}", label.color(PALETTE.label).bold());
        }
    }

    fn paint(&self, notice: Notice, message: &str) -> String {
        let line = format!("{} {message}", notice.marker());
        if self.options.no_color {
            line
        } else {
            line.color(PALETTE.notice(notice)).to_string()
        }
    }
}

/// An empty table with bold `headers`; ASCII borders when colour is off.
pub fn table(options: &GlobalOptions, headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(if options.no_color {
        presets::ASCII_FULL
    } else {
        presets::UTF8_FULL_CONDENSED
    });
    table.set_header(headers.iter().map(|header| Cell::new(header).add_attribute(Attribute::Bold)));
    table
}

/// A cell naming a scope, tinted by who owns values stored under it.
pub fn scope_cell(options: &GlobalOptions, name: &str) -> Cell {
    let cell = Cell::new(name);
    match Scope::by_name(name) {
        Some(scope) if !options.no_color => cell.fg(PALETTE.owner(scope)),
        _ => cell,
    }
}
