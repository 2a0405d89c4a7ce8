//! sheetlink CLI - spreadsheet inspection and mutation tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheetlink::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetlink")]
#[command(
    author,
    version,
    about = "Inspect and mutate spreadsheets through a live host session or directly on disk"
)]
struct Cli {
    /// Which backend to use
    #[arg(long, global = true, default_value = "auto")]
    backend: BackendArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Live session if available, file otherwise
    Auto,
    /// Running host session only
    Live,
    /// On-disk container only
    File,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sheets in a document
    Sheets {
        /// Input spreadsheet file
        input: PathBuf,
    },

    /// Read a cell's displayed value
    Get {
        input: PathBuf,
        /// Sheet name
        sheet: String,
        /// Cell reference (e.g. B2)
        cell: String,
    },

    /// Write a value to a cell and save
    Set {
        input: PathBuf,
        sheet: String,
        cell: String,
        /// Value to write; parsed as number or TRUE/FALSE when possible
        value: String,
    },

    /// Read a cell's formula (falls back to the value)
    Formula {
        input: PathBuf,
        sheet: String,
        cell: String,
    },

    /// Write a formula to a cell and save
    SetFormula {
        input: PathBuf,
        sheet: String,
        cell: String,
        /// Formula text, with or without the leading '='
        formula: String,
    },

    /// Read a cell's style
    Style {
        input: PathBuf,
        sheet: String,
        cell: String,
    },

    /// Show the sheet's used range
    UsedRange {
        input: PathBuf,
        sheet: String,
    },

    /// Create a named table over a range and save
    AddTable {
        input: PathBuf,
        sheet: String,
        /// Table range (e.g. A1:C10)
        range: String,
        /// Table name (no spaces)
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let preference = match cli.backend {
        BackendArg::Auto => BackendPreference::Auto,
        BackendArg::Live => BackendPreference::Live,
        BackendArg::File => BackendPreference::File,
    };

    match cli.command {
        Commands::Sheets { input } => {
            let mut session = open(&input, preference)?;
            for name in session.sheet_names()? {
                println!("{name}");
            }
            session.close()?;
        }
        Commands::Get { input, sheet, cell } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                println!("{}", sheet.value(&cell)?);
            }
            session.close()?;
        }
        Commands::Set {
            input,
            sheet,
            cell,
            value,
        } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                sheet.set_value(&cell, &parse_value(&value))?;
            }
            session.save().context("Failed to save document")?;
            session.close()?;
        }
        Commands::Formula { input, sheet, cell } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                println!("{}", sheet.formula(&cell)?);
            }
            session.close()?;
        }
        Commands::SetFormula {
            input,
            sheet,
            cell,
            formula,
        } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                sheet.set_formula(&cell, &formula)?;
            }
            session.save().context("Failed to save document")?;
            session.close()?;
        }
        Commands::Style { input, sheet, cell } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                let style = sheet.cell_style(&cell)?;
                println!("{style:#?}");
            }
            session.close()?;
        }
        Commands::UsedRange { input, sheet } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                println!("{}", sheet.used_range()?.to_a1());
            }
            session.close()?;
        }
        Commands::AddTable {
            input,
            sheet,
            range,
            name,
        } => {
            let mut session = open(&input, preference)?;
            {
                let mut sheet = session.sheet(&sheet)?;
                sheet.add_table(&range, &name)?;
            }
            session.save().context("Failed to save document")?;
            session.close()?;
        }
    }

    Ok(())
}

fn open(input: &PathBuf, preference: BackendPreference) -> Result<Session> {
    let options = OpenOptions {
        preference,
        ..OpenOptions::default()
    };
    sheetlink::open_with(input, options)
        .with_context(|| format!("Failed to open '{}'", input.display()))
}

/// Parse a CLI value the way a spreadsheet user expects: numbers and
/// TRUE/FALSE become typed values, everything else is text.
fn parse_value(raw: &str) -> CellValue {
    if let Ok(n) = raw.parse::<f64>() {
        return CellValue::from(n);
    }
    match raw.to_ascii_uppercase().as_str() {
        "TRUE" => CellValue::from(true),
        "FALSE" => CellValue::from(false),
        _ => CellValue::from(raw),
    }
}
