pub mod categories;
pub mod config;
pub mod import;
pub mod inspect;
pub mod map;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::{FinmapError, Result};

/// Split a `COLUMN=CATEGORY_ID` argument. An empty id means "unmap".
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, Option<String>)> {
    let (column, id) = raw
        .rsplit_once('=')
        .ok_or_else(|| FinmapError::InvalidAssignment(raw.to_string()))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(FinmapError::InvalidAssignment(raw.to_string()));
    }
    let id = id.trim();
    Ok((column.to_string(), (!id.is_empty()).then(|| id.to_string())))
}

/// `<output_dir>/<file stem>.mapping.json`
pub(crate) fn default_output_path(output_dir: &Path, file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("import");
    output_dir.join(format!("{stem}.mapping.json"))
}

#[derive(Parser)]
#[command(
    name = "finmap",
    version,
    about = "Map spreadsheet columns onto a financial statement taxonomy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the financial categories columns can be mapped to.
    Categories {
        /// Only show one statement group: income, balance, cash-flow, assumptions
        #[arg(long)]
        group: Option<String>,
    },
    /// Show file information and a preview of the parsed rows.
    Inspect {
        /// Path to a CSV or XLSX file
        file: String,
        /// Worksheet to read (XLSX only)
        #[arg(long)]
        sheet: Option<String>,
        /// Number of rows to show (default: settings preview_rows)
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Map columns non-interactively and optionally write the import payload.
    Map {
        /// Path to a CSV or XLSX file
        file: String,
        /// Worksheet to read (XLSX only)
        #[arg(long)]
        sheet: Option<String>,
        /// Auto-map columns by name before applying --set
        #[arg(long)]
        auto: bool,
        /// Clear all mappings before auto-mapping / applying --set
        #[arg(long)]
        clear: bool,
        /// Explicit mapping COLUMN=CATEGORY_ID (repeatable; empty id unmaps)
        #[arg(long = "set", value_name = "COLUMN=ID")]
        assignments: Vec<String>,
        /// Write the import payload as JSON to this path
        #[arg(long)]
        output: Option<String>,
    },
    /// Run the interactive import wizard.
    Import {
        /// Path to a CSV or XLSX file
        file: String,
        /// Worksheet to read (XLSX only)
        #[arg(long)]
        sheet: Option<String>,
        /// Where to write the payload (default: <output_dir>/<name>.mapping.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show or change settings.
    Config {
        /// Rows shown by `inspect` and the wizard preview
        #[arg(long = "preview-rows")]
        preview_rows: Option<usize>,
        /// Worksheet to use when none is given (empty to unset)
        #[arg(long = "default-sheet")]
        default_sheet: Option<String>,
        /// Directory the wizard writes payloads to
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Run auto-map when the wizard first reaches the mapping step
        #[arg(long = "auto-map-on-load")]
        auto_map_on_load: Option<bool>,
    },
    /// Generate shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("Revenue=revenue").unwrap(),
            ("Revenue".to_string(), Some("revenue".to_string()))
        );
        assert_eq!(
            parse_assignment("Notes=").unwrap(),
            ("Notes".to_string(), None)
        );
        assert_eq!(
            parse_assignment("a=b=cogs").unwrap(),
            ("a=b".to_string(), Some("cogs".to_string()))
        );
        assert!(matches!(
            parse_assignment("Revenue"),
            Err(FinmapError::InvalidAssignment(_))
        ));
        assert!(parse_assignment("=revenue").is_err());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("out"), Path::new("data/model.xlsx")),
            PathBuf::from("out/model.mapping.json")
        );
    }

    #[test]
    fn test_cli_parses_repeated_set() {
        let cli = Cli::try_parse_from([
            "finmap", "map", "m.csv", "--auto", "--set", "A=revenue", "--set", "B=",
        ])
        .unwrap();
        match cli.command {
            Commands::Map {
                auto, assignments, ..
            } => {
                assert!(auto);
                assert_eq!(assignments, vec!["A=revenue", "B="]);
            }
            _ => panic!("expected map"),
        }
    }
}
