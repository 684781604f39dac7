use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt;
use crate::importer::parse_file;
use crate::models::{FileInfo, PreviewRow};
use crate::settings::{load_settings, shellexpand_path};

pub fn run(file: &str, sheet: Option<&str>, rows: Option<usize>) -> Result<()> {
    let settings = load_settings();
    let path = shellexpand_path(file);
    let parsed = parse_file(&path, sheet, settings.default_sheet.as_deref())?;
    let limit = rows.unwrap_or(settings.preview_rows);

    print_file_info(&parsed.file);
    println!("Columns: {}", parsed.columns.join(", "));
    println!();
    println!("{}", preview_table(&parsed.columns, &parsed.rows, limit));
    if parsed.rows.len() > limit {
        println!(
            "{}",
            format!("... {} more rows", parsed.rows.len() - limit).dimmed()
        );
    }
    Ok(())
}

pub(crate) fn print_file_info(file: &FileInfo) {
    println!("{}", "File Information".bold());
    println!("File:    {}", file.file_name);
    println!("Sheets:  {}", file.sheet_names.join(", "));
    println!("Rows:    {}", file.row_count);
}

fn preview_table(columns: &[String], rows: &[PreviewRow], limit: usize) -> Table {
    let mut table = Table::new();
    let mut header = vec!["#".to_string()];
    header.extend(columns.iter().cloned());
    table.set_header(header);
    for (i, row) in rows.iter().take(limit).enumerate() {
        let mut cells = vec![Cell::new(i + 1)];
        cells.extend(columns.iter().map(|col| {
            Cell::new(row.get(col).map(fmt::cell).unwrap_or_default())
        }));
        table.add_row(cells);
    }
    table
}

