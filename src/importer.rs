use std::path::Path;
use std::sync::OnceLock;

use log::{info, warn};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{FinmapError, Result};
use crate::models::{CellValue, FileInfo, ParsedWorkbook, PreviewRow};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d{1,3}(,\d{3})+|\d+)(\.\d+)?$|^[+-]?\.\d+$").expect("valid regex")
    })
}

fn currency_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(-?\$\s*[\d,]*\.?\d+|\(\$?\s*[\d,]*\.?\d+\))$").expect("valid regex")
    })
}

/// Type a raw text cell the way a spreadsheet user would read it.
pub fn infer_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Text(String::new());
    }
    if let Some(pct) = s.strip_suffix('%') {
        let pct = pct.trim().replace(',', "");
        if number_pattern().is_match(&pct) {
            if let Ok(v) = pct.parse::<f64>() {
                return CellValue::Percentage(v);
            }
        }
    }
    if currency_pattern().is_match(s) {
        return CellValue::Currency(parse_amount(s));
    }
    if number_pattern().is_match(s) {
        if let Ok(v) = s.replace(',', "").parse::<f64>() {
            return CellValue::Number(v);
        }
    }
    CellValue::Text(s.to_string())
}

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|base| base + chrono::Duration::days(serial as i64))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Header names that are non-empty and unique: blanks become `Column N`,
/// repeats get a ` (2)`, ` (3)` suffix.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, name) in raw.iter().enumerate() {
        let base = match name.trim() {
            "" => {
                warn!("blank header in column {}, naming it 'Column {}'", i + 1, i + 1);
                format!("Column {}", i + 1)
            }
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while out.contains(&candidate) {
            candidate = format!("{base} ({n})");
            n += 1;
        }
        if candidate != base {
            warn!("duplicate header '{base}' renamed to '{candidate}'");
        }
        out.push(candidate);
    }
    out
}

/// Turn a grid of typed cells (header first) into preview rows.
fn build_rows(grid: Vec<Vec<CellValue>>) -> Option<(Vec<String>, Vec<PreviewRow>)> {
    let mut iter = grid
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()));
    let header = iter.next()?;
    let raw_names: Vec<String> = header
        .into_iter()
        .map(|c| match c {
            CellValue::Text(s) => s,
            other => other.as_f64().map(|v| v.to_string()).unwrap_or_default(),
        })
        .collect();
    let columns = normalize_headers(&raw_names);
    let rows = iter
        .map(|cells| {
            let mut cells = cells.into_iter();
            PreviewRow::new(
                columns
                    .iter()
                    .map(|col| {
                        let value = cells.next().unwrap_or(CellValue::Text(String::new()));
                        (col.clone(), value)
                    })
                    .collect(),
            )
        })
        .collect();
    Some((columns, rows))
}

// ---------------------------------------------------------------------------
// Importer kinds — enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImporterKind {
    Csv,
    #[cfg(feature = "xlsx")]
    Xlsx,
}

impl ImporterKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            #[cfg(feature = "xlsx")]
            Self::Xlsx => "xlsx",
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::Csv => &["csv", "txt"],
            #[cfg(feature = "xlsx")]
            Self::Xlsx => &["xlsx", "xlsm", "xls", "ods"],
        }
    }

    /// Returns the sheet names and the typed grid of the selected sheet.
    #[allow(unused_variables)]
    fn read(
        &self,
        file_path: &Path,
        sheet: Option<&str>,
        default_sheet: Option<&str>,
    ) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
        match self {
            Self::Csv => read_csv(file_path),
            #[cfg(feature = "xlsx")]
            Self::Xlsx => read_xlsx(file_path, sheet, default_sheet),
        }
    }
}

const ALL_IMPORTERS: &[ImporterKind] = &[
    ImporterKind::Csv,
    #[cfg(feature = "xlsx")]
    ImporterKind::Xlsx,
];

pub fn get_for_file(file_path: &Path) -> Option<ImporterKind> {
    let ext = file_path.extension()?.to_str()?.to_lowercase();
    ALL_IMPORTERS
        .iter()
        .find(|i| i.extensions().contains(&ext.as_str()))
        .copied()
}

// ---------------------------------------------------------------------------
// parse_file
// ---------------------------------------------------------------------------

/// Read a spreadsheet into the shape the import wizard starts from.
///
/// `sheet` only applies to workbooks and must exist. Without it, `default_sheet` is
/// used when the workbook has one by that name, else the first sheet.
pub fn parse_file(
    file_path: &Path,
    sheet: Option<&str>,
    default_sheet: Option<&str>,
) -> Result<ParsedWorkbook> {
    let importer = get_for_file(file_path)
        .ok_or_else(|| FinmapError::UnsupportedFile(file_path.display().to_string()))?;
    let (sheet_names, grid) = importer.read(file_path, sheet, default_sheet)?;
    let (columns, rows) = build_rows(grid)
        .ok_or_else(|| FinmapError::EmptyFile(file_path.display().to_string()))?;
    let file = FileInfo {
        file_name: file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string(),
        sheet_names,
        row_count: rows.len(),
        checksum: compute_checksum(file_path)?,
    };
    info!(
        "parsed {} as {}: {} rows, {} columns",
        file.file_name,
        importer.key(),
        file.row_count,
        columns.len()
    );
    Ok(ParsedWorkbook {
        file,
        rows,
        columns,
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(file_path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(infer_cell).collect());
    }
    let stem = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string();
    Ok((vec![stem], grid))
}

// ---------------------------------------------------------------------------
// XLSX (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_xlsx(
    file_path: &Path,
    sheet: Option<&str>,
    default_sheet: Option<&str>,
) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| FinmapError::Workbook(format!("Failed to open workbook: {e}")))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let fallback = default_sheet.filter(|d| sheet_names.iter().any(|s| s == *d));
    let selected = match sheet.or(fallback) {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(FinmapError::Workbook(format!(
                "No sheet named '{name}' (available: {})",
                sheet_names.join(", ")
            )))
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| FinmapError::EmptyFile(file_path.display().to_string()))?,
    };
    let range = workbook
        .worksheet_range(&selected)
        .map_err(|e| FinmapError::Workbook(format!("Failed to read sheet '{selected}': {e}")))?;

    let grid = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => CellValue::Text(String::new()),
                    Data::Float(f) => CellValue::Number(*f),
                    Data::Int(i) => CellValue::Number(*i as f64),
                    Data::String(s) => infer_cell(s),
                    Data::DateTime(dt) => CellValue::Text(excel_serial_to_date(dt.as_f64())),
                    Data::DateTimeIso(s) => CellValue::Text(s.clone()),
                    other => CellValue::Text(other.to_string()),
                })
                .collect()
        })
        .collect();
    Ok((sheet_names, grid))
}
