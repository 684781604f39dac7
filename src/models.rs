use serde::{Deserialize, Serialize};

use crate::taxonomy::ValueType;

/// A typed spreadsheet cell as it will be handed to the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Currency(f64),
    Percentage(f64),
}

impl CellValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::Text,
            Self::Number(_) => ValueType::Number,
            Self::Currency(_) => ValueType::Currency,
            Self::Percentage(_) => ValueType::Percentage,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(_) => None,
            Self::Number(v) | Self::Currency(v) | Self::Percentage(v) => Some(*v),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column: String,
    #[serde(flatten)]
    pub value: CellValue,
}

/// One imported record: cells in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub cells: Vec<Cell>,
}

impl PreviewRow {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|(column, value)| Cell { column, value })
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.value)
    }

    /// Replace the value for an existing column. Returns false if the row has no such column.
    pub fn set(&mut self, column: &str, value: CellValue) -> bool {
        match self.cells.iter_mut().find(|c| c.column == column) {
            Some(cell) => {
                cell.value = value;
                true
            }
            None => false,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.column.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub mapped_category: Option<String>,
    pub value_type: ValueType,
    pub required: bool,
}

impl ColumnMapping {
    pub fn unmapped(source_column: &str, value_type: ValueType) -> Self {
        Self {
            source_column: source_column.to_string(),
            mapped_category: None,
            value_type,
            required: false,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_category.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub sheet_names: Vec<String>,
    pub row_count: usize,
    pub checksum: String,
}

/// Intermediate representation from a CSV/XLSX parser before the wizard takes over.
#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub file: FileInfo,
    pub rows: Vec<PreviewRow>,
    pub columns: Vec<String>,
}

/// What a completed wizard session hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPayload {
    pub file: FileInfo,
    pub rows: Vec<PreviewRow>,
    pub mappings: Vec<ColumnMapping>,
}
