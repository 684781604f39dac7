use log::debug;

use crate::error::{FinmapError, Result};
use crate::mapper::{self, MappingProgress};
use crate::models::{CellValue, ColumnMapping, FileInfo, ImportPayload, ParsedWorkbook, PreviewRow};
use crate::taxonomy::{FinancialCategory, Taxonomy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Upload,
    Preview,
    Map,
    Confirm,
}

pub const ALL_STAGES: &[Stage] = &[Stage::Upload, Stage::Preview, Stage::Map, Stage::Confirm];

impl Stage {
    pub fn index(&self) -> usize {
        match self {
            Self::Upload => 0,
            Self::Preview => 1,
            Self::Map => 2,
            Self::Confirm => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Upload => "Upload File",
            Self::Preview => "Preview Data",
            Self::Map => "Map Columns",
            Self::Confirm => "Confirm Import",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Upload => "Select and upload your Excel file",
            Self::Preview => "Review and edit imported data",
            Self::Map => "Map Excel columns to financial categories",
            Self::Confirm => "Review and confirm the import",
        }
    }

    fn next(&self) -> Option<Stage> {
        ALL_STAGES.get(self.index() + 1).copied()
    }

    fn previous(&self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| ALL_STAGES[i])
    }
}

/// Why a forward move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    NoFile,
    NoRows,
    NoMappedColumns,
    AtStart,
    AtEnd,
}

impl Gate {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoFile => "Load a file first",
            Self::NoRows => "The file has no data rows",
            Self::NoMappedColumns => "Map at least one column to continue",
            Self::AtStart => "Already at the first step",
            Self::AtEnd => "Already at the last step; complete the import instead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(Stage),
    Blocked(Gate),
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub file_name: String,
    pub sheet_names: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    pub mapped: usize,
    pub progress: MappingProgress,
}

/// Single-use state for one import-from-file interaction.
///
/// Linear Upload -> Preview -> Map -> Confirm. Forward moves are gated at the moment
/// `next` is called; moving back is always allowed and nothing is re-checked later.
pub struct ImportWizard<'t> {
    taxonomy: &'t Taxonomy,
    stage: Stage,
    file: Option<FileInfo>,
    rows: Vec<PreviewRow>,
    mappings: Vec<ColumnMapping>,
}

impl<'t> ImportWizard<'t> {
    pub fn new(taxonomy: &'t Taxonomy) -> Self {
        Self {
            taxonomy,
            stage: Stage::Upload,
            file: None,
            rows: Vec::new(),
            mappings: Vec::new(),
        }
    }

    pub fn taxonomy(&self) -> &'t Taxonomy {
        self.taxonomy
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    pub fn rows(&self) -> &[PreviewRow] {
        &self.rows
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub fn columns(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .map(|m| m.source_column.as_str())
            .collect()
    }

    /// Take a parsed file and move to Preview. Only valid while in Upload.
    pub fn load(&mut self, parsed: ParsedWorkbook) -> Result<()> {
        self.require(Stage::Upload)?;
        self.mappings = mapper::initial_mappings(&parsed.columns, parsed.rows.first());
        self.rows = parsed.rows;
        debug!(
            "loaded {} ({} rows, {} columns)",
            parsed.file.file_name,
            self.rows.len(),
            self.mappings.len()
        );
        self.file = Some(parsed.file);
        self.stage = Stage::Preview;
        Ok(())
    }

    /// Drop the loaded file, rows and mappings after a failed re-read. Only valid in Upload.
    pub fn unload(&mut self) -> Result<()> {
        self.require(Stage::Upload)?;
        self.file = None;
        self.rows.clear();
        self.mappings.clear();
        debug!("session data discarded");
        Ok(())
    }

    pub fn can_proceed(&self) -> bool {
        self.gate().is_none()
    }

    fn gate(&self) -> Option<Gate> {
        match self.stage {
            Stage::Upload if self.file.is_none() => Some(Gate::NoFile),
            Stage::Preview if self.rows.is_empty() => Some(Gate::NoRows),
            Stage::Map if !self.mappings.iter().any(|m| m.is_mapped()) => {
                Some(Gate::NoMappedColumns)
            }
            _ => None,
        }
    }

    pub fn next(&mut self) -> Step {
        if let Some(gate) = self.gate() {
            debug!("{:?} -> next blocked: {gate:?}", self.stage);
            return Step::Blocked(gate);
        }
        match self.stage.next() {
            Some(stage) => {
                debug!("{:?} -> {stage:?}", self.stage);
                self.stage = stage;
                Step::Moved(stage)
            }
            None => Step::Blocked(Gate::AtEnd),
        }
    }

    pub fn back(&mut self) -> Step {
        match self.stage.previous() {
            Some(stage) => {
                debug!("{:?} -> {stage:?} (back)", self.stage);
                self.stage = stage;
                Step::Moved(stage)
            }
            None => Step::Blocked(Gate::AtStart),
        }
    }

    /// Whether the stepper should show `stage` as done.
    pub fn stage_completed(&self, stage: Stage) -> bool {
        match stage {
            Stage::Upload => self.file.is_some(),
            Stage::Preview => !self.rows.is_empty() && self.stage > Stage::Preview,
            Stage::Map => {
                self.mappings.iter().any(|m| m.is_mapped()) && self.stage > Stage::Map
            }
            Stage::Confirm => false,
        }
    }

    pub fn edit_cell(&mut self, row: usize, column: &str, value: CellValue) -> Result<()> {
        self.require(Stage::Preview)?;
        let target = self
            .rows
            .get_mut(row)
            .ok_or(FinmapError::RowOutOfRange(row))?;
        if target.set(column, value) {
            Ok(())
        } else {
            Err(FinmapError::UnknownColumn(column.to_string()))
        }
    }

    /// Lenient mapping: an unknown category id unmaps the column.
    pub fn set_mapping(&mut self, column: &str, category_id: Option<&str>) -> Result<()> {
        self.require(Stage::Map)?;
        self.mappings = mapper::set_mapping(self.taxonomy, &self.mappings, column, category_id);
        Ok(())
    }

    pub fn try_set_mapping(&mut self, column: &str, category_id: Option<&str>) -> Result<()> {
        self.require(Stage::Map)?;
        self.mappings =
            mapper::try_set_mapping(self.taxonomy, &self.mappings, column, category_id)?;
        Ok(())
    }

    pub fn auto_map(&mut self) -> Result<()> {
        self.require(Stage::Map)?;
        self.mappings = mapper::auto_map(self.taxonomy, &self.mappings);
        Ok(())
    }

    pub fn clear_mappings(&mut self) -> Result<()> {
        self.require(Stage::Map)?;
        self.mappings = mapper::clear_all(&self.mappings);
        Ok(())
    }

    pub fn progress(&self) -> MappingProgress {
        mapper::compute_progress(self.taxonomy, &self.mappings)
    }

    pub fn is_complete(&self) -> bool {
        mapper::is_complete(self.taxonomy, &self.mappings)
    }

    pub fn unmapped_required(&self) -> Vec<&'t FinancialCategory> {
        mapper::unmapped_required(self.taxonomy, &self.mappings)
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            file_name: self
                .file
                .as_ref()
                .map(|f| f.file_name.clone())
                .unwrap_or_default(),
            sheet_names: self
                .file
                .as_ref()
                .map(|f| f.sheet_names.clone())
                .unwrap_or_default(),
            rows: self.rows.len(),
            columns: self.mappings.len(),
            mapped: self.mappings.iter().filter(|m| m.is_mapped()).count(),
            progress: self.progress(),
        }
    }

    /// Finish the session and hand its rows and mappings to the caller.
    ///
    /// Outside Confirm the session is returned unchanged.
    pub fn complete(self) -> std::result::Result<ImportPayload, Self> {
        match self.file {
            Some(file) if self.stage == Stage::Confirm => {
                debug!("import of {} completed", file.file_name);
                Ok(ImportPayload {
                    file,
                    rows: self.rows,
                    mappings: self.mappings,
                })
            }
            file => Err(Self { file, ..self }),
        }
    }

    pub fn cancel(self) {
        debug!("import cancelled in {:?}", self.stage);
    }

    fn require(&self, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(FinmapError::WrongStage {
                expected: expected.title(),
                actual: self.stage.title(),
            })
        }
    }
}
