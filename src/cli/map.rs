use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::parse_assignment;
use crate::error::{FinmapError, Result};
use crate::importer::parse_file;
use crate::mapper::{duplicate_targets, group_coverage, unmapped_required};
use crate::models::{ColumnMapping, ImportPayload};
use crate::settings::{load_settings, shellexpand_path};
use crate::taxonomy::Taxonomy;
use crate::wizard::{ImportWizard, Stage, Step};

pub struct MapOptions<'a> {
    pub sheet: Option<&'a str>,
    pub auto: bool,
    pub clear: bool,
    pub assignments: &'a [String],
    pub output: Option<&'a str>,
}

pub fn run(file: &str, opts: MapOptions<'_>) -> Result<()> {
    let settings = load_settings();
    let taxonomy = Taxonomy::builtin();
    let path = shellexpand_path(file);
    let parsed = parse_file(&path, opts.sheet, settings.default_sheet.as_deref())?;

    let mut wizard = ImportWizard::new(&taxonomy);
    wizard.load(parsed)?;
    advance(&mut wizard)?;

    if opts.clear {
        wizard.clear_mappings()?;
    }
    if opts.auto {
        wizard.auto_map()?;
    }
    for raw in opts.assignments {
        let (column, id) = parse_assignment(raw)?;
        wizard.try_set_mapping(&column, id.as_deref())?;
    }

    println!("{}", mapping_table(&taxonomy, wizard.mappings()));
    print_status(&taxonomy, wizard.mappings());

    advance(&mut wizard)?;
    let payload = wizard
        .complete()
        .map_err(|w| FinmapError::Other(format!("Import not ready ({})", w.stage().title())))?;

    if let Some(output) = opts.output {
        write_payload(&payload, &shellexpand_path(output))?;
    }
    Ok(())
}

/// Move one step forward, turning a refused gate into an error.
fn advance(wizard: &mut ImportWizard<'_>) -> Result<Stage> {
    match wizard.next() {
        Step::Moved(stage) => Ok(stage),
        Step::Blocked(gate) => Err(FinmapError::Other(gate.message().to_string())),
    }
}

pub(crate) fn mapping_table(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Type", "Mapped To", "Category", "Required"]);
    for m in mappings {
        let category = m.mapped_category.as_deref().and_then(|id| taxonomy.get(id));
        table.add_row(vec![
            Cell::new(&m.source_column),
            Cell::new(m.value_type.key()),
            Cell::new(m.mapped_category.as_deref().unwrap_or("-")),
            Cell::new(category.map(|c| c.name.as_str()).unwrap_or("")),
            Cell::new(if m.required { "yes" } else { "" }),
        ]);
    }
    table
}

pub(crate) fn print_status(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) {
    let progress = crate::mapper::compute_progress(taxonomy, mappings);
    println!(
        "Mapped columns:  {} of {}",
        progress.mapped_column_count,
        mappings.len()
    );
    println!(
        "Required fields: {} of {}",
        progress.mapped_required_count, progress.required_category_count
    );
    let missing = unmapped_required(taxonomy, mappings);
    let pct = format!("{}%", progress.completion_percent);
    if missing.is_empty() {
        println!("Completion:      {}", pct.green().bold());
    } else {
        println!("Completion:      {}", pct.yellow().bold());
    }

    let coverage: Vec<String> = group_coverage(taxonomy, mappings)
        .iter()
        .map(|g| format!("{} {}/{}", g.group.name(), g.mapped, g.total))
        .collect();
    println!("By group:        {}", coverage.join(", "));

    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|c| c.name.as_str()).collect();
        println!(
            "{}",
            format!(
                "{} required fields are still unmapped: {}",
                missing.len(),
                names.join(", ")
            )
            .yellow()
        );
    }
    for (cat, columns) in duplicate_targets(taxonomy, mappings) {
        println!(
            "{}",
            format!("{} is mapped from {} columns: {}", cat.name, columns.len(), columns.join(", "))
                .dimmed()
        );
    }
}

pub(crate) fn write_payload(payload: &ImportPayload, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, format!("{json}\n"))?;
    println!("Wrote {}", path.display());
    Ok(())
}
