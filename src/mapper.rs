use log::debug;
use serde::Serialize;

use crate::error::{FinmapError, Result};
use crate::models::{ColumnMapping, PreviewRow};
use crate::taxonomy::{FinancialCategory, StatementGroup, Taxonomy, ValueType};

fn matches(column_lower: &str, category: &FinancialCategory) -> bool {
    let id_words = category.id.to_lowercase().replace('_', " ");
    let name_lower = category.name.to_lowercase();
    column_lower.contains(&id_words)
        || column_lower.contains(&name_lower)
        || name_lower.contains(column_lower)
}

/// First category (in taxonomy order) whose id or name overlaps the column name.
///
/// This is deliberately not a best-match search: an earlier, broader category wins
/// over a later, more specific one.
pub fn match_category<'t>(taxonomy: &'t Taxonomy, column: &str) -> Option<&'t FinancialCategory> {
    let column_lower = column.to_lowercase();
    taxonomy.iter().find(|cat| matches(&column_lower, cat))
}

/// One unmapped entry per discovered column, typed from the first row's cells.
pub fn initial_mappings(columns: &[String], first_row: Option<&PreviewRow>) -> Vec<ColumnMapping> {
    columns
        .iter()
        .map(|column| {
            let value_type = first_row
                .and_then(|row| row.get(column))
                .map(|cell| cell.value_type())
                .unwrap_or(ValueType::Text);
            ColumnMapping::unmapped(column, value_type)
        })
        .collect()
}

fn apply(mapping: &ColumnMapping, category: Option<&FinancialCategory>) -> ColumnMapping {
    match category {
        Some(cat) => ColumnMapping {
            source_column: mapping.source_column.clone(),
            mapped_category: Some(cat.id.clone()),
            value_type: cat.value_type,
            required: cat.required,
        },
        None => ColumnMapping {
            source_column: mapping.source_column.clone(),
            mapped_category: None,
            value_type: mapping.value_type,
            required: false,
        },
    }
}

/// Point `column` at `category_id`, or unmap it with `None`.
///
/// An id that is not in the taxonomy unmaps the column instead of failing.
/// Columns not present in `mappings` leave the collection unchanged.
pub fn set_mapping(
    taxonomy: &Taxonomy,
    mappings: &[ColumnMapping],
    column: &str,
    category_id: Option<&str>,
) -> Vec<ColumnMapping> {
    let category = category_id.and_then(|id| taxonomy.get(id));
    if category_id.is_some() && category.is_none() {
        debug!("unknown category {category_id:?} for column '{column}', clearing");
    }
    mappings
        .iter()
        .map(|m| {
            if m.source_column == column {
                apply(m, category)
            } else {
                m.clone()
            }
        })
        .collect()
}

/// Like [`set_mapping`] but reports unknown columns and category ids.
pub fn try_set_mapping(
    taxonomy: &Taxonomy,
    mappings: &[ColumnMapping],
    column: &str,
    category_id: Option<&str>,
) -> Result<Vec<ColumnMapping>> {
    if !mappings.iter().any(|m| m.source_column == column) {
        return Err(FinmapError::UnknownColumn(column.to_string()));
    }
    if let Some(id) = category_id {
        if taxonomy.get(id).is_none() {
            return Err(FinmapError::UnknownCategory(id.to_string()));
        }
    }
    Ok(set_mapping(taxonomy, mappings, column, category_id))
}

pub fn clear_all(mappings: &[ColumnMapping]) -> Vec<ColumnMapping> {
    mappings.iter().map(|m| apply(m, None)).collect()
}

/// Re-derive every mapping from the column names alone, overwriting manual choices.
pub fn auto_map(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) -> Vec<ColumnMapping> {
    mappings
        .iter()
        .map(|m| {
            let category = match_category(taxonomy, &m.source_column);
            debug!(
                "auto-map '{}' -> {}",
                m.source_column,
                category.map_or("(none)", |c| c.id.as_str())
            );
            apply(m, category)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappingProgress {
    pub mapped_column_count: usize,
    pub required_category_count: usize,
    pub mapped_required_count: usize,
    pub completion_percent: u32,
}

impl MappingProgress {
    pub fn remaining_required(&self) -> usize {
        self.required_category_count
            .saturating_sub(self.mapped_required_count)
    }
}

pub fn compute_progress(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) -> MappingProgress {
    let mapped_column_count = mappings.iter().filter(|m| m.is_mapped()).count();
    let required_category_count = taxonomy.required_count();
    let mapped_required_count = mappings
        .iter()
        .filter(|m| {
            m.mapped_category
                .as_deref()
                .and_then(|id| taxonomy.get(id))
                .is_some_and(|c| c.required)
        })
        .count();
    let completion_percent = if required_category_count == 0 {
        100
    } else {
        (100.0 * mapped_required_count as f64 / required_category_count as f64).round() as u32
    };
    MappingProgress {
        mapped_column_count,
        required_category_count,
        mapped_required_count,
        completion_percent,
    }
}

pub fn is_complete(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) -> bool {
    let progress = compute_progress(taxonomy, mappings);
    progress.mapped_required_count == progress.required_category_count
}

fn is_targeted(mappings: &[ColumnMapping], id: &str) -> bool {
    mappings
        .iter()
        .any(|m| m.mapped_category.as_deref() == Some(id))
}

/// Required categories nothing is mapped to yet, in taxonomy order.
pub fn unmapped_required<'t>(
    taxonomy: &'t Taxonomy,
    mappings: &[ColumnMapping],
) -> Vec<&'t FinancialCategory> {
    taxonomy
        .iter()
        .filter(|c| c.required && !is_targeted(mappings, &c.id))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCoverage {
    pub group: StatementGroup,
    pub mapped: usize,
    pub total: usize,
}

pub fn group_coverage(taxonomy: &Taxonomy, mappings: &[ColumnMapping]) -> Vec<GroupCoverage> {
    taxonomy
        .groups()
        .into_iter()
        .map(|group| {
            let (mapped, total) = taxonomy.in_group(group).fold((0, 0), |(mapped, total), c| {
                let hit = usize::from(is_targeted(mappings, &c.id));
                (mapped + hit, total + 1)
            });
            GroupCoverage {
                group,
                mapped,
                total,
            }
        })
        .collect()
}

/// Categories targeted by more than one column, with the columns pointing at each.
pub fn duplicate_targets<'t>(
    taxonomy: &'t Taxonomy,
    mappings: &[ColumnMapping],
) -> Vec<(&'t FinancialCategory, Vec<String>)> {
    taxonomy
        .iter()
        .filter_map(|cat| {
            let columns: Vec<String> = mappings
                .iter()
                .filter(|m| m.mapped_category.as_deref() == Some(cat.id.as_str()))
                .map(|m| m.source_column.clone())
                .collect();
            (columns.len() > 1).then_some((cat, columns))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use crate::taxonomy::StatementGroup::{Assumptions, BalanceSheet, IncomeStatement};
    use crate::taxonomy::ValueType::{Currency, Number, Percentage, Text};

    fn small_taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            FinancialCategory::new("revenue", "Total Revenue", IncomeStatement, Currency, true),
            FinancialCategory::new("cogs", "Cost of Goods Sold", IncomeStatement, Currency, true),
            FinancialCategory::new("tax_rate", "Tax Rate", Assumptions, Percentage, false),
        ])
        .unwrap()
    }

    fn columns(names: &[&str]) -> Vec<ColumnMapping> {
        names
            .iter()
            .map(|n| ColumnMapping::unmapped(n, Number))
            .collect()
    }

    fn targets(mappings: &[ColumnMapping]) -> Vec<Option<&str>> {
        mappings
            .iter()
            .map(|m| m.mapped_category.as_deref())
            .collect()
    }

    #[test]
    fn test_auto_map_example_scenario() {
        let taxonomy = small_taxonomy();
        let mapped = auto_map(&taxonomy, &columns(&["Revenue", "COGS", "Notes"]));
        assert_eq!(targets(&mapped), vec![Some("revenue"), Some("cogs"), None]);

        let progress = compute_progress(&taxonomy, &mapped);
        assert_eq!(progress.required_category_count, 2);
        assert_eq!(progress.mapped_required_count, 2);
        assert_eq!(progress.completion_percent, 100);
        assert!(is_complete(&taxonomy, &mapped));
    }

    #[test]
    fn test_auto_map_copies_category_type() {
        let taxonomy = small_taxonomy();
        let mapped = auto_map(&taxonomy, &columns(&["Tax Rate", "Notes"]));
        assert_eq!(mapped[0].value_type, Percentage);
        assert!(!mapped[0].required);
        assert_eq!(mapped[1].value_type, Number);
    }

    #[test]
    fn test_first_match_not_best_match() {
        let taxonomy = Taxonomy::new(vec![
            FinancialCategory::new("total_assets", "Total Assets", BalanceSheet, Currency, true),
            FinancialCategory::new("assets", "Assets", BalanceSheet, Currency, true),
            FinancialCategory::new("current_assets", "Current Assets", BalanceSheet, Currency, true),
        ])
        .unwrap();
        // "assets" matches before the more specific "current_assets".
        let mapped = auto_map(&taxonomy, &columns(&["current assets"]));
        assert_eq!(targets(&mapped), vec![Some("assets")]);

        // Reversing the declaration order changes the winner.
        let reversed = Taxonomy::new(taxonomy.iter().rev().cloned().collect()).unwrap();
        let mapped = auto_map(&reversed, &columns(&["current assets"]));
        assert_eq!(targets(&mapped), vec![Some("current_assets")]);
    }

    #[test]
    fn test_match_rules() {
        let taxonomy = Taxonomy::builtin();
        // (a) id with underscores as spaces
        assert_eq!(
            match_category(&taxonomy, "FY24 operating expenses").map(|c| c.id.as_str()),
            Some("operating_expenses")
        );
        assert_eq!(
            match_category(&taxonomy, "PPE (net)").map(|c| c.id.as_str()),
            Some("ppe")
        );
        // (b) column contains the display name
        assert_eq!(
            match_category(&taxonomy, "Reported Net Income").map(|c| c.id.as_str()),
            Some("net_income")
        );
        // (c) display name contains the column
        assert_eq!(
            match_category(&taxonomy, "Equivalents").map(|c| c.id.as_str()),
            Some("cash")
        );
        // earlier, broader categories shadow later ones
        assert_eq!(
            match_category(&taxonomy, "Free Cash Flow (adj)").map(|c| c.id.as_str()),
            Some("cash")
        );
        assert!(match_category(&taxonomy, "Notes").is_none());
        assert!(match_category(&taxonomy, "Year").is_none());
    }

    #[test]
    fn test_auto_map_is_deterministic() {
        let taxonomy = Taxonomy::builtin();
        let cols = columns(&["Year", "Revenue", "COGS", "Operating Expenses", "Net Income"]);
        let once = auto_map(&taxonomy, &cols);
        let twice = auto_map(&taxonomy, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_auto_map_overwrites_manual_choice() {
        let taxonomy = small_taxonomy();
        let manual = set_mapping(&taxonomy, &columns(&["Notes"]), "Notes", Some("revenue"));
        assert_eq!(targets(&manual), vec![Some("revenue")]);
        let mapped = auto_map(&taxonomy, &manual);
        assert_eq!(targets(&mapped), vec![None]);
        assert!(!mapped[0].required);
    }

    #[test]
    fn test_set_mapping_updates_type_and_required() {
        let taxonomy = small_taxonomy();
        let mapped = set_mapping(&taxonomy, &columns(&["A", "B"]), "A", Some("revenue"));
        assert_eq!(mapped[0].mapped_category.as_deref(), Some("revenue"));
        assert_eq!(mapped[0].value_type, Currency);
        assert!(mapped[0].required);
        assert_eq!(mapped[1], ColumnMapping::unmapped("B", Number));

        let cleared = set_mapping(&taxonomy, &mapped, "A", None);
        assert_eq!(cleared[0].mapped_category, None);
        assert!(!cleared[0].required);
        // type stays reconciled to the last mapped category
        assert_eq!(cleared[0].value_type, Currency);
    }

    #[test]
    fn test_set_mapping_unknown_category_clears() {
        let taxonomy = small_taxonomy();
        let mapped = set_mapping(&taxonomy, &columns(&["A"]), "A", Some("revenue"));
        let after = set_mapping(&taxonomy, &mapped, "A", Some("no_such_thing"));
        assert_eq!(after[0].mapped_category, None);
        assert!(!after[0].required);
    }

    #[test]
    fn test_set_mapping_unknown_column_is_noop() {
        let taxonomy = small_taxonomy();
        let before = columns(&["A"]);
        let after = set_mapping(&taxonomy, &before, "Z", Some("revenue"));
        assert_eq!(before, after);
    }

    #[test]
    fn test_try_set_mapping_reports_errors() {
        let taxonomy = small_taxonomy();
        let cols = columns(&["A"]);
        assert!(matches!(
            try_set_mapping(&taxonomy, &cols, "A", Some("bogus")),
            Err(FinmapError::UnknownCategory(id)) if id == "bogus"
        ));
        assert!(matches!(
            try_set_mapping(&taxonomy, &cols, "Z", None),
            Err(FinmapError::UnknownColumn(name)) if name == "Z"
        ));
        let ok = try_set_mapping(&taxonomy, &cols, "A", Some("cogs")).unwrap();
        assert_eq!(ok[0].mapped_category.as_deref(), Some("cogs"));
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let taxonomy = small_taxonomy();
        let mapped = auto_map(&taxonomy, &columns(&["Revenue", "COGS", "Tax Rate"]));
        let once = clear_all(&mapped);
        let twice = clear_all(&once);
        assert_eq!(once, twice);
        assert!(once.iter().all(|m| m.mapped_category.is_none() && !m.required));
        assert_eq!(
            once.iter().map(|m| m.source_column.as_str()).collect::<Vec<_>>(),
            vec!["Revenue", "COGS", "Tax Rate"]
        );
        assert_eq!(once[2].value_type, Percentage);
    }

    #[test]
    fn test_progress_moves_by_one() {
        let taxonomy = small_taxonomy();
        let base = columns(&["A", "B"]);
        let p0 = compute_progress(&taxonomy, &base).mapped_required_count;

        let one = set_mapping(&taxonomy, &base, "A", Some("revenue"));
        assert_eq!(compute_progress(&taxonomy, &one).mapped_required_count, p0 + 1);

        let moved = set_mapping(&taxonomy, &one, "A", Some("cogs"));
        assert_eq!(compute_progress(&taxonomy, &moved).mapped_required_count, p0 + 1);

        let optional = set_mapping(&taxonomy, &moved, "B", Some("tax_rate"));
        assert_eq!(compute_progress(&taxonomy, &optional).mapped_required_count, p0 + 1);
        assert_eq!(compute_progress(&taxonomy, &optional).mapped_column_count, 2);

        let cleared = set_mapping(&taxonomy, &optional, "A", None);
        assert_eq!(compute_progress(&taxonomy, &cleared).mapped_required_count, p0);
    }

    #[test]
    fn test_completion_boundary() {
        let taxonomy = small_taxonomy();
        let base = columns(&["A", "B", "C"]);
        let partial = set_mapping(&taxonomy, &base, "A", Some("revenue"));
        let progress = compute_progress(&taxonomy, &partial);
        assert_eq!(progress.completion_percent, 50);
        assert_eq!(progress.remaining_required(), 1);
        assert!(!is_complete(&taxonomy, &partial));

        let full = set_mapping(&taxonomy, &partial, "B", Some("cogs"));
        assert!(is_complete(&taxonomy, &full));
        assert_eq!(compute_progress(&taxonomy, &full).completion_percent, 100);
    }

    #[test]
    fn test_completion_percent_rounds() {
        let taxonomy = Taxonomy::builtin();
        let mapped = auto_map(&taxonomy, &columns(&["Revenue"]));
        // 1 of 17 required
        assert_eq!(compute_progress(&taxonomy, &mapped).completion_percent, 6);
    }

    #[test]
    fn test_empty_taxonomy_is_complete() {
        let taxonomy = Taxonomy::new(vec![]).unwrap();
        let mapped = auto_map(&taxonomy, &columns(&["Revenue"]));
        let progress = compute_progress(&taxonomy, &mapped);
        assert_eq!(progress.completion_percent, 100);
        assert_eq!(progress.required_category_count, 0);
        assert!(is_complete(&taxonomy, &mapped));
    }

    #[test]
    fn test_initial_mappings_infer_from_first_row() {
        let row = PreviewRow::new(vec![
            ("Year".into(), CellValue::Text("2024".into())),
            ("Revenue".into(), CellValue::Currency(10.0)),
        ]);
        let cols = vec!["Year".to_string(), "Revenue".to_string(), "Extra".to_string()];
        let mappings = initial_mappings(&cols, Some(&row));
        assert_eq!(mappings.len(), 3);
        assert_eq!(mappings[0].value_type, Text);
        assert_eq!(mappings[1].value_type, Currency);
        assert_eq!(mappings[2].value_type, Text);
        assert!(mappings.iter().all(|m| !m.is_mapped() && !m.required));
        assert!(initial_mappings(&cols, None)
            .iter()
            .all(|m| m.value_type == Text));
    }

    #[test]
    fn test_unmapped_required_and_coverage() {
        let taxonomy = small_taxonomy();
        let mapped = set_mapping(&taxonomy, &columns(&["A"]), "A", Some("cogs"));
        let missing: Vec<&str> = unmapped_required(&taxonomy, &mapped)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(missing, vec!["revenue"]);

        let coverage = group_coverage(&taxonomy, &mapped);
        assert_eq!(
            coverage,
            vec![
                GroupCoverage { group: IncomeStatement, mapped: 1, total: 2 },
                GroupCoverage { group: Assumptions, mapped: 0, total: 1 },
            ]
        );
    }

    #[test]
    fn test_duplicate_targets_are_allowed_and_reported() {
        let taxonomy = small_taxonomy();
        let cols = columns(&["Revenue 2024", "Revenue 2025", "COGS"]);
        let mapped = auto_map(&taxonomy, &cols);
        assert_eq!(
            targets(&mapped),
            vec![Some("revenue"), Some("revenue"), Some("cogs")]
        );
        let dups = duplicate_targets(&taxonomy, &mapped);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0.id, "revenue");
        assert_eq!(dups[0].1, vec!["Revenue 2024", "Revenue 2025"]);
    }
}
