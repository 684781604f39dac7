use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{FinmapError, Result};
use crate::taxonomy::{FinancialCategory, StatementGroup, Taxonomy};

pub fn run(group: Option<&str>) -> Result<()> {
    let taxonomy = Taxonomy::builtin();
    let group = match group {
        Some(key) => Some(StatementGroup::from_key(key).ok_or_else(|| {
            FinmapError::Other(format!(
                "Unknown group: {key} (expected income, balance, cash-flow or assumptions)"
            ))
        })?),
        None => None,
    };

    let categories: Vec<&FinancialCategory> = match group {
        Some(g) => taxonomy.in_group(g).collect(),
        None => taxonomy.iter().collect(),
    };

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Group", "Type", "Required", "Description"]);
    for cat in &categories {
        table.add_row(vec![
            Cell::new(&cat.id),
            Cell::new(&cat.name),
            Cell::new(cat.group.name()),
            Cell::new(cat.value_type.key()),
            Cell::new(if cat.required { "yes" } else { "" }),
            Cell::new(&cat.description),
        ]);
    }
    println!("{}\n{table}", "Financial Categories".bold());

    let required = categories.iter().filter(|c| c.required).count();
    println!("{} categories, {} required", categories.len(), required);
    Ok(())
}
