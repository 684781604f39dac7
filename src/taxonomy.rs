use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{FinmapError, Result};

use StatementGroup::{Assumptions, BalanceSheet, CashFlow, IncomeStatement};
use ValueType::{Currency, Percentage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementGroup {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Assumptions,
}

impl StatementGroup {
    pub fn key(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "income",
            Self::BalanceSheet => "balance",
            Self::CashFlow => "cash-flow",
            Self::Assumptions => "assumptions",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "Income Statement",
            Self::BalanceSheet => "Balance Sheet",
            Self::CashFlow => "Cash Flow",
            Self::Assumptions => "Assumptions",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_GROUPS
            .iter()
            .find(|g| g.key().eq_ignore_ascii_case(key.trim()))
            .copied()
    }
}

pub const ALL_GROUPS: &[StatementGroup] = &[
    StatementGroup::IncomeStatement,
    StatementGroup::BalanceSheet,
    StatementGroup::CashFlow,
    StatementGroup::Assumptions,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Currency,
    Percentage,
}

impl ValueType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Percentage => "percentage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialCategory {
    pub id: String,
    pub name: String,
    pub group: StatementGroup,
    #[serde(default)]
    pub description: String,
    pub value_type: ValueType,
    pub required: bool,
}

impl FinancialCategory {
    pub fn new(
        id: &str,
        name: &str,
        group: StatementGroup,
        value_type: ValueType,
        required: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            group,
            description: String::new(),
            value_type,
            required,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Ordered, immutable set of categories a source column can be mapped to.
///
/// Declaration order matters: auto-mapping walks the categories front to back and
/// takes the first hit.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<FinancialCategory>,
}

impl Taxonomy {
    /// Build a taxonomy, rejecting duplicate ids.
    pub fn new(categories: Vec<FinancialCategory>) -> Result<Self> {
        let mut seen = HashSet::new();
        for cat in &categories {
            if !seen.insert(cat.id.as_str()) {
                return Err(FinmapError::DuplicateCategory(cat.id.clone()));
            }
        }
        Ok(Self { categories })
    }

    /// The standard three-statement line items plus modelling assumptions.
    pub fn builtin() -> Self {
        let categories = BUILTIN
            .iter()
            .map(|(id, name, group, description, value_type, required)| {
                FinancialCategory::new(id, name, *group, *value_type, *required)
                    .with_description(description)
            })
            .collect();
        Self { categories }
    }

    pub fn get(&self, id: &str) -> Option<&FinancialCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FinancialCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn required_count(&self) -> usize {
        self.categories.iter().filter(|c| c.required).count()
    }

    /// Groups present in the taxonomy, in order of first appearance.
    pub fn groups(&self) -> Vec<StatementGroup> {
        let mut groups = Vec::new();
        for cat in &self.categories {
            if !groups.contains(&cat.group) {
                groups.push(cat.group);
            }
        }
        groups
    }

    pub fn in_group(&self, group: StatementGroup) -> impl Iterator<Item = &FinancialCategory> {
        self.categories.iter().filter(move |c| c.group == group)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'a> IntoIterator for &'a Taxonomy {
    type Item = &'a FinancialCategory;
    type IntoIter = std::slice::Iter<'a, FinancialCategory>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}

type BuiltinRow = (
    &'static str,
    &'static str,
    StatementGroup,
    &'static str,
    ValueType,
    bool,
);

const BUILTIN: &[BuiltinRow] = &[
    ("revenue", "Total Revenue", IncomeStatement, "Total sales revenue", Currency, true),
    ("cogs", "Cost of Goods Sold", IncomeStatement, "Direct costs of producing goods", Currency, true),
    ("gross_profit", "Gross Profit", IncomeStatement, "Revenue minus COGS", Currency, false),
    ("operating_expenses", "Operating Expenses", IncomeStatement, "General operating costs", Currency, true),
    ("ebitda", "EBITDA", IncomeStatement, "Earnings before interest, taxes, depreciation", Currency, false),
    ("depreciation", "Depreciation & Amortization", IncomeStatement, "Non-cash depreciation expense", Currency, true),
    ("interest_expense", "Interest Expense", IncomeStatement, "Cost of debt financing", Currency, false),
    ("tax_expense", "Tax Expense", IncomeStatement, "Income tax liability", Currency, false),
    ("net_income", "Net Income", IncomeStatement, "Bottom line profit", Currency, true),
    ("cash", "Cash & Cash Equivalents", BalanceSheet, "Liquid cash assets", Currency, true),
    ("accounts_receivable", "Accounts Receivable", BalanceSheet, "Money owed by customers", Currency, false),
    ("inventory", "Inventory", BalanceSheet, "Goods held for sale", Currency, false),
    ("current_assets", "Total Current Assets", BalanceSheet, "Assets convertible to cash within 1 year", Currency, true),
    ("ppe", "Property, Plant & Equipment", BalanceSheet, "Fixed assets", Currency, true),
    ("total_assets", "Total Assets", BalanceSheet, "Sum of all assets", Currency, true),
    ("accounts_payable", "Accounts Payable", BalanceSheet, "Money owed to suppliers", Currency, false),
    ("current_liabilities", "Total Current Liabilities", BalanceSheet, "Debts due within 1 year", Currency, true),
    ("long_term_debt", "Long-term Debt", BalanceSheet, "Debt due after 1 year", Currency, false),
    ("total_liabilities", "Total Liabilities", BalanceSheet, "Sum of all liabilities", Currency, true),
    ("shareholders_equity", "Shareholders' Equity", BalanceSheet, "Ownership value", Currency, true),
    ("operating_cash_flow", "Operating Cash Flow", CashFlow, "Cash from core business operations", Currency, true),
    ("investing_cash_flow", "Investing Cash Flow", CashFlow, "Cash from investments", Currency, false),
    ("financing_cash_flow", "Financing Cash Flow", CashFlow, "Cash from financing activities", Currency, false),
    ("free_cash_flow", "Free Cash Flow", CashFlow, "Cash available after investments", Currency, true),
    ("revenue_growth_rate", "Revenue Growth Rate", Assumptions, "Annual revenue growth percentage", Percentage, true),
    ("gross_margin", "Gross Margin %", Assumptions, "Gross profit as % of revenue", Percentage, true),
    ("tax_rate", "Tax Rate", Assumptions, "Corporate tax rate", Percentage, true),
    ("discount_rate", "Discount Rate", Assumptions, "Cost of capital for DCF", Percentage, false),
];
