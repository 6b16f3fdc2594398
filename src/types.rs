use crate::util::{format_usd, natural_cmp};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use tabled::Tabled;

pub const COL_WORK_WEEK: &str = "WorkWeek";
pub const COL_TYPE: &str = "Type";
pub const COL_MATERIAL: &str = "Material Description";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_COST: &str = "Cost (USD)";

pub const TYPE_SAP: &str = "SAP";
pub const TYPE_EXPENSE: &str = "Expense";

/// One spreadsheet row after null-dropping and normalisation.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct ExpenditureRow {
    #[tabled(rename = "WorkWeek")]
    pub work_week: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Material Description")]
    pub material: String,
    /// `None` when the sheet was loaded without a Quantity column.
    #[tabled(rename = "Quantity", display_with = "display_quantity")]
    pub quantity: Option<u64>,
    #[tabled(rename = "Cost (USD)", display_with = "display_cost")]
    pub cost: f64,
}

/// The loaded table. Read-only once built; shared between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<ExpenditureRow>,
    pub has_quantity: bool,
}

impl Dataset {
    pub fn new(rows: Vec<ExpenditureRow>, has_quantity: bool) -> Self {
        Dataset { rows, has_quantity }
    }

    /// Distinct week labels in natural order.
    pub fn weeks(&self) -> Vec<String> {
        let mut weeks: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.work_week.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        weeks.sort_by(|a, b| natural_cmp(a, b));
        weeks
    }

    /// Distinct expense types, sorted.
    pub fn types(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.kind.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Types observed for one week, in order of first appearance.
    pub fn types_for_week(&self, week: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for r in self.rows.iter().filter(|r| r.work_week == week) {
            if !seen.contains(&r.kind) {
                seen.push(r.kind.clone());
            }
        }
        seen
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total: f64,
    pub sap: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct WeeklySummaryRow {
    #[serde(rename = "WorkWeek")]
    #[tabled(rename = "WorkWeek")]
    pub work_week: String,
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Cost (USD)", serialize_with = "serialize_cost")]
    #[tabled(rename = "Cost (USD)", display_with = "display_cost")]
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DrillDownRow {
    #[serde(rename = "Material Description")]
    #[tabled(rename = "Material Description")]
    pub material: String,
    #[serde(rename = "Cost (USD)", serialize_with = "serialize_cost")]
    #[tabled(rename = "Cost (USD)", display_with = "display_cost")]
    pub total_cost: f64,
    #[serde(rename = "Quantity", skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Quantity", display_with = "display_quantity")]
    pub total_quantity: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryExport {
    pub source: String,
    pub selected_weeks: Vec<String>,
    pub selected_types: Vec<String>,
    pub row_count: usize,
    pub metrics: Metrics,
    pub weekly_summary: Vec<WeeklySummaryRow>,
}

fn display_cost(v: &f64) -> String {
    format_usd(*v)
}

fn display_quantity(q: &Option<u64>) -> String {
    q.map(|q| q.to_string()).unwrap_or_default()
}

// Exported sums keep cent precision without float noise like 0.30000000000000004.
fn serialize_cost<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((v * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(week: &str, kind: &str) -> ExpenditureRow {
        ExpenditureRow {
            work_week: week.to_string(),
            kind: kind.to_string(),
            material: "Widget".to_string(),
            quantity: None,
            cost: 1.0,
        }
    }

    #[test]
    fn weeks_use_natural_order() {
        let ds = Dataset::new(
            vec![row("WW10", "SAP"), row("WW2", "SAP"), row("WW1", "Expense"), row("WW2", "SAP")],
            false,
        );
        assert_eq!(ds.weeks(), vec!["WW1", "WW2", "WW10"]);
        assert_eq!(ds.types(), vec!["Expense", "SAP"]);
    }

    #[test]
    fn types_for_week_keep_first_appearance() {
        let ds = Dataset::new(
            vec![row("WW1", "SAP"), row("WW2", "Other"), row("WW1", "Expense"), row("WW1", "SAP")],
            false,
        );
        assert_eq!(ds.types_for_week("WW1"), vec!["SAP", "Expense"]);
        assert!(ds.types_for_week("WW9").is_empty());
    }
}
