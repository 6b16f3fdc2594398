use crate::types::{
    Dataset, DrillDownRow, ExpenditureRow, Metrics, WeeklySummaryRow, TYPE_EXPENSE, TYPE_SAP,
};
use crate::util::natural_cmp;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// How many materials the drill-down ranks by default.
pub const TOP_N: usize = 10;

/// Total, SAP and Expense spend over `rows`. Other types only count toward
/// the total.
pub fn metrics(rows: &[&ExpenditureRow]) -> Metrics {
    let mut m = Metrics::default();
    for r in rows {
        m.total += r.cost;
        match r.kind.as_str() {
            TYPE_SAP => m.sap += r.cost,
            TYPE_EXPENSE => m.expense += r.cost,
            _ => {}
        }
    }
    m
}

/// Cost summed per (week, type) pair, weeks in natural order then types.
pub fn weekly_summary(rows: &[&ExpenditureRow]) -> Vec<WeeklySummaryRow> {
    let mut map: HashMap<(&str, &str), f64> = HashMap::new();
    for r in rows {
        *map.entry((r.work_week.as_str(), r.kind.as_str())).or_insert(0.0) += r.cost;
    }
    let mut out: Vec<WeeklySummaryRow> = map
        .into_iter()
        .map(|((week, kind), total_cost)| WeeklySummaryRow {
            work_week: week.to_string(),
            kind: kind.to_string(),
            total_cost,
        })
        .collect();
    out.sort_by(|a, b| {
        natural_cmp(&a.work_week, &b.work_week).then_with(|| a.kind.cmp(&b.kind))
    });
    out
}

/// Rank materials by spend for one week and type of the full table.
///
/// Groups are enumerated in material order before the stable sort, so ties
/// on cost keep alphabetical order. Returns at most `limit` rows and nothing
/// at all when the pair has no rows.
pub fn drill_down(dataset: &Dataset, week: &str, kind: &str, limit: usize) -> Vec<DrillDownRow> {
    #[derive(Default)]
    struct Acc {
        cost: f64,
        quantity: u64,
    }
    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    for r in dataset
        .rows
        .iter()
        .filter(|r| r.work_week == week && r.kind == kind)
    {
        let e = map.entry(r.material.as_str()).or_default();
        e.cost += r.cost;
        e.quantity = e.quantity.saturating_add(r.quantity.unwrap_or(0));
    }

    let mut rows: Vec<DrillDownRow> = map
        .into_iter()
        .map(|(material, acc)| DrillDownRow {
            material: material.to_string(),
            total_cost: acc.cost,
            total_quantity: dataset.has_quantity.then_some(acc.quantity),
        })
        .collect();
    rows.sort_by(|a, b| b.total_cost.partial_cmp(&a.total_cost).unwrap_or(Ordering::Equal));
    rows.truncate(limit);
    rows
}
