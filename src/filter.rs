use crate::types::{Dataset, ExpenditureRow};
use std::collections::BTreeSet;

/// Which weeks and types are currently selected.
///
/// An empty set on either axis means "nothing selected" and hides every row;
/// it is never read as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub weeks: BTreeSet<String>,
    pub types: BTreeSet<String>,
}

impl Selection {
    /// Every observed week and type selected (i.e., show everything).
    pub fn all(dataset: &Dataset) -> Self {
        Selection {
            weeks: dataset.weeks().into_iter().collect(),
            types: dataset.types().into_iter().collect(),
        }
    }

    /// Start from everything and narrow the axes that were given.
    pub fn narrowed(dataset: &Dataset, weeks: Option<Vec<String>>, types: Option<Vec<String>>) -> Self {
        let mut sel = Selection::all(dataset);
        if let Some(weeks) = weeks {
            sel.weeks = weeks.into_iter().collect();
        }
        if let Some(types) = types {
            sel.types = types.into_iter().collect();
        }
        sel
    }

    pub fn matches(&self, row: &ExpenditureRow) -> bool {
        self.weeks.contains(&row.work_week) && self.types.contains(&row.kind)
    }
}

/// Rows passing both the week and the type selection, in table order.
pub fn filter_rows<'a>(dataset: &'a Dataset, selection: &Selection) -> Vec<&'a ExpenditureRow> {
    dataset.rows.iter().filter(|r| selection.matches(r)).collect()
}

/// Split a comma-separated list from the command line or the menu prompt.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
