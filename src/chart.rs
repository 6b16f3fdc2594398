use crate::types::{DrillDownRow, WeeklySummaryRow};
use crate::util::format_usd;

pub const DEFAULT_WIDTH: usize = 80;
pub const MIN_WIDTH: usize = 40;
const MAX_LABEL_CHARS: usize = 30;
const BAR: char = '#';

struct Bar {
    label: String,
    value: f64,
}

struct Group {
    title: String,
    bars: Vec<Bar>,
}

/// Horizontal text bar chart. Bars may be grouped (one block per week, one
/// bar per type) or flat (a single untitled group).
pub struct BarChart {
    title: String,
    groups: Vec<Group>,
    group_charlen: usize,
    label_charlen: usize,
    max_val: f64,
    max_barlen: usize,
}

impl BarChart {
    /// Grouped chart of the weekly summary. `rows` must already be in display
    /// order (weeks in natural order).
    pub fn weekly(rows: &[WeeklySummaryRow], width: usize) -> BarChart {
        let mut groups: Vec<Group> = Vec::new();
        for r in rows {
            let bar = Bar {
                label: r.kind.clone(),
                value: r.total_cost,
            };
            match groups.last_mut() {
                Some(g) if g.title == r.work_week => g.bars.push(bar),
                _ => groups.push(Group {
                    title: r.work_week.clone(),
                    bars: vec![bar],
                }),
            }
        }
        BarChart::new("Weekly Spend Summary by Type", groups, width)
    }

    /// Flat chart of a drill-down ranking.
    pub fn top_items(title: &str, rows: &[DrillDownRow], width: usize) -> BarChart {
        let bars = rows
            .iter()
            .map(|r| Bar {
                label: truncate_label(&r.material),
                value: r.total_cost,
            })
            .collect::<Vec<_>>();
        let groups = if bars.is_empty() {
            Vec::new()
        } else {
            vec![Group {
                title: String::new(),
                bars,
            }]
        };
        BarChart::new(title, groups, width)
    }

    fn new(title: &str, groups: Vec<Group>, width: usize) -> BarChart {
        let bars = || groups.iter().flat_map(|g| g.bars.iter());
        let group_charlen = groups.iter().map(|g| g.title.chars().count()).max().unwrap_or(0);
        let label_charlen = bars().map(|b| b.label.chars().count()).max().unwrap_or(0);
        let value_charlen = bars().map(|b| format_usd(b.value).len()).max().unwrap_or(0);
        let max_val = bars().map(|b| b.value).fold(0.0, f64::max);
        let gutter = if group_charlen > 0 { group_charlen + 1 } else { 0 };
        let max_barlen = width
            .max(MIN_WIDTH)
            .saturating_sub(gutter + label_charlen + value_charlen)
            .saturating_sub(3) // " |" before the bar and the space after it
            .max(1);

        BarChart {
            title: title.to_string(),
            groups,
            group_charlen,
            label_charlen,
            max_val,
            max_barlen,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn barlen(&self, val: f64) -> usize {
        if self.max_val <= 0.0 || val <= 0.0 {
            return 0;
        }
        let x = val / self.max_val * self.max_barlen as f64;
        self.max_barlen.min(x.round() as usize)
    }

    fn draw(&self, w: &mut impl std::fmt::Write, group: &Group) -> std::fmt::Result {
        for (i, bar) in group.bars.iter().enumerate() {
            if self.group_charlen > 0 {
                let title = if i == 0 { group.title.as_str() } else { "" };
                write!(w, "{:<width$} ", title, width = self.group_charlen)?;
            }
            let bars = BAR.to_string().repeat(self.barlen(bar.value));
            writeln!(
                w,
                "{:<lw$} |{} {}",
                bar.label,
                bars,
                format_usd(bar.value),
                lw = self.label_charlen,
            )?;
        }
        Ok(())
    }
}

fn truncate_label(s: &str) -> String {
    if s.chars().count() <= MAX_LABEL_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_LABEL_CHARS - 3).collect();
    out.push_str("...");
    out
}

impl std::fmt::Display for BarChart {
    /// Writes a terminating newline.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        if self.is_empty() {
            return writeln!(f, "(no data)");
        }
        for group in &self.groups {
            self.draw(f, group)?;
        }
        Ok(())
    }
}
