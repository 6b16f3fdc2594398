// Terminal presentation of the expenditure report.
//
// A `Session` owns its own filter and drill-down state and shares the loaded
// dataset read-only, so several sessions can sit on one cached table.
use crate::chart::{BarChart, DEFAULT_WIDTH};
use crate::error::DashboardError;
use crate::filter::{filter_rows, parse_list, Selection};
use crate::output::{drill_down_csv, export_file_name, render_table};
use crate::reports::{drill_down, metrics, weekly_summary, TOP_N};
use crate::types::{Dataset, SummaryExport};
use crate::util::{format_int, format_usd};
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TITLE: &str = "Weekly Inventory Expenditure Dashboard";
pub const DEFAULT_TABLE_ROWS: usize = 50;

/// One week/type pair chosen for the drill-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillChoice {
    pub week: String,
    pub kind: String,
}

impl DrillChoice {
    /// Validate a requested pair, filling in defaults: the first week in
    /// natural order, then the first type observed for that week.
    pub fn resolve(
        dataset: &Dataset,
        week: Option<&str>,
        kind: Option<&str>,
    ) -> Result<DrillChoice, DashboardError> {
        let weeks = dataset.weeks();
        let week = match week {
            Some(w) if weeks.iter().any(|x| x == w) => w.to_string(),
            Some(w) => return Err(DashboardError::UnknownWeek(w.to_string())),
            None => weeks.into_iter().next().ok_or(DashboardError::NoData)?,
        };
        let types = dataset.types_for_week(&week);
        let kind = match kind {
            Some(k) if types.iter().any(|x| x == k) => k.to_string(),
            Some(k) => {
                return Err(DashboardError::UnknownType {
                    week,
                    kind: k.to_string(),
                })
            }
            None => types.into_iter().next().ok_or(DashboardError::NoData)?,
        };
        Ok(DrillChoice { week, kind })
    }
}

pub struct Session {
    dataset: Arc<Dataset>,
    source: String,
    pub selection: Selection,
    pub drill: Option<DrillChoice>,
    pub width: usize,
    pub limit: usize,
    pub table_rows: usize,
}

impl Session {
    pub fn new(dataset: Arc<Dataset>, source: impl Into<String>) -> Session {
        let selection = Selection::all(&dataset);
        Session {
            dataset,
            source: source.into(),
            selection,
            drill: None,
            width: DEFAULT_WIDTH,
            limit: TOP_N,
            table_rows: DEFAULT_TABLE_ROWS,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn reset_filters(&mut self) {
        self.selection = Selection::all(&self.dataset);
    }

    /// Title, metrics, weekly chart and the filtered table.
    pub fn render_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        let rows = filter_rows(&self.dataset, &self.selection);
        debug!("{} of {} rows pass the filter", rows.len(), self.dataset.rows.len());
        let m = metrics(&rows);
        let summary = weekly_summary(&rows);

        writeln!(out, "{}", TITLE)?;
        writeln!(
            out,
            "Source: {} ({} rows)",
            self.source,
            format_int(self.dataset.rows.len())
        )?;
        writeln!(out, "Weeks: {}", join_or_none(&self.selection.weeks))?;
        writeln!(out, "Types: {}\n", join_or_none(&self.selection.types))?;

        writeln!(out, "Total Spend:   {}", format_usd(m.total))?;
        writeln!(out, "SAP Spend:     {}", format_usd(m.sap))?;
        writeln!(out, "Expense Spend: {}\n", format_usd(m.expense))?;

        writeln!(out, "{}", BarChart::weekly(&summary, self.width))?;

        writeln!(out, "Filtered Table ({} rows)", format_int(rows.len()))?;
        write!(out, "{}", render_table(&rows, self.table_rows))?;
        Ok(())
    }

    /// JSON-ready snapshot of what `render_summary` shows.
    pub fn summary_export(&self) -> SummaryExport {
        let rows = filter_rows(&self.dataset, &self.selection);
        SummaryExport {
            source: self.source.clone(),
            selected_weeks: self.selection.weeks.iter().cloned().collect(),
            selected_types: self.selection.types.iter().cloned().collect(),
            row_count: rows.len(),
            metrics: metrics(&rows),
            weekly_summary: weekly_summary(&rows),
        }
    }

    /// Top materials for one week and type, as a table and a chart.
    pub fn render_drill_down<W: Write>(&self, out: &mut W, choice: &DrillChoice) -> Result<()> {
        let ranking = drill_down(&self.dataset, &choice.week, &choice.kind, self.limit);
        writeln!(out, "Drill Down: {} ({})", choice.week, choice.kind)?;
        writeln!(
            out,
            "Top {} items for {} ({}):",
            self.limit, choice.week, choice.kind
        )?;
        write!(out, "{}", render_table(&ranking, self.limit))?;
        writeln!(out)?;
        let title = format!("Top {} Items in {} ({})", self.limit, choice.week, choice.kind);
        write!(out, "{}", BarChart::top_items(&title, &ranking, self.width))?;
        Ok(())
    }

    /// Write the drill-down ranking to `dir` and return the file path.
    pub fn export_drill_down(&self, choice: &DrillChoice, dir: &Path) -> Result<PathBuf> {
        let ranking = drill_down(&self.dataset, &choice.week, &choice.kind, self.limit);
        let payload = drill_down_csv(&ranking, self.dataset.has_quantity)
            .context("serializing drill-down CSV")?;
        let path = dir.join(export_file_name(&choice.week, &choice.kind));
        std::fs::write(&path, payload).with_context(|| format!("writing {}", path.display()))?;
        info!("exported {} drill-down rows to {}", ranking.len(), path.display());
        Ok(path)
    }

    fn current_drill(&self) -> Result<DrillChoice, DashboardError> {
        match &self.drill {
            Some(c) => Ok(c.clone()),
            None => DrillChoice::resolve(&self.dataset, None, None),
        }
    }
}

fn join_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let v: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if v.is_empty() {
        "(none)".to_string()
    } else {
        v.join(", ")
    }
}

/// Print `msg` and read one trimmed line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, msg: &str) -> Result<Option<String>> {
    write!(out, "{}", msg)?;
    out.flush()?;
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

// Blank keeps everything, "none" selects nothing, otherwise a comma list.
fn read_axis<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
    options: &[String],
) -> Result<Option<Option<Vec<String>>>> {
    writeln!(out, "Available {}: {}", label, options.join(", "))?;
    let Some(line) = prompt(input, out, &format!("{} (comma-separated, blank for all, 'none' for none): ", label))? else {
        return Ok(None);
    };
    Ok(Some(match line.as_str() {
        "" => None,
        "none" => Some(Vec::new()),
        other => Some(parse_list(other)),
    }))
}

fn print_menu<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Select an action:")?;
    writeln!(out, "[1] Show summary")?;
    writeln!(out, "[2] Filter weeks")?;
    writeln!(out, "[3] Filter types")?;
    writeln!(out, "[4] Drill down")?;
    writeln!(out, "[5] Export drill-down CSV")?;
    writeln!(out, "[6] Reset filters")?;
    writeln!(out, "[0] Exit\n")?;
    Ok(())
}

/// Menu-driven session over `input`/`out`. Every choice recomputes its view
/// from the shared dataset; end of input behaves like `[0]`.
pub fn run_interactive<R: BufRead, W: Write>(
    session: &mut Session,
    mut input: R,
    mut out: W,
    export_dir: &Path,
) -> Result<()> {
    loop {
        print_menu(&mut out)?;
        let Some(choice) = prompt(&mut input, &mut out, "Enter choice: ")? else {
            break;
        };
        writeln!(out)?;
        match choice.as_str() {
            "1" => session.render_summary(&mut out)?,
            "2" => {
                let weeks = session.dataset.weeks();
                let Some(sel) = read_axis(&mut input, &mut out, "weeks", &weeks)? else {
                    break;
                };
                session.selection.weeks = sel.unwrap_or(weeks).into_iter().collect();
            }
            "3" => {
                let types = session.dataset.types();
                let Some(sel) = read_axis(&mut input, &mut out, "types", &types)? else {
                    break;
                };
                session.selection.types = sel.unwrap_or(types).into_iter().collect();
            }
            "4" => {
                let weeks = session.dataset.weeks();
                writeln!(out, "Available weeks: {}", weeks.join(", "))?;
                let default_week = weeks.first().cloned().unwrap_or_default();
                let Some(week) = prompt(&mut input, &mut out, &format!("Select week [{}]: ", default_week))? else {
                    break;
                };
                let week = if week.is_empty() { default_week } else { week };

                let types = session.dataset.types_for_week(&week);
                writeln!(out, "Available types: {}", types.join(", "))?;
                let default_type = types.first().cloned().unwrap_or_default();
                let Some(kind) = prompt(&mut input, &mut out, &format!("Select type [{}]: ", default_type))? else {
                    break;
                };
                let kind = if kind.is_empty() { default_type } else { kind };

                match DrillChoice::resolve(&session.dataset, Some(&week), Some(&kind)) {
                    Ok(c) => {
                        writeln!(out)?;
                        session.render_drill_down(&mut out, &c)?;
                        session.drill = Some(c);
                    }
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            "5" => match session.current_drill() {
                Ok(c) => {
                    let path = session.export_drill_down(&c, export_dir)?;
                    writeln!(out, "Drill-down exported to {}", path.display())?;
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            "6" => {
                session.reset_filters();
                writeln!(out, "Filters reset.")?;
            }
            "0" => break,
            _ => writeln!(out, "Invalid choice. Please enter a number from the menu.")?,
        }
        writeln!(out)?;
    }
    writeln!(out, "Exiting the program.")?;
    Ok(())
}
