use crate::types::DrillDownRow;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Serialize `rows` as CSV with a header row and no index column.
pub fn write_csv<W, T>(writer: W, rows: &[T]) -> Result<(), csv::Error>
where
    W: std::io::Write,
    T: Serialize,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The drill-down export payload. An empty ranking still yields the header.
pub fn drill_down_csv(rows: &[DrillDownRow], with_quantity: bool) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    if rows.is_empty() {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        let mut header = vec!["Material Description", "Cost (USD)"];
        if with_quantity {
            header.push("Quantity");
        }
        wtr.write_record(&header)?;
        wtr.flush()?;
    } else {
        write_csv(&mut buf, rows)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `Top_Items_<week>_<type>.csv`, with path separators replaced.
pub fn export_file_name(week: &str, kind: &str) -> String {
    let clean = |s: &str| s.replace(['/', '\\'], "_");
    format!("Top_Items_{}_{}.csv", clean(week), clean(kind))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)
}

/// Markdown-styled table of the first `max_rows` rows.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled,
{
    if rows.is_empty() {
        return "(no rows)\n".to_string();
    }
    let shown = rows.iter().take(max_rows);
    let mut s = Table::new(shown).with(Style::markdown()).to_string();
    s.push('\n');
    if rows.len() > max_rows {
        s.push_str(&format!("({} more rows not shown)\n", rows.len() - max_rows));
    }
    s
}
