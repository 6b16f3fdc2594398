use crate::error::LoadError;
use crate::types::{
    Dataset, ExpenditureRow, COL_COST, COL_MATERIAL, COL_QUANTITY, COL_TYPE, COL_WORK_WEEK,
};
use crate::util::{parse_cost, parse_quantity};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which sheet layout to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Require a free-text Quantity column and parse a count out of it.
    pub quantity: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { quantity: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
    pub unparsed_quantities: usize,
}

static NULL_CELL: Cell = Cell::Null;

// A raw cell before it is bound to a column.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Text(String),
    Number(f64),
}

impl Cell {
    // Whitespace-only text is a value; only empty text is null.
    fn text(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Null
        } else {
            Cell::Text(s.to_string())
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    // Label form used for WorkWeek, Type and Material Description.
    fn label(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Cell::Number(f) => f.to_string(),
        }
    }
}

// Column positions resolved against the (trimmed) header row.
struct Columns {
    work_week: usize,
    kind: usize,
    material: usize,
    quantity: Option<usize>,
    cost: usize,
}

impl Columns {
    fn resolve(headers: &[String], options: LoadOptions) -> Result<Columns, LoadError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(LoadError::MissingColumn(name))
        };
        Ok(Columns {
            work_week: find(COL_WORK_WEEK)?,
            kind: find(COL_TYPE)?,
            material: find(COL_MATERIAL)?,
            quantity: if options.quantity { Some(find(COL_QUANTITY)?) } else { None },
            cost: find(COL_COST)?,
        })
    }

    fn required(&self) -> impl Iterator<Item = usize> + '_ {
        [self.work_week, self.kind, self.material, self.cost]
            .into_iter()
            .chain(self.quantity)
    }
}

/// Load the expenditure sheet at `path`.
///
/// The format is picked by extension: spreadsheets go through `calamine`
/// (first worksheet only), `.csv` through the `csv` crate. Rows with an empty
/// cell in any required column are dropped and counted in the report.
pub fn load_dataset(path: &Path, options: LoadOptions) -> Result<(Dataset, LoadReport), LoadError> {
    std::fs::metadata(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let (headers, records) = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path)?,
        "csv" => read_csv(path)?,
        other => return Err(LoadError::UnsupportedFormat(format!(".{}", other))),
    };

    let (dataset, report) = build_dataset(&headers, records, options)?;
    info!(
        "loaded {} rows from {} ({} dropped for missing values)",
        report.kept_rows,
        path.display(),
        report.dropped_rows
    );
    if report.unparsed_quantities > 0 {
        debug!("{} quantities had no digits and were set to 0", report.unparsed_quantities);
    }
    Ok((dataset, report))
}

fn read_spreadsheet(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>), LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::NoSheets)??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(LoadError::EmptySheet)?
        .iter()
        .map(|c| cell_from_data(c).label())
        .collect();
    let records = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok((headers, records))
}

fn cell_from_data(d: &Data) -> Cell {
    match d {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Cell::Text(format_datetime(ndt)),
            None => Cell::Number(dt.as_f64()),
        },
    }
}

fn format_datetime(ndt: NaiveDateTime) -> String {
    if ndt.num_seconds_from_midnight() == 0 {
        ndt.format("%Y-%m-%d").to_string()
    } else {
        ndt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(record.iter().map(Cell::text).collect());
    }
    Ok((headers, records))
}

fn build_dataset(
    headers: &[String],
    records: Vec<Vec<Cell>>,
    options: LoadOptions,
) -> Result<(Dataset, LoadReport), LoadError> {
    let cols = Columns::resolve(headers, options)?;
    let mut report = LoadReport {
        total_rows: records.len(),
        ..LoadReport::default()
    };
    let mut rows = Vec::with_capacity(records.len());

    for (idx, record) in records.into_iter().enumerate() {
        let cell = |i: usize| record.get(i).unwrap_or(&NULL_CELL);
        if cols.required().any(|i| cell(i).is_null()) {
            report.dropped_rows += 1;
            continue;
        }

        // Header is spreadsheet row 1, so data rows start at 2.
        let sheet_row = idx + 2;
        let cost = match cell(cols.cost) {
            Cell::Number(f) => *f,
            other => {
                let text = other.label();
                parse_cost(&text).ok_or(LoadError::InvalidCost {
                    row: sheet_row,
                    value: text,
                })?
            }
        };

        let quantity = cols.quantity.map(|i| {
            let parsed = parse_quantity(&cell(i).label());
            if parsed.is_none() {
                report.unparsed_quantities += 1;
            }
            parsed.unwrap_or(0)
        });

        rows.push(ExpenditureRow {
            work_week: cell(cols.work_week).label(),
            kind: cell(cols.kind).label(),
            material: cell(cols.material).label(),
            quantity,
            cost,
        });
    }

    report.kept_rows = rows.len();
    Ok((Dataset::new(rows, options.quantity), report))
}

/// Memoizes loaded datasets per source path for the life of the process.
///
/// Entries are never invalidated. The returned `Arc<Dataset>` can be handed
/// to any number of sessions since nothing mutates it after the load.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<(PathBuf, LoadOptions), (Arc<Dataset>, LoadReport)>,
    reads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &mut self,
        path: &Path,
        options: LoadOptions,
    ) -> Result<(Arc<Dataset>, LoadReport), LoadError> {
        let key = (
            std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            options,
        );
        if let Some((dataset, report)) = self.entries.get(&key) {
            debug!("cache hit for {}", key.0.display());
            return Ok((Arc::clone(dataset), report.clone()));
        }

        debug!("cache miss for {}", key.0.display());
        let (dataset, report) = load_dataset(path, options)?;
        self.reads += 1;
        let dataset = Arc::new(dataset);
        self.entries.insert(key, (Arc::clone(&dataset), report.clone()));
        Ok((dataset, report))
    }

    /// Number of times a source was actually read.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rstest::{fixture, rstest};
    use rust_xlsxwriter::Workbook;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = indoc! {"
        WorkWeek , Type,Material Description,Quantity ,Cost (USD),Requester
        WW01,SAP,Widget A,4pcs,100,ann
        WW01,Expense,Widget B,12 units,50,bob
        WW02,SAP,Widget A,none,75,
        WW02,,Widget C,1,20,cat
        WW03,SAP,Widget D,,30,dan
        WW03,Expense,,2,5,eve
    "};

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).expect("create");
        f.write_all(contents.as_bytes()).expect("write");
        path
    }

    #[rstest]
    fn csv_drops_nulls_and_parses_quantity(dir: TempDir) {
        let path = write_file(&dir, "weekly.csv", SAMPLE);
        let (ds, report) = load_dataset(&path, LoadOptions::default()).unwrap();

        assert_eq!(
            report,
            LoadReport {
                total_rows: 6,
                kept_rows: 3,
                dropped_rows: 3,
                unparsed_quantities: 1,
            }
        );
        assert!(ds.has_quantity);
        let quantities: Vec<_> = ds.rows.iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, vec![Some(4), Some(12), Some(0)]);
        assert_eq!(ds.rows[0].work_week, "WW01");
        assert_eq!(ds.rows[0].material, "Widget A");
        assert_eq!(ds.rows[2].cost, 75.0);
    }

    #[rstest]
    fn without_quantity_column_keeps_more_rows(dir: TempDir) {
        let path = write_file(&dir, "weekly.csv", SAMPLE);
        let (ds, report) = load_dataset(&path, LoadOptions { quantity: false }).unwrap();

        // The WW03/SAP row only lacked a quantity.
        assert_eq!(report.kept_rows, 4);
        assert!(!ds.has_quantity);
        assert!(ds.rows.iter().all(|r| r.quantity.is_none()));
    }

    #[rstest]
    fn whitespace_text_is_kept(dir: TempDir) {
        let path = write_file(
            &dir,
            "weekly.csv",
            "WorkWeek,Type,Material Description,Cost (USD)\nWW01,SAP,A,100\nWW01,SAP,\"   \",50\n",
        );
        let (ds, report) = load_dataset(&path, LoadOptions { quantity: false }).unwrap();

        assert_eq!(report.kept_rows, 2);
        assert_eq!(report.dropped_rows, 0);
        assert_eq!(ds.rows[1].material, "   ");
        assert_eq!(ds.rows.iter().map(|r| r.cost).sum::<f64>(), 150.0);
    }

    #[rstest]
    fn missing_column_is_fatal(dir: TempDir) {
        let path = write_file(&dir, "weekly.csv", "WorkWeek,Type,Quantity,Cost (USD)\nWW01,SAP,1,2\n");
        let err = load_dataset(&path, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Material Description")));
    }

    #[rstest]
    fn quantity_column_only_required_for_quantity_layout(dir: TempDir) {
        let path = write_file(
            &dir,
            "weekly.csv",
            "WorkWeek,Type,Material Description,Cost (USD)\nWW01,SAP,Bolt,2\n",
        );
        let err = load_dataset(&path, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Quantity")));
        let (ds, _) = load_dataset(&path, LoadOptions { quantity: false }).unwrap();
        assert_eq!(ds.rows.len(), 1);
    }

    #[rstest]
    fn bad_cost_reports_sheet_row(dir: TempDir) {
        let path = write_file(
            &dir,
            "weekly.csv",
            "WorkWeek,Type,Material Description,Cost (USD)\nWW01,SAP,Bolt,\"$1,200.50\"\nWW01,SAP,Nut,lots\n",
        );
        let err = load_dataset(&path, LoadOptions { quantity: false }).unwrap_err();
        match err {
            LoadError::InvalidCost { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn missing_file_is_io_error(dir: TempDir) {
        let err = load_dataset(&dir.path().join("nope.xlsx"), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[rstest]
    fn unknown_extension_is_rejected(dir: TempDir) {
        let path = write_file(&dir, "weekly.txt", SAMPLE);
        let err = load_dataset(&path, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == ".txt"));
    }

    #[rstest]
    fn xlsx_cells_are_normalised(dir: TempDir) {
        let path = dir.path().join("Weekly Expenditure.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in [" WorkWeek", "Type", "Material Description", "Quantity", " Cost (USD) "]
            .into_iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, name).unwrap();
        }
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_string(1, 1, "SAP").unwrap();
        sheet.write_string(1, 2, "Gasket").unwrap();
        sheet.write_number(1, 3, 6.0).unwrap();
        sheet.write_number(1, 4, 12.5).unwrap();
        sheet.write_string(2, 0, "WW02").unwrap();
        sheet.write_string(2, 1, "Expense").unwrap();
        sheet.write_string(2, 2, "Tape").unwrap();
        sheet.write_string(2, 3, "3 rolls").unwrap();
        workbook.save(&path).unwrap();

        let (ds, report) = load_dataset(&path, LoadOptions::default()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(
            ds.rows,
            vec![ExpenditureRow {
                work_week: "1".to_string(),
                kind: "SAP".to_string(),
                material: "Gasket".to_string(),
                quantity: Some(6),
                cost: 12.5,
            }]
        );
    }

    #[rstest]
    fn cache_reads_each_path_once(dir: TempDir) {
        let path = write_file(&dir, "weekly.csv", SAMPLE);
        let mut cache = DatasetCache::new();

        let (first, _) = cache.get_or_load(&path, LoadOptions::default()).unwrap();
        // Rewriting the file must not be observed: the cached table is returned.
        write_file(&dir, "weekly.csv", "garbage");
        let (second, report) = cache.get_or_load(&path, LoadOptions::default()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(report.kept_rows, 3);
        assert_eq!(cache.reads(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[rstest]
    fn cache_keys_on_options(dir: TempDir) {
        let path = write_file(&dir, "weekly.csv", SAMPLE);
        let mut cache = DatasetCache::new();
        cache.get_or_load(&path, LoadOptions::default()).unwrap();
        cache.get_or_load(&path, LoadOptions { quantity: false }).unwrap();
        assert_eq!(cache.reads(), 2);
    }

    #[rstest]
    fn failed_load_is_not_cached(dir: TempDir) {
        let mut cache = DatasetCache::new();
        let path = dir.path().join("later.csv");
        assert!(cache.get_or_load(&path, LoadOptions::default()).is_err());
        write_file(&dir, "later.csv", SAMPLE);
        assert!(cache.get_or_load(&path, LoadOptions::default()).is_ok());
        assert_eq!(cache.len(), 1);
    }
}
