// Entry point and high-level CLI flow.
//
// - `summary` prints the metrics, the weekly chart and the filtered table.
// - `drill` ranks the top materials for one week and type, optionally
//   exporting them as CSV.
// - `options` lists the weeks and the types observed in each.
// - Without a command, an interactive menu session is started.
mod chart;
mod dashboard;
mod error;
mod filter;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dashboard::{DrillChoice, Session};
use loader::{DatasetCache, LoadOptions, LoadReport};
use std::io::Write;
use std::path::PathBuf;

const DEFAULT_FILE: &str = "Weekly Expenditure.xlsx";

/// Weekly inventory expenditure report
#[derive(Debug, Parser)]
#[command(version, color = clap::ColorChoice::Never)]
struct Cli {
    /// Spreadsheet (.xlsx, .xls, .ods) or CSV file to read
    #[arg(short, long, global = true, default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// The sheet has no Quantity column
    #[arg(long, global = true)]
    no_quantity: bool,

    /// Chart width in characters
    #[arg(short, long, global = true, default_value_t = chart::DEFAULT_WIDTH)]
    width: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Summary(SummaryCmd),
    Drill(DrillCmd),
    /// List the weeks and the types seen in each
    Options,
}

/// Spend metrics, weekly chart and filtered table
#[derive(Debug, Args)]
struct SummaryCmd {
    /// Weeks to include (comma-separated, default all)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    weeks: Option<Vec<String>>,

    /// Types to include (comma-separated, default all)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    types: Option<Vec<String>>,

    /// Also write the summary as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Maximum rows of the filtered table to print
    #[arg(long, default_value_t = dashboard::DEFAULT_TABLE_ROWS)]
    rows: usize,
}

/// Top materials by spend for one week and type
#[derive(Debug, Args)]
struct DrillCmd {
    /// Week to drill into (default: first week)
    #[arg(long)]
    week: Option<String>,

    /// Type to drill into (default: first type seen in the week)
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<String>,

    /// Number of materials to rank
    #[arg(long, default_value_t = reports::TOP_N)]
    limit: usize,

    /// Write the ranking to Top_Items_<week>_<type>.csv
    #[arg(long)]
    export: bool,

    /// Directory for the exported CSV
    #[arg(long, default_value = ".", value_name = "DIR")]
    out_dir: PathBuf,
}

fn print_load_report<W: Write>(out: &mut W, report: &LoadReport) -> std::io::Result<()> {
    writeln!(
        out,
        "Processing dataset... ({} rows read, {} kept)",
        util::format_int(report.total_rows),
        util::format_int(report.kept_rows)
    )?;
    if report.dropped_rows > 0 {
        writeln!(
            out,
            "Note: {} rows skipped due to missing values.",
            util::format_int(report.dropped_rows)
        )?;
    }
    writeln!(out)
}

fn handle_summary<W: Write>(out: &mut W, session: &mut Session, cmd: SummaryCmd) -> anyhow::Result<()> {
    session.selection = filter::Selection::narrowed(session.dataset(), cmd.weeks, cmd.types);
    session.table_rows = cmd.rows;
    session.render_summary(out)?;
    if let Some(path) = cmd.json {
        output::write_json(&path, &session.summary_export())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        writeln!(out, "\nSummary saved to {}", path.display())?;
    }
    Ok(())
}

fn handle_drill<W: Write>(out: &mut W, session: &mut Session, cmd: DrillCmd) -> anyhow::Result<()> {
    let choice = DrillChoice::resolve(session.dataset(), cmd.week.as_deref(), cmd.kind.as_deref())?;
    session.limit = cmd.limit;
    session.render_drill_down(out, &choice)?;
    if cmd.export {
        let path = session.export_drill_down(&choice, &cmd.out_dir)?;
        writeln!(out, "\nDrill-down exported to {}", path.display())?;
    }
    Ok(())
}

fn handle_options<W: Write>(out: &mut W, session: &Session) -> anyhow::Result<()> {
    let ds = session.dataset();
    writeln!(out, "Types: {}", ds.types().join(", "))?;
    writeln!(out, "Weeks:")?;
    for week in ds.weeks() {
        writeln!(out, "  {}: {}", week, ds.types_for_week(&week).join(", "))?;
    }
    Ok(())
}

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = LoadOptions {
        quantity: !cli.no_quantity,
    };

    let mut cache = DatasetCache::new();
    let (dataset, report) = cache
        .get_or_load(&cli.file, options)
        .with_context(|| format!("failed to load '{}'", cli.file.display()))?;
    log::debug!("{} cached datasets, {} source reads", cache.len(), cache.reads());

    let mut stdout = std::io::stdout().lock();
    let mut session = Session::new(dataset, cli.file.display().to_string());
    session.width = cli.width;

    match cli.command {
        Some(Commands::Summary(cmd)) => handle_summary(&mut stdout, &mut session, cmd)?,
        Some(Commands::Drill(cmd)) => handle_drill(&mut stdout, &mut session, cmd)?,
        Some(Commands::Options) => handle_options(&mut stdout, &session)?,
        None => {
            print_load_report(&mut stdout, &report)?;
            let stdin = std::io::stdin().lock();
            dashboard::run_interactive(&mut session, stdin, &mut stdout, std::path::Path::new("."))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = try_main() {
        eprint!("error");
        e.chain().for_each(|cause| eprint!(": {}", cause));
        eprintln!();
        std::process::exit(1);
    }
}
