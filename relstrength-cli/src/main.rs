//! relstrength CLI: evaluate, prepare and summary commands.
//!
//! Commands:
//! - `evaluate`: load the factor/equity pair, classify relative strength, print a report
//! - `prepare`: build `factors.csv` and `hk20.csv` from a sources file
//! - `summary`: rows, columns and date range of one or more tables

mod report;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relstrength_core::{ChartFrame, PresentationAdapter, StrengthConfig, Toggle, ViewOptions};
use relstrength_runner::{
    export_json, read_sources, write_outputs, DefaultFetcher, FallbackLoader, LoadedTable,
    PrepareJob, RetryPolicy, SnapshotCache, SourcePair, TableSource,
};
use tracing_subscriber::EnvFilter;

use crate::report::TextAdapter;

#[derive(Parser)]
#[command(
    name = "relstrength",
    about = "Relative strength of equities against a fused macro benchmark"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every tracked equity at the latest date.
    Evaluate {
        /// Factor table: URL or path.
        #[arg(long)]
        factors: String,

        /// Fallback factor table, tried when the primary fails.
        #[arg(long)]
        factors_fallback: Option<String>,

        /// Equity table: URL or path.
        #[arg(long)]
        equities: String,

        /// Fallback equity table, tried when the primary fails.
        #[arg(long)]
        equities_fallback: Option<String>,

        /// TOML config file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Momentum regression window.
        #[arg(long)]
        window: Option<usize>,

        /// Benchmark column in the factor table (e.g. Fused_equal).
        #[arg(long)]
        benchmark: Option<String>,

        /// Hide the factor series in the report.
        #[arg(long, default_value_t = false)]
        hide_factors: bool,

        /// Only list equities labelled strong.
        #[arg(long, default_value_t = false)]
        strong_only: bool,

        /// Write evaluation.json and strength.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full evaluation as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Build the factor and equity tables from a sources file.
    Prepare {
        /// Lines of `CODE,location`; `FACTORS` marks the factor source.
        #[arg(long, default_value = "scripts/sources.txt")]
        sources: PathBuf,

        /// Output directory for factors.csv and hk20.csv.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Print rows, columns and date range of each table.
    Summary {
        /// Tables to inspect: URLs or paths.
        #[arg(required = true)]
        sources: Vec<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            factors,
            factors_fallback,
            equities,
            equities_fallback,
            config,
            window,
            benchmark,
            hide_factors,
            strong_only,
            output_dir,
            json,
        } => {
            let factors = source_pair(&factors, factors_fallback.as_deref());
            let equities = source_pair(&equities, equities_fallback.as_deref());
            let config = build_config(config.as_deref(), window, benchmark)?;
            let view = EvaluateView {
                hide_factors,
                strong_only,
                json,
            };
            run_evaluate(&factors, &equities, &config, view, output_dir.as_deref())
        }
        Commands::Prepare { sources, out_dir } => run_prepare(&sources, &out_dir),
        Commands::Summary { sources } => run_summary(&sources),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn loader(date_column: &str) -> Result<FallbackLoader<DefaultFetcher>> {
    let fetcher = DefaultFetcher::new(RetryPolicy::default()).context("failed to build fetcher")?;
    Ok(FallbackLoader::new(fetcher, date_column))
}

fn source_pair(primary: &str, fallback: Option<&str>) -> SourcePair {
    let pair = SourcePair::new(primary);
    match fallback {
        Some(f) => pair.with_fallback(f),
        None => pair,
    }
}

fn build_config(
    path: Option<&Path>,
    window: Option<usize>,
    benchmark: Option<String>,
) -> Result<StrengthConfig> {
    let mut config = match path {
        Some(p) => StrengthConfig::from_file(p)?,
        None => StrengthConfig::default(),
    };
    if let Some(w) = window {
        config.window = w;
    }
    if let Some(b) = benchmark {
        config.benchmark_column = b;
    }
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Clone, Copy)]
struct EvaluateView {
    hide_factors: bool,
    strong_only: bool,
    json: bool,
}

fn run_evaluate(
    factors: &SourcePair,
    equities: &SourcePair,
    config: &StrengthConfig,
    view: EvaluateView,
    output_dir: Option<&Path>,
) -> Result<()> {
    let loader = loader(&config.date_column)?;
    let cache = SnapshotCache::new();
    let refresh = cache
        .refresh(&loader, factors, equities)
        .context("failed to load input tables")?;
    let snapshot = refresh.snapshot;
    warn_on_parse_issues(&snapshot.factors);
    warn_on_parse_issues(&snapshot.equities);

    let evaluation = snapshot.evaluate(config)?;
    tracing::info!(
        tracked = evaluation.equities.len(),
        strong = evaluation.strong.len(),
        fingerprint = %evaluation.fingerprint,
        "evaluated"
    );

    if view.json {
        println!("{}", export_json(&evaluation)?);
    } else {
        let options = Arc::new(Mutex::new(ViewOptions::default()));
        let mut adapter = TextAdapter::new(std::io::stdout().lock());
        let shared = Arc::clone(&options);
        adapter.on_toggle(Box::new(move |t| {
            if let Ok(mut o) = shared.lock() {
                o.apply(t);
            }
        }));

        // Command-line switches go through the same toggle path as interactive ones.
        if view.hide_factors {
            adapter.toggle(Toggle::Factors);
        }
        if view.strong_only {
            adapter.toggle(Toggle::StrongOnly);
        }

        let current = options
            .lock()
            .map(|o| *o)
            .unwrap_or_default();
        adapter
            .render(&ChartFrame::build(&evaluation, &current), &current)
            .context("failed to write report")?;
    }

    if let Some(dir) = output_dir {
        let written = write_outputs(&evaluation, dir)?;
        for path in written {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn warn_on_parse_issues(loaded: &LoadedTable) {
    let r = &loaded.report;
    if r.date_column_fallback {
        tracing::warn!(
            table = %loaded.location,
            column = %r.date_column,
            "date column not found, using the first column"
        );
    }
    if r.duplicate_dates > 0 || r.non_numeric_cells > 0 {
        tracing::warn!(
            table = %loaded.location,
            duplicate_dates = r.duplicate_dates,
            non_numeric_cells = r.non_numeric_cells,
            "table had cells that were skipped"
        );
    }
}

fn run_prepare(sources: &Path, out_dir: &Path) -> Result<()> {
    let entries = read_sources(sources)?;
    let loader = loader("Date")?;
    let summary = PrepareJob::new(&loader, out_dir).run(&entries)?;

    println!();
    println!("=== Prepared ===");
    match &summary.equities {
        Some(s) => println!("Equities: {s}"),
        None => println!("Equities: no sources"),
    }
    match &summary.factors {
        Some(s) => println!("Factors:  {s}"),
        None => println!("Factors:  no FACTORS source"),
    }
    for path in &summary.written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_summary(sources: &[String]) -> Result<()> {
    let loader = loader("Date")?;
    for src in sources {
        let source = TableSource::from(src.as_str());
        let (table, report) = loader
            .load_source(src, &source)
            .with_context(|| format!("failed to load {src}"))?;
        println!("{}", table.summary());
        if !report.dropped_rows.is_empty() {
            println!("  dropped rows (bad date): {:?}", report.dropped_rows);
        }
        if report.date_column_fallback {
            println!("  date column: {} (first column)", report.date_column);
        }
    }
    Ok(())
}
