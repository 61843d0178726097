//! InsightLab CLI: insight reports, progress tracking and paper portfolios.
//!
//! Commands:
//! - `analyze` - full insight report for an optimizer result JSON
//! - `mistakes` - run the mistake rules only
//! - `explain` - explain a ticker or a portfolio metric
//! - `record` - record a learning activity
//! - `progress` - show streak, badges and concept mastery
//! - `paper` - list, create, update, value and delete paper portfolios

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use insightlab_core::derive::FrontierCurve;
use insightlab_core::domain::parse_calendar_day;
use insightlab_core::{
    EntityKind, Explainer, InsightConfig, InsightReport, MetricKind, MistakeDetector,
    PortfolioResult, Verbosity,
};
use insightlab_tracker::{ActivityKind, FileRecordStore, PaperBook, PaperUpdate, ProgressTracker};

#[derive(Parser)]
#[command(
    name = "insightlab",
    about = "InsightLab CLI: portfolio insight engine"
)]
struct Cli {
    /// Directory for persisted progress and paper portfolios.
    /// Defaults to the platform data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full insight report for an optimizer result.
    Analyze {
        /// Optimizer result JSON file.
        result: PathBuf,

        /// Thresholds / axis config TOML.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the mistake rules against an optimizer result.
    Mistakes {
        result: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Explain a ticker's allocation or a portfolio metric.
    Explain {
        result: PathBuf,

        /// Ticker to explain.
        #[arg(long, conflicts_with = "metric")]
        ticker: Option<String>,

        /// Metric to explain (volatility, sharpe_ratio, max_drawdown, ...).
        #[arg(long)]
        metric: Option<String>,

        /// Weight for a ticker absent from the result, or the metric value
        /// when the result does not carry it.
        #[arg(long)]
        value: Option<f64>,

        /// Technical wording with details.
        #[arg(long, default_value_t = false)]
        technical: bool,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Record a learning activity: portfolio, news or rebalance.
    Record {
        activity: ActivityKind,

        /// Calendar day of the activity (YYYY-MM-DD or an RFC 3339
        /// timestamp). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Show streak, badges and concept progress.
    Progress {
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Reset progress to the initial state.
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Paper portfolio management.
    Paper {
        #[command(subcommand)]
        action: PaperAction,
    },
}

#[derive(Subcommand)]
enum PaperAction {
    /// List saved paper portfolios.
    List,
    /// Save the weights of an optimizer result as a paper portfolio.
    Create {
        #[arg(long)]
        name: String,

        /// Optimizer result whose weights are saved.
        #[arg(long)]
        result: PathBuf,
    },
    /// Rename or (de)activate a paper portfolio.
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        active: Option<bool>,
    },
    /// Revalue a paper portfolio against a fresh optimizer result.
    Value {
        id: String,

        #[arg(long)]
        result: PathBuf,
    },
    /// Delete a paper portfolio.
    Delete { id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Analyze {
            result,
            config,
            json,
        } => run_analyze(&result, config.as_deref(), json),
        Commands::Mistakes {
            result,
            config,
            json,
        } => run_mistakes(&result, config.as_deref(), json),
        Commands::Explain {
            result,
            ticker,
            metric,
            value,
            technical,
            config,
            json,
        } => run_explain(
            &result,
            ticker,
            metric,
            value,
            technical,
            config.as_deref(),
            json,
        ),
        Commands::Record { activity, date } => {
            run_record(&resolve_data_dir(data_dir)?, activity, date.as_deref())
        }
        Commands::Progress { json, reset } => {
            run_progress(&resolve_data_dir(data_dir)?, json, reset)
        }
        Commands::Paper { action } => run_paper(&resolve_data_dir(data_dir)?, action),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let base = dirs::data_dir().context("no platform data directory; pass --data-dir")?;
    let dir = base.join("insightlab");
    debug!(dir = %dir.display(), "using default data directory");
    Ok(dir)
}

fn load_config(path: Option<&Path>) -> Result<InsightConfig> {
    match path {
        Some(p) => InsightConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(InsightConfig::default()),
    }
}

fn load_result(path: &Path) -> Result<PortfolioResult> {
    let result = PortfolioResult::from_file(path)
        .with_context(|| format!("reading optimizer result {}", path.display()))?;
    result
        .validate()
        .with_context(|| format!("validating optimizer result {}", path.display()))?;
    Ok(result)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "n/a".to_string(),
    }
}

/// `--date` accepts the same forms as stored records.
fn parse_activity_day(raw: &str) -> Result<NaiveDate> {
    parse_calendar_day(raw).with_context(|| format!("invalid --date '{raw}'"))
}

// ── Insight commands ─────────────────────────────────────────────────

fn run_analyze(result_path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let result = load_result(result_path)?;
    let report = InsightReport::build(&result, &config);

    if json {
        return print_json(&report);
    }

    println!("Portfolio ({} holdings)", result.weights.len());
    println!("{}", "-".repeat(40));
    println!("Expected return:   {:.2}%", result.expected_return * 100.0);
    println!("Volatility:        {:.2}%", result.volatility * 100.0);
    println!("Sharpe ratio:      {}", fmt_opt(result.sharpe, 2));
    println!("Sortino ratio:     {}", fmt_opt(result.sortino, 2));
    println!("Max drawdown:      {}%", fmt_opt(report.max_drawdown_pct, 2));
    println!();

    if !report.performance.is_empty() {
        println!(
            "Performance: {} series over {} dates",
            report.performance.columns.len(),
            report.performance.rows.len()
        );
        if let Some(last) = report.performance.rows.last() {
            for column in &report.performance.columns {
                println!("  {:<12} {:>8}%", column, fmt_opt(last.get(column), 2));
            }
        }
        println!();
    }

    for (label, table) in [
        ("Rolling Sharpe", &report.rolling_sharpe),
        ("Rolling volatility", &report.rolling_volatility),
    ] {
        if let Some(last) = table.rows.last() {
            let cells: Vec<String> = table
                .columns
                .iter()
                .map(|c| format!("{c}={}", fmt_opt(last.get(c), 2)))
                .collect();
            println!("{label} (latest): {}", cells.join("  "));
        }
    }

    match &report.frontier {
        Some(FrontierCurve::Available { points, .. }) => {
            let synthetic = points.iter().filter(|p| p.synthetic).count();
            println!(
                "Efficient frontier: {} points ({synthetic} synthetic)",
                points.len()
            );
        }
        Some(FrontierCurve::InsufficientData { usable, .. }) => {
            println!("Efficient frontier: insufficient data ({usable} usable points)");
        }
        None => {}
    }
    println!();

    print_mistakes(&report.mistakes);
    Ok(())
}

fn print_mistakes(mistakes: &[insightlab_core::Mistake]) {
    if mistakes.is_empty() {
        println!("No structural issues found.");
        return;
    }
    println!("Issues ({}):", mistakes.len());
    for m in mistakes {
        println!("  [{}] {}", m.severity, m.message);
        println!("      {}", m.explanation);
        println!("      -> {}", m.suggestion);
    }
}

fn run_mistakes(result_path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let result = load_result(result_path)?;
    let mistakes = MistakeDetector::new(config.thresholds).detect(&result);

    if json {
        return print_json(&mistakes);
    }
    print_mistakes(&mistakes);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_explain(
    result_path: &Path,
    ticker: Option<String>,
    metric: Option<String>,
    value: Option<f64>,
    technical: bool,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let result = load_result(result_path)?;
    let explainer = Explainer::new(config.thresholds);
    let verbosity = if technical {
        Verbosity::Technical
    } else {
        Verbosity::Plain
    };

    let explanation = match (ticker, metric) {
        (Some(ticker), None) => explainer.explain(
            EntityKind::Ticker,
            &ticker,
            value.unwrap_or(0.0),
            &result,
            verbosity,
        ),
        (None, Some(metric)) => {
            let from_result = MetricKind::from_name(&metric).and_then(|k| k.value_in(&result));
            let Some(v) = value.or(from_result) else {
                bail!("metric '{metric}' is not in the result; pass --value");
            };
            explainer.explain(EntityKind::Metric, &metric, v, &result, verbosity)
        }
        _ => bail!("exactly one of --ticker or --metric is required"),
    };

    if json {
        return print_json(&explanation);
    }
    println!("{}", explanation.title);
    println!();
    println!("{}", explanation.body);
    if let Some(details) = &explanation.technical_details {
        println!();
        println!("{details}");
    }
    Ok(())
}

// ── Progress commands ────────────────────────────────────────────────

fn run_record(data_dir: &Path, activity: ActivityKind, date: Option<&str>) -> Result<()> {
    let tracker = ProgressTracker::new(FileRecordStore::new(data_dir));
    let outcome = match date {
        Some(raw) => {
            tracker.record_on(activity, parse_activity_day(raw)?)
        }
        None => tracker.record(activity),
    };

    println!(
        "Recorded {activity}. Streak: {} day(s).",
        outcome.state.streak_count
    );
    for id in &outcome.newly_earned {
        if let Some(badge) = outcome.state.badge(id) {
            println!("Badge unlocked: {} ({})", badge.name, badge.description);
        }
    }
    if !outcome.persisted {
        eprintln!("Warning: progress could not be saved to {}", data_dir.display());
    }
    Ok(())
}

fn run_progress(data_dir: &Path, json: bool, reset: bool) -> Result<()> {
    let tracker = ProgressTracker::new(FileRecordStore::new(data_dir));
    let state = if reset {
        tracker.reset().context("resetting progress")?
    } else {
        tracker.load()
    };

    if json {
        return print_json(&state);
    }

    let today = chrono::Local::now().date_naive();
    println!("Streak: {} day(s)", state.effective_streak(today));
    println!(
        "Portfolios: {}  News analyzed: {}  Rebalances: {}",
        state.total_portfolios, state.total_news_analyzed, state.total_rebalances
    );
    println!();
    println!("{:<20} {:>8} {:>8}", "Concept", "Count", "Progress");
    println!("{}", "-".repeat(38));
    for c in &state.concepts {
        println!(
            "{:<20} {:>4}/{:<3} {:>7.0}%",
            c.name, c.current_count, c.target, c.progress
        );
    }
    println!();
    println!("Badges:");
    for b in &state.badges {
        let mark = if b.earned { "x" } else { " " };
        let when = b
            .earned_date
            .map(|d| format!(" (earned {d})"))
            .unwrap_or_default();
        println!("  [{mark}] {:<24} {}{when}", b.name, b.description);
    }
    Ok(())
}

// ── Paper commands ───────────────────────────────────────────────────

fn run_paper(data_dir: &Path, action: PaperAction) -> Result<()> {
    let book = PaperBook::new(FileRecordStore::new(data_dir));

    match action {
        PaperAction::List => {
            let portfolios = book.list();
            if portfolios.is_empty() {
                println!("No paper portfolios.");
                return Ok(());
            }
            println!(
                "{:<24} {:<20} {:>12} {:>8} {:>7}",
                "ID", "Name", "Value", "Return", "Active"
            );
            println!("{}", "-".repeat(75));
            for p in &portfolios {
                println!(
                    "{:<24} {:<20} {:>12.2} {:>7.2}% {:>7}",
                    p.id,
                    p.name,
                    p.current_value,
                    p.total_return() * 100.0,
                    if p.is_active { "yes" } else { "no" }
                );
            }
        }
        PaperAction::Create { name, result } => {
            let result = load_result(&result)?;
            let weights = result.weights.clone();
            let portfolio = book
                .create(&name, weights, Some(result))
                .context("creating paper portfolio")?;
            println!("Created {} ({})", portfolio.id, portfolio.name);
        }
        PaperAction::Update { id, name, active } => {
            let updated = book
                .update(
                    &id,
                    PaperUpdate {
                        name,
                        is_active: active,
                        ..Default::default()
                    },
                )
                .context("updating paper portfolio")?;
            println!("Updated {} ({})", updated.id, updated.name);
        }
        PaperAction::Value { id, result } => {
            let result = load_result(&result)?;
            let updated = book
                .update(
                    &id,
                    PaperUpdate {
                        snapshot: Some(result),
                        ..Default::default()
                    },
                )
                .with_context(|| format!("revaluing paper portfolio '{id}'"))?;
            println!(
                "{}: {:.2} ({:+.2}% on {:.0})",
                updated.name,
                updated.current_value,
                updated.total_return() * 100.0,
                updated.initial_capital_units
            );
        }
        PaperAction::Delete { id } => {
            if !book.delete(&id) {
                bail!("no paper portfolio with id '{id}'");
            }
            println!("Deleted {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_day_accepts_record_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 3).unwrap();
        assert_eq!(parse_activity_day("2024-09-03").unwrap(), expected);
        assert_eq!(parse_activity_day("2024-09-03T21:15:00Z").unwrap(), expected);
        assert_eq!(parse_activity_day("2024-09-03 08:00:00").unwrap(), expected);
        assert!(parse_activity_day("09/03/2024").is_err());
    }
}
