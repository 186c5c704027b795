//! CLI definition and dispatch.

use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::SignalConfig;
use crate::domain::config_validation::check_date_range;
use crate::domain::drivers::{
    BacktestReport, BacktestSettings, live_context, load_history, run_backtest,
};
use crate::domain::engine::DecisionEngine;
use crate::domain::error::TailSignalError;
use crate::domain::ohlcv::Timeframe;
use crate::domain::signal::{AggregateDecision, Signal};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tailsignal", about = "Weekly-tail weighted LONG/SHORT/HOLD signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decide a signal at one evaluation date
    Decide {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_daily.csv and optionally <SYMBOL>_weekly.csv
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        symbol: String,
        /// Evaluation date; defaults to the day after the latest daily candle
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
    /// Walk the engine forward over historical data
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Write one CSV row per evaluation date
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a signal configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Decide {
            config,
            data,
            symbol,
            as_of,
            json,
        } => run_decide(&config, &data, &symbol, as_of, json),
        Command::Backtest {
            config,
            data,
            symbol,
            start,
            end,
            output,
        } => run_backtest_command(&config, &data, &symbol, start, end, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &TailSignalError) -> ExitCode {
    error!("{err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(&TailSignalError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

pub fn build_engine(adapter: &dyn ConfigPort) -> Result<DecisionEngine, TailSignalError> {
    Ok(DecisionEngine::new(SignalConfig::from_port(adapter)?))
}

/// Explicit date, or the day the latest daily candle closes.
pub fn resolve_as_of(
    data_port: &dyn DataPort,
    symbol: &str,
    as_of: Option<NaiveDate>,
) -> Result<NaiveDate, TailSignalError> {
    if let Some(date) = as_of {
        return Ok(date);
    }
    let no_data = || TailSignalError::NoData {
        symbol: symbol.to_string(),
        timeframe: Timeframe::Daily,
    };
    let (_, last, _) = data_port
        .get_data_range(symbol, Timeframe::Daily)?
        .ok_or_else(no_data)?;
    last.checked_add_days(Days::new(1)).ok_or_else(no_data)
}

pub fn format_decision(as_of: NaiveDate, decision: &AggregateDecision) -> String {
    let mut out = format!(
        "{} {} confidence={:.3}",
        as_of, decision.signal, decision.confidence
    );
    for reason in &decision.reasons {
        out.push_str("\n  - ");
        out.push_str(reason);
    }
    out
}

pub fn run_decide_pipeline(
    data_port: &dyn DataPort,
    engine: &DecisionEngine,
    symbol: &str,
    as_of: Option<NaiveDate>,
) -> Result<(NaiveDate, AggregateDecision), TailSignalError> {
    let as_of = resolve_as_of(data_port, symbol, as_of)?;
    let ctx = live_context(data_port, symbol, as_of)?;
    info!(
        symbol,
        %as_of,
        daily = ctx.daily().len(),
        weekly = ctx.weekly().len(),
        "context built"
    );
    Ok((as_of, engine.decide(&ctx)))
}

fn run_decide(
    config_path: &Path,
    data_dir: &Path,
    symbol: &str,
    as_of: Option<NaiveDate>,
    json: bool,
) -> ExitCode {
    info!("loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let engine = match build_engine(&adapter) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    match run_decide_pipeline(&data_port, &engine, symbol, as_of) {
        Ok((as_of, decision)) => {
            if json {
                println!("{}", decision.to_json());
            } else {
                println!("{}", format_decision(as_of, &decision));
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: &Path,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&Path>,
) -> ExitCode {
    // Stage 1: config
    info!("loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut settings = match BacktestSettings::from_port(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    settings.start = start.or(settings.start);
    settings.end = end.or(settings.end);
    if let Err(e) = check_date_range(settings.start, settings.end) {
        return fail(&e);
    }

    // Stage 2: engine
    let engine = match build_engine(&adapter) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    // Stages 3-5: data, walk-forward, report
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    run_backtest_pipeline(&data_port, &engine, symbol, &settings, output, &CsvReportAdapter)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    engine: &DecisionEngine,
    symbol: &str,
    settings: &BacktestSettings,
    output: Option<&Path>,
    report_port: &dyn ReportPort,
) -> ExitCode {
    let history = match load_history(data_port, symbol, settings.end.unwrap_or(NaiveDate::MAX)) {
        Ok(h) => h,
        Err(e) => return fail(&e),
    };

    let report = match run_backtest(engine, &history, settings) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(symbol, &report);

    if let Some(path) = output {
        if let Err(e) = report_port.write_decisions(&report.records, path) {
            return fail(&e);
        }
        info!("decisions written to {}", path.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(symbol: &str, report: &BacktestReport) {
    let s = &report.summary;
    eprintln!("\n=== Backtest: {} ===", symbol);
    if let (Some(first), Some(last)) = (report.records.first(), report.records.last()) {
        eprintln!("Period:           {} to {}", first.date, last.date);
    }
    eprintln!("Decisions:        {}", s.decisions);
    eprintln!("LONG / SHORT:     {} / {}", s.longs, s.shorts);
    eprintln!("HOLD:             {}", s.holds);
    match s.mean_confidence {
        Some(c) => eprintln!("Mean confidence:  {:.3}", c),
        None => eprintln!("Mean confidence:  n/a"),
    }
    match s.hit_rate {
        Some(r) => eprintln!(
            "Hit rate:         {:.1}% ({}/{})",
            r * 100.0,
            s.hits,
            s.evaluated
        ),
        None => eprintln!("Hit rate:         n/a"),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    info!("validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match SignalConfig::from_port(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = BacktestSettings::from_port(&adapter) {
        return fail(&e);
    }

    eprintln!("\nModule weights:");
    for (name, weight) in config.weights.iter() {
        eprintln!("  {:<14}{:.2}", name, weight);
    }
    eprintln!(
        "\nThresholds: LONG {:.2}, SHORT {:.2}, min confirmations {}",
        config.gates.threshold_for(Signal::Long),
        config.gates.threshold_for(Signal::Short),
        config.gates.min_confirmations
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
