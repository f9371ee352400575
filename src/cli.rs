//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_state_adapter::MemoryStateAdapter;
use crate::adapters::webhook_notify_adapter::WebhookNotifyAdapter;
use crate::domain::account::Account;
use crate::domain::backtest::run_universe;
use crate::domain::bar::PriceBar;
use crate::domain::error::PulseError;
use crate::domain::indicator::compute_indicators;
use crate::domain::metrics::Summary;
use crate::domain::profile::{RuleProfile, StrategyProfile};
use crate::domain::signal::classify;
use crate::domain::sizing::size_from_vol;
use crate::ports::config_port::ConfigPort;
use crate::realtime::{DecisionLoop, WatchConfig};

#[derive(Parser, Debug)]
#[command(name = "pulsetrader", about = "Signal screening and auto-trading decision engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured symbols
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Backtest all rule profiles side by side
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Show the current indicator state, signal and sizing for one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Run the realtime decision loop
    Watch {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, symbol } => run_backtest_cmd(&config, symbol.as_deref()),
        Command::Compare { config, symbol } => run_compare(&config, symbol.as_deref()),
        Command::Analyze { config, symbol } => run_analyze(&config, &symbol),
        Command::Watch { config } => run_watch(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PulseError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn resolve_symbols(adapter: &dyn ConfigPort, symbol_override: Option<&str>) -> Vec<String> {
    if let Some(symbol) = symbol_override {
        return vec![symbol.to_string()];
    }
    adapter
        .get_string("backtest", "symbols")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn load_universe(
    adapter: &dyn ConfigPort,
    symbols: &[String],
) -> Result<BTreeMap<String, Vec<PriceBar>>, PulseError> {
    let data_dir = adapter
        .get_string("data", "data_dir")
        .ok_or_else(|| PulseError::ConfigMissing {
            section: "data".into(),
            key: "data_dir".into(),
        })?;
    let prices = CsvPriceAdapter::new(&data_dir);
    let mut universe = BTreeMap::new();
    for symbol in symbols {
        universe.insert(symbol.clone(), prices.load_bars(symbol)?);
    }
    Ok(universe)
}

fn run_backtest_cmd(config_path: &PathBuf, symbol_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let profile = match StrategyProfile::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let symbols = resolve_symbols(&adapter, symbol_override);
    if symbols.is_empty() {
        eprintln!("error: no symbols configured");
        return ExitCode::from(2);
    }
    let capital = adapter.get_double("backtest", "initial_capital", 10_000.0);

    let universe = match load_universe(&adapter, &symbols) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Backtesting {} symbol(s) with the {} profile...",
        universe.len(),
        profile.rules
    );
    let result = run_universe(&universe, capital, &profile);

    for (symbol, summary) in &result.per_symbol {
        println!("=== {symbol} ===");
        print_summary(summary);
    }
    for (symbol, err) in &result.skipped {
        eprintln!("skipped {symbol}: {err}");
    }
    if let Some(aggregate) = &result.aggregate {
        println!("=== portfolio (equal weight) ===");
        print_summary(aggregate);
    }

    if result.per_symbol.is_empty() {
        eprintln!("error: no symbol produced a result");
        return ExitCode::from(5);
    }
    ExitCode::SUCCESS
}

fn run_compare(config_path: &PathBuf, symbol_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let base = match StrategyProfile::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let symbols = resolve_symbols(&adapter, symbol_override);
    if symbols.is_empty() {
        eprintln!("error: no symbols configured");
        return ExitCode::from(2);
    }
    let capital = adapter.get_double("backtest", "initial_capital", 10_000.0);
    let universe = match load_universe(&adapter, &symbols) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!(
        "{:<10} {:>10} {:>10} {:>8} {:>8} {:>7}",
        "profile", "return%", "bench%", "mdd%", "sharpe", "trades"
    );
    for rules in [RuleProfile::Strict, RuleProfile::Relaxed, RuleProfile::Momentum] {
        let profile = StrategyProfile { rules, ..base.clone() };
        let result = run_universe(&universe, capital, &profile);
        match result.aggregate {
            Some(summary) => {
                println!(
                    "{:<10} {:>10.2} {:>10.2} {:>8.2} {:>8.2} {:>7}",
                    rules.to_string(),
                    summary.total_return_pct,
                    summary.benchmark_return_pct,
                    summary.max_drawdown_pct,
                    summary.sharpe,
                    summary.trade_count
                );
            }
            None => println!("{:<10} no results", rules.to_string()),
        }
    }
    ExitCode::SUCCESS
}

fn run_analyze(config_path: &PathBuf, symbol: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let profile = match StrategyProfile::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let universe = match load_universe(&adapter, &[symbol.to_string()]) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let bars = &universe[symbol];
    if bars.len() < 2 {
        let err = PulseError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: 2,
        };
        eprintln!("error: {err}");
        return (&err).into();
    }

    let snapshots = compute_indicators(bars);
    let curr = snapshots[snapshots.len() - 1];
    let prev = snapshots[snapshots.len() - 2];
    let signal = classify(&prev, &curr, &profile);
    let sizing = size_from_vol(curr.ann_vol, &profile);
    let last = bars.last().unwrap();

    println!("symbol:      {symbol}");
    println!("as of:       {}", last.timestamp.date_naive());
    println!("close:       {:.2}", last.close);
    println!("rsi:         {}", fmt_opt(curr.rsi));
    println!("macd hist:   {}", fmt_opt(curr.macd_hist));
    println!("ann vol:     {}", fmt_opt(curr.ann_vol));
    println!("signal:      {:?} ({:?})", signal.kind, signal.strength);
    println!("kelly f:     {:.4}", sizing.kelly_f);
    println!("weight:      {:.4}", sizing.weight);
    ExitCode::SUCCESS
}

fn run_watch(config_path: &PathBuf) -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsetrader=info".into()),
        )
        .init();

    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let profile = match StrategyProfile::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let watch_config = match WatchConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_dir = match adapter.get_string("data", "data_dir") {
        Some(d) => d,
        None => {
            let err = PulseError::ConfigMissing {
                section: "data".into(),
                key: "data_dir".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let capital = adapter.get_double("watch", "initial_capital", 10_000.0);
    let webhook_url = adapter.get_string("watch", "webhook_url");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async move {
        let decision_loop = DecisionLoop::new(
            Arc::new(CsvPriceAdapter::new(&data_dir)),
            Arc::new(MemoryStateAdapter::new(Account::new(capital))),
            Arc::new(WebhookNotifyAdapter::new(webhook_url)),
            profile,
            watch_config,
        );
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let signal_target = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_target.notify_one();
            }
        });
        tracing::info!("decision loop starting");
        decision_loop.run(shutdown).await;
    });
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let profile = match StrategyProfile::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    println!("strategy: ok ({} profile)", profile.rules);

    // [watch] is only needed for the watch command
    if adapter.get_string("watch", "symbols").is_some() {
        match WatchConfig::from_config(&adapter) {
            Ok(c) => println!("watch: ok ({} symbols)", c.symbols.len()),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }
    if adapter.get_string("data", "data_dir").is_none() {
        eprintln!("warning: [data] data_dir not set; backtest and watch will fail");
    }
    println!("config: ok");
    ExitCode::SUCCESS
}

fn print_summary(summary: &Summary) {
    println!("  total return:   {:+.2}%", summary.total_return_pct);
    println!("  benchmark:      {:+.2}%", summary.benchmark_return_pct);
    println!("  outperformance: {:+.2}%", summary.outperformance_pct);
    match summary.cagr_pct {
        Some(cagr) => println!("  cagr:           {:+.2}%", cagr),
        None => println!("  cagr:           n/a"),
    }
    println!("  max drawdown:   {:.2}%", summary.max_drawdown_pct);
    println!("  sharpe:         {:.2}", summary.sharpe);
    println!("  win rate:       {:.1}%", summary.win_rate_pct);
    println!("  avg win/loss:   {:+.2}% / -{:.2}%", summary.avg_win_pct, summary.avg_loss_pct);
    println!("  profit factor:  {:.2}", summary.profit_factor);
    println!("  trades:         {}", summary.trade_count);
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    }
}
