//! contest-reminder binary entrypoint.
//! Loads configuration, wires sources, ledger and mail delivery, then polls
//! once (for cron) or forever on an interval.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contest_reminder::config::{ReminderConfig, SmtpConfig};
use contest_reminder::metrics::Metrics;
use contest_reminder::notify::{EmailNotifier, LogNotifier, Notifier};
use contest_reminder::scheduler::{live_sources, poll_all, run_forever};
use contest_reminder::JsonFileLedger;

/// Email a reminder 12 hours and 15 minutes before each upcoming contest.
#[derive(Parser, Debug)]
#[command(name = "contest-reminder", version, about, long_about = None)]
struct Cli {
    /// Run a single poll pass and exit (for cron / CI schedulers).
    #[arg(long)]
    once: bool,

    /// Log rendered reminders instead of sending email. The ledger is still updated.
    #[arg(long)]
    dry_run: bool,

    /// Config file (TOML or JSON). Defaults to $REMINDER_CONFIG_PATH, then config/reminders.{toml,json}.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// `RUST_LOG` filters (default `contest_reminder=info`); `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("contest_reminder=info,poll=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = ReminderConfig::load(cli.config.as_deref()).context("load reminder config")?;
    for w in cfg.coverage_warnings() {
        tracing::warn!("{w}");
    }

    let zone = cfg.display_zone()?;
    let notifier: Box<dyn Notifier> = if cli.dry_run {
        Box::new(LogNotifier::new(zone))
    } else {
        let smtp = SmtpConfig::from_env()?;
        Box::new(EmailNotifier::new(&smtp, zone)?)
    };

    let sources = live_sources(&cfg)?;
    let mut ledger = JsonFileLedger::new(&cfg.ledger_path, cfg.key_scheme);

    let _metrics_task = match &cfg.metrics_addr {
        Some(addr) => Some(Metrics::init()?.serve(addr).await?),
        None => None,
    };

    tracing::info!(
        sources = sources.len(),
        ledger = %cfg.ledger_path.display(),
        notifier = notifier.name(),
        once = cli.once,
        "contest-reminder starting"
    );

    if cli.once {
        let reports = poll_all(&sources, &mut ledger, notifier.as_ref(), chrono::Utc::now()).await;
        for (name, r) in reports {
            tracing::info!(source = name, ?r, "done");
        }
    } else {
        run_forever(&sources, &mut ledger, notifier.as_ref(), cfg.poll_interval_secs).await;
    }
    Ok(())
}
