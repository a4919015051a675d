use clap::Parser;
use ipo_watch_core::domain::{DiffPolicy, FilterCriteria};
use ipo_watch_core::ingest::HistockFetcher;
use ipo_watch_core::notify::NotifierSet;
use ipo_watch_core::pipeline::{RunMode, RunOptions, RunReport};
use ipo_watch_core::storage::lock::{RunLock, DEFAULT_STALE_AFTER};
use ipo_watch_core::storage::CsvBaselineStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ipo_watch_worker")]
struct Args {
    /// Baseline CSV path. Overrides IPO_BASELINE_PATH.
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Announce every qualifying offering instead of only new ones. The baseline is not touched.
    #[arg(long)]
    all: bool,

    /// Treat an offering as already announced when its code+name is in the baseline,
    /// even if its numbers changed.
    #[arg(long)]
    diff_by_key: bool,

    /// Do everything except sending notifications and writing the baseline.
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero when the listing could not be fetched or parsed.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = ipo_watch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(&settings, &args).await {
        Ok(Some(report)) => {
            log_summary(&report);
            if let Some(err) = report.fetch_error.as_deref() {
                sentry::capture_message(err, sentry::Level::Warning);
                if args.strict {
                    anyhow::bail!("listing fetch degraded: {err}");
                }
            }
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "ipo watch run failed");
            Err(err)
        }
    }
}

async fn run(
    settings: &ipo_watch_core::config::Settings,
    args: &Args,
) -> anyhow::Result<Option<RunReport>> {
    let baseline_path = args
        .baseline
        .clone()
        .unwrap_or_else(|| settings.baseline_path.clone());

    let opts = RunOptions {
        mode: if args.all { RunMode::All } else { RunMode::Diff },
        diff_policy: if args.diff_by_key {
            DiffPolicy::ByKey
        } else {
            DiffPolicy::FullRow
        },
        dry_run: args.dry_run,
    };

    let _lock = match opts.mode {
        RunMode::Diff => {
            let Some(lock) = RunLock::try_acquire(&baseline_path, DEFAULT_STALE_AFTER)? else {
                tracing::warn!(
                    baseline = %baseline_path.display(),
                    "run lock not acquired; another run in progress"
                );
                return Ok(None);
            };
            Some(lock)
        }
        RunMode::All => None,
    };

    let fetcher = HistockFetcher::from_settings(settings)?;
    let store = CsvBaselineStore::new(&baseline_path);
    let notifiers = NotifierSet::from_settings(settings);
    let criteria = FilterCriteria::from_settings(settings);

    tracing::info!(
        mode = ?opts.mode,
        diff_policy = ?opts.diff_policy,
        dry_run = opts.dry_run,
        baseline = %baseline_path.display(),
        transports = ?notifiers.transports(),
        "ipo watch run starting"
    );

    let report =
        ipo_watch_core::pipeline::run(&fetcher, &store, &notifiers, &criteria, &opts).await?;
    Ok(Some(report))
}

fn log_summary(report: &RunReport) {
    let failed = report
        .deliveries
        .iter()
        .filter(|d| !matches!(d.outcome, ipo_watch_core::notify::DeliveryOutcome::Delivered))
        .count();

    tracing::info!(
        mode = ?report.mode,
        fetched = report.fetched,
        qualifying = report.qualifying,
        new_items = report.new_items.len(),
        first_run = report.first_run,
        notified = report.notified,
        deliveries = report.deliveries.len(),
        failed_deliveries = failed,
        fetch_degraded = report.fetch_degraded(),
        "ipo watch run finished"
    );
}

fn init_sentry(settings: &ipo_watch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
