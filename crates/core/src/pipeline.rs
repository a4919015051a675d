use crate::domain::diff::{self, DiffPolicy};
use crate::domain::filter::FilterCriteria;
use crate::domain::item::{Dataset, Item};
use crate::ingest::DatasetFetcher;
use crate::notify::format::{format_message, ALL_ITEMS_HEADER, NEW_ITEMS_HEADER};
use crate::notify::{Delivery, NotifierSet};
use crate::storage::SnapshotStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Announce only items missing from the baseline, then replace it.
    #[default]
    Diff,

    /// Announce every qualifying item. The baseline is neither read nor written.
    All,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: RunMode,
    pub diff_policy: DiffPolicy,

    /// Skip delivery and the baseline write; the message is only logged.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub mode: RunMode,
    pub fetched: usize,
    pub qualifying: usize,
    pub new_items: Vec<Item>,
    pub first_run: bool,
    pub message: Option<String>,
    pub notified: bool,
    pub fetch_error: Option<String>,
    pub deliveries: Vec<Delivery>,
}

impl RunReport {
    pub fn fetch_degraded(&self) -> bool {
        self.fetch_error.is_some()
    }
}

pub async fn run(
    fetcher: &dyn DatasetFetcher,
    store: &dyn SnapshotStore,
    notifiers: &NotifierSet,
    criteria: &FilterCriteria,
    opts: &RunOptions,
) -> anyhow::Result<RunReport> {
    let mut report = RunReport {
        mode: opts.mode,
        ..Default::default()
    };

    let dataset = match fetcher.fetch().await {
        Ok(dataset) => dataset,
        Err(err) => {
            tracing::warn!(
                source = fetcher.source_name(),
                stage = err.stage(),
                error = %err,
                "listing unavailable; continuing with an empty dataset"
            );
            report.fetch_error = Some(err.to_string());
            Dataset::default()
        }
    };
    report.fetched = dataset.len();

    let qualifying = criteria.apply(&dataset);
    report.qualifying = qualifying.len();
    tracing::info!(
        fetched = report.fetched,
        qualifying = report.qualifying,
        "listing filtered"
    );

    let (header, announce) = match opts.mode {
        RunMode::All => (ALL_ITEMS_HEADER, qualifying.items.clone()),
        RunMode::Diff => {
            let previous = store.load()?;
            let new_items = match &previous {
                Some(previous) => diff::new_items(&qualifying, previous, opts.diff_policy),
                None => Vec::new(),
            };
            report.first_run = previous.is_none();

            // Replaced before delivery, whether or not anything is announced. A degraded
            // fetch observed nothing, so the last good baseline stays in place.
            if opts.dry_run {
                tracing::info!(items = qualifying.len(), "dry-run: baseline left untouched");
            } else if report.fetch_degraded() {
                tracing::warn!("listing fetch degraded; keeping previous baseline");
            } else {
                store.save(&qualifying)?;
            }

            if report.first_run {
                tracing::info!(items = qualifying.len(), "no baseline yet; nothing announced");
                return Ok(report);
            }
            (NEW_ITEMS_HEADER, new_items)
        }
    };

    report.new_items = announce;
    if report.new_items.is_empty() {
        tracing::info!(mode = ?opts.mode, "nothing new to announce");
        return Ok(report);
    }

    let message = format_message(header, &report.new_items)?;
    tracing::info!(items = report.new_items.len(), %message, "notification prepared");
    report.message = Some(message.clone());

    if opts.dry_run {
        tracing::info!("dry-run: delivery skipped");
        return Ok(report);
    }
    if notifiers.is_empty() {
        tracing::warn!("no notification transport configured; message not sent");
        return Ok(report);
    }

    report.deliveries = notifiers.notify_all(&message).await;
    report.notified = true;
    Ok(report)
}
