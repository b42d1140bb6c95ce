//! Scan coordinator
//!
//! One scan: load the prior inventory, read the candidate feed, probe every
//! candidate through the [`ProbeScheduler`], merge each outcome into the shared
//! store as it arrives, then persist the result.
//!
//! The output file is only written once every scheduled candidate has been
//! merged. A cancelled scan leaves the previous file untouched unless
//! incremental flushing (`flush_every`) is enabled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::candidates::{CandidateSource, JsonFileSource};
use crate::common::config::ScanConfig;
use crate::common::types::ServerStatus;
use crate::error::CensusResult;
use crate::health::{HttpProbe, Probe};
use crate::inventory::persist::{load_inventory, save_inventory};
use crate::inventory::InventoryStore;
use crate::lock::ScanLock;
use crate::scheduler::ProbeScheduler;

/// Summary of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates read from the feed
    pub candidates: usize,
    /// Candidates dropped as repeats of an earlier key
    pub skipped_duplicates: usize,
    /// Outcomes with status `live`
    pub live: usize,
    /// Outcomes with a non-200 liveness response
    pub http_error: usize,
    /// Outcomes that never got a response
    pub unreachable: usize,
    /// Records in the inventory at the end of the scan
    pub records: usize,
    /// Whether the scan stopped before every candidate was merged
    pub cancelled: bool,
}

impl ScanReport {
    /// Number of merged outcomes
    pub fn merged(&self) -> usize {
        self.live + self.http_error + self.unreachable
    }

    fn count(&mut self, status: ServerStatus) {
        match status {
            ServerStatus::Live => self.live += 1,
            ServerStatus::HttpError(_) => self.http_error += 1,
            ServerStatus::Unreachable => self.unreachable += 1,
        }
    }
}

/// Drives scans against one inventory file
pub struct ScanCoordinator<P: ?Sized, S> {
    config: ScanConfig,
    probe: Arc<P>,
    source: S,
}

impl ScanCoordinator<HttpProbe, JsonFileSource> {
    /// HTTP probing of the configured feed file
    pub fn from_config(config: ScanConfig) -> CensusResult<Self> {
        config.validate()?;
        let probe = Arc::new(HttpProbe::new(&config)?);
        let source = JsonFileSource::new(&config.input_path, config.default_port);
        Ok(Self::new(config, probe, source))
    }
}

impl<P, S> ScanCoordinator<P, S>
where
    P: Probe + ?Sized + 'static,
    S: CandidateSource,
{
    /// Create a coordinator from its collaborators
    pub fn new(config: ScanConfig, probe: Arc<P>, source: S) -> Self {
        Self {
            config,
            probe,
            source,
        }
    }

    /// Scan configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run a single scan
    ///
    /// Only a failure to write the final inventory is returned as an error.
    pub async fn run_once(&self, cancel: &CancellationToken) -> CensusResult<ScanReport> {
        let output = self.config.output_path.as_path();
        let store = InventoryStore::from_records(load_inventory(output).await);

        let candidates = match self.source.candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Failed to read candidate feed, scanning nothing");
                Vec::new()
            }
        };

        let mut report = ScanReport {
            candidates: candidates.len(),
            ..ScanReport::default()
        };

        let scheduler = ProbeScheduler::new(Arc::clone(&self.probe), self.config.max_concurrency);
        let mut run = scheduler.run_all(candidates, cancel.clone());
        report.skipped_duplicates = run.skipped_duplicates;

        info!(
            candidates = report.candidates,
            scheduled = run.scheduled,
            skipped_duplicates = report.skipped_duplicates,
            max_concurrency = self.config.max_concurrency,
            "Starting scan"
        );

        let flush_every = self.config.flush_every.filter(|n| *n > 0);
        while let Some(outcome) = run.outcomes.next().await {
            let record = store
                .apply(&outcome.key, &outcome.candidate, &outcome.result, Utc::now())
                .await;
            report.count(outcome.result.status);

            info!(
                endpoint = %format!("{}:{}", record.address, record.port),
                status = %record.status,
                version = %record.version,
                age = %record.age,
                "Processed endpoint"
            );

            if let Some(every) = flush_every {
                if report.merged() % every == 0 {
                    if let Err(e) = save_inventory(output, &store.snapshot().await).await {
                        warn!(error = %e, "Incremental inventory flush failed");
                    }
                }
            }
        }

        report.records = store.len().await;

        if report.merged() < run.scheduled {
            report.cancelled = true;
            warn!(
                merged = report.merged(),
                scheduled = run.scheduled,
                "Scan cancelled before all candidates were processed"
            );
            if flush_every.is_some() && report.merged() > 0 {
                save_inventory(output, &store.snapshot().await).await?;
            }
            return Ok(report);
        }

        save_inventory(output, &store.snapshot().await).await?;

        info!(
            path = %output.display(),
            records = report.records,
            live = report.live,
            http_error = report.http_error,
            unreachable = report.unreachable,
            "Saved inventory"
        );

        Ok(report)
    }

    /// Run scans under the output file lock
    ///
    /// Without `interval_secs` this is a single scan. Otherwise scans repeat on
    /// that interval until `cancel` fires. Returns the last report.
    pub async fn run(&self, cancel: CancellationToken) -> CensusResult<ScanReport> {
        let lock = ScanLock::acquire(&self.config.output_path)?;
        info!(lock = %lock.path().display(), "Acquired scan lock");

        let Some(interval_secs) = self.config.interval_secs.filter(|s| *s > 0) else {
            return self.run_once(&cancel).await;
        };

        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = ScanReport::default();
        let mut round: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            round += 1;
            info!(round = round, interval_secs = interval_secs, "Starting periodic scan");
            last = self.run_once(&cancel).await?;
            if last.cancelled {
                break;
            }
        }

        info!(rounds = round, "Periodic scanning stopped");
        Ok(last)
    }
}
