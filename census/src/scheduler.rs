//! Probe scheduler
//!
//! Runs a [`Probe`] over every candidate with a global cap on in-flight
//! probes. Results are yielded in completion order as soon as each probe
//! finishes; a new candidate is admitted whenever a slot frees up.
//!
//! Cancellation ends the stream immediately. In-flight probe futures are
//! dropped with it, so a cancelled probe never produces an outcome.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::identity::{compute_key, mask_address, IdentityKey};
use crate::common::types::{CandidateEndpoint, ProbeResult};
use crate::health::Probe;

/// A finished probe for one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Identity key of the candidate
    pub key: IdentityKey,
    /// The candidate as supplied by the feed
    pub candidate: CandidateEndpoint,
    /// Normalized probe result
    pub result: ProbeResult,
}

/// A scheduled run over a candidate list
pub struct ScheduledRun {
    /// Number of unique candidates admitted
    pub scheduled: usize,
    /// Candidates dropped because their key already appeared earlier in the list
    pub skipped_duplicates: usize,
    /// Outcomes in completion order
    pub outcomes: BoxStream<'static, ProbeOutcome>,
}

/// Bounded-concurrency scheduler
pub struct ProbeScheduler<P: ?Sized> {
    probe: Arc<P>,
    max_concurrency: usize,
}

impl<P: Probe + ?Sized + 'static> ProbeScheduler<P> {
    /// Create a scheduler; a cap of zero is treated as one
    pub fn new(probe: Arc<P>, max_concurrency: usize) -> Self {
        Self {
            probe,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Probe all candidates
    ///
    /// Duplicate keys within the list are probed once (first occurrence wins)
    /// so that no key is merged twice in a single run.
    pub fn run_all(
        &self,
        candidates: Vec<CandidateEndpoint>,
        cancel: CancellationToken,
    ) -> ScheduledRun {
        let (keyed, skipped_duplicates) = dedupe(candidates);
        let scheduled = keyed.len();
        let probe = Arc::clone(&self.probe);

        let outcomes = stream::iter(keyed)
            .map(move |(key, candidate)| {
                let probe = Arc::clone(&probe);
                async move {
                    let result = probe.probe(&candidate).await;
                    ProbeOutcome {
                        key,
                        candidate,
                        result,
                    }
                }
            })
            .buffer_unordered(self.max_concurrency)
            .take_until(cancel.cancelled_owned())
            .boxed();

        ScheduledRun {
            scheduled,
            skipped_duplicates,
            outcomes,
        }
    }
}

/// Compute keys and drop repeated ones, preserving submission order
fn dedupe(candidates: Vec<CandidateEndpoint>) -> (Vec<(IdentityKey, CandidateEndpoint)>, usize) {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut keyed = Vec::with_capacity(candidates.len());
    let mut skipped = 0;

    for candidate in candidates {
        let key = compute_key(&candidate.address, candidate.port);
        if seen.insert(key.clone()) {
            keyed.push((key, candidate));
        } else {
            skipped += 1;
            debug!(
                endpoint = %format!("{}:{}", mask_address(&candidate.address), candidate.port),
                "Skipping duplicate candidate"
            );
        }
    }

    (keyed, skipped)
}
