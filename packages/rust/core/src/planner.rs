//! Selection planner: which remote items this run downloads.
//!
//! An item is a candidate when it is **new** (id not in the processed set) or
//! **missing** (processed, but its recorded output file is gone and no local
//! file name embeds its id). Candidates above the per-run cap are sampled
//! uniformly without replacement.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use drivesite_shared::RemoteItem;
use drivesite_storage::ProcessedSet;

/// Items selected for this run, split by why they were selected.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Selected items in processing order (random).
    pub to_process: Vec<RemoteItem>,
    /// Ids of selected items that were never processed before.
    pub newly_discovered: BTreeSet<String>,
    /// Ids of selected items that were processed but whose output is missing.
    pub reprocessed: BTreeSet<String>,
    /// Total candidates before the cap was applied.
    pub candidates: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty()
    }
}

/// Whether a processed item's output can no longer be found locally.
///
/// Ids recorded without an output name (older processed-set files) count as
/// present: there is no expected file to check against.
pub fn is_missing(item: &RemoteItem, processed: &ProcessedSet, local: &BTreeSet<String>) -> bool {
    let Some(expected) = processed.output_for(&item.id) else {
        return false;
    };
    if local.contains(expected) {
        return false;
    }
    !local.iter().any(|name| name.contains(item.id.as_str()))
}

/// Compute the items to (re)process, capped at `cap`.
pub fn plan<R: Rng + ?Sized>(
    listing: &[RemoteItem],
    processed: &ProcessedSet,
    local: &BTreeSet<String>,
    cap: usize,
    rng: &mut R,
) -> Plan {
    let mut seen = BTreeSet::new();
    let mut candidates: Vec<RemoteItem> = Vec::new();

    for item in listing {
        if !seen.insert(item.id.as_str()) {
            continue;
        }
        if !processed.contains(&item.id) || is_missing(item, processed, local) {
            candidates.push(item.clone());
        }
    }

    let total = candidates.len();
    candidates.shuffle(rng);
    candidates.truncate(cap);

    let mut plan = Plan {
        candidates: total,
        ..Plan::default()
    };
    for item in &candidates {
        if processed.contains(&item.id) {
            plan.reprocessed.insert(item.id.clone());
        } else {
            plan.newly_discovered.insert(item.id.clone());
        }
    }
    plan.to_process = candidates;

    debug!(reprocessed = ?plan.reprocessed, "missing outputs scheduled");
    info!(
        listed = listing.len(),
        candidates = total,
        selected = plan.to_process.len(),
        new = plan.newly_discovered.len(),
        reprocessed = plan.reprocessed.len(),
        "selection planned"
    );

    plan
}
