//! End-to-end run: list → plan → (allocate → download → convert → persist)* → index → footers.

use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use rand::Rng;
use tracing::{info, instrument, warn};

use drivesite_convert::convert;
use drivesite_remote::{RemoteStore, download};
use drivesite_shared::{DriveSiteError, RemoteItem, Result, RunId, SiteConfig};
use drivesite_storage::{CacheStatus, KeywordQueue, ListingCache, ProcessedSet, write_atomic};

use crate::naming::{Allocation, NameAllocator};
use crate::planner;
use crate::site::{self, FooterReport};

/// Everything a run needs, constructed once at startup.
pub struct RunContext<'a> {
    pub config: &'a SiteConfig,
    /// Remote folders to list, in order.
    pub folder_ids: &'a [String],
    pub store: &'a dyn RemoteStore,
}

/// An item that was selected but did not produce a document.
#[derive(Debug)]
pub struct SkippedItem {
    pub id: String,
    pub name: String,
    pub error: DriveSiteError,
}

/// Result of rebuilding the index and footers.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Documents listed in the index.
    pub documents: usize,
    pub footers: FooterReport,
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    /// Items in the listing used for planning.
    pub listed: usize,
    /// The listing came from the cache.
    pub from_cache: bool,
    /// Folders whose listing failed this run.
    pub folders_failed: Vec<String>,
    /// Candidates before the per-run cap.
    pub candidates: usize,
    /// Output file names written, in processing order.
    pub written: Vec<String>,
    /// How many written items were reprocessed rather than new.
    pub reprocessed: usize,
    pub skipped: Vec<SkippedItem>,
    /// Items whose content needed lossy decoding.
    pub lossy: usize,
    pub site: RebuildReport,
    pub keywords_remaining: usize,
    pub elapsed: Duration,
}

/// Snapshot of persisted state for `status`.
#[derive(Debug)]
pub struct SiteStatus {
    pub processed: usize,
    pub keywords_remaining: usize,
    pub documents: usize,
    /// Age, item count and folders of the listing cache, if one exists.
    pub cache: Option<(TimeDelta, usize, Vec<String>)>,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each selected item, written or skipped.
    fn item_done(&self, name: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_done(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the full pipeline once.
///
/// Per-item failures (download, name allocation) skip the item. Failures
/// writing outputs or state abort the run; anything already persisted stays
/// consistent because each item is written before it is recorded.
#[instrument(skip_all, fields(out = %ctx.config.output_dir.display(), folders = ctx.folder_ids.len()))]
pub async fn run<R: Rng + ?Sized>(
    ctx: &RunContext<'_>,
    rng: &mut R,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    let config = ctx.config;
    config.validate()?;

    info!(%run_id, "starting run");

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| DriveSiteError::io(&config.output_dir, e))?;

    // --- List ---
    progress.phase("Listing remote folders");
    let listing = obtain_listing(ctx).await;

    // --- Plan ---
    progress.phase("Planning");
    let local: BTreeSet<String> = site::list_documents(&config.output_dir)?.into_iter().collect();
    let mut processed = ProcessedSet::load(&config.processed_file);
    let mut keywords = KeywordQueue::load(&config.keywords_file)?;
    let plan = planner::plan(&listing.items, &processed, &local, config.max_items, rng);

    // --- Process ---
    let total = plan.to_process.len();
    if total > 0 {
        progress.phase("Converting documents");
    }

    let mut allocator = NameAllocator::new(local.iter().cloned());
    let mut written = Vec::new();
    let mut skipped = Vec::new();
    let mut reprocessed = 0usize;
    let mut lossy = 0usize;
    let mut exhausted_warned = false;

    for (i, item) in plan.to_process.iter().enumerate() {
        let restored = plan
            .reprocessed
            .contains(&item.id)
            .then(|| processed.output_for(&item.id).map(str::to_string))
            .flatten()
            .filter(|name| site::is_document_name(name) && allocator.reserve(name));

        let allocation = match restored {
            Some(name) => Allocation {
                name,
                queue_after: keywords.clone(),
                from_keyword: false,
            },
            None => {
                if keywords.is_empty() && !exhausted_warned {
                    warn!("keyword list exhausted, naming from original file names");
                    exhausted_warned = true;
                }
                match allocator.allocate(item, &keywords, rng) {
                    Ok(allocation) => allocation,
                    Err(error) => {
                        warn!(id = %item.id, %error, "skipping item");
                        skipped.push(skip(item, error));
                        progress.item_done(&item.name, i + 1, total);
                        continue;
                    }
                }
            }
        };

        let raw = match download(ctx.store, item).await {
            Ok(raw) => raw,
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                warn!(id = %item.id, name = %item.name, %error, "download failed, skipping item");
                allocator.release(&allocation.name);
                skipped.push(skip(item, error));
                progress.item_done(&item.name, i + 1, total);
                continue;
            }
        };

        let converted = convert(item, &raw);
        if converted.lossy {
            lossy += 1;
        }

        // Output first, then the keyword, then the processed record: a crash
        // can orphan a document but never records an item without its output.
        let target = config.output_dir.join(&allocation.name);
        if let Err(error) = write_atomic(&target, converted.html.as_bytes()) {
            warn!(id = %item.id, output = %allocation.name, %error, "write failed, skipping item");
            allocator.release(&allocation.name);
            skipped.push(skip(item, error));
            progress.item_done(&item.name, i + 1, total);
            continue;
        }
        if allocation.from_keyword {
            keywords = allocation.queue_after;
            keywords.save(&config.keywords_file)?;
        }
        processed.record(item.id.clone(), allocation.name.clone());
        processed.save(&config.processed_file)?;

        if plan.reprocessed.contains(&item.id) {
            reprocessed += 1;
        }
        info!(id = %item.id, original = %item.name, output = %allocation.name, "document written");
        progress.item_done(&allocation.name, i + 1, total);
        written.push(allocation.name);
    }

    // --- Index + footers ---
    progress.phase("Rebuilding index and footers");
    let site = rebuild_site(config, rng)?;

    let report = RunReport {
        run_id,
        listed: listing.items.len(),
        from_cache: listing.from_cache,
        folders_failed: listing.folders_failed,
        candidates: plan.candidates,
        written,
        reprocessed,
        skipped,
        lossy,
        site,
        keywords_remaining: keywords.len(),
        elapsed: start.elapsed(),
    };

    info!(
        run_id = %report.run_id,
        written = report.written.len(),
        skipped = report.skipped.len(),
        documents = report.site.documents,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&report);

    Ok(report)
}

/// Regenerate `index.html` and every footer from the documents on disk.
///
/// Needs no remote access.
#[instrument(skip_all, fields(out = %config.output_dir.display()))]
pub fn rebuild_site<R: Rng + ?Sized>(config: &SiteConfig, rng: &mut R) -> Result<RebuildReport> {
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| DriveSiteError::io(&config.output_dir, e))?;

    let docs = site::list_documents(&config.output_dir)?;
    site::write_index(&config.output_dir, &docs, &config.title)?;
    let footers = site::refresh_footers_on_disk(
        &config.output_dir,
        &docs,
        config.footer_min_links,
        config.footer_max_links,
        rng,
    );

    Ok(RebuildReport {
        documents: docs.len(),
        footers,
    })
}

/// Read persisted state without touching anything.
pub fn site_status(config: &SiteConfig) -> Result<SiteStatus> {
    let processed = ProcessedSet::load(&config.processed_file);
    let keywords = KeywordQueue::load(&config.keywords_file)?;
    let documents = site::list_documents(&config.output_dir)?.len();
    let cache = ListingCache::load(&config.cache_file)
        .map(|c| (c.age(Utc::now()), c.items.len(), c.folder_ids));

    Ok(SiteStatus {
        processed: processed.len(),
        keywords_remaining: keywords.len(),
        documents,
        cache,
    })
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

struct Listing {
    items: Vec<RemoteItem>,
    from_cache: bool,
    folders_failed: Vec<String>,
}

/// Use the cache when fresh, otherwise list every folder.
///
/// A folder that fails is skipped; the cache is only rewritten when every
/// folder listed successfully.
async fn obtain_listing(ctx: &RunContext<'_>) -> Listing {
    let config = ctx.config;
    let now = Utc::now();

    if config.force_refresh {
        info!("cache bypassed by --refresh");
    } else {
        let (cache, status) =
            ListingCache::load_status(&config.cache_file, ctx.folder_ids, now, config.cache_ttl);
        match (cache, status) {
            (Some(cache), CacheStatus::Fresh) => {
                info!(items = cache.items.len(), age_min = cache.age(now).num_minutes(), "using cached listing");
                return Listing {
                    items: cache.items,
                    from_cache: true,
                    folders_failed: Vec::new(),
                };
            }
            (_, status) => info!(?status, "cache not usable, listing remote folders"),
        }
    }

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut folders_failed = Vec::new();

    for folder_id in ctx.folder_ids {
        match ctx.store.list(folder_id).await {
            Ok(listed) => {
                for item in listed {
                    if seen.insert(item.id.clone()) {
                        items.push(item);
                    }
                }
            }
            Err(error) => {
                warn!(folder_id = %folder_id, %error, "folder listing failed, skipping folder");
                folders_failed.push(folder_id.clone());
            }
        }
    }

    if folders_failed.is_empty() {
        let cache = ListingCache::new(ctx.folder_ids.to_vec(), items.clone(), now);
        if let Err(error) = cache.save(&config.cache_file) {
            warn!(%error, "could not write listing cache");
        }
    } else {
        warn!(failed = folders_failed.len(), "listing incomplete, cache not updated");
    }

    Listing {
        items,
        from_cache: false,
        folders_failed,
    }
}

fn skip(item: &RemoteItem, error: DriveSiteError) -> SkippedItem {
    SkippedItem {
        id: item.id.clone(),
        name: item.name.clone(),
        error,
    }
}
