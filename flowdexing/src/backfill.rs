//! Metadata backfill. A single task periodically picks workflows that still
//! lack metadata, resolves their content hashes through the configured
//! gateway, and records per-workflow failures without aborting the batch.

mod fetcher;

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::repos::{Repo, RepoError};
use crate::FlowdexingRepo;

pub use fetcher::{is_valid_cid, FetchError, HttpMetadataFetcher, MetadataFetcher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn start(config: &Config) -> JoinHandle<()> {
    let repo = config.repo.clone();
    let fetcher = HttpMetadataFetcher::new(
        &config.metadata_endpoint,
        Duration::from_millis(config.metadata_timeout_ms),
    );
    let interval_ms = config.backfill_interval_ms;
    let batch_size = config.backfill_batch_size;
    let cooldown_secs = config.meta_retry_cooldown_secs;

    tokio::spawn(async move {
        let pool = repo.get_pool(1).await;
        let mut conn = FlowdexingRepo::get_conn(&pool).await;

        let mut poll = interval(Duration::from_millis(interval_ms));
        loop {
            poll.tick().await;

            let now = Utc::now().timestamp();
            match run_cycle::<FlowdexingRepo, _>(
                &mut conn,
                &fetcher,
                now,
                cooldown_secs,
                batch_size,
            )
            .await
            {
                Ok(report) if report.selected > 0 => {
                    info!(
                        selected = report.selected,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "metadata backfill cycle done"
                    );
                }
                Ok(_) => {}
                Err(error) => error!(%error, "metadata backfill cycle failed"),
            }
        }
    })
}

/// One backfill pass. A failed fetch marks only that workflow for cooldown;
/// the rest of the batch still gets processed.
pub async fn run_cycle<'a, R: Repo, F: MetadataFetcher>(
    conn: &mut R::Conn<'a>,
    fetcher: &F,
    now: i64,
    cooldown_secs: u64,
    batch_size: i64,
) -> Result<BackfillReport, RepoError> {
    let cutoff = now - cooldown_secs as i64;
    let due = R::get_due_backfills(conn, cutoff, batch_size).await?;

    let mut report = BackfillReport {
        selected: due.len(),
        ..Default::default()
    };

    for workflow in &due {
        match fetcher.fetch(&workflow.ipfs_hash).await {
            Ok(meta) => {
                R::fill_meta(conn, &workflow.ipfs_hash, &meta).await?;
                report.succeeded += 1;
            }
            Err(error) => {
                warn!(ipfs_hash = %workflow.ipfs_hash, %error, "metadata fetch failed");
                R::record_meta_failure(conn, &workflow.ipfs_hash, now).await?;
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
