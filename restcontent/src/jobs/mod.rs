//! Background export and import jobs.
//!
//! A job is registered under its key, runs as one isolated task and is
//! observed only through polled [`JobResult`] snapshots.

mod export;
mod group;
mod import;
mod registry;
mod status;
mod strategy;
mod supervise;

pub use export::{ExportJob, ExportRequest};
pub use group::Group;
pub use import::{ImportJob, ImportRequest};
pub use registry::{JobKind, JobRegistry, RegisteredJob};
pub use status::{JobResult, JobStatus};
pub use strategy::{
    ContentRehomer, ExportContext, ExportHook, ExportRow, ImportContext, ImportHook,
    MediaBlobExporter, MediaRestorer, StrategyTable, TablePlan,
};
pub use supervise::{run_isolated, TaskFailure};

use std::future::Future;
use std::sync::Arc;

use crate::config::JobsConfig;
use crate::media::MediaLibrary;
use crate::store::Store;

/// Everything a job needs from its host.
#[derive(Clone)]
pub struct JobEnv {
    pub store: Store,
    pub media: Arc<MediaLibrary>,
    pub strategies: Arc<StrategyTable>,
    pub registry: JobRegistry,
    pub jobs: JobsConfig,
}

/// Run `work` for `entry` in the background, recording a panic as the job's
/// failure and scheduling eviction once it ends.
pub(crate) fn launch<F>(entry: RegisteredJob, env: &JobEnv, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let kind = entry.kind();
    let registry = env.registry.clone();
    let ttl = env.jobs.completed_ttl();

    metrics::counter!("restcontent_jobs_started_total", "kind" => kind.as_str()).increment(1);
    tracing::info!("Started {} job {}", kind, entry.key());

    tokio::spawn(async move {
        if let Err(failure) = run_isolated(work).await {
            tracing::warn!("Recovered from failure in {} job {}: {}", kind, entry.key(), failure);
            entry.status().fail(format!("recover: {failure}"));
        }

        let snapshot = entry.snapshot();
        metrics::counter!(
            "restcontent_jobs_finished_total",
            "kind" => kind.as_str(),
            "status" => snapshot.status.as_str()
        )
        .increment(1);
        match &snapshot.reason {
            Some(reason) => tracing::warn!("{} job {} failed: {}", kind, entry.key(), reason),
            None => tracing::info!("{} job {} finished", kind, entry.key()),
        }

        registry.evict_after(entry.key().to_string(), entry, ttl);
    });
}
