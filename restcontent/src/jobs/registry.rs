use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::export::ExportJob;
use super::import::ImportJob;
use super::status::{JobResult, StatusCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Export,
    Import,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Export => "export",
            JobKind::Import => "import",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as held by the registry.
#[derive(Clone)]
pub enum RegisteredJob {
    Export(Arc<ExportJob>),
    Import(Arc<ImportJob>),
}

impl RegisteredJob {
    pub fn kind(&self) -> JobKind {
        match self {
            RegisteredJob::Export(_) => JobKind::Export,
            RegisteredJob::Import(_) => JobKind::Import,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RegisteredJob::Export(job) => job.key(),
            RegisteredJob::Import(job) => job.key(),
        }
    }

    pub(crate) fn status(&self) -> &StatusCell {
        match self {
            RegisteredJob::Export(job) => job.status(),
            RegisteredJob::Import(job) => job.status(),
        }
    }

    pub fn snapshot(&self) -> JobResult {
        self.status().snapshot()
    }

    /// True while a background task may still write this job's status.
    ///
    /// An import that was uploaded but never started is not in flight.
    pub fn is_in_flight(&self) -> bool {
        let started = match self {
            RegisteredJob::Export(_) => true,
            RegisteredJob::Import(job) => job.is_started(),
        };
        started && !self.status().is_terminal()
    }

    pub fn ptr_eq(&self, other: &RegisteredJob) -> bool {
        match (self, other) {
            (RegisteredJob::Export(a), RegisteredJob::Export(b)) => Arc::ptr_eq(a, b),
            (RegisteredJob::Import(a), RegisteredJob::Import(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Process-wide map of live jobs, shared by the service and job tasks.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, RegisteredJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: impl Into<String>, job: RegisteredJob) {
        self.jobs.write().insert(key.into(), job);
    }

    pub fn load(&self, key: &str) -> Option<RegisteredJob> {
        self.jobs.read().get(key).cloned()
    }

    pub fn delete(&self, key: &str) {
        self.jobs.write().remove(key);
    }

    /// Remove `key` only if it still maps to `job`.
    pub fn remove_if_same(&self, key: &str, job: &RegisteredJob) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.get(key) {
            Some(current) if current.ptr_eq(job) => {
                jobs.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// After `delay`, drop `job` unless it has been replaced or is still running.
    pub fn evict_after(&self, key: String, job: RegisteredJob, delay: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if job.is_in_flight() {
                return;
            }
            if registry.remove_if_same(&key, &job) {
                tracing::debug!("Evicted {} job {}", job.kind(), key);
            }
        });
    }
}
