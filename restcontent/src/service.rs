//! The job control surface: start, upload and poll backup jobs.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::archive::ExportManifest;
use crate::config::{Config, SiteConfig};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::jobs::{
    ExportJob, ExportRequest, Group, ImportJob, ImportRequest, JobEnv, JobKind, JobRegistry,
    JobResult, JobStatus, RegisteredJob, StrategyTable,
};
use crate::media::MediaLibrary;
use crate::store::Store;
use crate::util::{random_text, sanitize_label};

const EXPORT_KEY_RANDOM_LEN: usize = 10;
const IMPORT_KEY_RANDOM_LEN: usize = 12;

/// Scheme and host a request arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Reply to a started export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportStarted {
    pub status: JobStatus,
    pub key: String,
}

/// Owns the job registry and hands out jobs against one store and media library.
pub struct BackupService {
    env: JobEnv,
    site: SiteConfig,
    media_host: Option<String>,
}

impl BackupService {
    pub fn new(store: Store, media: Arc<MediaLibrary>, config: &Config) -> Self {
        Self {
            env: JobEnv {
                store,
                media,
                strategies: Arc::new(StrategyTable::standard()),
                registry: JobRegistry::new(),
                jobs: config.jobs.clone(),
            },
            site: config.site.clone(),
            media_host: config.media.host.clone(),
        }
    }

    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.env.strategies = Arc::new(strategies);
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.env.registry
    }

    pub fn store(&self) -> &Store {
        &self.env.store
    }

    pub fn media(&self) -> &Arc<MediaLibrary> {
        &self.env.media
    }

    pub fn start_export(
        &self,
        identity: &Identity,
        groups: &[String],
        origin: &RequestOrigin,
    ) -> Result<ExportStarted> {
        identity.require_superuser()?;
        let groups = Group::parse_list(groups)?;

        let label = sanitize_label(&self.origin_label(origin));
        let key = format!(
            "{}-{}-{}",
            label,
            Utc::now().format("%Y-%m-%d"),
            random_text(EXPORT_KEY_RANDOM_LEN)
        );

        let request = ExportRequest {
            groups,
            identity: identity.clone(),
            origin: label,
            media_host: self.media_host(origin),
            author: self.site.admin.clone().unwrap_or_else(|| identity.name.clone()),
            build_time: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).to_string(),
        };
        let job = Arc::new(ExportJob::new(self.env.clone(), key.clone(), request));
        self.env
            .registry
            .store(key.clone(), RegisteredJob::Export(job.clone()));
        job.start();

        Ok(ExportStarted {
            status: JobStatus::Pending,
            key,
        })
    }

    pub fn poll_export(&self, key: &str) -> Result<JobResult> {
        self.poll(JobKind::Export, key)
    }

    /// Spool an archive and register an import for it. The returned manifest
    /// carries the new import key.
    pub async fn upload_import(&self, identity: &Identity, data: Bytes) -> Result<ExportManifest> {
        identity.require_superuser()?;
        if data.is_empty() {
            return Err(Error::Validation("empty upload".to_string()));
        }

        let key = format!("import_{}", random_text(IMPORT_KEY_RANDOM_LEN));
        let env = self.env.clone();
        let job_key = key.clone();
        let job = tokio::task::spawn_blocking(move || ImportJob::upload(env, job_key, &data))
            .await
            .map_err(|e| Error::Internal(format!("upload task: {e}")))??;

        let job = Arc::new(job);
        let manifest = job.manifest().clone();
        let entry = RegisteredJob::Import(job);
        self.env.registry.store(key.clone(), entry.clone());
        self.env
            .registry
            .evict_after(key, entry, self.env.jobs.upload_ttl());

        Ok(manifest)
    }

    /// Start a previously uploaded import.
    ///
    /// A finished job is removed and its final snapshot returned; a running
    /// one is left alone.
    pub fn start_import(
        &self,
        identity: &Identity,
        key: &str,
        groups: &[String],
        origin: &RequestOrigin,
    ) -> Result<JobResult> {
        identity.require_superuser()?;
        if key.is_empty() {
            return Err(Error::Validation("missing key".to_string()));
        }
        let groups = Group::parse_list(groups)?;

        let Some(RegisteredJob::Import(job)) = self.env.registry.load(key) else {
            return Err(Error::NotFound(format!("import job {key}")));
        };

        let snapshot = job.result();
        if snapshot.status.is_terminal() {
            self.env
                .registry
                .remove_if_same(key, &RegisteredJob::Import(job));
            return Ok(snapshot);
        }

        job.start(ImportRequest {
            groups,
            identity: identity.clone(),
            media_host: self.media_host(origin),
        });
        Ok(job.result())
    }

    pub fn poll_import(&self, key: &str) -> Result<JobResult> {
        self.poll(JobKind::Import, key)
    }

    /// Snapshot of a job; a terminal job is handed out once and then dropped.
    fn poll(&self, kind: JobKind, key: &str) -> Result<JobResult> {
        if key.is_empty() {
            return Err(Error::Validation("missing key".to_string()));
        }
        let job = self
            .env
            .registry
            .load(key)
            .filter(|job| job.kind() == kind)
            .ok_or_else(|| Error::NotFound(format!("{kind} job {key}")))?;

        let snapshot = job.snapshot();
        if snapshot.status.is_terminal() {
            self.env.registry.remove_if_same(key, &job);
        }
        Ok(snapshot)
    }

    fn origin_label(&self, origin: &RequestOrigin) -> String {
        match &self.site.url {
            Some(url) => {
                let bare = url
                    .strip_prefix("https://")
                    .or_else(|| url.strip_prefix("http://"))
                    .unwrap_or(url);
                bare.trim_end_matches('/').to_string()
            }
            None => origin.host.clone(),
        }
    }

    fn media_host(&self, origin: &RequestOrigin) -> String {
        self.media_host
            .clone()
            .unwrap_or_else(|| origin.base_url())
    }
}
