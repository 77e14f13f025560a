use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::NamedTempFile;

use super::group::Group;
use super::registry::RegisteredJob;
use super::status::{JobResult, StatusCell};
use super::strategy::ImportContext;
use super::{launch, JobEnv};
use crate::archive::{ArchiveReader, ExportManifest};
use crate::error::Result;
use crate::identity::Identity;
use crate::rehome::MediaRehomer;
use crate::store::StoreTx;

/// Inputs of one import, supplied when it is started.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub groups: Vec<Group>,
    pub identity: Identity,
    /// Media host of the destination; embedded URLs are rewritten to it
    pub media_host: String,
}

/// An uploaded archive waiting to be applied, or being applied.
pub struct ImportJob {
    key: String,
    manifest: ExportManifest,
    archive: NamedTempFile,
    started: AtomicBool,
    status: StatusCell,
    env: JobEnv,
}

impl ImportJob {
    /// Spool `data` to a temporary file and read its manifest.
    ///
    /// Fails when the bytes are not a zip archive or lack `meta.json`.
    pub fn upload(env: JobEnv, key: String, data: &[u8]) -> Result<Self> {
        let mut archive = tempfile::Builder::new()
            .prefix("restcontent_import_")
            .suffix(".zip")
            .tempfile()?;
        archive.write_all(data)?;
        archive.flush()?;

        let mut reader = ArchiveReader::new(archive.reopen()?)?;
        let mut manifest = reader.manifest()?;
        manifest.key = key.clone();

        tracing::debug!(
            "Spooled import {} ({} bytes) from {} to {}",
            key,
            data.len(),
            manifest.from,
            archive.path().display()
        );

        Ok(Self {
            key,
            manifest,
            archive,
            started: AtomicBool::new(false),
            status: StatusCell::new(),
            env,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Manifest of the uploaded archive, carrying this job's key.
    pub fn manifest(&self) -> &ExportManifest {
        &self.manifest
    }

    pub fn result(&self) -> JobResult {
        self.status.snapshot()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn status(&self) -> &StatusCell {
        &self.status
    }

    /// Apply the archive in the background. Returns `false` if the job had
    /// already been started.
    pub fn start(self: &Arc<Self>, request: ImportRequest) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.status.set(JobResult::pending());
        let job = self.clone();
        launch(RegisteredJob::Import(self.clone()), &self.env, async move {
            job.run(request).await
        });
        true
    }

    async fn run(&self, request: ImportRequest) {
        match self.apply(&request).await {
            Ok(()) => self.status.set(JobResult::done()),
            Err(reason) => self.status.fail(reason),
        }
    }

    /// Every selected group in one transaction; the first hard error undoes all.
    async fn apply(&self, request: &ImportRequest) -> std::result::Result<(), String> {
        let archive = self
            .archive
            .reopen()
            .map_err(crate::Error::from)
            .and_then(ArchiveReader::new)
            .map_err(|e| format!("open archive: {e}"))?;

        let rehomer = MediaRehomer::new(
            &self.manifest.media_host,
            &self.manifest.media_prefix,
            &request.media_host,
            self.env.media.prefix(),
        );
        let mut ctx = ImportContext {
            identity: request.identity.clone(),
            archive,
            media: self.env.media.clone(),
            rehomer,
            restored: Vec::new(),
        };

        let mut tx = self
            .env
            .store
            .begin()
            .await
            .map_err(|e| format!("begin transaction: {e}"))?;

        for group in &request.groups {
            match self.import_group(&mut tx, &mut ctx, *group).await {
                Ok(count) => {
                    tracing::debug!("Import {}: {} rows inserted for {}", self.key, count, group)
                }
                Err(e) => {
                    if let Err(rb) = tx.rollback() {
                        tracing::warn!("Rollback of import {} failed: {}", self.key, rb);
                    }
                    discard_restored(&mut ctx).await;
                    return Err(format!("[{group}] import {e}"));
                }
            }
        }

        if let Err(e) = tx.commit() {
            discard_restored(&mut ctx).await;
            return Err(format!("commit: {e}"));
        }
        Ok(())
    }

    async fn import_group(
        &self,
        tx: &mut StoreTx,
        ctx: &mut ImportContext,
        group: Group,
    ) -> Result<u64> {
        let mut inserted_total = 0;

        for table in group.tables() {
            let Some(rows) = ctx.archive.read_group(table)? else {
                tracing::debug!("Archive {} has no {} entries", self.key, table);
                continue;
            };
            let plan = self.env.strategies.plan(table)?;

            for fields in rows {
                let mut record = match plan.accessor.unmarshal(fields) {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable {} row: {}", table, e);
                        metrics::counter!(
                            "restcontent_rows_skipped_total",
                            "group" => group.as_str()
                        )
                        .increment(1);
                        continue;
                    }
                };

                if let Some(hook) = &plan.import_hook {
                    hook.before_insert(ctx, &mut record).await?;
                }
                let inserted = plan.accessor.insert_conflict_free(tx.conn(), &record)?;
                if let Some(hook) = &plan.import_hook {
                    hook.after_insert(ctx, &record, inserted).await?;
                }
                if inserted {
                    inserted_total += 1;
                }
            }
        }

        Ok(inserted_total)
    }
}

/// Remove blobs written by an import that did not commit.
async fn discard_restored(ctx: &mut ImportContext) {
    for store_path in ctx.restored.drain(..) {
        if let Err(e) = ctx.media.delete(&store_path).await {
            tracing::warn!("Failed to remove restored blob {}: {}", store_path, e);
        }
    }
}
