use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use super::group::Group;
use super::registry::RegisteredJob;
use super::status::{JobResult, StatusCell};
use super::strategy::{ExportContext, ExportRow};
use super::{launch, JobEnv};
use crate::archive::{ArchiveWriter, ExportManifest, GroupSummary};
use crate::error::Result;
use crate::identity::Identity;
use crate::model::Media;

/// Inputs of one export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub groups: Vec<Group>,
    pub identity: Identity,
    /// Label of the exporting site, recorded as the manifest's `from`
    pub origin: String,
    pub media_host: String,
    pub author: String,
    pub build_time: String,
}

/// Dumps the selected groups into a zip archive and publishes it as media.
pub struct ExportJob {
    key: String,
    request: ExportRequest,
    status: StatusCell,
    env: JobEnv,
}

impl ExportJob {
    pub fn new(env: JobEnv, key: String, request: ExportRequest) -> Self {
        Self {
            key,
            request,
            status: StatusCell::new(),
            env,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn result(&self) -> JobResult {
        self.status.snapshot()
    }

    pub(crate) fn status(&self) -> &StatusCell {
        &self.status
    }

    /// Archive name of this export's download.
    pub fn archive_name(&self) -> String {
        format!("restcontent_export_{}.zip", self.key)
    }

    /// Mark the job pending and run it in the background.
    pub fn start(self: &Arc<Self>) {
        self.status.set(JobResult::pending());
        let job = self.clone();
        launch(RegisteredJob::Export(self.clone()), &self.env, async move {
            job.run().await
        });
    }

    async fn run(&self) {
        match self.dump().await {
            Ok(result) => self.status.set(result),
            Err(reason) => self.status.fail(reason),
        }
    }

    async fn dump(&self) -> std::result::Result<JobResult, String> {
        let mut ctx = ExportContext {
            writer: ArchiveWriter::new(self.env.jobs.compress_archives),
            media: self.env.media.clone(),
        };

        let mut options = Vec::with_capacity(self.request.groups.len());
        for group in &self.request.groups {
            let summary = self
                .dump_group(&mut ctx, *group)
                .await
                .map_err(|e| format!("[{group}] dump {e}"))?;
            tracing::debug!(
                "Export {}: {} rows, {} bytes for {}",
                self.key,
                summary.count,
                summary.size,
                group
            );
            options.push(summary);
        }

        let manifest = ExportManifest {
            build_time: self.request.build_time.clone(),
            options,
            from: self.request.origin.clone(),
            media_host: self.request.media_host.clone(),
            media_prefix: self.env.media.prefix().to_string(),
            export_time: Utc::now(),
            author: self.request.author.clone(),
            key: self.key.clone(),
        };
        ctx.writer
            .write_manifest(&manifest)
            .map_err(|e| format!("upload archive: {e}"))?;
        let data = ctx
            .writer
            .finish()
            .map_err(|e| format!("upload archive: {e}"))?;

        self.publish(data).await
    }

    async fn dump_group(&self, ctx: &mut ExportContext, group: Group) -> Result<GroupSummary> {
        let mut summary = GroupSummary {
            name: group.to_string(),
            ..Default::default()
        };

        for table in group.tables() {
            let plan = self.env.strategies.plan(table)?;
            let records = {
                let conn = self.env.store.conn().await;
                plan.accessor.list(&conn)?
            };

            let mut rows = Vec::with_capacity(records.len());
            let mut blob_bytes = 0;
            for record in &records {
                if let Some(hook) = &plan.export_hook {
                    match hook.on_row(ctx, record).await? {
                        ExportRow::Include { blob_bytes: n } => blob_bytes += n,
                        ExportRow::Exclude => continue,
                    }
                }
                rows.push(plan.accessor.marshal_one(record)?);
            }

            let json_bytes = ctx.writer.write_group(table, &rows)?;
            summary.count += rows.len() as u64;
            summary.size += json_bytes + blob_bytes;
        }

        Ok(summary)
    }

    /// Store the archive and record it as a media entry at `/`.
    async fn publish(&self, data: Vec<u8>) -> std::result::Result<JobResult, String> {
        let name = self.archive_name();
        let upload = self
            .env
            .media
            .upload("/", &name, Bytes::from(data))
            .await
            .map_err(|e| format!("upload archive: {e}"))?;

        let now = Utc::now();
        let mut media = Media {
            path: "/".to_string(),
            name: name.clone(),
            ..Default::default()
        };
        upload.apply_to(&mut media);
        media.base.created_at = now;
        media.base.updated_at = now;
        media.base.publish();
        media.base.stamp_creator(self.request.identity.user_id);

        let created = match self.env.store.insert(&media).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("create result: media /{name} already exists")),
            Err(e) => Err(format!("create result: {e}")),
        };
        if let Err(reason) = created {
            if let Err(e) = self.env.media.delete(&upload.store_path).await {
                tracing::warn!("Failed to remove orphaned archive {}: {}", upload.store_path, e);
            }
            return Err(reason);
        }

        Ok(JobResult {
            download_link: Some(
                self.env
                    .media
                    .public_url(&self.request.media_host, "/", &name),
            ),
            download_size: Some(upload.size),
            ..JobResult::done()
        })
    }
}
