//! Per-table handling for export and import.
//!
//! Each table maps to an accessor plus optional hooks that run around every
//! row. Tables without hooks are dumped and restored verbatim.

use async_trait::async_trait;
use bytes::Bytes;
use restcontent_storage::StorePath;
use std::collections::HashMap;
use std::fs::File;
use std::sync::Arc;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::media::MediaLibrary;
use crate::model::{Category, GroupMember, Media, Page, Post, Site, User, UserGroup};
use crate::rehome::MediaRehomer;
use crate::store::{Entity, EntityAccessor, Record, TableAccessor};

/// State threaded through every row of one export.
pub struct ExportContext {
    pub writer: ArchiveWriter,
    pub media: Arc<MediaLibrary>,
}

/// What to do with one exported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRow {
    /// Write the row. `blob_bytes` counts bytes the hook added to the archive.
    Include { blob_bytes: u64 },
    /// Leave the row out of the archive and the counts.
    Exclude,
}

#[async_trait]
pub trait ExportHook: Send + Sync {
    async fn on_row(&self, ctx: &mut ExportContext, record: &Record) -> Result<ExportRow>;
}

/// State threaded through every row of one import.
pub struct ImportContext {
    pub identity: Identity,
    pub archive: ArchiveReader<File>,
    pub media: Arc<MediaLibrary>,
    pub rehomer: MediaRehomer,
    /// Store paths written during this import, removed again on rollback.
    pub restored: Vec<String>,
}

#[async_trait]
pub trait ImportHook: Send + Sync {
    /// Adjust `record` before its conflict-free insert.
    async fn before_insert(&self, ctx: &mut ImportContext, record: &mut Record) -> Result<()>;

    /// Called with `inserted == false` when the insert was skipped as a duplicate.
    async fn after_insert(
        &self,
        _ctx: &mut ImportContext,
        _record: &Record,
        _inserted: bool,
    ) -> Result<()> {
        Ok(())
    }
}

/// Accessor and hooks for one table.
#[derive(Clone)]
pub struct TablePlan {
    pub accessor: Arc<dyn EntityAccessor>,
    pub export_hook: Option<Arc<dyn ExportHook>>,
    pub import_hook: Option<Arc<dyn ImportHook>>,
}

impl TablePlan {
    pub fn new(accessor: Arc<dyn EntityAccessor>) -> Self {
        Self {
            accessor,
            export_hook: None,
            import_hook: None,
        }
    }

    pub fn for_entity<E: Entity>() -> Self {
        Self::new(Arc::new(TableAccessor::<E>::new()))
    }

    pub fn with_export_hook(mut self, hook: Arc<dyn ExportHook>) -> Self {
        self.export_hook = Some(hook);
        self
    }

    pub fn with_import_hook(mut self, hook: Arc<dyn ImportHook>) -> Self {
        self.import_hook = Some(hook);
        self
    }
}

/// Table name to [`TablePlan`].
#[derive(Clone)]
pub struct StrategyTable {
    plans: HashMap<&'static str, TablePlan>,
}

impl StrategyTable {
    pub fn empty() -> Self {
        Self {
            plans: HashMap::new(),
        }
    }

    /// Plans for every stored record type.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.insert(User::TABLE, TablePlan::for_entity::<User>());
        table.insert(UserGroup::TABLE, TablePlan::for_entity::<UserGroup>());
        table.insert(GroupMember::TABLE, TablePlan::for_entity::<GroupMember>());
        table.insert(Site::TABLE, TablePlan::for_entity::<Site>());
        table.insert(Category::TABLE, TablePlan::for_entity::<Category>());

        let rehomer: Arc<dyn ImportHook> = Arc::new(ContentRehomer);
        table.insert(
            Page::TABLE,
            TablePlan::for_entity::<Page>().with_import_hook(rehomer.clone()),
        );
        table.insert(
            Post::TABLE,
            TablePlan::for_entity::<Post>().with_import_hook(rehomer),
        );
        table.insert(
            Media::TABLE,
            TablePlan::for_entity::<Media>()
                .with_export_hook(Arc::new(MediaBlobExporter))
                .with_import_hook(Arc::new(MediaRestorer)),
        );
        table
    }

    pub fn insert(&mut self, table: &'static str, plan: TablePlan) {
        self.plans.insert(table, plan);
    }

    /// Swap the accessor of an existing plan, keeping its hooks.
    pub fn replace_accessor(&mut self, table: &'static str, accessor: Arc<dyn EntityAccessor>) {
        match self.plans.get_mut(table) {
            Some(plan) => plan.accessor = accessor,
            None => self.insert(table, TablePlan::new(accessor)),
        }
    }

    pub fn plan(&self, table: &str) -> Result<&TablePlan> {
        self.plans
            .get(table)
            .ok_or_else(|| Error::Internal(format!("no strategy for table {table}")))
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Copies the blob of every local media record into `media/<storePath>`.
///
/// Archives this engine produced itself are left out.
pub struct MediaBlobExporter;

#[async_trait]
impl ExportHook for MediaBlobExporter {
    async fn on_row(&self, ctx: &mut ExportContext, record: &Record) -> Result<ExportRow> {
        let Record::Media(media) = record else {
            return Ok(ExportRow::Include { blob_bytes: 0 });
        };
        if !media.is_active() {
            return Ok(ExportRow::Include { blob_bytes: 0 });
        }
        if media.is_reserved_archive() {
            tracing::debug!("Skipping backup archive {}{}", media.path, media.name);
            return Ok(ExportRow::Exclude);
        }

        let store_path = StorePath::parse(&media.store_path)?;
        let data = ctx.media.read(store_path.as_str()).await?;
        let blob_bytes = ctx.writer.write_blob(&store_path, &data)?;
        Ok(ExportRow::Include { blob_bytes })
    }
}

/// Re-stores archived blobs under fresh store paths.
pub struct MediaRestorer;

#[async_trait]
impl ImportHook for MediaRestorer {
    async fn before_insert(&self, ctx: &mut ImportContext, record: &mut Record) -> Result<()> {
        let Record::Media(media) = record else {
            return Ok(());
        };
        if !media.is_active() {
            return Ok(());
        }

        let store_path = StorePath::parse(&media.store_path)?;
        let data = ctx.archive.read_blob(&store_path)?;
        let upload = ctx
            .media
            .upload(&media.path, &media.name, Bytes::from(data))
            .await?;
        ctx.restored.push(upload.store_path.clone());

        upload.apply_to(media);
        media.directory = false;
        media.base.publish();
        media.base.stamp_creator(ctx.identity.user_id);
        Ok(())
    }

    async fn after_insert(
        &self,
        ctx: &mut ImportContext,
        record: &Record,
        inserted: bool,
    ) -> Result<()> {
        if inserted {
            return Ok(());
        }
        let Record::Media(media) = record else {
            return Ok(());
        };
        if let Some(pos) = ctx.restored.iter().position(|p| *p == media.store_path) {
            let store_path = ctx.restored.remove(pos);
            ctx.media.delete(&store_path).await?;
        }
        Ok(())
    }
}

/// Points embedded media URLs at the destination and claims the record.
pub struct ContentRehomer;

#[async_trait]
impl ImportHook for ContentRehomer {
    async fn before_insert(&self, ctx: &mut ImportContext, record: &mut Record) -> Result<()> {
        let article = match record {
            Record::Page(page) => &mut page.0,
            Record::Post(post) => &mut post.0,
            _ => return Ok(()),
        };
        ctx.rehomer.apply(article);
        article.base.stamp_creator(ctx.identity.user_id);
        Ok(())
    }
}
