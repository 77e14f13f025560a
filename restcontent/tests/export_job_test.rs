//! Export jobs against a real SQLite store and local blob storage.

mod common;

use common::*;
use restcontent::jobs::{JobStatus, StrategyTable};
use restcontent::store::{EntityAccessor, FieldMap, Record};
use restcontent::Error;
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;

#[tokio::test]
async fn test_export_sites_and_media() {
    let harness = Harness::new();
    harness.store().insert(&site("a.example")).await.unwrap();
    harness.store().insert(&site("b.example")).await.unwrap();
    harness.store().insert(&folder("/", "images")).await.unwrap();
    let logo = add_file(&harness, "/images/", "logo.png", png(64, 32)).await;
    assert_eq!(logo.dimensions, "64X32");

    let data = export_archive(&harness, &["sites", "media"]).await;
    let mut archive = open_archive(data);

    let sites = archive.read_group("sites").unwrap().unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0]["domain"], "a.example");

    let media = archive.read_group("media").unwrap().unwrap();
    assert_eq!(media.len(), 2);

    let blobs: Vec<String> = archive
        .entry_names()
        .into_iter()
        .filter(|n| n.starts_with("media/"))
        .collect();
    assert_eq!(blobs, vec![format!("media/{}", logo.store_path)]);

    let manifest = archive.manifest().unwrap();
    assert_eq!(manifest.from, "site.example");
    assert_eq!(manifest.media_host, "http://old.example");
    assert_eq!(manifest.media_prefix, "/media/");
    assert_eq!(manifest.author, "admin");
    let names: Vec<&str> = manifest.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["sites", "media"]);
    assert_eq!(manifest.group("media").unwrap().count, 2);
    assert!(manifest.group("media").unwrap().size > png(64, 32).len() as u64);
}

#[tokio::test]
async fn test_download_link_points_at_archive() {
    let harness = Harness::new();
    harness.store().insert(&site("a.example")).await.unwrap();

    let started = harness
        .service
        .start_export(&admin(), &groups(&["sites"]), &origin())
        .unwrap();
    assert_eq!(started.status, JobStatus::Pending);

    let result = wait_export(&harness.service, &started.key).await;
    assert_eq!(result.status, JobStatus::Done);
    assert_eq!(
        result.download_link.unwrap(),
        format!(
            "http://old.example/media/restcontent_export_{}.zip",
            started.key
        )
    );
    assert!(result.download_size.unwrap() > 0);

    // a terminal result is handed out once
    assert!(matches!(
        harness.service.poll_export(&started.key),
        Err(Error::NotFound(_))
    ));

    let record = harness
        .store()
        .find_media("/", &format!("restcontent_export_{}.zip", started.key))
        .await
        .unwrap()
        .unwrap();
    assert!(record.base.published);
    assert_eq!(record.base.creator_id, Some(1));
}

#[tokio::test]
async fn test_users_group_covers_three_tables() {
    let harness = Harness::new();
    let store = harness.store();
    store
        .insert(&restcontent::model::User {
            id: 1,
            email: "ada@example.com".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .insert(&restcontent::model::UserGroup {
            id: 1,
            name: "editors".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .insert(&restcontent::model::GroupMember {
            id: 1,
            user_id: 1,
            group_id: 1,
            role: "member".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut archive = open_archive(export_archive(&harness, &["users"]).await);
    for table in ["users", "groups", "group_members"] {
        assert_eq!(archive.read_group(table).unwrap().unwrap().len(), 1, "{table}");
    }
    let manifest = archive.manifest().unwrap();
    assert_eq!(manifest.options.len(), 1);
    assert_eq!(manifest.group("users").unwrap().count, 3);
}

#[tokio::test]
async fn test_overlapping_selection_dumps_each_table_once() {
    let harness = Harness::new();
    harness.store().insert(&site("a.example")).await.unwrap();
    harness
        .store()
        .insert(&restcontent::model::UserGroup {
            id: 1,
            name: "editors".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let data = export_archive(&harness, &["users", "groups", "sites", "sites"]).await;
    let mut archive = open_archive(data);

    let groups = archive.read_group("groups").unwrap().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(archive.read_group("sites").unwrap().unwrap().len(), 1);

    let manifest = archive.manifest().unwrap();
    let names: Vec<&str> = manifest.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["users", "sites"]);
    assert_eq!(manifest.group("users").unwrap().count, 1);
}

#[tokio::test]
async fn test_reserved_archives_are_not_exported() {
    let harness = Harness::new();
    add_file(&harness, "/", "restcontent_backup_nightly.zip", b"PK old".to_vec()).await;
    add_file(&harness, "/", "restcontent_export_site-2024-01-01-abc.zip", b"PK".to_vec()).await;
    let photos = add_file(&harness, "/", "photos.zip", b"PK photos".to_vec()).await;

    let mut archive = open_archive(export_archive(&harness, &["media"]).await);

    let rows = archive.read_group("media").unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "photos.zip");

    let blobs: Vec<String> = archive
        .entry_names()
        .into_iter()
        .filter(|n| n.starts_with("media/"))
        .collect();
    assert_eq!(blobs, vec![format!("media/{}", photos.store_path)]);
    assert_eq!(archive.manifest().unwrap().group("media").unwrap().count, 1);
}

#[tokio::test]
async fn test_missing_blob_fails_media_group() {
    let harness = Harness::new();
    let file = add_file(&harness, "/", "notes.txt", b"hello".to_vec()).await;
    harness.media().delete(&file.store_path).await.unwrap();

    let started = harness
        .service
        .start_export(&admin(), &groups(&["media"]), &origin())
        .unwrap();
    let result = wait_export(&harness.service, &started.key).await;

    assert_eq!(result.status, JobStatus::Error);
    assert!(result.reason.unwrap().starts_with("[media] dump"));
    assert!(result.download_link.is_none());
}

#[tokio::test]
async fn test_concurrent_exports_report_separately() {
    let harness = Harness::new();
    harness.store().insert(&site("a.example")).await.unwrap();
    add_file(&harness, "/", "a.txt", b"aaa".to_vec()).await;

    let first = harness
        .service
        .start_export(&admin(), &groups(&["sites"]), &origin())
        .unwrap();
    let second = harness
        .service
        .start_export(&admin(), &groups(&["media"]), &origin())
        .unwrap();
    assert_ne!(first.key, second.key);

    let (r1, r2) = tokio::join!(
        wait_export(&harness.service, &first.key),
        wait_export(&harness.service, &second.key)
    );
    assert!(r1.download_link.unwrap().contains(&first.key));
    assert!(r2.download_link.unwrap().contains(&second.key));
}

struct PanickingAccessor;

impl EntityAccessor for PanickingAccessor {
    fn table(&self) -> &'static str {
        "sites"
    }

    fn list(&self, _conn: &Connection) -> restcontent::Result<Vec<Record>> {
        panic!("sites accessor exploded");
    }

    fn marshal_one(&self, _record: &Record) -> restcontent::Result<FieldMap> {
        Ok(FieldMap::new())
    }

    fn unmarshal(&self, _fields: Value) -> restcontent::Result<Record> {
        Err(Error::Marshal("unsupported".into()))
    }

    fn insert_conflict_free(
        &self,
        _conn: &Connection,
        _record: &Record,
    ) -> restcontent::Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_panic_in_job_is_recovered() {
    let mut strategies = StrategyTable::standard();
    strategies.replace_accessor("sites", Arc::new(PanickingAccessor));
    let harness = Harness::build("http://old.example", "/media/", strategies);

    let started = harness
        .service
        .start_export(&admin(), &groups(&["sites"]), &origin())
        .unwrap();
    let result = wait_export(&harness.service, &started.key).await;

    assert_eq!(result.status, JobStatus::Error);
    assert_eq!(
        result.reason.as_deref(),
        Some("recover: sites accessor exploded")
    );

    // the store is still usable after the panic
    assert!(harness.store().insert(&site("after.example")).await.unwrap());
}
