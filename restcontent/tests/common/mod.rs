//! Shared setup for the job integration tests.
#![allow(dead_code)]

use bytes::Bytes;
use restcontent::archive::ArchiveReader;
use restcontent::jobs::{JobResult, StrategyTable};
use restcontent::media::MediaLibrary;
use restcontent::model::{Media, Page, Site};
use restcontent::store::Store;
use restcontent::{BackupService, Config, Identity, RequestOrigin};
use restcontent_storage::{BlobStorage, LocalStorage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub service: Arc<BackupService>,
    pub temp: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_host("http://old.example")
    }

    /// A service whose media is published under `media_host`.
    pub fn with_host(media_host: &str) -> Self {
        Self::build(media_host, "/media/", StrategyTable::standard())
    }

    pub fn build(media_host: &str, media_prefix: &str, strategies: StrategyTable) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.media.host = Some(media_host.to_string());
        config.media.prefix = media_prefix.to_string();
        config.site.url = Some("site.example".to_string());

        let storage = Arc::new(LocalStorage::new(temp.path().join("uploads")));
        let media = Arc::new(MediaLibrary::new(storage, &config.media.prefix));
        let store = Store::open(temp.path().join("restcontent.db")).unwrap();
        let service = BackupService::new(store, media, &config).with_strategies(strategies);

        Self {
            service: Arc::new(service),
            temp,
        }
    }

    pub fn store(&self) -> &Store {
        self.service.store()
    }

    pub fn media(&self) -> &Arc<MediaLibrary> {
        self.service.media()
    }

    /// Number of blobs in the upload directory.
    pub async fn blob_count(&self) -> usize {
        LocalStorage::new(self.temp.path().join("uploads"))
            .list("")
            .await
            .unwrap()
            .len()
    }
}

pub fn admin() -> Identity {
    Identity::local_admin()
}

pub fn origin() -> RequestOrigin {
    RequestOrigin::new("http", "site.example")
}

pub fn groups(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Poll an export until it reaches a terminal state.
pub async fn wait_export(service: &BackupService, key: &str) -> JobResult {
    for _ in 0..200 {
        let result = service.poll_export(key).unwrap();
        if result.status.is_terminal() {
            return result;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("export {key} did not finish");
}

/// Poll an import until it reaches a terminal state.
pub async fn wait_import(service: &BackupService, key: &str) -> JobResult {
    for _ in 0..200 {
        let result = service.poll_import(key).unwrap();
        if result.status.is_terminal() {
            return result;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("import {key} did not finish");
}

/// Run an export to completion and return its archive bytes.
pub async fn export_archive(harness: &Harness, names: &[&str]) -> Vec<u8> {
    let started = harness
        .service
        .start_export(&admin(), &groups(names), &origin())
        .unwrap();
    let result = wait_export(&harness.service, &started.key).await;
    assert_eq!(result.reason, None);

    let name = format!("restcontent_export_{}.zip", started.key);
    let record = harness
        .store()
        .find_media("/", &name)
        .await
        .unwrap()
        .expect("export archive is recorded as media");
    assert_eq!(Some(record.size), result.download_size);
    harness.media().read(&record.store_path).await.unwrap().to_vec()
}

pub fn open_archive(data: Vec<u8>) -> ArchiveReader<Cursor<Vec<u8>>> {
    ArchiveReader::new(Cursor::new(data)).unwrap()
}

/// Upload and start an import, returning its final status.
pub async fn import_archive(harness: &Harness, data: Vec<u8>, names: &[&str]) -> JobResult {
    let manifest = harness
        .service
        .upload_import(&admin(), Bytes::from(data))
        .await
        .unwrap();
    harness
        .service
        .start_import(&admin(), &manifest.key, &groups(names), &origin())
        .unwrap();
    wait_import(&harness.service, &manifest.key).await
}

pub fn site(domain: &str) -> Site {
    Site {
        domain: domain.into(),
        name: domain.into(),
        ..Default::default()
    }
}

pub fn page(site_id: &str, id: &str, body: &str) -> Page {
    let mut page = Page::default();
    page.site_id = site_id.into();
    page.id = id.into();
    page.body = body.into();
    page
}

pub fn folder(path: &str, name: &str) -> Media {
    Media {
        path: path.into(),
        name: name.into(),
        directory: true,
        ..Default::default()
    }
}

/// Minimal PNG header declaring `w` x `h` pixels.
pub fn png(w: u32, h: u32) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&w.to_be_bytes());
    data.extend_from_slice(&h.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

/// Store a file through the media library and record it.
pub async fn add_file(harness: &Harness, path: &str, name: &str, data: Vec<u8>) -> Media {
    let upload = harness
        .media()
        .upload(path, name, Bytes::from(data))
        .await
        .unwrap();
    let mut media = Media {
        path: path.into(),
        name: name.into(),
        ..Default::default()
    };
    upload.apply_to(&mut media);
    assert!(harness.store().insert(&media).await.unwrap());
    media
}
