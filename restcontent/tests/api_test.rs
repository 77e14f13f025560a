//! End-to-end HTTP tests for the backup API.
//!
//! Each test starts a real Axum server on a random port and drives it with
//! reqwest.

use bytes::Bytes;
use restcontent::api::{ApiServer, KeyChecker};
use restcontent::archive::ArchiveWriter;
use restcontent::config::ApiKeyConfig;
use restcontent::media::MediaLibrary;
use restcontent::model::{Media, Site};
use restcontent::store::Store;
use restcontent::{BackupService, Config};
use restcontent_storage::LocalStorage;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    service: Arc<BackupService>,
    _temp: TempDir,
}

async fn start_server(config: Config) -> TestServer {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path().join("uploads")));
    let media = Arc::new(MediaLibrary::new(storage, &config.media.prefix));
    let store = Store::open(temp.path().join("restcontent.db")).unwrap();
    let service = Arc::new(BackupService::new(store, media, &config));

    let checker = KeyChecker::new(&config.security, &config.media.prefix);
    let router = ApiServer::new(service.clone(), &config.server, checker).router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base_url: format!("http://{}", addr),
        service,
        _temp: temp,
    }
}

async fn poll_until_done(client: &Client, url: &str) -> Value {
    for _ in 0..200 {
        let resp = client.get(url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        if body["status"] != "pending" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job at {url} did not finish");
}

#[tokio::test]
async fn test_health() {
    let server = start_server(Config::default()).await;
    let resp = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_export_download_and_import() {
    let server = start_server(Config::default()).await;
    let client = Client::new();
    for domain in ["a.example", "b.example"] {
        server
            .service
            .store()
            .insert(&Site {
                domain: domain.into(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let resp = client
        .post(format!("{}/admin/export/start", server.base_url))
        .json(&json!({"options": ["sites"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let started: Value = resp.json().await.unwrap();
    assert_eq!(started["status"], "pending");
    let key = started["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("127.0.0.1_"), "{key}");

    let done = poll_until_done(
        &client,
        &format!("{}/admin/export/poll?key={}", server.base_url, key),
    )
    .await;
    assert_eq!(done["status"], "done");
    let link = done["downloadLink"].as_str().unwrap();
    assert_eq!(
        link,
        format!("{}/media/restcontent_export_{}.zip", server.base_url, key)
    );

    let resp = client.get(link).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    let archive = resp.bytes().await.unwrap();
    assert_eq!(archive.len() as u64, done["downloadSize"].as_u64().unwrap());

    let resp = client
        .post(format!("{}/admin/import/upload", server.base_url))
        .body(archive)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let manifest: Value = resp.json().await.unwrap();
    assert_eq!(manifest["options"][0]["name"], "sites");
    assert_eq!(manifest["options"][0]["count"], 2);
    let import_key = manifest["key"].as_str().unwrap().to_string();
    assert!(import_key.starts_with("import_"));

    let resp = client
        .post(format!("{}/admin/import/start", server.base_url))
        .json(&json!({"key": import_key, "options": ["sites"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let done = poll_until_done(
        &client,
        &format!("{}/admin/import/poll?key={}", server.base_url, import_key),
    )
    .await;
    assert_eq!(done["status"], "done");
    assert!(done.get("reason").is_none());

    // duplicates were skipped
    assert_eq!(server.service.store().count("sites").await.unwrap(), 2);
}

#[tokio::test]
async fn test_error_responses() {
    let server = start_server(Config::default()).await;
    let client = Client::new();

    let resp = client
        .post(format!("{}/admin/export/start", server.base_url))
        .json(&json!({"options": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = client
        .post(format!("{}/admin/export/start", server.base_url))
        .json(&json!({"options": ["widgets"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{}/admin/export/poll?key=missing", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/admin/import/upload", server.base_url))
        .body("not a zip")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut writer = ArchiveWriter::new(false);
    writer.write_raw("meta.json", b"{not json").unwrap();
    let resp = client
        .post(format!("{}/admin/import/upload", server.base_url))
        .body(writer.finish().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("meta.json"));

    let resp = client
        .post(format!("{}/admin/import/start", server.base_url))
        .json(&json!({"key": "import_unknown", "options": ["sites"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{}/media/nope.png", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_content_types() {
    let server = start_server(Config::default()).await;
    let client = Client::new();

    for (name, data) in [
        ("report.csv", "a,b\n1,2\n"),
        ("font.woff2", "wOF2"),
        ("logo.png", "\u{89}PNG"),
    ] {
        let upload = server
            .service
            .media()
            .upload("/files/", name, Bytes::from(data))
            .await
            .unwrap();
        let mut media = Media {
            path: "/files/".into(),
            name: name.into(),
            ..Default::default()
        };
        upload.apply_to(&mut media);
        assert!(server.service.store().insert(&media).await.unwrap());
    }

    for (name, expected) in [
        ("report.csv", "text/csv"),
        ("font.woff2", "font/woff2"),
        ("logo.png", "image/png"),
    ] {
        let resp = client
            .get(format!("{}/media/files/{}", server.base_url, name))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{name}");
        assert_eq!(resp.headers()["content-type"], expected, "{name}");
    }
}

#[tokio::test]
async fn test_api_keys() {
    let mut config = Config::default();
    config.security.enabled = true;
    config.security.api_keys = vec![
        ApiKeyConfig {
            key: "rc_admin".into(),
            name: "ops".into(),
            user_id: 2,
            superuser: true,
        },
        ApiKeyConfig {
            key: "rc_editor".into(),
            name: "editor".into(),
            user_id: 3,
            superuser: false,
        },
    ];
    let server = start_server(config).await;
    let client = Client::new();
    let url = format!("{}/admin/export/start", server.base_url);
    let body = json!({"options": ["sites"]});

    let resp = client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(&url)
        .bearer_auth("rc_wrong")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(&url)
        .bearer_auth("rc_editor")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .post(&url)
        .bearer_auth("rc_admin")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
