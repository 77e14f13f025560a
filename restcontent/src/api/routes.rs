use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::archive::ExportManifest;
use crate::identity::Identity;
use crate::jobs::JobResult;
use crate::service::{BackupService, ExportStarted, RequestOrigin};

#[derive(Debug, Deserialize)]
pub struct StartExportRequest {
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartImportRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

/// Scheme and host the client used, honouring `X-Forwarded-Proto`.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"));
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    RequestOrigin::new(if https { "https" } else { "http" }, host)
}

pub async fn start_export(
    State(service): State<Arc<BackupService>>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    Json(request): Json<StartExportRequest>,
) -> Result<Json<ExportStarted>, ApiError> {
    let started = service
        .start_export(&identity, &request.options, &request_origin(&headers))
        .map_err(ApiError::job)?;
    Ok(Json(started))
}

pub async fn poll_export(
    State(service): State<Arc<BackupService>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<JobResult>, ApiError> {
    Ok(Json(service.poll_export(&query.key).map_err(ApiError::job)?))
}

pub async fn upload_import(
    State(service): State<Arc<BackupService>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<ExportManifest>, ApiError> {
    let manifest = service
        .upload_import(&identity, body)
        .await
        .map_err(|e| match e {
            crate::Error::Archive(_) => {
                ApiError::from(crate::Error::Validation(format!("invalid archive: {e}")))
            }
            other => ApiError::job(other),
        })?;
    Ok(Json(manifest))
}

pub async fn start_import(
    State(service): State<Arc<BackupService>>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    Json(request): Json<StartImportRequest>,
) -> Result<Json<JobResult>, ApiError> {
    let result = service
        .start_import(
            &identity,
            &request.key,
            &request.options,
            &request_origin(&headers),
        )
        .map_err(ApiError::job)?;
    Ok(Json(result))
}

pub async fn poll_import(
    State(service): State<Arc<BackupService>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<JobResult>, ApiError> {
    Ok(Json(service.poll_import(&query.key).map_err(ApiError::job)?))
}

/// GET <prefix>*path: the blob of a media record, or a redirect for
/// externally hosted ones.
pub async fn serve_media(
    State(service): State<Arc<BackupService>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let (folder, name) = match path.rsplit_once('/') {
        Some((folder, name)) => (format!("/{}/", folder.trim_matches('/')), name.to_string()),
        None => ("/".to_string(), path.clone()),
    };
    let folder = if folder == "//" { "/".to_string() } else { folder };

    let media = service
        .store()
        .find_media(&folder, &name)
        .await?
        .filter(|m| !m.directory)
        .ok_or_else(|| crate::Error::NotFound(format!("media {folder}{name}")))?;

    if media.external {
        return Ok((StatusCode::FOUND, [(header::LOCATION, media.store_path)]).into_response());
    }

    let data = service.media().read(&media.store_path).await?;
    let mime = mime_guess::from_path(&media.name).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], data).into_response())
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
