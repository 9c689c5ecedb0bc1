//! Video catalog and streaming endpoints

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use vodgate_core::catalog::{owner_segment, MediaInfo};
use vodgate_core::{Error, VideoId};

use super::middleware::CallerIdentity;
use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub folder: Option<String>,
}

/// GET /videos - list the caller's videos, optionally within one folder
pub async fn list_videos(
    identity: CallerIdentity,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let records = state
        .lister
        .list(&identity.server_id, &identity.login, query.folder.as_deref())
        .await?;
    Ok(Json(records).into_response())
}

/// GET /videos/stream/{id} - media bytes honoring Range
pub async fn stream_video(
    identity: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = VideoId::from_encoded(id);
    let remote_path = id.to_path()?;
    authorize(&remote_path, &state, &identity)?;

    let local_path = state
        .downloader
        .acquire(&id, &remote_path, &identity.server_id)
        .await?;

    let mut file = tokio::fs::File::open(&local_path)
        .await
        .map_err(|_| AppError::not_found("video not readable"))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(format!("stat failed: {e}")))?
        .len();

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, size));

    let content_type = content_type_for(&remote_path);

    match range {
        Some((start, end)) => {
            debug!(%id, start, end, size, "serving byte range");
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::internal(format!("seek failed: {e}")))?;
            let length = end - start + 1;
            let stream = ReaderStream::new(file.take(length));

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, length)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{size}"),
                )
                .body(Body::from_stream(stream))
                .map_err(|e| AppError::internal(format!("response build failed: {e}")))
        }
        None => {
            let stream = ReaderStream::new(file);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, size)
                .body(Body::from_stream(stream))
                .map_err(|e| AppError::internal(format!("response build failed: {e}")))
        }
    }
}

/// GET /videos/info/{id} - technical metadata, defaults when probing fails
pub async fn video_info(
    identity: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MediaInfo>> {
    let id = VideoId::from_encoded(id);
    let remote_path = id.to_path()?;
    authorize(&remote_path, &state, &identity)?;

    let info = match state.prober.probe(&identity.server_id, &remote_path).await {
        Ok(info) => info,
        Err(e) => {
            warn!(%id, error = %e, "probe failed, returning defaults");
            let name = std::path::Path::new(&remote_path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            MediaInfo::fallback(name)
        }
    };
    Ok(Json(info))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub removed: bool,
    pub cache_entry_removed: bool,
}

/// DELETE /videos/{id} - remove the remote file and any cache entry
pub async fn delete_video(
    identity: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let id = VideoId::from_encoded(id);
    let remote_path = id.to_path()?;
    authorize(&remote_path, &state, &identity)?;

    let output = state
        .executor
        .run(&identity.server_id, &["rm", "--", &remote_path])
        .await?;
    if !output.success() {
        if output.stderr.contains("No such file") {
            return Err(AppError::not_found("video not found"));
        }
        return Err(Error::UpstreamUnavailable(format!(
            "remote delete exited with status {}",
            output.status
        ))
        .into());
    }

    let cache_entry_removed = state.cache.remove(&id)?;
    info!(%id, cache_entry_removed, "video deleted");
    Ok(Json(DeleteResponse {
        removed: true,
        cache_entry_removed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub id: VideoId,
    pub name: String,
}

/// PUT /videos/{id}/rename - rename keeping the original extension
pub async fn rename_video(
    identity: CallerIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> AppResult<Json<RenameResponse>> {
    let id = VideoId::from_encoded(id);
    let remote_path = id.to_path()?;
    authorize(&remote_path, &state, &identity)?;

    let new_name = sanitize_name(&request.name)
        .ok_or_else(|| AppError::bad_request("invalid name"))?;

    let old = std::path::Path::new(&remote_path);
    let parent = old
        .parent()
        .ok_or_else(|| AppError::bad_request("invalid video path"))?;
    let extension = old
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .ok_or_else(|| Error::UnsupportedFormat("video has no extension".to_string()))?;
    let new_path = parent
        .join(format!("{new_name}.{extension}"))
        .to_string_lossy()
        .into_owned();

    let output = state
        .executor
        .run(
            &identity.server_id,
            &["mv", "--", &remote_path, &new_path],
        )
        .await?;
    if !output.success() {
        if output.stderr.contains("No such file") {
            return Err(AppError::not_found("video not found"));
        }
        return Err(Error::UpstreamUnavailable(format!(
            "remote rename exited with status {}",
            output.status
        ))
        .into());
    }

    // The old cache entry is keyed by the old path; drop it
    let _ = state.cache.remove(&id);

    let updated = state
        .store
        .update_path(&remote_path, &new_path, &new_name)
        .await?;
    info!(%id, catalog_updated = updated, "video renamed");

    Ok(Json(RenameResponse {
        id: VideoId::from_path(&new_path),
        name: new_name,
    }))
}

/// Ownership gate: the decoded path's owner segment must match the caller.
/// Runs before any remote I/O.
fn authorize(remote_path: &str, state: &AppState, identity: &CallerIdentity) -> AppResult<()> {
    let owner = owner_segment(remote_path, &state.config.remote.video_root);
    if owner != Some(identity.login.as_str()) {
        return Err(AppError::forbidden("video belongs to another user"));
    }
    Ok(())
}

/// Single-range `bytes=start-end` parser; anything else means "no range".
/// Suffix ranges and out-of-bounds starts deliberately fall back to the
/// full response rather than erroring.
fn parse_range(value: &str, size: u64) -> Option<(u64, u64)> {
    if size == 0 {
        return None;
    }
    let spec = value.strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    if start >= size {
        return None;
    }
    let end: u64 = match end.trim() {
        "" => size - 1,
        e => e.parse().ok()?,
    };
    let end = end.min(size - 1);
    if start > end {
        return None;
    }
    Some((start, end))
}

fn content_type_for(path: &str) -> &'static str {
    match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Strip path separators and whitespace from a requested display name.
fn sanitize_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}
