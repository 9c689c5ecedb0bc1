//! Remote video catalog listing
//!
//! One recursive `find` over the owner's directory on the origin server,
//! parsed into [`VideoRecord`]s, with a best-effort duration probe per
//! file. Listing is not latency critical; callers cache the result.

pub mod probe;

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::identifier::VideoId;
use crate::remote::RemoteExecutor;

pub use probe::{MediaInfo, MediaProber};

/// Extensions the catalog recognises as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v"];

/// One remote video, built per listing call and never persisted here.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub duration_secs: f64,
    pub permissions: String,
    pub server_id: String,
    pub owner: String,
}

/// Owner segment of an absolute path under the video root, e.g.
/// `/srv/media/alice/clips/a.mp4` with root `/srv/media` yields `alice`.
pub fn owner_segment<'a>(path: &'a str, video_root: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(video_root)?;
    let rest = rest.trim_start_matches('/');
    let owner = rest.split('/').next()?;
    if owner.is_empty() {
        None
    } else {
        Some(owner)
    }
}

pub struct CatalogLister {
    executor: Arc<dyn RemoteExecutor>,
    prober: Arc<MediaProber>,
    video_root: String,
}

impl CatalogLister {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        prober: Arc<MediaProber>,
        video_root: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            prober,
            video_root: video_root.into(),
        }
    }

    /// List all videos for `owner`, optionally restricted to one folder.
    ///
    /// An unreachable or empty base path yields an empty list, never an
    /// error.
    pub async fn list(
        &self,
        server_id: &str,
        owner: &str,
        folder: Option<&str>,
    ) -> Result<Vec<VideoRecord>> {
        let mut base = format!("{}/{}", self.video_root.trim_end_matches('/'), owner);
        if let Some(folder) = folder {
            base.push('/');
            base.push_str(folder.trim_matches('/'));
        }

        let patterns: Vec<String> = VIDEO_EXTENSIONS
            .iter()
            .map(|ext| format!("*.{ext}"))
            .collect();
        let mut command: Vec<&str> = vec!["find", &base, "-type", "f", "("];
        for (i, pattern) in patterns.iter().enumerate() {
            if i > 0 {
                command.push("-o");
            }
            command.push("-iname");
            command.push(pattern.as_str());
        }
        command.extend([")", "-printf", "%m|%s|%p\\n"]);

        let output = match self.executor.run(server_id, &command).await {
            Ok(output) => output,
            Err(e) => {
                debug!(server_id, owner, %base, error = %e, "catalog scan unreachable");
                return Ok(Vec::new());
            }
        };
        if !output.success() {
            // find exits non-zero when the base path does not exist
            debug!(server_id, owner, %base, status = output.status, "catalog scan empty");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for line in output.stdout.lines() {
            let Some(mut record) = self.parse_line(server_id, owner, line) else {
                debug!(line, "skipping malformed listing line");
                continue;
            };
            record.duration_secs = match self
                .prober
                .probe_duration(server_id, &record.path)
                .await
            {
                Ok(duration) => duration,
                Err(e) => {
                    warn!(path = %record.name, error = %e, "duration probe failed, defaulting to 0");
                    0.0
                }
            };
            records.push(record);
        }
        Ok(records)
    }

    fn parse_line(&self, server_id: &str, owner: &str, line: &str) -> Option<VideoRecord> {
        let mut parts = line.splitn(3, '|');
        let permissions = parts.next()?.trim();
        let size = parts.next()?.trim().parse::<u64>().ok()?;
        let path = parts.next()?.trim();
        if path.is_empty() {
            return None;
        }

        let name = std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())?;

        Some(VideoRecord {
            id: VideoId::from_path(path),
            name,
            path: path.to_string(),
            size,
            duration_secs: 0.0,
            permissions: permissions.to_string(),
            server_id: server_id.to_string(),
            owner: owner.to_string(),
        })
    }
}
