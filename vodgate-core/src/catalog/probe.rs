//! Best-effort media probing via remote `ffprobe`
//!
//! Probing is an optional enrichment: every failure becomes
//! `Error::ProbeUnavailable` and callers substitute defaults instead of
//! failing the request.

use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::remote::RemoteExecutor;

/// Technical metadata of one video file.
#[derive(Debug, Clone, Serialize)]
pub struct MediaInfo {
    pub name: String,
    pub size: u64,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub codec: String,
    pub format: String,
}

impl MediaInfo {
    /// Defaults used when probing fails.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            duration_secs: 0.0,
            width: 0,
            height: 0,
            bitrate: 0,
            codec: "unknown".to_string(),
            format: "unknown".to_string(),
        }
    }
}

pub struct MediaProber {
    executor: Arc<dyn RemoteExecutor>,
}

impl MediaProber {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Full probe for the info endpoint.
    pub async fn probe(&self, server: &str, path: &str) -> Result<MediaInfo> {
        let output = self
            .executor
            .run(
                server,
                &[
                    "ffprobe",
                    "-v",
                    "error",
                    "-show_format",
                    "-show_streams",
                    "-of",
                    "json",
                    path,
                ],
            )
            .await
            .map_err(|e| Error::ProbeUnavailable(e.to_string()))?;

        if !output.success() {
            return Err(Error::ProbeUnavailable(format!(
                "ffprobe exited with status {}",
                output.status
            )));
        }

        parse_ffprobe_json(path, &output.stdout)
    }

    /// Narrow duration-only probe used by the catalog lister.
    pub async fn probe_duration(&self, server: &str, path: &str) -> Result<f64> {
        let output = self
            .executor
            .run(
                server,
                &[
                    "ffprobe",
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "csv=p=0",
                    path,
                ],
            )
            .await
            .map_err(|e| Error::ProbeUnavailable(e.to_string()))?;

        if !output.success() {
            return Err(Error::ProbeUnavailable(format!(
                "ffprobe exited with status {}",
                output.status
            )));
        }

        output
            .stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::ProbeUnavailable("unparseable duration".to_string()))
    }
}

fn parse_ffprobe_json(path: &str, stdout: &str) -> Result<MediaInfo> {
    let value: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| Error::ProbeUnavailable(format!("bad ffprobe output: {e}")))?;

    let name = std::path::Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut info = MediaInfo::fallback(name);

    if let Some(format) = value.get("format") {
        info.size = str_field_u64(format, "size");
        info.bitrate = str_field_u64(format, "bit_rate");
        info.duration_secs = format
            .get("duration")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        if let Some(fmt) = format.get("format_name").and_then(|v| v.as_str()) {
            info.format = fmt.to_string();
        }
    }

    let video_stream = value
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))
        });
    if let Some(stream) = video_stream {
        info.width = stream.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        info.height = stream.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if let Some(codec) = stream.get("codec_name").and_then(|v| v.as_str()) {
            info.codec = codec.to_string();
        }
    }

    Ok(info)
}

// ffprobe emits numbers as JSON strings
fn str_field_u64(value: &serde_json::Value, field: &str) -> u64 {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_ffprobe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
            ],
            "format": {
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "734.500000",
                "size": "104857600",
                "bit_rate": "1142000"
            }
        }"#;

        let info = parse_ffprobe_json("/srv/media/alice/clips/trip.mp4", json).expect("parse");
        assert_eq!(info.name, "trip");
        assert_eq!(info.codec, "h264");
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.size, 104_857_600);
        assert_eq!(info.bitrate, 1_142_000);
        assert!((info.duration_secs - 734.5).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_output_is_probe_unavailable() {
        assert!(matches!(
            parse_ffprobe_json("/srv/x.mp4", "not json"),
            Err(Error::ProbeUnavailable(_))
        ));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let info = parse_ffprobe_json("/srv/x.mp4", "{}").expect("parse");
        assert_eq!(info.codec, "unknown");
        assert_eq!(info.width, 0);
        assert_eq!(info.duration_secs, 0.0);
    }
}
