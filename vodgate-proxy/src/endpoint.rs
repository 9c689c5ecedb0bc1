//! Canonical origin endpoint policy
//!
//! Every upstream URL is produced here; callers never assemble origin
//! hosts or ports themselves. The policy table maps a content class to
//! host, port and cache behaviour.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::Duration;

use vodgate_core::catalog::VIDEO_EXTENSIONS;
use vodgate_core::config::OriginConfig;

/// Path characters that must be escaped in upstream URLs.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'<')
    .add(b'>');

/// Manifest/segment extensions served by the streaming endpoint.
const STREAMING_EXTENSIONS: &[&str] = &["m3u8", "mpd", "ts", "m4s"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Live manifests and segments: no caching, short timeout.
    Streaming,
    /// Whole files: authenticated content endpoint, hour-scale caching.
    OnDemand,
}

impl ContentClass {
    pub fn classify(path: &str) -> Self {
        let ext = path
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if STREAMING_EXTENSIONS.contains(&ext.as_str()) {
            Self::Streaming
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::OnDemand
        } else {
            // Unknown extensions are treated as plain files
            Self::OnDemand
        }
    }

    pub fn cache_control(self) -> &'static str {
        match self {
            Self::Streaming => "no-cache",
            Self::OnDemand => "public, max-age=3600",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointPolicy {
    scheme: String,
    host: String,
    streaming_port: u16,
    content_port: u16,
    streaming_timeout: Duration,
    content_timeout: Duration,
}

impl EndpointPolicy {
    pub fn from_config(config: &OriginConfig) -> Self {
        Self {
            scheme: config.scheme.clone(),
            host: config.host.clone(),
            streaming_port: config.streaming_port,
            content_port: config.content_port,
            streaming_timeout: Duration::from_secs(config.streaming_timeout_secs),
            content_timeout: Duration::from_secs(config.content_timeout_secs),
        }
    }

    /// Upstream URL for a relative content path, credentials never
    /// included.
    pub fn resolve(&self, class: ContentClass, path: &str) -> String {
        let port = match class {
            ContentClass::Streaming => self.streaming_port,
            ContentClass::OnDemand => self.content_port,
        };
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!(
            "{}://{}:{}/{}",
            self.scheme,
            self.host,
            port,
            encoded.join("/")
        )
    }

    pub fn timeout(&self, class: ContentClass) -> Duration {
        match class {
            ContentClass::Streaming => self.streaming_timeout,
            ContentClass::OnDemand => self.content_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EndpointPolicy {
        EndpointPolicy::from_config(&OriginConfig {
            scheme: "http".to_string(),
            host: "origin.local".to_string(),
            streaming_port: 8088,
            content_port: 8090,
            streaming_timeout_secs: 10,
            content_timeout_secs: 120,
            ..OriginConfig::default()
        })
    }

    #[test]
    fn classification_by_extension() {
        assert_eq!(ContentClass::classify("live/stream.m3u8"), ContentClass::Streaming);
        assert_eq!(ContentClass::classify("live/seg-001.ts"), ContentClass::Streaming);
        assert_eq!(ContentClass::classify("alice/clips/trip.mp4"), ContentClass::OnDemand);
        assert_eq!(ContentClass::classify("alice/notes.txt"), ContentClass::OnDemand);
    }

    #[test]
    fn resolve_picks_port_by_class() {
        let policy = policy();
        assert_eq!(
            policy.resolve(ContentClass::Streaming, "live/stream.m3u8"),
            "http://origin.local:8088/live/stream.m3u8"
        );
        assert_eq!(
            policy.resolve(ContentClass::OnDemand, "alice/clips/trip.mp4"),
            "http://origin.local:8090/alice/clips/trip.mp4"
        );
    }

    #[test]
    fn resolve_escapes_awkward_segments() {
        let policy = policy();
        assert_eq!(
            policy.resolve(ContentClass::OnDemand, "alice/my clips/trip #1.mp4"),
            "http://origin.local:8090/alice/my%20clips/trip%20%231.mp4"
        );
    }

    #[test]
    fn timeouts_differ_per_class() {
        let policy = policy();
        assert!(policy.timeout(ContentClass::Streaming) < policy.timeout(ContentClass::OnDemand));
    }
}
