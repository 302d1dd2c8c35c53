//! Content-type classification for proxied targets.

use url::Url;

pub const MANIFEST: &str = "application/vnd.apple.mpegurl";
pub const TRANSPORT_STREAM: &str = "video/mp2t";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extensions whose content type overrides whatever the origin declares.
/// Checked in order.
const HLS_TYPES: &[(&str, &str)] = &[(".m3u8", MANIFEST), (".ts", TRANSPORT_STREAM)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A playlist: buffered and rewritten.
    Manifest,
    /// Anything else: streamed through untouched.
    Passthrough,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Manifest => "manifest",
            TargetKind::Passthrough => "passthrough",
        }
    }
}

fn extension_type(path: &str) -> Option<&'static str> {
    HLS_TYPES
        .iter()
        .find(|(ext, _)| path.ends_with(ext))
        .map(|(_, mime)| *mime)
}

/// Whether the target is an HLS playlist, decided by its path extension.
pub fn target_kind(target: &Url) -> TargetKind {
    if target.path().ends_with(".m3u8") {
        TargetKind::Manifest
    } else {
        TargetKind::Passthrough
    }
}

/// Resolve the content type for a target: extension table first, then the
/// upstream-declared type, then `application/octet-stream`.
pub fn classify(target: &Url, upstream: Option<&str>) -> String {
    extension_type(target.path())
        .or(upstream)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}
