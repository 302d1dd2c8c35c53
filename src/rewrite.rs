//! M3U8 playlist rewriting.
//!
//! Every reference line of a playlist is turned into a proxy-relative URL so
//! that the player fetches sub-playlists, segments and keys back through
//! the relay. Tag lines (`#...`) and blank lines are left untouched.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is when a URL is embedded as a query value. Same set a
/// browser's `encodeURIComponent` keeps.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value for use in a query string.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Build `<proxy_path>?url=<encoded target>`.
pub fn proxied_url(proxy_path: &str, target: &str) -> String {
    format!("{}?url={}", proxy_path, encode_query_value(target))
}

/// The directory part of a playlist URL: everything up to and including the
/// final `/`.
pub fn manifest_base(source_url: &str) -> &str {
    match source_url.rfind('/') {
        Some(idx) => &source_url[..=idx],
        None => "",
    }
}

/// Resolve a reference line against the playlist directory.
///
/// Plain concatenation: `..` and `.` segments are kept verbatim.
pub fn resolve_reference(reference: &str, base: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        reference.to_string()
    } else {
        format!("{base}{reference}")
    }
}

fn rewrite_line<'a>(line: &'a str, base: &str, proxy_path: &str) -> Cow<'a, str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Cow::Borrowed(line);
    }
    Cow::Owned(proxied_url(proxy_path, &resolve_reference(trimmed, base)))
}

/// Rewrite a playlist fetched from `source_url` so that every reference goes
/// through `proxy_path`.
///
/// Lines are split and re-joined on `\n`, so the line count and any trailing
/// newline survive unchanged.
pub fn rewrite_manifest(manifest: &str, source_url: &str, proxy_path: &str) -> String {
    let base = manifest_base(source_url);
    manifest
        .split('\n')
        .map(|line| rewrite_line(line, base, proxy_path))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://origin.example/live/chan/playlist.m3u8";

    #[test]
    fn test_comment_only_manifest_is_unchanged() {
        let data = "#EXTM3U\n#EXT-X-VERSION:3\n\n#EXT-X-TARGETDURATION:6\n   \n#EXT-X-ENDLIST\n";
        assert_eq!(rewrite_manifest(data, SOURCE, "/proxy"), data);
    }

    #[test]
    fn test_relative_reference_is_rebased() {
        let data = "#EXTM3U\n#EXTINF:6.0,\nseg001.ts\n";
        let out = rewrite_manifest(data, SOURCE, "/proxy");
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(
            lines[2],
            "/proxy?url=https%3A%2F%2Forigin.example%2Flive%2Fchan%2Fseg001.ts"
        );
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_absolute_reference_is_not_rebased() {
        let out = rewrite_manifest("https://other.example/x.ts", SOURCE, "/proxy");
        assert_eq!(out, format!("/proxy?url={}", encode_query_value("https://other.example/x.ts")));
        assert_eq!(out, "/proxy?url=https%3A%2F%2Fother.example%2Fx.ts");
    }

    #[test]
    fn test_parent_segments_are_not_normalized() {
        let out = rewrite_manifest("../hd/index.m3u8", SOURCE, "/api/proxy");
        assert_eq!(
            out,
            proxied_url("/api/proxy", "https://origin.example/live/chan/../hd/index.m3u8")
        );
    }

    #[test]
    fn test_surrounding_whitespace_and_cr_are_trimmed() {
        let data = "#EXTM3U\r\n  chunk_1.ts\r\n";
        let out = rewrite_manifest(data, SOURCE, "/proxy");
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#EXTM3U\r");
        assert_eq!(
            lines[1],
            proxied_url("/proxy", "https://origin.example/live/chan/chunk_1.ts")
        );
    }

    #[test]
    fn test_query_strings_in_references_are_encoded() {
        let out = rewrite_manifest("seg.ts?token=a b&x=1", SOURCE, "/proxy");
        assert_eq!(
            out,
            "/proxy?url=https%3A%2F%2Forigin.example%2Flive%2Fchan%2Fseg.ts%3Ftoken%3Da%20b%26x%3D1"
        );
    }

    #[test]
    fn test_manifest_base() {
        assert_eq!(manifest_base(SOURCE), "https://origin.example/live/chan/");
        assert_eq!(manifest_base("no-slash"), "");
    }
}
