use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Entertainment,
    Music,
    Sports,
    Kids,
    Lifestyle,
}

impl Category {
    fn from_group(group: &str) -> Self {
        match group.trim().to_ascii_lowercase().as_str() {
            "news" => Category::News,
            "music" => Category::Music,
            "sport" | "sports" => Category::Sports,
            "kids" | "children" => Category::Kids,
            "lifestyle" => Category::Lifestyle,
            _ => Category::Entertainment,
        }
    }
}

/// A catalog entry. `streams` is in failover order and never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub logo: String,
    pub category: Category,
    pub streams: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel {0:?} has no streams")]
    NoStreams(String),

    #[error("duplicate channel id {0:?}")]
    DuplicateId(String),
}

fn validate(channels: Vec<Channel>) -> Result<Vec<Channel>, CatalogError> {
    let mut seen = HashSet::new();
    for channel in &channels {
        if channel.streams.is_empty() {
            return Err(CatalogError::NoStreams(channel.id.clone()));
        }
        if !seen.insert(channel.id.as_str()) {
            return Err(CatalogError::DuplicateId(channel.id.clone()));
        }
    }
    Ok(channels)
}

pub fn parse_catalog_json(content: &str) -> Result<Vec<Channel>, CatalogError> {
    validate(serde_json::from_str(content)?)
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Parse an extended M3U playlist of channels. Entries sharing a name are
/// merged into one channel whose streams keep playlist order.
pub fn parse_m3u(content: &str) -> Result<Vec<Channel>, CatalogError> {
    let re_extinf = Regex::new(r#"^#EXTINF:-?\d+(?P<attrs>(?:[^,"]|"[^"]*")*),(?P<name>.*)$"#).unwrap();
    let re_attr = Regex::new(r#"(?P<key>[\w-]+)="(?P<value>[^"]*)""#).unwrap();

    let mut channels: Vec<Channel> = Vec::new();
    let mut pending: Option<(String, String, Category)> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = re_extinf.captures(line) {
            let name = caps["name"].trim().to_string();
            let mut logo = String::new();
            let mut category = Category::Entertainment;
            for attr in re_attr.captures_iter(&caps["attrs"]) {
                match &attr["key"] {
                    "tvg-logo" => logo = attr["value"].to_string(),
                    "group-title" => category = Category::from_group(&attr["value"]),
                    _ => {}
                }
            }
            pending = Some((name, logo, category));
        } else if line.starts_with("http://") || line.starts_with("https://") {
            let Some((name, logo, category)) = pending.take() else {
                continue;
            };
            match channels.iter_mut().find(|c| c.name == name) {
                Some(existing) => existing.streams.push(line.to_string()),
                None => channels.push(Channel {
                    id: slug(&name),
                    name,
                    logo,
                    category,
                    streams: vec![line.to_string()],
                    description: None,
                }),
            }
        }
    }

    validate(channels)
}

/// Load a catalog file: `.m3u`/`.m3u8` as a playlist, anything else as JSON.
pub fn load_catalog(path: &Path) -> Result<Vec<Channel>, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("m3u") | Some("m3u8") => parse_m3u(&content),
        _ => parse_catalog_json(&content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_m3u() {
        let data = r#"#EXTM3U
#EXTINF:-1 tvg-logo="https://logos.example/tvk.png" group-title="News",TVK
https://live.example/live/tvk.stream/playlist.m3u8
#EXTINF:-1 group-title="Sports",CTV 8 HD
http://cdn-a.example/ctv8/index.m3u8
#EXTINF:-1 group-title="Sports",CTV 8 HD
https://cdn-b.example/ctv8/index.m3u8
rtsp://ignored.example/stream"#;

        let channels = parse_m3u(data).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].id, "tvk");
        assert_eq!(channels[0].logo, "https://logos.example/tvk.png");
        assert_eq!(channels[0].category, Category::News);
        assert_eq!(channels[1].id, "ctv-8-hd");
        assert_eq!(channels[1].category, Category::Sports);
        assert_eq!(
            channels[1].streams,
            vec![
                "http://cdn-a.example/ctv8/index.m3u8".to_string(),
                "https://cdn-b.example/ctv8/index.m3u8".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_m3u_quoted_comma_in_attribute() {
        let data = r#"#EXTM3U
#EXTINF:-1 tvg-logo="https://logos.example/a,b.png" group-title="News, Sports",Hang Meas HDTV
https://live.example/hm/index.m3u8"#;

        let channels = parse_m3u(data).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Hang Meas HDTV");
        assert_eq!(channels[0].logo, "https://logos.example/a,b.png");
        assert_eq!(channels[0].id, "hang-meas-hdtv");
    }

    #[test]
    fn test_parse_catalog_json() {
        let data = r#"[
            {"id":"pnn-tv","name":"PNN","logo":"pnn.png","category":"news",
             "streams":["https://a.example/pnn.m3u8","https://b.example/pnn.m3u8"],
             "description":"People Nation Network"},
            {"id":"kids","name":"Kids","logo":"k.png","category":"kids","streams":["https://k.example/k.m3u8"]}
        ]"#;
        let channels = parse_catalog_json(data).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].streams.len(), 2);
        assert_eq!(channels[0].description.as_deref(), Some("People Nation Network"));
        assert_eq!(channels[1].description, None);
    }

    #[test]
    fn test_catalog_rejects_empty_streams_and_duplicates() {
        let empty = r#"[{"id":"a","name":"A","logo":"","category":"music","streams":[]}]"#;
        assert!(matches!(parse_catalog_json(empty), Err(CatalogError::NoStreams(id)) if id == "a"));

        let dup = r#"[
            {"id":"a","name":"A","logo":"","category":"music","streams":["https://x/a.m3u8"]},
            {"id":"a","name":"A2","logo":"","category":"music","streams":["https://x/b.m3u8"]}
        ]"#;
        assert!(matches!(parse_catalog_json(dup), Err(CatalogError::DuplicateId(_))));

        let bad_category = r#"[{"id":"a","name":"A","logo":"","category":"weather","streams":["https://x"]}]"#;
        assert!(matches!(parse_catalog_json(bad_category), Err(CatalogError::Json(_))));
    }
}
