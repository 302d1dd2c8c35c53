//! Player-side stream selection.
//!
//! A channel carries its candidate stream URLs in priority order. The
//! controller walks them forward on fatal playback errors and gives up once
//! the list is exhausted. The candidate list itself is never modified.

use crate::channels::Channel;
use crate::rewrite::proxied_url;
use crate::settings::Mode;

pub const UNPLAYABLE_MESSAGE: &str = "Stream unavailable. Try another stream or channel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    Playing,
    Unplayable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// Non-fatal error, or the channel was already given up on.
    Ignored,
    /// Restart loading with the next candidate.
    Advanced { index: usize, url: String },
    /// No candidates left.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct StreamFailover {
    channel: Channel,
    index: usize,
    state: PlaybackState,
}

impl StreamFailover {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            index: 0,
            state: PlaybackState::Loading,
        }
    }

    /// Switch to another channel, starting again from its first candidate.
    pub fn select_channel(&mut self, channel: Channel) {
        *self = Self::new(channel);
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// URL to load right now; `None` once unplayable.
    pub fn current_stream(&self) -> Option<&str> {
        match self.state {
            PlaybackState::Unplayable => None,
            _ => self.channel.streams.get(self.index).map(String::as_str),
        }
    }

    /// The media pipeline parsed the manifest and started playback.
    pub fn on_ready(&mut self) {
        if self.state == PlaybackState::Loading {
            self.state = PlaybackState::Playing;
        }
    }

    pub fn on_error(&mut self, fatal: bool) -> FailoverOutcome {
        if !fatal || self.state == PlaybackState::Unplayable {
            return FailoverOutcome::Ignored;
        }
        if self.index + 1 < self.channel.streams.len() {
            self.index += 1;
            self.state = PlaybackState::Loading;
            FailoverOutcome::Advanced {
                index: self.index,
                url: self.channel.streams[self.index].clone(),
            }
        } else {
            self.state = PlaybackState::Unplayable;
            FailoverOutcome::Exhausted
        }
    }

    pub fn error_message(&self) -> Option<&'static str> {
        (self.state == PlaybackState::Unplayable).then_some(UNPLAYABLE_MESSAGE)
    }
}

/// How the player reaches a stream URL.
#[derive(Debug, Clone)]
pub struct StreamRouting {
    pub mode: Mode,
    /// Origin the player page was served from, e.g. `https://tv.example`.
    pub page_origin: String,
    /// Origin of the proxy in development, e.g. `http://localhost:3000`.
    pub dev_proxy_origin: String,
    pub proxy_path: String,
}

/// Production routes every stream through the proxy. Development only
/// proxies plain-http streams viewed from an https page, which the browser
/// would otherwise block as mixed content.
pub fn stream_url(raw: &str, routing: &StreamRouting) -> String {
    match routing.mode {
        Mode::Production => format!("{}{}", routing.page_origin, proxied_url(&routing.proxy_path, raw)),
        Mode::Development => {
            if routing.page_origin.starts_with("https://") && raw.starts_with("http://") {
                format!("{}{}", routing.dev_proxy_origin, proxied_url(&routing.proxy_path, raw))
            } else {
                raw.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Category;

    fn channel(streams: &[&str]) -> Channel {
        Channel {
            id: "pnn-tv".to_string(),
            name: "PNN".to_string(),
            logo: String::new(),
            category: Category::News,
            streams: streams.iter().map(|s| s.to_string()).collect(),
            description: None,
        }
    }

    #[test]
    fn test_exhausts_candidates_in_order() {
        let mut failover = StreamFailover::new(channel(&["https://a/1.m3u8", "https://b/2.m3u8", "https://c/3.m3u8"]));
        assert_eq!(failover.current_index(), 0);
        assert_eq!(failover.current_stream(), Some("https://a/1.m3u8"));

        assert_eq!(
            failover.on_error(true),
            FailoverOutcome::Advanced { index: 1, url: "https://b/2.m3u8".to_string() }
        );
        assert_eq!(
            failover.on_error(true),
            FailoverOutcome::Advanced { index: 2, url: "https://c/3.m3u8".to_string() }
        );
        assert_eq!(failover.on_error(true), FailoverOutcome::Exhausted);
        assert_eq!(failover.state(), PlaybackState::Unplayable);
        assert_eq!(failover.current_stream(), None);
        assert_eq!(failover.error_message(), Some(UNPLAYABLE_MESSAGE));

        // Never goes back to the first candidate.
        assert_eq!(failover.on_error(true), FailoverOutcome::Ignored);
        assert_eq!(failover.current_index(), 2);
        assert_eq!(failover.channel().streams.len(), 3);
    }

    #[test]
    fn test_non_fatal_errors_are_ignored() {
        let mut failover = StreamFailover::new(channel(&["https://a/1.m3u8", "https://b/2.m3u8"]));
        failover.on_ready();
        assert_eq!(failover.on_error(false), FailoverOutcome::Ignored);
        assert_eq!(failover.state(), PlaybackState::Playing);
        assert_eq!(failover.current_index(), 0);
    }

    #[test]
    fn test_single_candidate_fails_immediately() {
        let mut failover = StreamFailover::new(channel(&["https://a/1.m3u8"]));
        assert_eq!(failover.on_error(true), FailoverOutcome::Exhausted);
    }

    #[test]
    fn test_channel_change_resets_index() {
        let mut failover = StreamFailover::new(channel(&["https://a/1.m3u8", "https://b/2.m3u8"]));
        failover.on_error(true);
        failover.on_error(true);
        failover.select_channel(channel(&["https://x/1.m3u8", "https://y/2.m3u8"]));
        assert_eq!(failover.current_index(), 0);
        assert_eq!(failover.state(), PlaybackState::Loading);
        assert_eq!(failover.current_stream(), Some("https://x/1.m3u8"));
    }

    #[test]
    fn test_stream_url_routing() {
        let mut routing = StreamRouting {
            mode: Mode::Production,
            page_origin: "https://tv.example".to_string(),
            dev_proxy_origin: "http://localhost:3000".to_string(),
            proxy_path: "/proxy".to_string(),
        };
        assert_eq!(
            stream_url("https://a.example/live.m3u8", &routing),
            "https://tv.example/proxy?url=https%3A%2F%2Fa.example%2Flive.m3u8"
        );

        routing.mode = Mode::Development;
        assert_eq!(
            stream_url("http://a.example/live.m3u8", &routing),
            "http://localhost:3000/proxy?url=http%3A%2F%2Fa.example%2Flive.m3u8"
        );
        assert_eq!(stream_url("https://a.example/live.m3u8", &routing), "https://a.example/live.m3u8");

        routing.page_origin = "http://192.168.1.5:5173".to_string();
        assert_eq!(stream_url("http://a.example/live.m3u8", &routing), "http://a.example/live.m3u8");
    }
}
