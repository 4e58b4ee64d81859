pub mod youtube;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ResolutionError;

pub use youtube::YouTubeClient;

/// Turns a user query into something the voice transport can stream.
///
/// Implementations never retry; failures go straight back to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves a direct URI or free-text keywords into a playable track.
    async fn resolve(&self, query: &str) -> Result<TrackDescriptor, ResolutionError>;
}

/// Representa un track resuelto y reproducible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    source_uri: String,
    title: String,
    page_url: Option<String>,
    duration: Option<Duration>,
}

impl TrackDescriptor {
    pub fn new(source_uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            title: title.into(),
            page_url: None,
            duration: None,
        }
    }

    // Getters
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    // Setters
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// True when the query is an http(s) URI rather than search keywords.
pub fn is_direct_uri(query: &str) -> bool {
    let query = query.trim();
    if !(query.starts_with("http://") || query.starts_with("https://")) {
        return false;
    }

    url::Url::parse(query)
        .map(|url| url.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_uri_detection() {
        assert!(is_direct_uri("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_direct_uri("http://radio.example.com:8000/stream.mp3"));
        assert!(is_direct_uri("  https://youtu.be/dQw4w9WgXcQ "));
        assert!(!is_direct_uri("never gonna give you up"));
        assert!(!is_direct_uri("ftp://files.example.com/song.mp3"));
        assert!(!is_direct_uri("https://"));
    }
}
