use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{is_direct_uri, TrackDescriptor, TrackResolver};
use crate::error::ResolutionError;

/// Cliente para resolver búsquedas y URLs con yt-dlp
pub struct YouTubeClient {
    rate_limiter: Semaphore,
    timeout: Duration,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YouTubeClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            // Limitar requests concurrentes para evitar rate limiting
            rate_limiter: Semaphore::new(3),
            timeout,
        }
    }

    /// Argument passed to yt-dlp: the URL itself, or a single-result search.
    fn target(query: &str) -> String {
        let query = query.trim();
        if is_direct_uri(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    async fn run_ytdlp(&self, target: &str) -> Result<String, ResolutionError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolutionError::Provider(e.to_string()))?;

        let mut command = Command::new("yt-dlp");
        command
            .args([
                "--no-playlist",
                "--dump-json",
                "-f",
                "bestaudio/best",
                "--no-warnings",
                target,
            ])
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolutionError::Timeout)?
            .map_err(|e| ResolutionError::Provider(format!("could not run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ResolutionError::Provider(error.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Turns `yt-dlp --dump-json` output into a track.
///
/// Only the first JSON line is read. A playlist wrapper contributes its first
/// entry.
fn parse_output(stdout: &str, query: &str) -> Result<TrackDescriptor, ResolutionError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ResolutionError::NoResults(query.to_string()))?;

    let mut info: YtDlpInfo = serde_json::from_str(line)
        .map_err(|e| ResolutionError::Provider(format!("unreadable yt-dlp output: {}", e)))?;

    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::NoResults(query.to_string()))?;
    }

    let stream_url = info
        .url
        .filter(|url| is_direct_uri(url))
        .ok_or(ResolutionError::MissingStreamUrl)?;

    let mut track = TrackDescriptor::new(
        stream_url,
        info.title.unwrap_or_else(|| "Unknown".to_string()),
    );

    if let Some(page) = info.webpage_url {
        track = track.with_page_url(page);
    }

    // yt-dlp puede devolver valores absurdos; no deben tumbar el proceso
    if let Some(duration) = info.duration.and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
        track = track.with_duration(duration);
    }

    Ok(track)
}

#[async_trait]
impl TrackResolver for YouTubeClient {
    async fn resolve(&self, query: &str) -> Result<TrackDescriptor, ResolutionError> {
        let target = Self::target(query);
        info!("🔍 Resolviendo: {}", target);

        let stdout = self.run_ytdlp(&target).await.map_err(|e| {
            warn!("❌ yt-dlp falló para '{}': {}", query, e);
            e
        })?;

        let track = parse_output(&stdout, query)?;
        debug!("✅ Resuelto '{}' -> {}", query, track.title());

        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_target() {
        assert_eq!(YouTubeClient::target("lofi beats"), "ytsearch1:lofi beats");
        assert_eq!(
            YouTubeClient::target(" https://youtu.be/dQw4w9WgXcQ "),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn parses_a_single_video() {
        let stdout = r#"{"title":"Song A","url":"https://cdn.example.com/a.webm","webpage_url":"https://www.youtube.com/watch?v=a","duration":183.0}"#;
        let track = parse_output(stdout, "song a").unwrap();

        assert_eq!(track.title(), "Song A");
        assert_eq!(track.source_uri(), "https://cdn.example.com/a.webm");
        assert_eq!(track.page_url(), Some("https://www.youtube.com/watch?v=a"));
        assert_eq!(track.duration(), Some(Duration::from_secs(183)));
    }

    #[test]
    fn takes_the_first_search_entry() {
        let stdout = r#"{"entries":[{"title":"First","url":"https://cdn.example.com/1"},{"title":"Second","url":"https://cdn.example.com/2"}]}"#;
        let track = parse_output(stdout, "query").unwrap();
        assert_eq!(track.title(), "First");
    }

    #[test]
    fn missing_title_becomes_unknown() {
        let track = parse_output(r#"{"url":"https://cdn.example.com/x"}"#, "x").unwrap();
        assert_eq!(track.title(), "Unknown");
    }

    #[test]
    fn empty_output_means_no_results() {
        assert_eq!(
            parse_output("\n", "nothing"),
            Err(ResolutionError::NoResults("nothing".into()))
        );
        assert_eq!(
            parse_output(r#"{"entries":[]}"#, "nothing"),
            Err(ResolutionError::NoResults("nothing".into()))
        );
    }

    #[test]
    fn missing_or_bad_stream_url_is_rejected() {
        assert_eq!(
            parse_output(r#"{"title":"No stream"}"#, "q"),
            Err(ResolutionError::MissingStreamUrl)
        );
        assert_eq!(
            parse_output(r#"{"title":"Bad","url":"not a url"}"#, "q"),
            Err(ResolutionError::MissingStreamUrl)
        );
    }

    #[test]
    fn unrepresentable_durations_are_dropped() {
        for duration in ["1e20", "-5"] {
            let stdout = format!(r#"{{"url":"https://cdn.example.com/x","duration":{}}}"#, duration);
            let track = parse_output(&stdout, "x").unwrap();
            assert_eq!(track.duration(), None, "duration {}", duration);
        }
    }

    #[test]
    fn garbage_is_a_provider_error() {
        assert!(matches!(
            parse_output("ERROR: something", "q"),
            Err(ResolutionError::Provider(_))
        ));
    }
}
