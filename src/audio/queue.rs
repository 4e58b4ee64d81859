use serenity::model::id::{ChannelId, UserId};
use std::{fmt, time::Duration};

use crate::sources::TrackDescriptor;

/// A resolved track bound to the voice channel it should play in.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub track: TrackDescriptor,
    pub voice_channel: ChannelId,
    /// Where "now playing" notices for this entry go.
    pub text_channel: ChannelId,
    pub requested_by: UserId,
}

impl QueueEntry {
    pub fn title(&self) -> &str {
        self.track.title()
    }

    /// Announcement for when this entry starts, with the length and the
    /// page link when the provider reported them.
    pub fn now_playing_notice(&self) -> String {
        let mut notice = format!("🎶 Now playing: **{}**", self.title());

        if let Some(duration) = self.track.duration() {
            notice.push_str(&format!(" ({})", format_duration(duration)));
        }
        if let Some(page_url) = self.track.page_url() {
            // <> evita que Discord genere un embed
            notice.push_str(&format!("\n<{}>", page_url));
        }

        notice
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// The first few titles of a guild queue plus how many were left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueListing {
    titles: Vec<String>,
    overflow: usize,
}

impl QueueListing {
    pub fn new<I, S>(titles: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut listed = Vec::new();
        let mut overflow = 0;

        for title in titles {
            if listed.len() < limit {
                listed.push(title.into());
            } else {
                overflow += 1;
            }
        }

        Self {
            titles: listed,
            overflow,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl fmt::Display for QueueListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, title) in self.titles.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, title)?;
        }

        if self.overflow > 0 {
            write!(f, "\n\n... and {} more", self.overflow)?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn entry(title: &str, voice_channel: u64) -> QueueEntry {
        QueueEntry {
            track: TrackDescriptor::new(
                format!("https://cdn.example.com/{}", title.replace(' ', "_")),
                title,
            ),
            voice_channel: ChannelId::new(voice_channel),
            text_channel: ChannelId::new(500),
            requested_by: UserId::new(7),
        }
    }

    #[test]
    fn single_entry_lists_exactly_one_line() {
        let listing = QueueListing::new(["X"], 10);
        assert_eq!(listing.to_string(), "1. X");
    }

    #[test]
    fn long_queues_report_overflow() {
        let titles = (1..=12).map(|i| format!("Song {}", i));
        let text = QueueListing::new(titles, 10).to_string();

        assert_eq!(text.lines().filter(|l| !l.is_empty()).count(), 11);
        assert!(text.starts_with("1. Song 1\n2. Song 2\n"));
        assert!(text.ends_with("10. Song 10\n\n... and 2 more"));
    }

    #[test]
    fn empty_queue_lists_nothing() {
        let listing = QueueListing::new(Vec::<String>::new(), 10);
        assert!(listing.is_empty());
        assert_eq!(listing.to_string(), "");
    }

    #[test]
    fn notice_without_metadata_is_just_the_title() {
        assert_eq!(entry("A", 1).now_playing_notice(), "🎶 Now playing: **A**");
    }

    #[test]
    fn notice_shows_length_and_link() {
        let mut item = entry("A", 1);
        item.track = item
            .track
            .with_duration(Duration::from_secs(183))
            .with_page_url("https://www.youtube.com/watch?v=a");

        assert_eq!(
            item.now_playing_notice(),
            "🎶 Now playing: **A** (3:03)\n<https://www.youtube.com/watch?v=a>"
        );
    }

    #[test]
    fn long_tracks_show_hours() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
    }
}
