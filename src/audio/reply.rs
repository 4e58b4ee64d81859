use serenity::model::id::ChannelId;
use std::fmt;

use crate::audio::queue::QueueListing;

/// Successful outcome of a guild command. `Display` renders the chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    NowPlaying { title: String },
    Paused,
    Resumed,
    Skipped,
    Cleared,
    Left,
    RadioStarted { url: String },
    RadioStopped,
    /// Station playing, if any, and the voice channel the bot sits in.
    RadioStatus {
        url: Option<String>,
        channel: Option<ChannelId>,
    },
    Queue(QueueListing),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::NowPlaying { title } => write!(f, "✅ Playing now: **{}**", title),
            Reply::Paused => f.write_str("⏸️ Paused the music."),
            Reply::Resumed => f.write_str("▶️ Resumed the music."),
            Reply::Skipped => f.write_str("⏭️ Skipped the song."),
            Reply::Cleared => f.write_str("🗑️ Queue cleared."),
            Reply::Left => f.write_str("👋 Disconnected from the voice channel."),
            Reply::RadioStarted { url } => write!(f, "📻 Now playing radio: **{}**", url),
            Reply::RadioStopped => f.write_str("⏹️ Stopped the radio stream."),
            Reply::RadioStatus {
                url: Some(url),
                channel: Some(channel),
            } => write!(f, "📻 Radio is currently playing in <#{}>: {}", channel, url),
            Reply::RadioStatus {
                url: Some(url),
                channel: None,
            } => write!(f, "📻 Radio is currently playing: {}", url),
            Reply::RadioStatus { url: None, .. } => {
                f.write_str("❌ No radio is playing right now.")
            }
            Reply::Queue(listing) if listing.is_empty() => f.write_str("📭 Queue is empty."),
            Reply::Queue(listing) => write!(f, "**🎶 Current Queue:**\n{}", listing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn radio_status_mentions_the_voice_channel() {
        let reply = Reply::RadioStatus {
            url: Some("https://radio.example.com/live".into()),
            channel: Some(ChannelId::new(10)),
        };
        assert_eq!(
            reply.to_string(),
            "📻 Radio is currently playing in <#10>: https://radio.example.com/live"
        );

        let idle = Reply::RadioStatus {
            url: None,
            channel: Some(ChannelId::new(10)),
        };
        assert_eq!(idle.to_string(), "❌ No radio is playing right now.");
    }
}
