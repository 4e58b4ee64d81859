//! Voice transport contract.
//!
//! A [`VoiceGateway`] opens connections; a [`VoiceSession`] is one guild's
//! live connection. Sessions never touch playback state themselves: when a
//! stream ends they post a [`Completion`] through the [`CompletionNotifier`]
//! handed to [`VoiceSession::play`], and the guild worker picks it up in its
//! own serialized loop.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ConnectionError, PlaybackError};

/// End-of-stream notice for the play call identified by `generation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub generation: u64,
    pub error: Option<PlaybackError>,
}

/// One-shot completion handle. Consuming `notify` guarantees a single
/// delivery per play call.
#[derive(Debug)]
pub struct CompletionNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionNotifier {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notify(self, error: Option<PlaybackError>) {
        let completion = Completion {
            generation: self.generation,
            error,
        };
        if self.tx.send(completion).is_err() {
            debug!("Worker cerrado, finalización {} descartada", self.generation);
        }
    }
}

#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Joins `channel_id` and returns a session bound to it.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceSession>, ConnectionError>;
}

#[async_trait]
pub trait VoiceSession: Send + Sync {
    /// Channel the session is currently in.
    fn channel_id(&self) -> ChannelId;

    /// Relocates the connection without tearing down playback.
    async fn move_to(&mut self, channel_id: ChannelId) -> Result<(), ConnectionError>;

    /// Starts streaming `source_uri`, replacing whatever was playing.
    ///
    /// On `Ok`, `on_complete` fires exactly once when the stream ends
    /// (naturally, stopped, or failed). On `Err` it is dropped unfired.
    async fn play(
        &mut self,
        source_uri: &str,
        on_complete: CompletionNotifier,
    ) -> Result<(), PlaybackError>;

    /// No-op unless playing.
    fn pause(&mut self);

    /// No-op unless paused.
    fn resume(&mut self);

    /// Halts the stream. Completion is delivered asynchronously.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Whether the transport still holds a voice channel for this session.
    async fn is_connected(&self) -> bool;

    /// Idempotent.
    async fn disconnect(&mut self);
}
