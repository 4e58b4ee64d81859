//! In-memory voice transport and announcer for tests.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use serenity::model::id::{ChannelId, GuildId};
use std::{collections::HashMap, sync::Arc};

use crate::{
    audio::{
        player::Announcer,
        session::{CompletionNotifier, VoiceGateway, VoiceSession},
    },
    error::{ConnectionError, PlaybackError},
};

/// Everything the fake transport was asked to do.
#[derive(Debug, Default)]
pub struct FakeVoice {
    pub connects: Vec<ChannelId>,
    pub moves: Vec<ChannelId>,
    pub plays: Vec<String>,
    pub stops: usize,
    pub disconnects: usize,
    pub paused: bool,
    pub fail_connect: bool,
    pub fail_play: bool,
    /// Set when the server side dropped the connection.
    pub dropped: bool,
    current: HashMap<GuildId, CompletionNotifier>,
}

impl FakeVoice {
    /// Ends the guild's stream the way songbird does: the completion is
    /// posted, not applied.
    fn end_current(&mut self, guild_id: GuildId, error: Option<PlaybackError>) {
        if let Some(notifier) = self.current.remove(&guild_id) {
            self.paused = false;
            notifier.notify(error);
        }
    }
}

#[derive(Default)]
pub struct FakeGateway {
    voice: Arc<Mutex<FakeVoice>>,
}

impl FakeGateway {
    pub fn voice(&self) -> MutexGuard<'_, FakeVoice> {
        self.voice.lock()
    }

    /// Simulates a moderator disconnecting the bot.
    pub fn drop_connection(&self) {
        self.voice().dropped = true;
    }

    /// Simulates the current track of every guild reaching its end.
    pub fn finish_current(&self, error: Option<PlaybackError>) {
        let mut voice = self.voice();
        let guilds: Vec<GuildId> = voice.current.keys().copied().collect();
        for guild_id in guilds {
            voice.end_current(guild_id, error.clone());
        }
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceSession>, ConnectionError> {
        let mut voice = self.voice.lock();
        if voice.fail_connect {
            return Err(ConnectionError::Join("missing permissions".into()));
        }
        voice.connects.push(channel_id);
        voice.dropped = false;

        Ok(Box::new(FakeSession {
            guild_id,
            channel_id,
            connected: true,
            voice: self.voice.clone(),
        }))
    }
}

struct FakeSession {
    guild_id: GuildId,
    channel_id: ChannelId,
    connected: bool,
    voice: Arc<Mutex<FakeVoice>>,
}

#[async_trait]
impl VoiceSession for FakeSession {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<(), ConnectionError> {
        let mut voice = self.voice.lock();
        if voice.fail_connect {
            return Err(ConnectionError::Join("missing permissions".into()));
        }
        voice.moves.push(channel_id);
        self.channel_id = channel_id;
        Ok(())
    }

    async fn play(
        &mut self,
        source_uri: &str,
        on_complete: CompletionNotifier,
    ) -> Result<(), PlaybackError> {
        let mut voice = self.voice.lock();
        if !self.connected {
            return Err(PlaybackError::NotConnected);
        }
        if voice.fail_play {
            return Err(PlaybackError::Transport("unsupported source".into()));
        }

        voice.end_current(self.guild_id, None);
        voice.plays.push(source_uri.to_string());
        voice.current.insert(self.guild_id, on_complete);
        Ok(())
    }

    fn pause(&mut self) {
        let mut voice = self.voice.lock();
        if voice.current.contains_key(&self.guild_id) {
            voice.paused = true;
        }
    }

    fn resume(&mut self) {
        self.voice.lock().paused = false;
    }

    fn stop(&mut self) {
        let mut voice = self.voice.lock();
        voice.stops += 1;
        voice.end_current(self.guild_id, None);
    }

    fn is_playing(&self) -> bool {
        self.voice.lock().current.contains_key(&self.guild_id)
    }

    fn is_paused(&self) -> bool {
        let voice = self.voice.lock();
        voice.current.contains_key(&self.guild_id) && voice.paused
    }

    async fn is_connected(&self) -> bool {
        self.connected && !self.voice.lock().dropped
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;

        let mut voice = self.voice.lock();
        voice.disconnects += 1;
        voice.end_current(self.guild_id, None);
    }
}

#[derive(Default)]
pub struct RecordingAnnouncer {
    messages: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingAnnouncer {
    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, channel_id: ChannelId, message: String) {
        self.messages.lock().push((channel_id, message));
    }
}
