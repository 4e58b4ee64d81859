use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{
    audio::{
        player::{
            Announcer, GuildCommand, GuildHandle, GuildPlayback, GuildRequest, PlaybackMode,
            PlaybackSnapshot,
        },
        queue::{QueueEntry, QueueListing},
        reply::Reply,
        session::VoiceGateway,
    },
    config::Config,
    error::{CommandError, ResolutionError},
    sources::{is_direct_uri, TrackResolver},
};

/// Who asked for a track and where they are.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: UserId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
}

/// Guild registry and command surface of the player.
///
/// Each guild's state lives in its own worker, created on the first command
/// for that guild and kept for the life of the process. Commands for
/// different guilds never wait on each other.
pub struct PlaybackCoordinator {
    guilds: DashMap<GuildId, GuildHandle>,
    resolver: Arc<dyn TrackResolver>,
    gateway: Arc<dyn VoiceGateway>,
    announcer: Arc<dyn Announcer>,
    config: Arc<Config>,
}

impl PlaybackCoordinator {
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        gateway: Arc<dyn VoiceGateway>,
        announcer: Arc<dyn Announcer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            guilds: DashMap::new(),
            resolver,
            gateway,
            announcer,
            config,
        }
    }

    /// Resolves `query` and plays it right away, replacing the guild queue.
    ///
    /// Resolution runs before the guild is touched, so a failed search
    /// leaves the current playback as it was.
    pub async fn play(
        &self,
        guild_id: GuildId,
        requester: Requester,
        query: &str,
    ) -> Result<Reply, CommandError> {
        let track = self.resolver.resolve(query).await.map_err(|e| {
            warn!("❌ No se pudo resolver '{}' en guild {}: {}", query, guild_id, e);
            e
        })?;

        let entry = QueueEntry {
            track,
            voice_channel: requester.voice_channel,
            text_channel: requester.text_channel,
            requested_by: requester.user_id,
        };

        self.dispatch(guild_id, GuildCommand::PlayNow(entry)).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::Pause).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::Resume).await
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::Skip).await
    }

    pub async fn show_queue(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        let snapshot = self.snapshot(guild_id).await?;
        Ok(Reply::Queue(QueueListing::new(
            snapshot.queue,
            self.config.queue_display_limit,
        )))
    }

    pub async fn clear(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::Clear).await
    }

    pub async fn leave(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::Leave).await
    }

    /// Starts a continuous stream, falling back to the configured station.
    pub async fn start_radio(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        url: Option<&str>,
    ) -> Result<Reply, CommandError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.config.default_radio_url.as_str())
            .to_string();

        if !is_direct_uri(&url) {
            return Err(ResolutionError::InvalidUri(url).into());
        }

        self.dispatch(
            guild_id,
            GuildCommand::StartRadio { url, voice_channel },
        )
        .await
    }

    pub async fn stop_radio(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        self.dispatch(guild_id, GuildCommand::StopRadio).await
    }

    pub async fn radio_info(&self, guild_id: GuildId) -> Result<Reply, CommandError> {
        let snapshot = self.snapshot(guild_id).await?;
        let station = match snapshot.mode {
            PlaybackMode::Radio { url, .. } => Some(url),
            _ => None,
        };
        Ok(Reply::RadioStatus {
            url: station,
            channel: snapshot.voice_channel,
        })
    }

    /// Resets a guild whose voice connection was dropped from outside.
    pub async fn voice_disconnected(&self, guild_id: GuildId) {
        let Some(handle) = self.guilds.get(&guild_id).map(|h| h.clone()) else {
            return;
        };

        let (tx, rx) = oneshot::channel();
        if handle
            .send(GuildRequest::Command(GuildCommand::VoiceDisconnected, tx))
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> Result<PlaybackSnapshot, CommandError> {
        let (tx, rx) = oneshot::channel();
        self.guild(guild_id).send(GuildRequest::Snapshot(tx))?;
        rx.await.map_err(|_| CommandError::WorkerGone)
    }

    async fn dispatch(
        &self,
        guild_id: GuildId,
        command: GuildCommand,
    ) -> Result<Reply, CommandError> {
        let (tx, rx) = oneshot::channel();
        self.guild(guild_id).send(GuildRequest::Command(command, tx))?;
        rx.await.map_err(|_| CommandError::WorkerGone)?
    }

    fn guild(&self, guild_id: GuildId) -> GuildHandle {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Estado de reproducción creado para guild {}", guild_id);
                GuildPlayback::spawn(
                    guild_id,
                    self.gateway.clone(),
                    self.announcer.clone(),
                )
            })
            .clone()
    }
}
