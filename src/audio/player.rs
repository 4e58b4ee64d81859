//! Per-guild playback state machine.
//!
//! Each guild gets one [`GuildPlayback`] owned by one worker task. User
//! commands and voice completions both arrive through that task's mailboxes,
//! so nothing else ever reads or writes the queue, the mode or the session.
//!
//! Every `play` call is stamped with a fresh generation. Only the completion
//! matching the generation in flight advances the queue, which is what keeps
//! a stop issued by replace/clear/leave/radio from advancing a second time.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::QueueEntry,
        reply::Reply,
        session::{Completion, CompletionNotifier, VoiceGateway, VoiceSession},
    },
    error::{CommandError, PlaybackError, StateError},
};

/// Posts user-visible notices outside of a command reply.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, channel_id: ChannelId, message: String);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    Queue { paused: bool },
    Radio { url: String, paused: bool },
}

impl PlaybackMode {
    pub fn is_playing(&self) -> bool {
        !matches!(self, PlaybackMode::Idle)
    }
}

/// Point-in-time view of a guild, for status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub mode: PlaybackMode,
    pub queue: Vec<String>,
    pub voice_channel: Option<ChannelId>,
}

#[derive(Debug)]
pub enum GuildCommand {
    /// Replaces the queue with this entry and starts it.
    PlayNow(QueueEntry),
    Pause,
    Resume,
    Skip,
    Clear,
    Leave,
    StartRadio { url: String, voice_channel: ChannelId },
    StopRadio,
    /// The gateway reported the bot out of voice without us asking. May be
    /// a late notice for a session that was already replaced.
    VoiceDisconnected,
}

pub enum GuildRequest {
    Command(GuildCommand, oneshot::Sender<Result<Reply, CommandError>>),
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
}

/// Mailbox of a running guild worker.
#[derive(Clone)]
pub struct GuildHandle {
    requests: mpsc::UnboundedSender<GuildRequest>,
}

impl GuildHandle {
    pub fn send(&self, request: GuildRequest) -> Result<(), CommandError> {
        self.requests
            .send(request)
            .map_err(|_| CommandError::WorkerGone)
    }
}

pub struct GuildPlayback {
    guild_id: GuildId,
    queue: VecDeque<QueueEntry>,
    mode: PlaybackMode,
    session: Option<Box<dyn VoiceSession>>,
    generation: u64,
    in_flight: Option<u64>,
    gateway: Arc<dyn VoiceGateway>,
    announcer: Arc<dyn Announcer>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl GuildPlayback {
    pub fn new(
        guild_id: GuildId,
        gateway: Arc<dyn VoiceGateway>,
        announcer: Arc<dyn Announcer>,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            guild_id,
            queue: VecDeque::new(),
            mode: PlaybackMode::Idle,
            session: None,
            generation: 0,
            in_flight: None,
            gateway,
            announcer,
            completions,
        }
    }

    /// Spawns the worker task for a guild and returns its mailbox.
    pub fn spawn(
        guild_id: GuildId,
        gateway: Arc<dyn VoiceGateway>,
        announcer: Arc<dyn Announcer>,
    ) -> GuildHandle {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let playback = Self::new(guild_id, gateway, announcer, completions_tx);
        tokio::spawn(playback.run(requests_rx, completions_rx));

        debug!("Worker de reproducción creado para guild {}", guild_id);
        GuildHandle {
            requests: requests_tx,
        }
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<GuildRequest>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                // Completions already posted are applied before the next command
                biased;

                Some(completion) = completions.recv() => self.on_completion(completion).await,

                request = requests.recv() => match request {
                    Some(GuildRequest::Command(command, reply)) => {
                        let result = self.handle(command).await;
                        let _ = reply.send(result);
                    }
                    Some(GuildRequest::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => break,
                },
            }
        }

        debug!("Worker de reproducción terminado para guild {}", self.guild_id);
    }

    pub async fn handle(&mut self, command: GuildCommand) -> Result<Reply, CommandError> {
        debug!("Guild {} procesando {:?}", self.guild_id, command);

        match command {
            GuildCommand::PlayNow(entry) => self.play_now(entry).await,
            GuildCommand::Pause => self.pause(),
            GuildCommand::Resume => self.resume(),
            GuildCommand::Skip => self.skip().await,
            GuildCommand::Clear => {
                self.halt();
                self.queue.clear();
                info!("🗑️ Cola limpiada en guild {}", self.guild_id);
                Ok(Reply::Cleared)
            }
            GuildCommand::Leave => self.leave().await,
            GuildCommand::StartRadio { url, voice_channel } => {
                self.start_radio(url, voice_channel).await
            }
            GuildCommand::StopRadio => match self.mode {
                PlaybackMode::Radio { .. } => {
                    self.halt();
                    info!("⏹️ Radio detenida en guild {}", self.guild_id);
                    Ok(Reply::RadioStopped)
                }
                _ => Err(StateError::NoRadio.into()),
            },
            GuildCommand::VoiceDisconnected => {
                self.voice_lost().await;
                Ok(Reply::Left)
            }
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            mode: self.mode.clone(),
            queue: self.queue.iter().map(|e| e.title().to_string()).collect(),
            voice_channel: self.session.as_ref().map(|s| s.channel_id()),
        }
    }

    /// Applies an end-of-stream notice from the transport.
    pub async fn on_completion(&mut self, completion: Completion) {
        if self.in_flight != Some(completion.generation) {
            debug!(
                "Ignorando finalización obsoleta {} en guild {}",
                completion.generation, self.guild_id
            );
            return;
        }
        self.in_flight = None;

        if let Some(e) = &completion.error {
            error!("❌ Error de reproducción en guild {}: {}", self.guild_id, e);
        }

        match self.mode {
            PlaybackMode::Radio { .. } => {
                self.mode = PlaybackMode::Idle;
                info!("📻 Stream de radio terminado en guild {}", self.guild_id);
            }
            PlaybackMode::Queue { .. } => {
                self.queue.pop_front();
                let notice_channel = self.queue.front().map(|e| e.text_channel);

                if let Err(e) = self.advance().await {
                    warn!("No se pudo continuar la cola en guild {}: {}", self.guild_id, e);
                    self.queue.clear();
                    self.mode = PlaybackMode::Idle;
                    if let Some(channel_id) = notice_channel {
                        self.announcer.announce(channel_id, format!("❌ {}", e)).await;
                    }
                }
            }
            PlaybackMode::Idle => {}
        }
    }

    async fn play_now(&mut self, entry: QueueEntry) -> Result<Reply, CommandError> {
        self.ensure_connected(entry.voice_channel).await?;

        let title = entry.title().to_string();
        self.halt();
        self.queue.clear();
        self.queue.push_back(entry);

        self.advance().await?;
        Ok(Reply::NowPlaying { title })
    }

    /// Starts the queue head, or goes idle when the queue is empty.
    ///
    /// Entries the transport refuses to play are dropped and the next one is
    /// tried. The error of the last refusal is returned once the queue runs
    /// dry.
    async fn advance(&mut self) -> Result<(), CommandError> {
        let mut refused: Option<PlaybackError> = None;

        loop {
            let Some(entry) = self.queue.front().cloned() else {
                self.mode = PlaybackMode::Idle;
                info!("📭 Cola vacía en guild {}", self.guild_id);
                return refused.map_or(Ok(()), |e| Err(e.into()));
            };

            if let Err(e) = self.ensure_connected(entry.voice_channel).await {
                self.mode = PlaybackMode::Idle;
                return Err(e.into());
            }

            let notifier = self.next_notifier();
            let generation = notifier.generation();

            let played = match self.session.as_mut() {
                Some(session) => session.play(entry.track.source_uri(), notifier).await,
                None => Err(PlaybackError::NotConnected),
            };

            match played {
                Ok(()) => {
                    self.in_flight = Some(generation);
                    self.mode = PlaybackMode::Queue { paused: false };
                    info!(
                        "🎵 Reproduciendo: {} (pedido por {}) en guild {}",
                        entry.title(),
                        entry.requested_by,
                        self.guild_id
                    );
                    self.announcer
                        .announce(entry.text_channel, entry.now_playing_notice())
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    error!("❌ No se pudo reproducir {}: {}", entry.title(), e);
                    self.queue.pop_front();
                    refused = Some(e);
                }
            }
        }
    }

    fn pause(&mut self) -> Result<Reply, CommandError> {
        match &mut self.mode {
            PlaybackMode::Queue { paused } | PlaybackMode::Radio { paused, .. } if !*paused => {
                *paused = true;
            }
            _ => return Err(StateError::NothingPlaying.into()),
        }

        if let Some(session) = self.session.as_mut() {
            session.pause();
        }
        Ok(Reply::Paused)
    }

    fn resume(&mut self) -> Result<Reply, CommandError> {
        match &mut self.mode {
            PlaybackMode::Queue { paused } | PlaybackMode::Radio { paused, .. } if *paused => {
                *paused = false;
            }
            _ => return Err(StateError::NotPaused.into()),
        }

        if let Some(session) = self.session.as_mut() {
            session.resume();
        }
        Ok(Reply::Resumed)
    }

    /// Drops the current track and starts the next one right away.
    ///
    /// The stopped track's completion is stale by the time it arrives, so
    /// back-to-back skips each move the queue by one entry.
    async fn skip(&mut self) -> Result<Reply, CommandError> {
        if !matches!(self.mode, PlaybackMode::Queue { .. }) {
            return Err(StateError::NothingPlaying.into());
        }

        self.in_flight = None;
        if let Some(session) = self.session.as_mut() {
            session.stop();
        }
        self.queue.pop_front();
        info!("⏭️ Track saltado en guild {}", self.guild_id);

        if let Err(e) = self.advance().await {
            self.queue.clear();
            self.mode = PlaybackMode::Idle;
            return Err(e);
        }
        Ok(Reply::Skipped)
    }

    async fn leave(&mut self) -> Result<Reply, CommandError> {
        self.halt();
        self.queue.clear();

        let Some(mut session) = self.session.take() else {
            return Err(StateError::NotConnected.into());
        };
        session.disconnect().await;
        Ok(Reply::Left)
    }

    /// Resets the guild once the transport confirms the connection is gone.
    ///
    /// A notice from an earlier leave can arrive after a new join; the live
    /// session answers `is_connected` and is kept.
    async fn voice_lost(&mut self) {
        if let Some(session) = self.session.as_ref() {
            if session.is_connected().await {
                debug!("Ignorando desconexión obsoleta en guild {}", self.guild_id);
                return;
            }
        }

        self.in_flight = None;
        self.mode = PlaybackMode::Idle;
        self.queue.clear();
        if let Some(mut session) = self.session.take() {
            session.disconnect().await;
            warn!("🔌 Conexión de voz perdida en guild {}", self.guild_id);
        }
    }

    async fn start_radio(
        &mut self,
        url: String,
        voice_channel: ChannelId,
    ) -> Result<Reply, CommandError> {
        self.ensure_connected(voice_channel).await?;

        self.halt();
        self.queue.clear();

        let notifier = self.next_notifier();
        let generation = notifier.generation();

        match self.session.as_mut() {
            Some(session) => session.play(&url, notifier).await?,
            None => return Err(PlaybackError::NotConnected.into()),
        }

        self.in_flight = Some(generation);
        self.mode = PlaybackMode::Radio {
            url: url.clone(),
            paused: false,
        };
        info!("📻 Radio iniciada en guild {}: {}", self.guild_id, url);
        Ok(Reply::RadioStarted { url })
    }

    /// Stops whatever is playing without advancing and goes idle.
    fn halt(&mut self) {
        self.in_flight = None;
        if let Some(session) = self.session.as_mut() {
            if self.mode.is_playing() || session.is_playing() || session.is_paused() {
                session.stop();
            }
        }
        self.mode = PlaybackMode::Idle;
    }

    /// Connects, or moves the existing session, to `channel_id`.
    async fn ensure_connected(
        &mut self,
        channel_id: ChannelId,
    ) -> Result<(), crate::error::ConnectionError> {
        match self.session {
            Some(ref mut session) => {
                if session.channel_id() != channel_id {
                    session.move_to(channel_id).await?;
                }
            }
            None => {
                let session = self.gateway.connect(self.guild_id, channel_id).await?;
                self.session = Some(session);
            }
        }
        Ok(())
    }

    fn next_notifier(&mut self) -> CompletionNotifier {
        self.generation += 1;
        CompletionNotifier::new(self.generation, self.completions.clone())
    }
}
