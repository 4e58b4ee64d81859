use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    audio::session::{CompletionNotifier, VoiceGateway, VoiceSession},
    error::{ConnectionError, PlaybackError},
};

/// Opens songbird calls through the client's voice manager.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    connect_timeout: Duration,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>, connect_timeout: Duration) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            connect_timeout,
        }
    }
}

async fn join(
    manager: &Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
    connect_timeout: Duration,
) -> Result<Arc<Mutex<Call>>, ConnectionError> {
    match tokio::time::timeout(connect_timeout, manager.join(guild_id, channel_id)).await {
        Ok(Ok(call)) => Ok(call),
        Ok(Err(e)) => {
            error!("Error al conectar al canal de voz: {:?}", e);
            Err(ConnectionError::Join(e.to_string()))
        }
        Err(_) => Err(ConnectionError::Timeout),
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceSession>, ConnectionError> {
        let call = join(&self.manager, guild_id, channel_id, self.connect_timeout).await?;
        info!("🔊 Conectado al canal de voz en guild {}", guild_id);

        Ok(Box::new(SongbirdSession {
            guild_id,
            channel_id,
            manager: self.manager.clone(),
            call,
            http: self.http.clone(),
            connect_timeout: self.connect_timeout,
            connected: true,
            track: None,
        }))
    }
}

struct ActiveTrack {
    handle: TrackHandle,
    paused: bool,
    finished: Arc<AtomicBool>,
}

impl ActiveTrack {
    fn is_live(&self) -> bool {
        !self.finished.load(Ordering::Acquire)
    }
}

pub struct SongbirdSession {
    guild_id: GuildId,
    channel_id: ChannelId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    connect_timeout: Duration,
    connected: bool,
    track: Option<ActiveTrack>,
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<(), ConnectionError> {
        if self.connected && self.channel_id == channel_id {
            return Ok(());
        }

        // songbird reutiliza la llamada existente del guild al volver a unirse
        self.call = join(&self.manager, self.guild_id, channel_id, self.connect_timeout).await?;
        self.channel_id = channel_id;
        self.connected = true;

        info!("🔀 Movido al canal {} en guild {}", channel_id, self.guild_id);
        Ok(())
    }

    async fn play(
        &mut self,
        source_uri: &str,
        on_complete: CompletionNotifier,
    ) -> Result<(), PlaybackError> {
        if !self.connected {
            return Err(PlaybackError::NotConnected);
        }

        let input: Input = HttpRequest::new(self.http.clone(), source_uri.to_string()).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };

        let finished = Arc::new(AtomicBool::new(false));
        let notifier = Arc::new(SyncMutex::new(Some(on_complete)));

        for (event, failed) in [(TrackEvent::End, false), (TrackEvent::Error, true)] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackCompletion {
                        guild_id: self.guild_id,
                        notifier: notifier.clone(),
                        finished: finished.clone(),
                        failed,
                    },
                )
                .map_err(|e| PlaybackError::Transport(e.to_string()))?;
        }

        self.track = Some(ActiveTrack {
            handle,
            paused: false,
            finished,
        });

        Ok(())
    }

    fn pause(&mut self) {
        if let Some(track) = self.track.as_mut().filter(|t| t.is_live() && !t.paused) {
            let _ = track.handle.pause();
            track.paused = true;
            info!("⏸️ Reproducción pausada");
        }
    }

    fn resume(&mut self) {
        if let Some(track) = self.track.as_mut().filter(|t| t.is_live() && t.paused) {
            let _ = track.handle.play();
            track.paused = false;
            info!("▶️ Reproducción reanudada");
        }
    }

    fn stop(&mut self) {
        if let Some(track) = self.track.take() {
            let _ = track.handle.stop();
            info!("⏹️ Reproducción detenida");
        }
    }

    fn is_playing(&self) -> bool {
        self.track.as_ref().is_some_and(ActiveTrack::is_live)
    }

    fn is_paused(&self) -> bool {
        self.track.as_ref().is_some_and(|t| t.is_live() && t.paused)
    }

    async fn is_connected(&self) -> bool {
        // songbird suelta el canal al recibir el voice state de una expulsión
        self.connected && self.call.lock().await.current_channel().is_some()
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }

        self.stop();
        self.connected = false;

        if let Err(e) = self.manager.remove(self.guild_id).await {
            debug!("La llamada ya no existía en guild {}: {:?}", self.guild_id, e);
        }

        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
    }
}

/// Handler para cuando termina o falla una canción
///
/// End and Error both get one of these; they share the notifier so only the
/// first to fire reports.
struct TrackCompletion {
    guild_id: GuildId,
    notifier: Arc<SyncMutex<Option<CompletionNotifier>>>,
    finished: Arc<AtomicBool>,
    failed: bool,
}

#[async_trait]
impl VoiceEventHandler for TrackCompletion {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        self.finished.store(true, Ordering::Release);

        let error = self.failed.then(|| {
            let cause = match ctx {
                EventContext::Track(tracks) => tracks.first().and_then(|(state, _)| {
                    match &state.playing {
                        PlayMode::Errored(e) => Some(format!("{:?}", e)),
                        _ => None,
                    }
                }),
                _ => None,
            };
            PlaybackError::Transport(cause.unwrap_or_else(|| "track failed".to_string()))
        });

        let notifier = self.notifier.lock().take();
        if let Some(notifier) = notifier {
            match &error {
                Some(e) => warn!("❌ Error en track para guild {}: {}", self.guild_id, e),
                None => debug!("Track terminado en guild {}", self.guild_id),
            }
            notifier.notify(error);
        }

        Some(Event::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::session::Completion;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn end_and_error_report_a_single_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let notifier = Arc::new(SyncMutex::new(Some(CompletionNotifier::new(3, tx))));
        let finished = Arc::new(AtomicBool::new(false));

        let handler = |failed| TrackCompletion {
            guild_id: GuildId::new(1),
            notifier: notifier.clone(),
            finished: finished.clone(),
            failed,
        };
        let on_error = handler(true);
        let on_end = handler(false);

        let next = on_error.act(&EventContext::Track(&[])).await;
        assert!(matches!(next, Some(Event::Cancel)));
        on_end.act(&EventContext::Track(&[])).await;

        assert!(finished.load(Ordering::Acquire));
        assert_eq!(
            rx.try_recv().unwrap(),
            Completion {
                generation: 3,
                error: Some(PlaybackError::Transport("track failed".into())),
            }
        );
        // El notificador se consumió: el canal queda cerrado sin más avisos
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn natural_end_reports_no_error() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let on_end = TrackCompletion {
            guild_id: GuildId::new(1),
            notifier: Arc::new(SyncMutex::new(Some(CompletionNotifier::new(1, tx)))),
            finished: Arc::new(AtomicBool::new(false)),
            failed: false,
        };

        on_end.act(&EventContext::Track(&[])).await;

        assert_eq!(rx.try_recv().unwrap().error, None);
    }
}
