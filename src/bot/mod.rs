//! # Bot Module
//!
//! Discord front-end of the player.
//!
//! - Slash command registration on ready (per guild when `GUILD_ID` is set)
//! - Interaction dispatch to the [`PlaybackCoordinator`]
//! - Voice state tracking, so a moderator disconnecting the bot resets the
//!   guild
//!
//! The playback itself lives in [`crate::audio`]; this module only turns
//! Discord events into coordinator calls and replies into messages.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Http, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::{Announcer, PlaybackCoordinator},
    config::Config,
};

/// Main Discord event handler.
pub struct CatalinaBot {
    config: Arc<Config>,
    pub coordinator: Arc<PlaybackCoordinator>,
}

impl CatalinaBot {
    pub fn new(config: Arc<Config>, coordinator: Arc<PlaybackCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands propagate almost immediately, global ones can take up
    /// to an hour. The bot needs the `applications.commands` scope either way.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for CatalinaBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea! (ID: {})", ready.user.name, ready.user.id);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    /// Errors are logged and never reach the gateway loop; a failed reply
    /// shows up as "This interaction failed" on the user's side.
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        // Detectar si el bot fue desconectado
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.coordinator.voice_disconnected(guild_id).await;
        }
    }
}

/// Posts announcements into Discord text channels.
pub struct SerenityAnnouncer {
    http: Arc<Http>,
}

impl SerenityAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for SerenityAnnouncer {
    async fn announce(&self, channel_id: ChannelId, message: String) {
        if let Err(e) = channel_id.say(&self.http, message).await {
            warn!("⚠️ No se pudo enviar mensaje a {}: {:?}", channel_id, e);
        }
    }
}
