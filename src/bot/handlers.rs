use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::info;

use crate::{
    audio::{Reply, Requester},
    bot::CatalinaBot,
    error::CommandError,
};

pub const HELP_MESSAGE: &str = "\
🎵 Music Bot Commands:
/help - Displays this message
/mplay <keywords or URL> - Plays a song from YouTube
/mpause - Pauses the current song
/mresume - Resumes the song
/mskip - Skips the current song
/mqueue - Shows the queue
/mclear - Clears the queue
/mleave - Disconnects from VC
/radio [url] - Plays a radio stream
/rstop - Stops the radio
/rinfo - Shows the radio status";

const NOT_IN_VOICE: &str = "❌ You need to be connected to a voice channel!";

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CatalinaBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let player = &bot.coordinator;
    let outcome = match command.data.name.as_str() {
        "mplay" => return handle_play(ctx, &command, bot, guild_id).await,
        "radio" => {
            let Some(voice_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
                return respond(ctx, &command, NOT_IN_VOICE.to_string()).await;
            };
            player
                .start_radio(guild_id, voice_channel, string_option(&command, "url"))
                .await
        }
        "mpause" => player.pause(guild_id).await,
        "mresume" => player.resume(guild_id).await,
        "mskip" => player.skip(guild_id).await,
        "mqueue" => player.show_queue(guild_id).await,
        "mclear" => player.clear(guild_id).await,
        "mleave" => player.leave(guild_id).await,
        "rstop" => player.stop_radio(guild_id).await,
        "rinfo" => player.radio_info(guild_id).await,
        "help" => return respond(ctx, &command, HELP_MESSAGE.to_string()).await,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Unknown command")
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
    };

    respond(ctx, &command, render(outcome)).await
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CatalinaBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(voice_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
        return respond(ctx, command, NOT_IN_VOICE.to_string()).await;
    };

    let query = string_option(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?;

    // Defer la respuesta ya que la búsqueda puede tardar
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let requester = Requester {
        user_id: command.user.id,
        voice_channel,
        text_channel: command.channel_id,
    };
    let outcome = bot.coordinator.play(guild_id, requester, query).await;

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().content(render(outcome)),
        )
        .await?;

    Ok(())
}

/// Text shown to the user for a command outcome.
pub fn render(outcome: Result<Reply, CommandError>) -> String {
    match outcome {
        Ok(reply) => reply.to_string(),
        Err(e) => format!("❌ {}", e),
    }
}

async fn respond(ctx: &Context, command: &CommandInteraction, content: String) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

// Funciones auxiliares

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
