use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::{Command, CommandOptionType}, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        simple("mpause", "Pauses the current song"),
        simple("mresume", "Resumes the paused song"),
        simple("mskip", "Skips the current song"),
        simple("mqueue", "Shows the queue"),
        simple("mclear", "Clears the queue and stops the music"),
        simple("mleave", "Disconnects the bot from the voice channel"),
        radio_command(),
        simple("rstop", "Stops the radio stream"),
        simple("rinfo", "Shows what the radio is playing"),
        simple("help", "Displays the help message"),
    ]
}

fn simple(name: &str, description: &str) -> CreateCommand {
    CreateCommand::new(name).description(description)
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("mplay")
        .description("Plays a song from YouTube")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "Keywords or URL",
            )
            .required(true),
        )
}

fn radio_command() -> CreateCommand {
    CreateCommand::new("radio")
        .description("Plays a radio stream")
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "url",
            "Stream URL (defaults to the configured station)",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name_of(command: &CreateCommand) -> String {
        serde_json::to_value(command).unwrap()["name"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn registers_the_full_command_table() {
        let names: Vec<String> = all_commands().iter().map(name_of).collect();
        assert_eq!(
            names,
            vec![
                "mplay", "mpause", "mresume", "mskip", "mqueue", "mclear", "mleave", "radio",
                "rstop", "rinfo", "help",
            ]
        );
    }

    #[test]
    fn play_requires_a_query() {
        let value = serde_json::to_value(play_command()).unwrap();
        assert_eq!(value["options"][0]["name"], "query");
        assert_eq!(value["options"][0]["required"], true);
    }
}
