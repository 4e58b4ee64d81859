//! Error taxonomy for the playback subsystem.
//!
//! None of these are fatal. Resolution and connection failures abort the
//! requested transition, playback failures are logged and treated as the end
//! of the track, and state errors are informational replies. The `Display`
//! output of [`CommandError`] is what users see in the chat.

use thiserror::Error;

/// A query or URL could not be turned into a playable track.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no results found for \"{0}\"")]
    NoResults(String),

    #[error("the provider returned no stream URL")]
    MissingStreamUrl,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("resolution timed out")]
    Timeout,

    #[error("not a valid stream URL: {0}")]
    InvalidUri(String),
}

/// The bot could not join or move within a voice channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("could not join the voice channel: {0}")]
    Join(String),

    #[error("timed out connecting to the voice channel")]
    Timeout,
}

/// The transport failed to start or keep streaming a source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("voice session is not connected")]
    NotConnected,
}

/// The command is not valid for the guild's current playback state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("No music is currently playing.")]
    NothingPlaying,

    #[error("Music is not paused.")]
    NotPaused,

    #[error("Not connected to any voice channel.")]
    NotConnected,

    #[error("No radio is currently playing.")]
    NoRadio,
}

/// Everything a coordinator command can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Could not retrieve the song ({0}). Try another keyword or URL.")]
    Resolution(#[from] ResolutionError),

    #[error("Could not reach your voice channel ({0}).")]
    Connection(#[from] ConnectionError),

    #[error("Could not start playback ({0}).")]
    Playback(#[from] PlaybackError),

    #[error("{0}")]
    State(#[from] StateError),

    #[error("The player for this server is not available right now.")]
    WorkerGone,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_errors_render_as_user_messages() {
        let err = CommandError::from(StateError::NothingPlaying);
        assert_eq!(err.to_string(), "No music is currently playing.");
    }

    #[test]
    fn resolution_errors_keep_the_cause() {
        let err = CommandError::from(ResolutionError::NoResults("zzz".into()));
        assert_eq!(
            err.to_string(),
            "Could not retrieve the song (no results found for \"zzz\"). Try another keyword or URL."
        );
    }
}
