//! # Audio Module
//!
//! Playback core of the bot: per-guild queues, the voice transport
//! abstraction and the registry that routes commands to each guild.
//!
//! ## Architecture
//!
//! ### [`coordinator`] - Playback Coordinator
//! - Guild id → worker registry, created lazily on the first command
//! - Resolves tracks before handing them to the guild
//! - One async method per chat command
//!
//! ### [`player`] - Guild Playback State
//! - Queue, playback mode (idle / queue / radio) and the voice session
//! - One tokio task per guild; commands and voice completions are applied
//!   in arrival order by that task only
//! - Generation-tagged completions so a stop never advances twice
//!
//! ### [`session`] / [`voice`] - Voice Session
//! - `VoiceGateway` / `VoiceSession` traits
//! - Songbird implementation streaming over HTTP
//!
//! ### [`queue`] - Queue entries and listings
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use serenity::all::{ChannelId, GuildId, UserId};
//! # async fn example(player: Arc<PlaybackCoordinator>) -> anyhow::Result<()> {
//! let guild_id = GuildId::new(123456789);
//! let requester = Requester {
//!     user_id: UserId::new(42),
//!     voice_channel: ChannelId::new(987654321),
//!     text_channel: ChannelId::new(555),
//! };
//!
//! player.play(guild_id, requester, "never gonna give you up").await?;
//! player.pause(guild_id).await?;
//! player.resume(guild_id).await?;
//! player.skip(guild_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod player;
pub mod queue;
pub mod reply;
pub mod session;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{PlaybackCoordinator, Requester};
pub use player::Announcer;
pub use reply::Reply;
pub use voice::SongbirdGateway;
