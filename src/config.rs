use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_RADIO_URL: &str = "https://stream.example.com/default_radio.mp3";

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Radio
    pub default_radio_url: String,

    // Límites
    pub resolve_timeout: Duration,
    pub connect_timeout: Duration,
    pub queue_display_limit: usize,
}

impl Config {
    /// Loads `.env` (if present) and builds the configuration from the
    /// process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// The token is read from `DISCORD_TOKEN`, falling back to `TOKEN`.
    /// Every other key has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN")
            .or_else(|| var("TOKEN"))
            .context("DISCORD_TOKEN is not set. Add it to the environment or to your .env file")?;

        let config = Self {
            discord_token,
            guild_id: var("GUILD_ID")
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("GUILD_ID must be a numeric guild id")?,

            default_radio_url: var("DEFAULT_RADIO_URL")
                .unwrap_or_else(|| DEFAULT_RADIO_URL.to_string()),

            resolve_timeout: Duration::from_secs(
                var("RESOLVE_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse()
                    .context("RESOLVE_TIMEOUT_SECS must be a number of seconds")?,
            ),
            connect_timeout: Duration::from_secs(
                var("CONNECT_TIMEOUT_SECS")
                    .unwrap_or_else(|| "15".to_string())
                    .parse()
                    .context("CONNECT_TIMEOUT_SECS must be a number of seconds")?,
            ),
            queue_display_limit: var("QUEUE_DISPLAY_LIMIT")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("QUEUE_DISPLAY_LIMIT must be a positive integer")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Timeouts must be greater than zero
    /// - The queue display limit must be greater than zero
    /// - The default radio URL must be an http(s) URL
    pub fn validate(&self) -> Result<()> {
        if self.resolve_timeout.is_zero() {
            anyhow::bail!("Resolve timeout must be greater than 0");
        }

        if self.connect_timeout.is_zero() {
            anyhow::bail!("Connect timeout must be greater than 0");
        }

        if self.queue_display_limit == 0 {
            anyhow::bail!("Queue display limit must be greater than 0");
        }

        if !crate::sources::is_direct_uri(&self.default_radio_url) {
            anyhow::bail!(
                "Default radio URL must start with http:// or https://, got: {}",
                self.default_radio_url
            );
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Radio: default {}\n  \
            Limits: {}s resolve, {}s connect, {} queue entries shown",
            self.guild_id
                .map_or("global".to_string(), |id| format!("for guild {}", id)),
            self.default_radio_url,
            self.resolve_timeout.as_secs(),
            self.connect_timeout.as_secs(),
            self.queue_display_limit,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            default_radio_url: DEFAULT_RADIO_URL.to_string(),

            resolve_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            queue_display_limit: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_names_the_variable() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        assert!(Config::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn falls_back_to_legacy_token_variable() {
        let config = Config::from_lookup(lookup(&[("TOKEN", "abc")])).unwrap();
        assert_eq!(config.discord_token, "abc");
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.guild_id, None);
        assert_eq!(config.default_radio_url, DEFAULT_RADIO_URL);
        assert_eq!(config.resolve_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.queue_display_limit, 10);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("QUEUE_DISPLAY_LIMIT", "0"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("DEFAULT_RADIO_URL", "ftp://radio"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("GUILD_ID", "not-a-number"),
        ]))
        .is_err());
    }

    #[test]
    fn summary_hides_the_token() {
        let config = Config {
            discord_token: "super-secret".into(),
            guild_id: Some(42),
            ..Config::default()
        };
        let summary = config.summary();
        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("for guild 42"));
    }
}
