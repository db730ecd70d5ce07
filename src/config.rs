//! Application-level configuration loading for match pacing, the question
//! provider, and token lifetimes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_DUEL_BACK_CONFIG_PATH";
/// Pause between a closed round and the next question broadcast.
const DEFAULT_ROUND_DELAY_MS: u64 = 2_000;
/// Trivia provider queried at match start.
const DEFAULT_QUESTION_API_URL: &str =
    "https://opentdb.com/api.php?amount=10&category=21&type=multiple";
/// How many fresh codes room creation tries before giving up.
const DEFAULT_CODE_ATTEMPTS: u32 = 5;
/// Bearer token lifetime.
const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    round_delay: Duration,
    question_api_url: String,
    code_attempts: u32,
    token_ttl: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Pacing delay between rounds.
    pub fn round_delay(&self) -> Duration {
        self.round_delay
    }

    /// URL of the trivia provider.
    pub fn question_api_url(&self) -> &str {
        &self.question_api_url
    }

    /// Attempt budget for room code generation.
    pub fn code_attempts(&self) -> u32 {
        self.code_attempts
    }

    /// Lifetime of minted bearer tokens.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[cfg(test)]
    pub(crate) fn for_tests(round_delay: Duration) -> Self {
        Self {
            round_delay,
            ..Self::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            round_delay: Duration::from_millis(DEFAULT_ROUND_DELAY_MS),
            question_api_url: DEFAULT_QUESTION_API_URL.to_owned(),
            code_attempts: DEFAULT_CODE_ATTEMPTS,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`]. Every field is optional.
struct RawConfig {
    round_delay_ms: Option<u64>,
    question_api_url: Option<String>,
    room_code_attempts: Option<u32>,
    token_ttl_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            round_delay: value
                .round_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.round_delay),
            question_api_url: value.question_api_url.unwrap_or(defaults.question_api_url),
            code_attempts: value.room_code_attempts.unwrap_or(defaults.code_attempts),
            token_ttl: value
                .token_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.token_ttl),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
