// Runtime settings, read from the process environment with fixed defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.moltbook.com/api/v1";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Upper bound on the registration round trip.
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the API lives, where credentials are kept, and how long ordinary
/// calls may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub env_file: PathBuf,
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Build settings from `MOLTBOOK_BASE_URL`, `MOLTBOOK_ENV_FILE` and
    /// `MOLTBOOK_TIMEOUT_SECS`, falling back to the public API, `./.env` and
    /// the transport's own timeout.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MOLTBOOK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let env_file = std::env::var_os("MOLTBOOK_ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_ENV_FILE)
            });
        let request_timeout = std::env::var("MOLTBOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| parse_timeout(&v));
        Settings {
            request_timeout,
            ..Settings::new(base_url, env_file)
        }
    }

    pub fn new(base_url: impl Into<String>, env_file: impl Into<PathBuf>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Settings {
            base_url,
            env_file: env_file.into(),
            request_timeout: None,
        }
    }
}

/// Whole seconds, ignoring zero and anything unparsable.
fn parse_timeout(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => None,
    }
}
