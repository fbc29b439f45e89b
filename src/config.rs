use std::{fmt::Debug, time::Duration};

use bon::Builder;
use url::Url;

use crate::meter::Meter;

/// Immutable client configuration, built once at process start.
#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct Config {
    pub credentials: Credentials,

    #[builder(default = Config::default_base_url())]
    pub base_url: Url,

    #[builder(default = UserAgent::detect())]
    pub user_agent: UserAgent,

    /// Per-call timeout.
    #[builder(default = Duration::from_secs(10))]
    pub timeout: Duration,

    /// Cooldown given to every discovered meter, in minutes (clamped by [`Meter::new`]).
    #[builder(default = Meter::MIN_UPDATE_INTERVAL_MINUTES)]
    pub update_interval_minutes: u32,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.duke-energy.com/";

    fn default_base_url() -> Url {
        Url::parse(Self::DEFAULT_BASE_URL).expect("the default base URL should be valid")
    }

    /// Absolute URL of a portal path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

/// `User-Agent` sent with every request.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub struct UserAgent(String);

impl UserAgent {
    /// Identify as this crate running on the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self(format!(
            "rust/{os}-{arch} {name}/{version}",
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            name = env!("CARGO_PKG_NAME"),
            version = env!("CARGO_PKG_VERSION"),
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserAgent {
    fn from(user_agent: String) -> Self {
        Self(user_agent)
    }
}
