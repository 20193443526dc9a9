use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::sync::Arc;

pub mod config {
    use serde::Deserialize;

    /// Environment variable prefix, e.g. `TASKRETRO_PORT=9000`.
    pub const ENV_PREFIX: &str = "TASKRETRO";

    #[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
    pub struct Config {
        #[serde(default = "default_app_name")]
        pub app_name: String,
        #[serde(default = "default_version")]
        pub version: String,
        #[serde(default)]
        pub debug: bool,
        #[serde(default = "default_host")]
        pub host: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default)]
        pub reload: bool,
    }

    impl Config {
        /// Loads configuration from `TASKRETRO_*` environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        }

        fn from_source(source: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Socket address the server binds to.
        pub fn bind_address(&self) -> String {
            format!("{}:{}", self.host, self.port)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                app_name: default_app_name(),
                version: default_version(),
                debug: false,
                host: default_host(),
                port: default_port(),
                reload: false,
            }
        }
    }

    fn default_app_name() -> String {
        "Task Retro API".to_string()
    }

    fn default_version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

}

pub mod repository;
pub mod retrospective;
pub mod task;
pub mod web;

/// Clock shared by the services, swappable in tests.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Returns the clock's current time, nudged forward if needed so it is
/// strictly later than `previous`.
pub(crate) fn next_timestamp(previous: DateTime<Utc>, clock: &dyn Clock) -> DateTime<Utc> {
    let now = clock.utc();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
