use dotenvy::dotenv;
use serde::Deserialize;

use crate::error::Result;

fn default_max_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Upper bound on open connections. Operations run one at a time, so a
    /// single connection is enough.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Fallback tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Build a configuration from an explicit list of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(vars)?)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration.
///
/// A URL given on the command line takes precedence over `DATABASE_URL`.
pub fn init(database_url: Option<String>) -> Result<Config> {
    dotenv().ok();

    match database_url {
        Some(url) => {
            let mut vars: Vec<(String, String)> = std::env::vars()
                .filter(|(key, _)| key != "DATABASE_URL")
                .collect();
            vars.push(("DATABASE_URL".to_string(), url));
            Config::from_vars(vars)
        }
        None => Config::load(),
    }
}
