use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::social::SocialConfig;

/// Work factors bcrypt accepts.
const BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

/// Session lifetimes accepted in `auth.session_hours`: one hour to ten years.
const SESSION_HOURS: std::ops::RangeInclusive<u64> = 1..=87_600;

#[derive(Parser, Debug)]
#[command(name = "minifeed", about = "A small social feed")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign session tokens
    #[arg(long)]
    pub session_secret: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub session_secret: Option<String>,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "minifeed_session".to_string(),
            session_hours: 720,
            session_secret: None,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref secret) = cli.session_secret {
            config.auth.session_secret = Some(secret.clone());
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("minifeed.db"));
        }

        if !BCRYPT_COSTS.contains(&config.auth.bcrypt_cost) {
            anyhow::bail!(
                "auth.bcrypt_cost must be between {} and {}",
                BCRYPT_COSTS.start(),
                BCRYPT_COSTS.end()
            );
        }

        if !SESSION_HOURS.contains(&config.auth.session_hours) {
            anyhow::bail!(
                "auth.session_hours must be between {} and {}",
                SESSION_HOURS.start(),
                SESSION_HOURS.end()
            );
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".minifeed")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("minifeed.db"))
    }

    /// Core settings. Generates a throwaway secret when none is configured.
    pub fn social(&self) -> SocialConfig {
        let session_secret = match &self.auth.session_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "No session secret configured; using a random one. Sessions will not survive a restart."
                );
                crate::auth::session::generate_secret()
            }
        };

        SocialConfig {
            session_secret,
            session_hours: self.auth.session_hours,
            bcrypt_cost: self.auth.bcrypt_cost,
        }
    }
}
