use crate::storage::{DEFAULT_CHECKPOINT_THRESHOLD, DurabilityMode};
use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_ENTRY_SCRIPT: &str = "student_scores.cgi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    Development,
    #[default]
    Production,
}

impl AppEnv {
    fn from_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(anyhow!("APP_ENV must be one of: development, production")),
        }
    }

    /// Development raises the default log filter to `debug`.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Application configuration
///
/// Loaded from the process environment (and `.env`, when present); the
/// binary lets a few values be overridden from the command line.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_env: AppEnv,

    /// Durable store location; `None` keeps records in memory only
    pub data_dir: Option<PathBuf>,
    pub durability: DurabilityMode,
    pub checkpoint_threshold: usize,

    /// Shared secret for webhook signatures; `None` disables the webhook
    pub webhook_secret: Option<String>,
    pub deploy_dir: PathBuf,
    pub deploy_entry_script: String,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            app_env: AppEnv::default(),
            data_dir: None,
            durability: DurabilityMode::default(),
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
            webhook_secret: None,
            deploy_dir: PathBuf::from("."),
            deploy_entry_script: DEFAULT_ENTRY_SCRIPT.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::new();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("APP_PORT") {
            Some(raw) => raw.parse::<u16>().context("APP_PORT must be a valid u16")?,
            None => defaults.port,
        };

        let app_env = match non_empty("APP_ENV") {
            Some(raw) => AppEnv::from_env(&raw)?,
            None => defaults.app_env,
        };

        let durability = match non_empty("DURABILITY") {
            Some(raw) => raw.parse::<DurabilityMode>().map_err(|e| anyhow!(e))?,
            None => defaults.durability,
        };

        let checkpoint_threshold = match non_empty("CHECKPOINT_THRESHOLD") {
            Some(raw) => raw
                .parse::<usize>()
                .context("CHECKPOINT_THRESHOLD must be a valid usize")?,
            None => defaults.checkpoint_threshold,
        };

        let config = Self {
            host: non_empty("APP_HOST").unwrap_or(defaults.host),
            port,
            app_env,
            data_dir: non_empty("DATA_DIR").map(PathBuf::from),
            durability,
            checkpoint_threshold,
            webhook_secret: non_empty("WEBHOOK_SECRET"),
            deploy_dir: non_empty("DEPLOY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.deploy_dir),
            deploy_entry_script: non_empty("DEPLOY_ENTRY_SCRIPT")
                .unwrap_or(defaults.deploy_entry_script),
        };

        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }

    /// Set the host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".to_string());
        }

        if self.checkpoint_threshold == 0 {
            return Err("CHECKPOINT_THRESHOLD must be > 0".to_string());
        }

        if self.deploy_entry_script.contains('/') {
            return Err("DEPLOY_ENTRY_SCRIPT must be a file name inside DEPLOY_DIR".to_string());
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("app_env", &self.app_env)
            .field("data_dir", &self.data_dir)
            .field("durability", &self.durability)
            .field("checkpoint_threshold", &self.checkpoint_threshold)
            // Don't expose the secret
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .field("deploy_dir", &self.deploy_dir)
            .field("deploy_entry_script", &self.deploy_entry_script)
            .finish()
    }
}
