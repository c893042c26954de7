use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Name this service signs its backend requests with
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Base URL of the application backend (permissions, users, files)
    #[serde(default = "default_app_service_url")]
    pub app_service_url: String,

    /// Shared secret for service JWTs sent to the backend
    pub service_jwt_secret: Option<String>,

    /// Age at which an unrefreshed cell lock is abandoned
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    #[serde(default = "default_lock_sweep_secs")]
    pub lock_sweep_secs: u64,

    /// Inactivity after which an editor is removed from a session
    #[serde(default = "default_presence_idle_secs")]
    pub presence_idle_secs: u64,

    #[serde(default = "default_presence_sweep_secs")]
    pub presence_sweep_secs: u64,

    #[serde(default = "default_user_cache_ttl_secs")]
    pub user_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn lock_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lock_ttl_secs as i64)
    }

    pub fn presence_idle(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.presence_idle_secs as i64)
    }

    pub fn lock_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lock_sweep_secs.max(1))
    }

    pub fn presence_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence_sweep_secs.max(1))
    }

    pub fn user_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.user_cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            service_name: default_service_name(),
            app_service_url: default_app_service_url(),
            service_jwt_secret: None,
            lock_ttl_secs: default_lock_ttl_secs(),
            lock_sweep_secs: default_lock_sweep_secs(),
            presence_idle_secs: default_presence_idle_secs(),
            presence_sweep_secs: default_presence_sweep_secs(),
            user_cache_ttl_secs: default_user_cache_ttl_secs(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "colabri-grid".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_app_service_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_lock_ttl_secs() -> u64 {
    30
}

fn default_lock_sweep_secs() -> u64 {
    30
}

fn default_presence_idle_secs() -> u64 {
    300
}

fn default_presence_sweep_secs() -> u64 {
    300
}

fn default_user_cache_ttl_secs() -> u64 {
    300
}
