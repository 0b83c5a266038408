use std::{env, fmt, net::SocketAddr, path::PathBuf};

use super::{database_url, server_bind_address};

/// Deployment flavour; selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Settings for one run of the listings server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    /// Optional JSON fixture file loaded into the store at startup.
    pub seed_file: Option<PathBuf>,
}

impl AppConfig {
    /// Reads `APP_ENV`, `APP_BIND_ADDR`, `APP_DATABASE_URL` and `APP_SEED_FILE`.
    ///
    /// A seed path must name an existing file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let seed_file = match env::var("APP_SEED_FILE") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => {
                let path = PathBuf::from(value);
                if !path.is_file() {
                    return Err(ConfigError::SeedFile(path));
                }
                Some(path)
            }
            Err(_) => None,
        };

        Ok(Self {
            bind_addr,
            environment,
            database_url: database_url(),
            seed_file,
        })
    }
}

/// Rejected configuration value.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    SeedFile(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::SeedFile(path) => write!(
                f,
                "APP_SEED_FILE does not point to a readable file: {}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
