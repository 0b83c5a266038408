pub mod config;

use std::{env, net::SocketAddr};

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://listings.db?mode=rwc";

/// Reads a local `.env` into the process environment; a missing file is fine.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// `APP_BIND_ADDR`, or [`DEFAULT_BIND_ADDR`] when unset.
pub fn server_bind_address() -> Result<SocketAddr, std::net::AddrParseError> {
    let value = env::var("APP_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    value.parse()
}

/// `APP_DATABASE_URL`, or [`DEFAULT_DATABASE_URL`] when unset or blank.
pub fn database_url() -> String {
    env::var("APP_DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{LazyLock, Mutex};

    /// Serialises tests that mutate process environment variables.
    pub static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
}
