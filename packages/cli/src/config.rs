use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

use parkshare_storage::StorageConfig;

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid bind address: {0}")]
    InvalidHost(String),
    #[error("Invalid database connection limit: {0}")]
    InvalidMaxConnections(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: String,
    /// SQLite file; `None` runs on the in-memory store
    pub database_path: Option<PathBuf>,
    pub database_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match env::var("PARKSHARE_HOST") {
            Ok(value) => value
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidHost(value))?,
            Err(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port_str = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let port = port_str.trim().parse::<u16>()?;
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());

        let database_path = env::var("DATABASE_PATH")
            .ok()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxConnections(value)),
            },
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Config {
            host,
            port,
            cors_origin,
            database_path,
            database_max_connections,
        })
    }

    /// Command line flags win over the environment
    pub fn with_overrides(
        mut self,
        host: Option<IpAddr>,
        port: Option<u16>,
        database: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            if port == 0 {
                return Err(ConfigError::PortOutOfRange(port));
            }
            self.port = port;
        }
        if database.is_some() {
            self.database_path = database;
        }
        Ok(self)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn storage_config(&self) -> StorageConfig {
        let mut config = StorageConfig::from_database_path(self.database_path.clone());
        config.max_connections = self.database_max_connections;
        config
    }
}
