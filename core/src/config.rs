use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub stdout: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigFile {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub config_file: ConfigFile,
}

impl Config {
    pub fn from_file() -> anyhow::Result<Self> {
        let config_path = if Path::new("configdb.json").exists() {
            "configdb.json"
        } else if Path::new("../configdb.json").exists() {
            "../configdb.json"
        } else {
            tracing::warn!("configdb.json not found, using configdb.example.json");
            "configdb.example.json"
        };

        let config_str = fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", config_path, e))?;

        let config_file: ConfigFile = serde_json::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            config_file.database.username,
            config_file.database.password,
            config_file.database.host,
            config_file.database.port,
            config_file.database.database,
        );

        Ok(Self {
            database_url,
            config_file,
        })
    }

    /// DATABASE_URL wins over the config file when both are present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            let mut config = Self::from_file().unwrap_or_else(|_| Self {
                database_url: database_url.clone(),
                config_file: ConfigFile {
                    database: DatabaseConfig {
                        host: String::new(),
                        port: 5432,
                        database: String::new(),
                        username: String::new(),
                        password: String::new(),
                        max_connections: None,
                        min_connections: None,
                        connect_timeout: None,
                    },
                    logging: LoggingConfig {
                        level: "info".to_string(),
                        stdout: Some(true),
                    },
                },
            });
            config.database_url = database_url;
            return Ok(config);
        }

        Self::from_file()
    }
}

/// Install the tracing subscriber for embedding binaries. `RUST_LOG` wins
/// over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
