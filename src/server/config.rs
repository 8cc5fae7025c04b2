use crate::server::error::{config::ConfigError, AppError};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3004;
const DEFAULT_DEPLOY_ENV: &str = "dev";

pub struct Config {
    pub database_url: String,

    pub host: String,
    pub port: u16,

    pub deploy_env: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let port = match std::env::var("APP_PORT") {
            Ok(value) => value.parse().map_err(|e| ConfigError::InvalidEnvVar {
                name: "APP_PORT".to_string(),
                reason: format!("{}", e),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port,
            deploy_env: std::env::var("DEPLOY_ENV")
                .unwrap_or_else(|_| DEFAULT_DEPLOY_ENV.to_string()),
        })
    }

    /// `host:port` the server listens on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
