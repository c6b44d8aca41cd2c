//! Process configuration loaded from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Where variant images are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Filesystem { dir: PathBuf },
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Base of the prev/next links in paginated responses.
    pub app_url: String,
    pub page_limit: u32,
    pub jwt_secret: String,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub storage: StorageBackend,
    /// Base URL objects are published under (memory and filesystem backends).
    pub storage_public_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let server_host = get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or("SERVER_PORT", get("SERVER_PORT"), 8080_u16)?;
        let app_url = get("APP_URL")
            .unwrap_or_else(|| format!("http://{server_host}:{server_port}"))
            .trim_end_matches('/')
            .to_string();

        let page_limit = parse_or("PAG_LIMIT", get("PAG_LIMIT"), 5_u32)?;
        if page_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "PAG_LIMIT",
                message: "must be positive".to_string(),
            });
        }

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let use_persistent_stores = parse_or("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES"), false)?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let storage = match get("STORAGE_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("filesystem") => StorageBackend::Filesystem {
                dir: PathBuf::from(get("STORAGE_DIR").unwrap_or_else(|| "./uploads".to_string())),
            },
            Some("s3") => StorageBackend::S3 {
                bucket: get("AWS_BN").ok_or(ConfigError::Missing("AWS_BN"))?,
                region: get("AWS_REGION"),
                endpoint: get("S3_ENDPOINT"),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    message: format!("unknown backend '{other}' (expected memory, filesystem or s3)"),
                });
            }
        };
        let storage_public_url = get("STORAGE_PUBLIC_URL").unwrap_or_else(|| format!("{app_url}/images"));

        tracing::info!(
            server_host = %server_host,
            server_port,
            page_limit,
            use_persistent_stores,
            "configuration loaded"
        );

        Ok(Self {
            server_host,
            server_port,
            app_url,
            page_limit,
            jwt_secret,
            use_persistent_stores,
            database_url,
            storage,
            storage_public_url,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
