use std::{env, fmt, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

/// Which pair of backends the service talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// S3 for objects, DynamoDB for records.
    Aws,
    /// Process-local maps. Nothing survives a restart.
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "s3" => Ok(Backend::Aws),
            "memory" | "in-memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{}', expected 'aws' or 'memory'", other)),
        }
    }
}

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_TABLE_NAME: &str = "meme_list";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CLEANUP_MAX_ELAPSED_SECS: u64 = 300;

#[derive(Clone)] // Clone needed if passed around
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend: Backend,
    pub meme_bucket_name: String,
    pub memes_table_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub public_base_url: Option<String>,
    // Bearer token required for deletes; None disables deleting entirely
    pub admin_token: Option<String>,
    pub max_upload_bytes: usize,
    pub cleanup_max_elapsed: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    /// `load` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated the same as unset ones
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let backend = match var("STORAGE_BACKEND") {
            Some(raw) => raw
                .parse::<Backend>()
                .map_err(|e| ConfigError::InvalidVar("STORAGE_BACKEND".into(), e))?,
            None => Backend::Aws,
        };

        // The bucket is only mandatory when we actually talk to S3
        let meme_bucket_name = match (var("MEME_BUCKET_NAME"), backend) {
            (Some(name), _) => name,
            (None, Backend::Memory) => "memes".to_string(),
            (None, Backend::Aws) => return Err(ConfigError::MissingVar("MEME_BUCKET_NAME".into())),
        };

        let memes_table_name = var("MEMES_TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let aws_region = var("AWS_DEFAULT_REGION")
            .unwrap_or_else(|| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = var("AWS_ENDPOINT_URL").map(|url| url.trim_end_matches('/').to_string());
        let public_base_url = var("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string());

        let admin_token = var("ADMIN_TOKEN");

        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", var("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?;
        let cleanup_secs = parse_or(
            "CLEANUP_MAX_ELAPSED_SECS",
            var("CLEANUP_MAX_ELAPSED_SECS"),
            DEFAULT_CLEANUP_MAX_ELAPSED_SECS,
        )?;

        Ok(Config {
            bind_address,
            backend,
            meme_bucket_name,
            memes_table_name,
            aws_region,
            localstack_endpoint,
            public_base_url,
            admin_token,
            max_upload_bytes,
            cleanup_max_elapsed: Duration::from_secs(cleanup_secs),
        })
    }
}

// Written out so the admin token never reaches the logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("backend", &self.backend)
            .field("meme_bucket_name", &self.meme_bucket_name)
            .field("memes_table_name", &self.memes_table_name)
            .field("aws_region", &self.aws_region)
            .field("localstack_endpoint", &self.localstack_endpoint)
            .field("public_base_url", &self.public_base_url)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("cleanup_max_elapsed", &self.cleanup_max_elapsed)
            .finish()
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidVar(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
