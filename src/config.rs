use crate::Args;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
    pub conversion_timeout: Duration,
}

impl Config {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin.trim() == "*")
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_body_size: args.max_body_size,
            cors_origins: args.cors_origins,
            conversion_timeout: Duration::from_secs(args.conversion_timeout_secs),
        }
    }
}
