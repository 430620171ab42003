//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the relay can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chatflow_shared::constants::{DEFAULT_ALLOWED_ORIGIN, DEFAULT_PORT};

/// Development-only signing secret used when `JWT_SECRET` is unset.
/// Startup logs a warning whenever this fallback is active.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the relay listens on.
    /// Env: `PORT` (port only, bound on all interfaces)
    /// Default: `0.0.0.0:3001`
    pub http_addr: SocketAddr,

    /// Shared secret used to sign and verify credential tokens.
    /// Env: `JWT_SECRET`
    /// Default: an insecure development value.
    pub jwt_secret: String,

    /// Browser origin allowed by CORS.
    /// Env: `ALLOWED_ORIGIN`
    /// Default: `http://localhost:3000`
    pub allowed_origin: String,

    /// Explicit database file path. When unset the store picks the
    /// platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_PORT).into(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            database_path: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.http_addr = ([0, 0, 0, 0], parsed).into();
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }

        if let Ok(origin) = std::env::var("ALLOWED_ORIGIN") {
            if !origin.is_empty() {
                config.allowed_origin = origin;
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Whether the insecure development signing secret is in use.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
