use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Profile-aware variable lookup. `{PROFILE}_{KEY}` wins over `{KEY}`;
/// empty values count as unset.
#[derive(Debug, Clone, Copy)]
struct ProfiledEnv<'a>(&'a str);

impl ProfiledEnv<'_> {
    fn get(self, key: &str) -> Option<String> {
        let read = |k: &str| env::var(k).ok().filter(|v| !v.is_empty());
        let prefixed = if self.0.is_empty() { None } else { read(&format!("{}_{key}", self.0)) };
        prefixed.or_else(|| read(key))
    }

    fn string(self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Unparseable values fall back to `default`.
    fn parsed<T: std::str::FromStr>(self, key: &str, default: T) -> T {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub worker: WorkerEndpointConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GRAPHSPLIT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env::var("GRAPHSPLIT_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let profile = profile.to_uppercase();
        let env = ProfiledEnv(&profile);
        Self {
            server: ServerConfig::from_env(env),
            postgres: PostgresConfig::from_env(env),
            worker: WorkerEndpointConfig::from_env(env),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{} (upload limit {} bytes)", self.server.host, self.server.port, self.server.max_upload_bytes);
        tracing::info!("  postgres:  host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!("  worker:    url={}, timeout={}ms", self.worker.url, self.worker.timeout_ms);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Upper bound for uploaded job files.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    fn from_env(env: ProfiledEnv<'_>) -> Self {
        Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parsed("PORT", 8080),
            cors_origin: env.string("CORS_ORIGIN", "*"),
            max_upload_bytes: env.parsed("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
}

impl PostgresConfig {
    fn from_env(env: ProfiledEnv<'_>) -> Self {
        Self {
            host: env.string("PG_HOST", "localhost"),
            port: env.parsed("PG_PORT", 5432),
            database: env.string("PG_DATABASE", "graphsplit"),
            username: env.get("PG_USERNAME"),
            password: env.get("PG_PASSWORD"),
            ssl_mode: env.string("PG_SSL_MODE", "prefer"),
            max_connections: env.parsed("PG_MAX_CONNECTIONS", 10),
            url: env.get("DATABASE_URL"),
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

// ── Worker endpoint ───────────────────────────────────────────

/// Where the scheduler reaches the compute pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEndpointConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl WorkerEndpointConfig {
    fn from_env(env: ProfiledEnv<'_>) -> Self {
        Self {
            url: env.string("WORKER_URL", "http://localhost:8000/"),
            timeout_ms: env.parsed("WORKER_TIMEOUT_MS", 3000),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}
