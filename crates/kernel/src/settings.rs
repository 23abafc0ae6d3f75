use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSTORE_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSTORE_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSTORE";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// prefixed environment variables and the legacy `PORT`/`DATABASE_URL`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit config directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())
            .with_context(|| "invalid PORT override")?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())
            .with_context(|| "invalid DATABASE_URL override")?;

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    /// Directory served for any path not claimed by an API route.
    #[serde(default = "ServerSettings::default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_static_dir() -> PathBuf {
        PathBuf::from("public")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: Self::default_static_dir(),
        }
    }
}

/// PostgreSQL connection settings. `url`, when present, wins over the
/// discrete fields.
#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "DatabaseSettings::default_host")]
    pub host: String,
    #[serde(default = "DatabaseSettings::default_port")]
    pub port: u16,
    #[serde(default = "DatabaseSettings::default_user")]
    pub user: String,
    #[serde(default = "DatabaseSettings::default_password")]
    pub password: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_host() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        5432
    }

    fn default_user() -> String {
        "postgres".to_string()
    }

    fn default_password() -> String {
        "postgres".to_string()
    }

    fn default_name() -> String {
        "bookstore_db".to_string()
    }

    fn default_max_connections() -> u32 {
        10
    }

    fn default_acquire_timeout_ms() -> u64 {
        5000
    }

    /// Human-readable target for logs; never includes the password.
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(_) => "<database url>".to_string(),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.name),
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: Self::default_host(),
            port: Self::default_port(),
            user: Self::default_user(),
            password: Self::default_password(),
            name: Self::default_name(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bookstore-settings-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_points_at_local_postgres() {
        let settings = Settings::default();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.name, "bookstore_db");
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn default_server_listens_on_8080() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(settings.server.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let settings = DatabaseSettings {
            password: "hunter2".to_string(),
            ..DatabaseSettings::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(!settings.display_target().contains("hunter2"));
    }

    #[test]
    fn environment_overlay_wins_over_base() {
        let dir = scratch_dir("overlay");
        std::fs::write(
            dir.join("base.toml"),
            "[server]\nhost = \"127.0.0.1\"\n[database]\nname = \"base_db\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("staging.toml"), "[database]\nname = \"staging_db\"\n").unwrap();

        let settings = Settings::load_from(&dir, "staging").unwrap();

        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.database.name, "staging_db");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = scratch_dir("empty");
        let settings = Settings::load_from(&dir, "local").unwrap();
        assert_eq!(settings.telemetry.log_format, LogFormat::Pretty);
        assert_eq!(settings.database.max_connections, 10);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let dir = scratch_dir("unknown");
        let err = Settings::load_from(&dir, "qa").unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }
}
