use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
    time::Duration,
};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database: DatabaseSettings,
    pub tls: TlsSettings,
    pub max_pool_size: u32,
    pub default_page_size: i64,
    pub request_timeout: Duration,
    pub run_migrations: bool,
}

/// Connection target. A full URL wins over the discrete `DB_*` parts.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn pg_config(&self) -> Result<PgConfig> {
        if let Some(url) = &self.url {
            return url.parse::<PgConfig>().context("invalid database URL");
        }

        let mut config = PgConfig::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.name);
        Ok(config)
    }
}

/// Optional rustls settings for the Postgres connection (libpq-style names).
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub root_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    songs_listen_addr: Option<String>,
    #[serde(default)]
    songs_listen_host: Option<String>,
    #[serde(default)]
    songs_listen_port: Option<u16>,
    #[serde(default)]
    songs_database_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    db_host: Option<String>,
    #[serde(default)]
    db_port: Option<String>,
    #[serde(default)]
    db_user: Option<String>,
    #[serde(default)]
    db_password: Option<String>,
    #[serde(default)]
    db_name: Option<String>,
    #[serde(default = "default_pool_size")]
    songs_max_pool_size: u32,
    #[serde(default = "default_page_size")]
    songs_default_page_size: i64,
    #[serde(default = "default_timeout_secs")]
    songs_request_timeout_secs: u64,
    #[serde(default = "default_run_migrations")]
    songs_run_migrations: bool,
    #[serde(default)]
    pgsslrootcert: Option<String>,
    #[serde(default)]
    pgsslcert: Option<String>,
    #[serde(default)]
    pgsslkey: Option<String>,
}

const DEFAULT_DB_PORT: u16 = 5432;
const DOTENV_FILE: &str = ".env";

const fn default_pool_size() -> u32 {
    10
}

const fn default_page_size() -> i64 {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_run_migrations() -> bool {
    true
}

impl AppConfig {
    /// Reads `.env` from the working directory (if present), then the process environment.
    pub fn from_env() -> Result<Self> {
        load_dotenv(Path::new(DOTENV_FILE));
        let raw: RawConfig =
            envy::from_env().context("failed to parse songs API environment variables")?;
        Self::from_raw(raw)
    }

    /// Same as [`AppConfig::from_env`] but reads from an explicit variable list.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawConfig =
            envy::from_iter(vars).context("failed to parse songs API environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.songs_listen_addr,
            raw.songs_listen_host,
            raw.songs_listen_port,
        )?;

        let database = DatabaseSettings {
            url: non_blank(raw.songs_database_url).or_else(|| non_blank(raw.database_url)),
            host: raw.db_host.unwrap_or_else(|| "localhost".to_string()),
            port: parse_port(raw.db_port),
            user: raw.db_user.unwrap_or_else(|| "postgres".to_string()),
            password: raw.db_password.unwrap_or_else(|| "123".to_string()),
            name: raw.db_name.unwrap_or_else(|| "songs_db".to_string()),
        };

        let tls = TlsSettings {
            root_cert: non_blank(raw.pgsslrootcert),
            client_cert: non_blank(raw.pgsslcert),
            client_key: non_blank(raw.pgsslkey),
        };

        Ok(Self {
            listen_addr,
            database,
            tls,
            max_pool_size: raw.songs_max_pool_size.max(1),
            default_page_size: raw.songs_default_page_size.max(1),
            request_timeout: Duration::from_secs(raw.songs_request_timeout_secs.max(1)),
            run_migrations: raw.songs_run_migrations,
        })
    }
}

/// Variables already present in the environment win over the file.
fn load_dotenv(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded environment file");
            true
        }
        Err(err) if err.not_found() => {
            warn!(path = %path.display(), "no environment file found, using process environment");
            false
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to load environment file");
            false
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// An unparsable DB_PORT falls back to the default instead of failing boot.
fn parse_port(raw: Option<String>) -> u16 {
    match raw {
        None => DEFAULT_DB_PORT,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(value = %value, "ignoring invalid DB_PORT, using {DEFAULT_DB_PORT}");
            DEFAULT_DB_PORT
        }),
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid SONGS_LISTEN_ADDR value")?
            .next()
            .context("SONGS_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(1323);
    let combined = format!("{}:{}", host, port);
    combined
        .to_socket_addrs()
        .context("invalid songs API listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
