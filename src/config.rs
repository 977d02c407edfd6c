//! Environment-driven configuration, loaded once at start-up and passed by
//! reference to everything that needs it.

use crate::domains::export::types::{ExportFlag, PartitionPolicy};
use crate::errors::ConfigError;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA: &str = "dbo";
pub const DEFAULT_SQL_PORT: u16 = 1433;

/// SQL Server connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub trust_cert: bool,
}

/// Where to reach SQL Server, parsed from `SQL_SERVER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    /// Explicit TCP port. When absent, a named instance is resolved through
    /// SQL Browser and a default instance uses [`DEFAULT_SQL_PORT`].
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerAddress {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SQL_PORT)
    }
}

impl DatabaseConfig {
    /// Parses `server`. Accepts `host`, `host\instance`, `host,port` (the ODBC
    /// form), `host:port` and bracketed IPv6 such as `[::1]:1433`. A bare IPv6
    /// address is rejected since its port cannot be told apart.
    pub fn address(&self) -> Result<ServerAddress, ConfigError> {
        let server = self.server.trim();
        let invalid = |reason: &str| ConfigError::invalid("SQL_SERVER", reason);

        let (host, port) = if let Some((host, port)) = server.rsplit_once(',') {
            (host.trim(), Some(port))
        } else if let Some(rest) = server.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in IPv6 address"))?;
            match tail {
                "" => (host, None),
                _ => {
                    let port = tail
                        .strip_prefix(':')
                        .ok_or_else(|| invalid("expected ':port' after IPv6 address"))?;
                    (host, Some(port))
                }
            }
        } else {
            match server.matches(':').count() {
                0 => (server, None),
                1 => server
                    .split_once(':')
                    .map(|(host, port)| (host, Some(port)))
                    .unwrap_or((server, None)),
                _ => return Err(invalid("IPv6 addresses must be written as [address] or [address]:port")),
            }
        };

        let port = port
            .map(|port| {
                port.trim()
                    .parse::<u16>()
                    .map_err(|_| invalid("port must be a number between 0 and 65535"))
            })
            .transpose()?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        let (host, instance) = match host.split_once('\\') {
            Some((host, instance)) => {
                if instance.trim().is_empty() {
                    return Err(invalid("instance name after '\\' is empty"));
                }
                (host, Some(instance.trim().to_string()))
            }
            None => (host, None),
        };
        if host.trim().is_empty() {
            return Err(invalid("host is empty"));
        }

        Ok(ServerAddress {
            host: host.trim().to_string(),
            port,
            instance,
        })
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.server, self.username, self.database)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub csv_folder_path: PathBuf,
    pub schema_name: String,
    pub procedure_name: String,
    pub partitions: PartitionPolicy,
}

impl Config {
    /// Reads the process environment. The binary loads `.env` into it first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::missing(key));

        let database = DatabaseConfig {
            server: require("SQL_SERVER")?,
            username: require("SQL_USERNAME")?,
            password: require("SQL_PASSWORD")?,
            database: require("SQL_DATABASE")?,
            trust_cert: parse_bool("SQL_TRUST_CERT", get("SQL_TRUST_CERT"), true)?,
        };

        let csv_folder_path = get("csv_folder_path")
            .or_else(|| get("CSV_FOLDER_PATH"))
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::missing("csv_folder_path"))?;

        let partitions = PartitionPolicy {
            flag_partitions: match lookup("EXPORT_FLAG_PARTITIONS") {
                Some(list) => parse_flags(&list)?,
                None => PartitionPolicy::default().flag_partitions,
            },
            exclude_closed_period: parse_bool("EXCLUDE_CLOSED_PERIOD", get("EXCLUDE_CLOSED_PERIOD"), false)?,
        };

        Ok(Self {
            database,
            csv_folder_path,
            schema_name: get("schema_name").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            procedure_name: require("procedure_name")?,
            partitions,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, "expected true or false")),
    }
}

fn parse_flags(list: &str) -> Result<Vec<ExportFlag>, ConfigError> {
    let mut flags = Vec::new();
    for name in list.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let flag = name
            .parse::<ExportFlag>()
            .map_err(|reason| ConfigError::invalid("EXPORT_FLAG_PARTITIONS", &reason))?;
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }
    Ok(flags)
}
