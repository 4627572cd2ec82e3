use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Spots review REST API")]
pub struct Args {
    /// Host to bind to (overrides SPOTS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SPOTS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Public disk root where uploaded pictures are stored (overrides SPOTS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides SPOTS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Maximum accepted request body size in bytes (overrides SPOTS_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Apply the schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |key| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values produced by `lookup` (normally `std::env::var`).
    pub fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = lookup("SPOTS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env(&lookup, "SPOTS_PORT", 3000u16)?;
        let env_storage = lookup("SPOTS_STORAGE_DIR").unwrap_or_else(|_| "./data/public".into());
        let env_db =
            lookup("SPOTS_DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/spots.db".into());
        let env_max_upload =
            parse_env(&lookup, "SPOTS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Result<String, env::VarError> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = AppConfig::merge(Args::default(), lookup_from(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.storage_dir, "./data/public");
        assert_eq!(cfg.database_url, "sqlite://./data/spots.db");
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn cli_args_win_over_environment() {
        let args = Args {
            port: Some(8080),
            host: Some("127.0.0.1".into()),
            ..Args::default()
        };
        let cfg = AppConfig::merge(
            args,
            lookup_from(&[("SPOTS_PORT", "9000"), ("SPOTS_STORAGE_DIR", "/srv/pics")]),
        )
        .unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.storage_dir, "/srv/pics");
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = AppConfig::merge(Args::default(), lookup_from(&[("SPOTS_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("SPOTS_PORT"));
    }
}
