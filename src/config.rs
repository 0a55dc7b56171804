use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use tracing::{info, warn};

/// Which persistence backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Sqlite,
    Mock,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sql" => Ok(StorageKind::Sqlite),
            "mock" | "local" => Ok(StorageKind::Mock),
            other => Err(anyhow!("unknown storage backend '{}'", other)),
        }
    }
}

/// The single admin login accepted by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Credentials {
            email: try_load("BARBERIA_ADMIN_EMAIL", "admin@barberia.com")?,
            password: try_load("BARBERIA_ADMIN_PASSWORD", "admin123")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub storage: StorageKind,
    /// File backing the mock store. `None` keeps it in memory.
    pub mock_path: Option<PathBuf>,
    pub public_dir: PathBuf,
    /// Gap between appointments shown to staff. Never enforced.
    pub buffer_minutes: u32,
    pub audit_actor: String,
    pub admin: Credentials,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let storage: StorageKind = try_load("BARBERIA_STORAGE", "sqlite")?;
        let database_url = match storage {
            StorageKind::Sqlite => {
                env::var("DATABASE_URL").context("DATABASE_URL env var must be set!")?
            }
            StorageKind::Mock => env::var("DATABASE_URL").unwrap_or_default(),
        };

        Ok(Config {
            database_url,
            port: try_load("BARBERIA_PORT", "3000")?,
            storage,
            mock_path: env::var("BARBERIA_MOCK_PATH").ok().map(PathBuf::from),
            public_dir: try_load("BARBERIA_PUBLIC_DIR", "public")?,
            buffer_minutes: try_load("BARBERIA_BUFFER_MINUTES", "10")?,
            audit_actor: try_load("BARBERIA_AUDIT_ACTOR", "Admin Principal")?,
            admin: Credentials::from_env()?,
        })
    }
}

/// Base URL of a running server, for the CLI.
pub fn base_url() -> Result<String> {
    dotenv().ok();
    env::var("BASE_URL").context("BASE_URL env var must be set!")
}

fn try_load<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {} value: {}", key, e);
        anyhow!("invalid value for {}: {}", key, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_parses_aliases() {
        assert_eq!("SQLite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert_eq!(" local ".parse::<StorageKind>().unwrap(), StorageKind::Mock);
        assert!("postgres".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_try_load_falls_back_to_default() {
        let port: u16 = try_load("BARBERIA_TEST_UNSET_PORT", "3000").unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn test_try_load_rejects_garbage() {
        env::set_var("BARBERIA_TEST_BAD_MINUTES", "ten");
        let minutes: Result<u32> = try_load("BARBERIA_TEST_BAD_MINUTES", "10");
        assert!(minutes.is_err());
    }
}
