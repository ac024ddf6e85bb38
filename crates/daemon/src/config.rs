//! Daemon configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `UPKEEP_*`
//! environment variables.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use upkeep_core::application::constants::{
    DEFAULT_SWEEP_INTERVAL, DEFAULT_UPCOMING_HORIZON_DAYS, MAX_UPCOMING_HORIZON_DAYS,
};

const ENV_PREFIX: &str = "UPKEEP";
const CONFIG_PATH_ENV: &str = "UPKEEP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.upkeep/upkeep.toml";
const DEFAULT_DB_PATH: &str = "~/.upkeep/upkeep.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: i64 = 9627;

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// "pretty" or "json"
    pub log_format: String,
    /// Daily-rotated JSON log files go here when set
    pub log_dir: Option<String>,
    /// 0 disables the sweeper
    pub overdue_sweep_minutes: u64,
    pub upcoming_horizon_days: u32,
}

impl DaemonConfig {
    /// Load using `UPKEEP_CONFIG` (or the default path) as the file layer
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&expand(&path))
    }

    /// Load with `file` as the file layer. A missing file is not an error.
    pub fn load_from(file: &Path) -> Result<Self> {
        let default_sweep_minutes = (DEFAULT_SWEEP_INTERVAL.as_secs() / 60) as i64;

        let settings = ::config::Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("rpc_host", DEFAULT_RPC_HOST)?
            .set_default("rpc_port", DEFAULT_RPC_PORT)?
            .set_default("log_format", "pretty")?
            .set_default("overdue_sweep_minutes", default_sweep_minutes)?
            .set_default(
                "upcoming_horizon_days",
                i64::from(DEFAULT_UPCOMING_HORIZON_DAYS),
            )?
            .add_source(::config::File::from(file).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?;

        let mut cfg: DaemonConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.db_path = expand(&cfg.db_path).to_string_lossy().into_owned();
        cfg.log_dir = cfg
            .log_dir
            .map(|dir| expand(&dir).to_string_lossy().into_owned());
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.upcoming_horizon_days > MAX_UPCOMING_HORIZON_DAYS {
            bail!(
                "upcoming_horizon_days must be at most {}, got {}",
                MAX_UPCOMING_HORIZON_DAYS,
                self.upcoming_horizon_days
            );
        }
        if self.overdue_sweep_minutes.checked_mul(60).is_none() {
            bail!(
                "overdue_sweep_minutes is too large: {}",
                self.overdue_sweep_minutes
            );
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.overdue_sweep_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
