use chrono_tz::Tz;
use clap::Parser;
use serde::Deserialize;
use uuid::Uuid;

use api_types::OwnerId;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Bearer token of the signed-in account.
    pub token: String,
    /// Account the token belongs to.
    pub owner_id: String,
    pub timezone: String,
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            token: String::new(),
            owner_id: String::new(),
            timezone: "Europe/Rome".to_string(),
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn owner(&self) -> Result<OwnerId> {
        Uuid::parse_str(self.owner_id.trim())
            .map(OwnerId::new)
            .map_err(|err| AppError::Setting(format!("owner_id: {err}")))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| AppError::Setting(format!("timezone: {err}")))
    }
}

#[derive(Debug, Parser)]
#[command(name = "dashboard", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Override the bearer token.
    #[arg(long)]
    token: Option<String>,
    /// Override the owner id (UUID).
    #[arg(long)]
    owner_id: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override log level.
    #[arg(long)]
    level: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    resolve(Args::parse())
}

/// Layers the optional file, then `DASHBOARD_*` variables, then CLI flags.
fn resolve(args: Args) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let settings = config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD"))
        .set_override_option("base_url", args.base_url)?
        .set_override_option("token", args.token)?
        .set_override_option("owner_id", args.owner_id)?
        .set_override_option("timezone", args.timezone)?
        .set_override_option("level", args.level)?
        .build()?;
    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_timezone_but_need_owner() {
        let config = AppConfig::default();
        assert!(config.tz().is_ok());
        assert!(matches!(config.owner(), Err(AppError::Setting(_))));
    }

    #[test]
    fn owner_id_is_trimmed() {
        let config = AppConfig {
            owner_id: " 67e55044-10b1-426f-9247-bb680e5fe0c8 ".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.owner().unwrap().to_string(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args::try_parse_from([
            "dashboard",
            "--config",
            "does/not/exist",
            "--owner-id",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "--timezone",
            "UTC",
        ])
        .unwrap();

        let config = resolve(args).unwrap();

        assert_eq!(config.owner_id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.base_url, AppConfig::default().base_url);
        assert!(config.owner().is_ok());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(config.tz().is_err());
    }
}
