use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} missing from environment")]
    MissingVar(&'static str),
}

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub goal_token: String,
    pub account_token: String,
    /// Directory group whose members are in scope for the report.
    pub member_group: String,
    /// Cycle to analyze; defaults to the newest quarterly cycle.
    pub cycle_path: Option<String>,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let goal_token = std::env::var("GOAL_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingVar("GOAL_ACCESS_TOKEN"))?;
        let account_token = std::env::var("ACCOUNT_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingVar("ACCOUNT_ACCESS_TOKEN"))?;
        let member_group =
            std::env::var("MEMBER_GROUP").unwrap_or_else(|_| "aplus".to_string());
        let cycle_path = std::env::var("CYCLE_PATH").ok().filter(|p| !p.is_empty());
        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports"));

        Ok(Self {
            goal_token,
            account_token,
            member_group,
            cycle_path,
            output_dir,
        })
    }
}
