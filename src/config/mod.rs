pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "reptile-global")]
#[command(about = "Shipment tracking, KYC and label service for Reptile Global")]
pub struct CliConfig {
    #[arg(long, env = "REPTILE_CONFIG", default_value = "reptile.toml")]
    pub config: PathBuf,

    #[arg(long, env = "REPTILE_BIND", help = "Override server.bind")]
    pub bind: Option<String>,

    #[arg(long, env = "REPTILE_DATA_DIR", help = "Override storage.data_dir")]
    pub data_dir: Option<String>,

    #[arg(long, help = "Keep all data in memory; nothing is written to disk")]
    pub ephemeral: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Read the config file (defaults when it is absent) and apply the
    /// command-line overrides on top.
    pub fn load(&self) -> crate::utils::error::Result<AppConfig> {
        let mut config = AppConfig::from_file_or_default(&self.config)?;
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}
