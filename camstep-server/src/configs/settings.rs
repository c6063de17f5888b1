use std::env;

use camstep_embedded::DeviceConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Value expected in `X-Update-Password`; empty accepts any upload.
    pub password: String,
    /// Directory the simulated flash images are written to.
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assets {
    pub index_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    #[serde(default)]
    pub motors: DeviceConfig,
    pub update: Update,
    pub assets: Assets,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("CAMSTEP").separator("__"))
            .build()?
            .try_deserialize()
    }
}
