use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Credentials and session parameters for the auth command.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub username: Option<String>,
    pub secret: Option<String>,
    pub authzid: Option<String>,
    pub anonymous_token: Option<String>,
    pub service: Option<String>,
    pub hostname: Option<String>,
    pub realm: Option<String>,
    #[serde(default)]
    pub allowed_realms: Vec<String>,
    pub qop: Option<String>,
    pub scram_salted_password: Option<String>,
}

pub fn read_config(config_file: PathBuf) -> Result<Config> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_file.as_path())?;

    let mut config = String::new();
    file.read_to_string(&mut config)?;

    Ok(toml::from_str(&config)?)
}
