use crate::error::Result;
use shellexpand::tilde;
use std::{
    env,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_path: PathBuf,
    pub database_reset_on_start: bool,
    pub database_max_connections: u32,
    pub listen_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let raw_database_path = env::var("DATABASE_PATH").unwrap_or("a.db".to_string());
        let database_path = Path::new(&tilde(&raw_database_path).to_string()).to_path_buf();

        // the users table is recreated on every start unless told otherwise
        let database_reset_on_start =
            env::var("DATABASE_RESET_ON_START").unwrap_or("true".to_string());
        let database_reset_on_start = database_reset_on_start.parse::<bool>()?;

        let database_max_connections =
            env::var("DATABASE_MAX_CONNECTIONS").unwrap_or("5".to_string());
        let database_max_connections = database_max_connections.parse::<u32>()?;

        let listen_address = env::var("LISTEN_ADDRESS").unwrap_or("0.0.0.0:5000".to_string());

        let config = Self {
            database_path,
            database_reset_on_start,
            database_max_connections,
            listen_address,
        };

        tracing::debug!("Configuration extraction successful: {:?}", config);

        Ok(config)
    }
}
