use crate::drivers::transport::{BusTiming, TransportConfig};
use crate::error::DynError;
use crate::utils::commission::Commissioner;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a bus master, normally read from a JSON file. Missing
/// fields get their default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub transport: TransportConfig,
    pub timing: BusTiming,
    pub verify_short_address: bool,
}

impl MasterConfig {
    pub fn load(path: &Path) -> Result<MasterConfig, DynError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }

    pub fn commissioner(&self) -> Commissioner {
        Commissioner::new(self.timing).verify_short_address(self.verify_short_address)
    }
}
