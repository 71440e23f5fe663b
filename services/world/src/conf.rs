use std::{net::Ipv4Addr, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorldServerConfig {
    pub bind_address: Ipv4Addr,
    pub port: u16,

    /// target number of milliseconds between world updates
    pub update_interval: u64,
    /// slot count for newly created character inventories
    pub inventory_slots: u32,

    pub character_database: String,
}

impl WorldServerConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        serde_yaml::from_reader(file).context("could not read yaml file")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(file, self).context("could not write yaml file")
    }
}
