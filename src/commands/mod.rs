use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use log::debug;

use crate::error::FabricNetResult;
use crate::fabric::DatastoreFabric;
use crate::ipam::{IpamConfig, IpamDriver};
use crate::network::core_utils::get_hostname;
use crate::network::link::IpCommand;
use crate::network::metadata::NetworkMetadataStore;
use crate::network::resolver::DockerResolver;
use crate::network::{constants, DriverConfig, NetworkDriver};
use crate::plugin::Plugin;
use crate::store::{FileStore, KeyValueStore};

pub mod call;
pub mod version;

pub const DEFAULT_CONFIG_DIR: &str = "/var/lib/fabricnet";

/// Global options shared by the subcommands.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory of the keyed store shared by all fabricnet invocations.
    #[clap(short, long, env = "FABRICNET_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config: String,
    /// Host name used for workload identity and address affinity, defaults to the system host name.
    #[clap(long, env = "FABRICNET_HOSTNAME")]
    pub hostname: Option<String>,
    /// Prefix of the host side interface names, at most 4 characters.
    #[clap(
        long,
        env = "FABRICNET_INTERFACE_PREFIX",
        default_value = constants::DEFAULT_INTERFACE_PREFIX
    )]
    pub interface_prefix: String,
    /// Seconds an interface or engine command may run before it is killed.
    #[clap(long, env = "FABRICNET_COMMAND_TIMEOUT", default_value_t = 5)]
    pub command_timeout: u64,
    /// Path to the ip binary.
    #[clap(long, default_value = "ip")]
    pub ip_binary: String,
    /// Path to the container engine binary used to resolve network names.
    #[clap(long, default_value = "docker")]
    pub docker_binary: String,
}

impl Config {
    /// Wire the drivers to the file store, the ip binary and the engine.
    pub fn build_plugin(&self) -> FabricNetResult<Plugin> {
        let hostname = match &self.hostname {
            Some(name) => name.clone(),
            None => get_hostname()?,
        };
        let timeout = Duration::from_secs(self.command_timeout);
        debug!(
            "using store {} on host {} with interface prefix {}",
            self.config, hostname, self.interface_prefix
        );

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&self.config)?);
        let fabric = Arc::new(DatastoreFabric::new(store.clone()));

        let mut driver_config = DriverConfig::new(&hostname);
        driver_config.interface_prefix = self.interface_prefix.clone();

        let network = NetworkDriver::new(
            driver_config,
            fabric.clone(),
            NetworkMetadataStore::new(store),
            Box::new(IpCommand::new(&self.ip_binary, timeout)),
            Box::new(DockerResolver::new(&self.docker_binary, timeout)),
        )?;
        let ipam = IpamDriver::new(IpamConfig::new(&hostname), fabric);

        Ok(Plugin::new(network, ipam))
    }
}
