use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use ipnet::IpNet;
use log::{debug, info};
use macaddr::MacAddr6;

use crate::{
    error::{FabricNetError, FabricNetErrorList, FabricNetResult},
    fabric::{Fabric, PoolRecord, ProfileRecord},
    ipam::IpamSentinels,
    network::{
        constants,
        core_utils::{classify_ipam_mode, get_gateway_and_pool, parse_option_flag},
        link::LinkOps,
        metadata::NetworkMetadataStore,
        resolver::NameResolver,
        types::{
            CapabilitiesResponse, CreateNetworkRequest, DeleteNetworkRequest, FamilyRecord,
            GatewayPool, IpFamily, IpamMode, NetworkRecord,
        },
    },
};

/// Static configuration of the network driver.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// name of this host, part of every workload endpoint identity
    pub hostname: String,
    /// prefix of the host side veth name, at most 4 characters
    pub interface_prefix: String,
    pub fixed_mac: String,
    pub orchestrator_id: String,
    pub workload_id: String,
    /// gateway handed to containers of fabric managed IPv4 networks
    pub ipv4_nexthop: Ipv4Addr,
    pub sentinels: IpamSentinels,
}

impl DriverConfig {
    pub fn new(hostname: &str) -> Self {
        DriverConfig {
            hostname: hostname.to_string(),
            interface_prefix: constants::DEFAULT_INTERFACE_PREFIX.to_string(),
            fixed_mac: constants::DEFAULT_FIXED_MAC.to_string(),
            orchestrator_id: constants::DEFAULT_ORCHESTRATOR_ID.to_string(),
            workload_id: constants::DEFAULT_WORKLOAD_ID.to_string(),
            ipv4_nexthop: Ipv4Addr::new(169, 254, 1, 1),
            sentinels: IpamSentinels::default(),
        }
    }

    /// validate the driver options
    pub fn validate(&self) -> FabricNetResult<()> {
        if self.interface_prefix.chars().count() > constants::MAX_INTERFACE_PREFIX_LEN {
            return Err(FabricNetError::InvalidPrefix(self.interface_prefix.clone()));
        }
        if self.hostname.is_empty() {
            return Err(FabricNetError::msg("hostname must not be empty"));
        }
        MacAddr6::from_str(&self.fixed_mac).map_err(|e| {
            FabricNetError::msg(format!("invalid fixed mac {:?}: {}", self.fixed_mac, e))
        })?;
        Ok(())
    }
}

/// Network driver, handles the network and endpoint lifecycle.
pub struct NetworkDriver {
    pub(crate) config: DriverConfig,
    pub(crate) fabric: Arc<dyn Fabric>,
    pub(crate) metadata: NetworkMetadataStore,
    pub(crate) links: Box<dyn LinkOps>,
    pub(crate) resolver: Box<dyn NameResolver>,
}

impl NetworkDriver {
    pub fn new(
        config: DriverConfig,
        fabric: Arc<dyn Fabric>,
        metadata: NetworkMetadataStore,
        links: Box<dyn LinkOps>,
        resolver: Box<dyn NameResolver>,
    ) -> FabricNetResult<Self> {
        config.validate()?;
        Ok(NetworkDriver {
            config,
            fabric,
            metadata,
            links,
            resolver,
        })
    }

    pub fn get_capabilities(&self) -> CapabilitiesResponse {
        CapabilitiesResponse {
            scope: constants::SCOPE_GLOBAL.to_string(),
            connectivity_scope: constants::SCOPE_GLOBAL.to_string(),
        }
    }

    /// Make sure the profile of the network exists. Several endpoints of a
    /// new network may race here, losing the create race is fine.
    pub(crate) fn ensure_profile(&self, name: &str) -> FabricNetResult<()> {
        match self.fabric.get_profile(name) {
            Ok(_) => return Ok(()),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(FabricNetError::wrap(format!("get profile {}", name), err)),
        }

        match self.fabric.create_profile(&ProfileRecord::for_network(name)) {
            Ok(()) => {
                info!("created profile {}", name);
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                debug!("profile {} already exists", name);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn family_record(&self, family: IpFamily, gateway_pool: GatewayPool) -> FamilyRecord {
        let mode = classify_ipam_mode(&gateway_pool.gateway, family, &self.config.sentinels);
        FamilyRecord {
            gateway_pool,
            mode,
            pool_created: false,
        }
    }

    /// Fails when a fabric pool with this CIDR exists and is open to auto
    /// assignment.
    fn check_external_pool(&self, cidr: &IpNet) -> FabricNetResult<()> {
        match self.fabric.get_pool(cidr) {
            Ok(pool) if !pool.disabled => Err(FabricNetError::PoolConflict(cidr.to_string())),
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn create_network(&self, req: &CreateNetworkRequest) -> FabricNetResult<()> {
        // validate everything first, nothing may be created for a bad request
        let mut ipv4 = get_gateway_and_pool(&req.ipv4_data, IpFamily::V4)?
            .map(|gp| self.family_record(IpFamily::V4, gp));
        let mut ipv6 = get_gateway_and_pool(&req.ipv6_data, IpFamily::V6)?
            .map(|gp| self.family_record(IpFamily::V6, gp));
        let ipip = parse_option_flag(&req.options, constants::OPTION_IPIP)?;
        let nat_outgoing = parse_option_flag(&req.options, constants::OPTION_NAT_OUTGOING)?;
        for record in [&ipv4, &ipv6].into_iter().flatten() {
            if record.mode == IpamMode::ExternallyManaged {
                self.check_external_pool(&record.gateway_pool.pool.trunc())?;
            }
        }

        // a retried create keeps the ownership of the pools it made before
        let previous = match self.metadata.get(&req.network_id) {
            Ok(record) => Some(record),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let profile_name = self.resolver.network_name(&req.network_id)?;
        self.ensure_profile(&profile_name)?;

        for (family, record) in [(IpFamily::V4, &mut ipv4), (IpFamily::V6, &mut ipv6)] {
            let record = match record {
                Some(record) if record.mode == IpamMode::ExternallyManaged => record,
                _ => continue,
            };
            let pool = PoolRecord {
                cidr: record.gateway_pool.pool.trunc(),
                // another IPAM driver owns this pool
                disabled: true,
                ipip_enabled: ipip && family == IpFamily::V4,
                nat_outgoing,
            };
            record.pool_created = match self.fabric.create_pool(&pool) {
                Ok(()) => {
                    info!("created {} pool {} for {}", family, pool.cidr, req.network_id);
                    true
                }
                Err(err) if err.is_already_exists() => {
                    // created since the check above
                    self.check_external_pool(&pool.cidr)?;
                    debug!("pool {} already exists", pool.cidr);
                    match previous.as_ref().and_then(|prev| prev.family(family)) {
                        Some(prev) => {
                            prev.pool_created && prev.gateway_pool.pool.trunc() == pool.cidr
                        }
                        None => false,
                    }
                }
                Err(err) => return Err(err),
            };
        }

        self.metadata.put(&NetworkRecord {
            network_id: req.network_id.clone(),
            profile_name,
            ipv4,
            ipv6,
            options: req.options.clone(),
        })?;
        info!("created network {}", req.network_id);
        Ok(())
    }

    pub fn delete_network(&self, req: &DeleteNetworkRequest) -> FabricNetResult<()> {
        let record = match self.metadata.get(&req.network_id) {
            Ok(record) => record,
            Err(err) if err.is_not_found() => {
                return Err(FabricNetError::NetworkNotFound(req.network_id.clone()))
            }
            Err(err) => return Err(err),
        };

        // remove as much as possible, report all failures at the end
        let mut errors = FabricNetErrorList::new();
        match self.fabric.delete_profile(&record.profile_name) {
            Ok(()) => info!("removed profile {}", record.profile_name),
            Err(err) if err.is_not_found() => {
                debug!("profile {} already removed", record.profile_name)
            }
            Err(err) => errors.push(FabricNetError::wrap(
                format!("delete profile {}", record.profile_name),
                err,
            )),
        }

        for family in [IpFamily::V4, IpFamily::V6] {
            // pools of other owners stay
            let pool = match record.family(family) {
                Some(f) if f.mode == IpamMode::ExternallyManaged && f.pool_created => {
                    f.gateway_pool.pool.trunc()
                }
                _ => continue,
            };
            match self.fabric.delete_pool(&pool) {
                Ok(()) => info!("removed pool {}", pool),
                Err(err) if err.is_not_found() => debug!("pool {} already removed", pool),
                Err(err) => errors.push(FabricNetError::wrap(format!("delete pool {}", pool), err)),
            }
        }

        if errors.is_empty() {
            self.metadata.delete(&req.network_id)?;
            info!("removed network {}", req.network_id);
        }
        errors.into_result()
    }
}
