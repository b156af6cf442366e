use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use log::{debug, info};

use crate::{
    error::{FabricNetError, FabricNetResult},
    fabric::Fabric,
    ipam::{
        types::{
            AddressSpacesResponse, IpamCapabilitiesResponse, ReleaseAddressRequest,
            ReleasePoolRequest, RequestAddressRequest, RequestAddressResponse, RequestPoolRequest,
            RequestPoolResponse,
        },
        util::host_net,
        IpamSentinels, GATEWAY_DATA_KEY, GLOBAL_ADDRESS_SPACE, LOCAL_ADDRESS_SPACE,
    },
    network::{core_utils::parse_cidr, types::IpFamily},
};

#[derive(Clone, Debug)]
pub struct IpamConfig {
    /// host affinity of every assignment made by this driver
    pub hostname: String,
    pub sentinels: IpamSentinels,
}

impl IpamConfig {
    pub fn new(hostname: &str) -> Self {
        IpamConfig {
            hostname: hostname.to_string(),
            sentinels: IpamSentinels::default(),
        }
    }
}

/// IPAM driver handing out addresses from the fabric pools.
pub struct IpamDriver {
    config: IpamConfig,
    fabric: Arc<dyn Fabric>,
}

impl IpamDriver {
    pub fn new(config: IpamConfig, fabric: Arc<dyn Fabric>) -> Self {
        IpamDriver { config, fabric }
    }

    pub fn get_capabilities(&self) -> IpamCapabilitiesResponse {
        IpamCapabilitiesResponse {
            requires_mac_address: false,
        }
    }

    pub fn get_default_address_spaces(&self) -> AddressSpacesResponse {
        AddressSpacesResponse {
            local_default_address_space: LOCAL_ADDRESS_SPACE.to_string(),
            global_default_address_space: GLOBAL_ADDRESS_SPACE.to_string(),
        }
    }

    pub fn request_pool(&self, req: &RequestPoolRequest) -> FabricNetResult<RequestPoolResponse> {
        if !req.sub_pool.is_empty() {
            return Err(FabricNetError::SubPoolUnsupported);
        }

        let sentinels = &self.config.sentinels;
        let family = if req.v6 { IpFamily::V6 } else { IpFamily::V4 };

        let (pool_id, pool, family) = if req.pool.is_empty() {
            // assign from across all fabric pools of the family
            (
                sentinels.pool_id(family).to_string(),
                sentinels.pool_cidr(family).to_string(),
                family,
            )
        } else {
            // a requested subnet must be one of the configured pools
            let cidr = parse_cidr(&req.pool)
                .map_err(|_| FabricNetError::UnknownPool(req.pool.clone()))?
                .trunc();
            match self.fabric.get_pool(&cidr) {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    return Err(FabricNetError::UnknownPool(req.pool.clone()))
                }
                Err(err) => return Err(err),
            }
            (cidr.to_string(), cidr.to_string(), IpFamily::of_net(&cidr))
        };

        // The gateway hint stops the orchestrator from reserving a gateway
        // address in the pool, the real gateway is handed out on join.
        let mut data = HashMap::new();
        data.insert(
            GATEWAY_DATA_KEY.to_string(),
            sentinels.gateway(family).to_string(),
        );

        debug!("request pool {:?} -> {}", req.pool, pool_id);
        Ok(RequestPoolResponse {
            pool_id,
            pool,
            data,
        })
    }

    pub fn release_pool(&self, req: &ReleasePoolRequest) -> FabricNetResult<()> {
        debug!("release pool {}", req.pool_id);
        Ok(())
    }

    /// Family to auto assign from, a concrete pool ID must still exist.
    fn pool_family(&self, pool_id: &str) -> FabricNetResult<IpFamily> {
        if let Some(family) = self.config.sentinels.sentinel_family(pool_id) {
            return Ok(family);
        }
        let cidr = parse_cidr(pool_id)
            .map_err(|e| FabricNetError::wrap(format!("invalid pool ID {}", pool_id), e))?
            .trunc();
        match self.fabric.get_pool(&cidr) {
            Ok(pool) => Ok(IpFamily::of_net(&pool.cidr)),
            Err(err) if err.is_not_found() => Err(FabricNetError::PoolDeleted(pool_id.to_string())),
            Err(err) => Err(err),
        }
    }

    pub fn request_address(
        &self,
        req: &RequestAddressRequest,
    ) -> FabricNetResult<RequestAddressResponse> {
        let hostname = &self.config.hostname;

        let ips: Vec<IpAddr> = if req.address.is_empty() {
            let family = self.pool_family(&req.pool_id)?;
            debug!("auto assigning {} address for host {}", family, hostname);
            let ips = self.fabric.auto_assign(family, 1, hostname)?;
            if ips.is_empty() {
                return Err(FabricNetError::PoolExhausted(family));
            }
            ips
        } else {
            let ip = parse_cidr(&req.address)?.addr();
            debug!("reserving {} for host {}", ip, hostname);
            self.fabric.assign_ip(ip, hostname)?;
            vec![ip]
        };

        if ips.len() != 1 {
            return Err(FabricNetError::UnexpectedAllocationCount(ips.len()));
        }

        let address = host_net(ips[0]).to_string();
        info!("assigned {} to host {}", address, hostname);
        Ok(RequestAddressResponse {
            address,
            data: HashMap::new(),
        })
    }

    pub fn release_address(&self, req: &ReleaseAddressRequest) -> FabricNetResult<()> {
        let ip = parse_cidr(&req.address)?.addr();
        let unallocated = self.fabric.release_ips(&[ip])?;
        if unallocated.is_empty() {
            info!("released {}", ip);
        } else {
            debug!("{} was not assigned", ip);
        }
        Ok(())
    }
}
