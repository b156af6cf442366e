use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::network::types::IpFamily;

pub mod driver;
pub mod types;
pub mod util;

pub use driver::{IpamConfig, IpamDriver};

// Returned by the IPAM driver as address spaces, the fabric does not use
// address spaces when assigning addresses.
pub const LOCAL_ADDRESS_SPACE: &str = "FabricLocalAddressSpace";
pub const GLOBAL_ADDRESS_SPACE: &str = "FabricGlobalAddressSpace";

// key of the gateway hint in the pool data
pub const GATEWAY_DATA_KEY: &str = "com.docker.network.gateway";

/// Fixed pool IDs and CIDRs of the fabric IPAM.
///
/// The orchestrator requires a pool ID for every allocation, while the fabric
/// assigns from all of its configured pools. The sentinel pool IDs, one per
/// family, stand for "any fabric pool of this family". The sentinel gateway
/// returned with them is also how the network driver recognizes that the
/// fabric IPAM was used for a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IpamSentinels {
    pub pool_id_v4: String,
    pub pool_id_v6: String,
    pub pool_cidr_v4: IpNet,
    pub pool_cidr_v6: IpNet,
    pub gateway_v4: IpNet,
    pub gateway_v6: IpNet,
}

impl Default for IpamSentinels {
    fn default() -> Self {
        // 0.0.0.0/0 and ::/0
        let any_v4 = IpNet::V4(Ipv4Net::default());
        let any_v6 = IpNet::V6(Ipv6Net::default());
        IpamSentinels {
            pool_id_v4: "FabricPoolIPv4".to_string(),
            pool_id_v6: "FabricPoolIPv6".to_string(),
            pool_cidr_v4: any_v4,
            pool_cidr_v6: any_v6,
            gateway_v4: any_v4,
            gateway_v6: any_v6,
        }
    }
}

impl IpamSentinels {
    pub fn pool_id(&self, family: IpFamily) -> &str {
        match family {
            IpFamily::V4 => &self.pool_id_v4,
            IpFamily::V6 => &self.pool_id_v6,
        }
    }

    pub fn pool_cidr(&self, family: IpFamily) -> &IpNet {
        match family {
            IpFamily::V4 => &self.pool_cidr_v4,
            IpFamily::V6 => &self.pool_cidr_v6,
        }
    }

    pub fn gateway(&self, family: IpFamily) -> &IpNet {
        match family {
            IpFamily::V4 => &self.gateway_v4,
            IpFamily::V6 => &self.gateway_v6,
        }
    }

    /// Family of a sentinel pool ID, None for any other pool ID.
    pub fn sentinel_family(&self, pool_id: &str) -> Option<IpFamily> {
        if pool_id == self.pool_id_v4 {
            Some(IpFamily::V4)
        } else if pool_id == self.pool_id_v6 {
            Some(IpFamily::V6)
        } else {
            None
        }
    }
}
