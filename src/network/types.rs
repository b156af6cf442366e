// Crate contains the types which are accepted and returned by the network driver.

use ipnet::IpNet;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Address family of a pool, gateway or address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn of_addr(addr: &IpAddr) -> IpFamily {
        match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    pub fn of_net(net: &IpNet) -> IpFamily {
        IpFamily::of_addr(&net.addr())
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Who owns address assignment for one address family of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpamMode {
    /// addresses come from the fabric pools, the container routes via the host
    FabricManaged,
    /// another IPAM driver owns the pool, the fabric must not auto assign from it
    ExternallyManaged,
}

/// Gateway and pool pair given for one address family at network creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPool {
    #[serde(rename = "gateway")]
    pub gateway: IpNet,

    #[serde(rename = "pool")]
    pub pool: IpNet,
}

/// The per family state persisted for a network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRecord {
    #[serde(flatten)]
    pub gateway_pool: GatewayPool,

    /// IPAM mode decided when the network was created
    #[serde(rename = "mode")]
    pub mode: IpamMode,

    /// true when this network created the fabric pool and so removes it
    #[serde(rename = "pool_created", default)]
    pub pool_created: bool,
}

/// NetworkRecord is written once when a network is created and read by
/// every later join on that network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// ID of the network as assigned by the orchestrator.
    #[serde(rename = "network_id")]
    pub network_id: String,

    /// Name of the fabric profile created for this network.
    #[serde(rename = "profile_name")]
    pub profile_name: String,

    /// IPv4 state, None when the network does not use IPv4.
    #[serde(rename = "ipv4")]
    pub ipv4: Option<FamilyRecord>,

    /// IPv6 state, None when the network does not use IPv6.
    #[serde(rename = "ipv6")]
    pub ipv6: Option<FamilyRecord>,

    /// Options as given on network creation.
    #[serde(rename = "options")]
    pub options: HashMap<String, Value>,
}

impl NetworkRecord {
    pub fn family(&self, family: IpFamily) -> Option<&FamilyRecord> {
        match family {
            IpFamily::V4 => self.ipv4.as_ref(),
            IpFamily::V6 => self.ipv6.as_ref(),
        }
    }

    /// true when the fabric owns address assignment for this family
    pub fn is_fabric_managed(&self, family: IpFamily) -> bool {
        self.family(family)
            .map(|f| f.mode == IpamMode::FabricManaged)
            .unwrap_or(false)
    }
}

/// IPAM data for one address family as supplied on network creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IpamData {
    #[serde(rename = "AddressSpace", default)]
    pub address_space: String,

    /// Pool in CIDR form.
    #[serde(rename = "Pool", default)]
    pub pool: String,

    /// Gateway in CIDR form.
    #[serde(rename = "Gateway", default)]
    pub gateway: String,

    #[serde(rename = "AuxAddresses", default)]
    pub aux_addresses: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    #[serde(rename = "Scope")]
    pub scope: String,

    #[serde(rename = "ConnectivityScope")]
    pub connectivity_scope: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,

    /// Options, the generic driver options are nested under
    /// "com.docker.network.generic".
    #[serde(rename = "Options", default)]
    pub options: HashMap<String, Value>,

    #[serde(rename = "IPv4Data", default)]
    pub ipv4_data: Vec<IpamData>,

    #[serde(rename = "IPv6Data", default)]
    pub ipv6_data: Vec<IpamData>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeleteNetworkRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
}

/// EndpointInterface carries the addresses assigned by IPAM and, in the
/// response, the MAC address of the container interface.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndpointInterface {
    #[serde(rename = "Address", default, skip_serializing_if = "String::is_empty")]
    pub address: String,

    #[serde(
        rename = "AddressIPv6",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub address_ipv6: String,

    #[serde(
        rename = "MacAddress",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub mac_address: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateEndpointRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,

    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,

    #[serde(rename = "Interface", default)]
    pub interface: Option<EndpointInterface>,

    #[serde(rename = "Options", default)]
    pub options: HashMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateEndpointResponse {
    #[serde(rename = "Interface")]
    pub interface: Option<EndpointInterface>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeleteEndpointRequest {
    #[serde(rename = "NetworkID", default)]
    pub network_id: String,

    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InfoRequest {
    #[serde(rename = "NetworkID", default)]
    pub network_id: String,

    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(rename = "Value")]
    pub value: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,

    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,

    #[serde(rename = "SandboxKey", default)]
    pub sandbox_key: String,

    #[serde(rename = "Options", default)]
    pub options: HashMap<String, Value>,
}

/// InterfaceName tells the orchestrator which interface to move into the
/// container and how to name it there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceName {
    #[serde(rename = "SrcName")]
    pub src_name: String,

    #[serde(rename = "DstPrefix")]
    pub dst_prefix: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoute {
    #[serde(rename = "Destination")]
    pub destination: String,

    /// 0 is a next hop route, 1 a directly connected route
    #[serde(rename = "RouteType")]
    pub route_type: i32,

    #[serde(rename = "NextHop", default, skip_serializing_if = "String::is_empty")]
    pub next_hop: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JoinResponse {
    #[serde(rename = "InterfaceName")]
    pub interface_name: InterfaceName,

    /// Host side end of the veth pair, only used in process.
    #[serde(skip)]
    pub host_interface_name: String,

    #[serde(rename = "Gateway", default, skip_serializing_if = "String::is_empty")]
    pub gateway: String,

    #[serde(
        rename = "GatewayIPv6",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub gateway_ipv6: String,

    #[serde(rename = "StaticRoutes", default)]
    pub static_routes: Vec<StaticRoute>,

    #[serde(rename = "DisableGatewayService", default)]
    pub disable_gateway_service: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LeaveRequest {
    #[serde(rename = "NetworkID", default)]
    pub network_id: String,

    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscoveryNotification {
    #[serde(rename = "DiscoveryType", default)]
    pub discovery_type: i32,

    #[serde(rename = "DiscoveryData", default)]
    pub discovery_data: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExternalConnectivityRequest {
    #[serde(rename = "NetworkID", default)]
    pub network_id: String,

    #[serde(rename = "EndpointID", default)]
    pub endpoint_id: String,

    #[serde(rename = "Options", default)]
    pub options: HashMap<String, Value>,
}
