//! Object model of the network policy fabric.
//!
//! The fabric owns profiles, pools, workload endpoints and IP allocations.
//! The drivers only talk to it through the [`Fabric`] trait.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::FabricNetResult;
use crate::network::types::IpFamily;

pub mod datastore;

pub use datastore::DatastoreFabric;

/// Single policy rule of a profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "action")]
    pub action: String,

    /// only match traffic from workloads carrying this tag
    #[serde(rename = "source_tag", default, skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
}

impl Rule {
    pub fn allow() -> Self {
        Rule {
            action: "allow".to_string(),
            source_tag: None,
        }
    }

    pub fn allow_from_tag(tag: &str) -> Self {
        Rule {
            action: "allow".to_string(),
            source_tag: Some(tag.to_string()),
        }
    }
}

/// Security boundary shared by all workloads of a network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "tags", default)]
    pub tags: Vec<String>,

    #[serde(rename = "ingress_rules", default)]
    pub ingress_rules: Vec<Rule>,

    #[serde(rename = "egress_rules", default)]
    pub egress_rules: Vec<Rule>,
}

impl ProfileRecord {
    /// Profile which tags its members with the profile name, allows all
    /// egress and allows ingress from other members only.
    pub fn for_network(name: &str) -> Self {
        ProfileRecord {
            name: name.to_string(),
            tags: vec![name.to_string()],
            ingress_rules: vec![Rule::allow_from_tag(name)],
            egress_rules: vec![Rule::allow()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    #[serde(rename = "cidr")]
    pub cidr: IpNet,

    /// disabled pools are never used for auto assignment
    #[serde(rename = "disabled", default)]
    pub disabled: bool,

    #[serde(rename = "ipip_enabled", default)]
    pub ipip_enabled: bool,

    #[serde(rename = "nat_outgoing", default)]
    pub nat_outgoing: bool,
}

/// Identity of a workload endpoint, fully derived from the host and the
/// endpoint ID so it can be deleted without reading it first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadEndpointId {
    #[serde(rename = "node")]
    pub node: String,

    #[serde(rename = "orchestrator")]
    pub orchestrator: String,

    #[serde(rename = "workload")]
    pub workload: String,

    #[serde(rename = "name")]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEndpointRecord {
    #[serde(rename = "id")]
    pub id: WorkloadEndpointId,

    /// host side interface name
    #[serde(rename = "interface_name")]
    pub interface_name: String,

    #[serde(rename = "mac")]
    pub mac: String,

    #[serde(rename = "ip_networks", default)]
    pub ip_networks: Vec<IpNet>,

    #[serde(rename = "profiles", default)]
    pub profiles: Vec<String>,
}

/// Access to the fabric object store and address allocator.
///
/// Lookups and deletes of missing objects fail with `NotFound`, creates of
/// existing objects fail with `AlreadyExists`.
pub trait Fabric: Send + Sync {
    fn get_profile(&self, name: &str) -> FabricNetResult<ProfileRecord>;
    fn create_profile(&self, profile: &ProfileRecord) -> FabricNetResult<()>;
    fn delete_profile(&self, name: &str) -> FabricNetResult<()>;

    fn get_pool(&self, cidr: &IpNet) -> FabricNetResult<PoolRecord>;
    fn list_pools(&self) -> FabricNetResult<Vec<PoolRecord>>;
    fn create_pool(&self, pool: &PoolRecord) -> FabricNetResult<()>;
    fn delete_pool(&self, cidr: &IpNet) -> FabricNetResult<()>;

    fn get_workload_endpoint(
        &self,
        id: &WorkloadEndpointId,
    ) -> FabricNetResult<WorkloadEndpointRecord>;
    fn create_workload_endpoint(&self, endpoint: &WorkloadEndpointRecord) -> FabricNetResult<()>;
    fn delete_workload_endpoint(&self, id: &WorkloadEndpointId) -> FabricNetResult<()>;

    /// Assign up to num addresses of the family from the enabled pools with
    /// affinity to hostname. Returns fewer addresses when the pools are full.
    fn auto_assign(
        &self,
        family: IpFamily,
        num: usize,
        hostname: &str,
    ) -> FabricNetResult<Vec<IpAddr>>;

    /// Reserve one specific address for hostname.
    fn assign_ip(&self, ip: IpAddr, hostname: &str) -> FabricNetResult<()>;

    /// Release the addresses, returns the ones which were not allocated.
    fn release_ips(&self, ips: &[IpAddr]) -> FabricNetResult<Vec<IpAddr>>;
}
