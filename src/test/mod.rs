//! Scenarios across the network driver, the IPAM driver and the fabric,
//! run against in memory stores and fake interfaces.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::{Arc, Mutex};

use ipnet::IpNet;

use crate::error::{FabricNetError, FabricNetResult};
use crate::fabric::{
    DatastoreFabric, Fabric, PoolRecord, ProfileRecord, WorkloadEndpointId,
    WorkloadEndpointRecord,
};
use crate::ipam::types::{RequestAddressRequest, RequestPoolRequest};
use crate::ipam::{IpamConfig, IpamDriver};
use crate::network::link::LinkOps;
use crate::network::metadata::NetworkMetadataStore;
use crate::network::resolver::NameResolver;
use crate::network::types::{
    CreateEndpointRequest, CreateNetworkRequest, DeleteEndpointRequest, DeleteNetworkRequest,
    EndpointInterface, IpFamily, IpamData, JoinRequest, LeaveRequest,
};
use crate::network::{DriverConfig, NetworkDriver};
use crate::plugin::Plugin;
use crate::store::{KeyValueStore, MemoryStore};


const HOSTNAME: &str = "host1";
const LINK_LOCAL: &str = "fe80::ecee:eeff:feee:eeee";

#[derive(Default)]
struct LinkState {
    /// interface -> peer
    links: HashMap<String, String>,
    macs: HashMap<String, String>,
}

/// Interfaces kept in memory, shared between the driver and the test.
#[derive(Clone, Default)]
pub struct FakeLinks {
    state: Arc<Mutex<LinkState>>,
    fail_set_mac: bool,
    no_link_local: bool,
}

impl FakeLinks {
    fn failing_set_mac() -> Self {
        FakeLinks {
            fail_set_mac: true,
            ..Default::default()
        }
    }

    fn without_link_local() -> Self {
        FakeLinks {
            no_link_local: true,
            ..Default::default()
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().unwrap().links.keys().cloned().collect();
        names.sort();
        names
    }

    fn mac(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().macs.get(name).cloned()
    }
}

impl LinkOps for FakeLinks {
    fn create_veth(&self, host: &str, peer: &str) -> FabricNetResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.links.contains_key(host) || state.links.contains_key(peer) {
            return Err(FabricNetError::msg(format!("{} already exists", host)));
        }
        state.links.insert(host.to_string(), peer.to_string());
        state.links.insert(peer.to_string(), host.to_string());
        Ok(())
    }

    fn set_mac(&self, name: &str, mac: &str) -> FabricNetResult<()> {
        if self.fail_set_mac {
            return Err(FabricNetError::msg("RTNETLINK answers: operation not permitted"));
        }
        self.state
            .lock()
            .unwrap()
            .macs
            .insert(name.to_string(), mac.to_string());
        Ok(())
    }

    fn set_up(&self, name: &str) -> FabricNetResult<()> {
        if !self.exists(name)? {
            return Err(FabricNetError::msg(format!("{} does not exist", name)));
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> FabricNetResult<bool> {
        Ok(self.state.lock().unwrap().links.contains_key(name))
    }

    fn delete(&self, name: &str) -> FabricNetResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state.links.remove(name) {
            Some(peer) => {
                state.links.remove(&peer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ipv6_addresses(&self, name: &str) -> FabricNetResult<Vec<Ipv6Addr>> {
        if !self.exists(name)? {
            return Err(FabricNetError::msg(format!("{} does not exist", name)));
        }
        if self.no_link_local {
            return Ok(vec!["fd00:1::5".parse()?]);
        }
        Ok(vec!["fd00:1::5".parse()?, LINK_LOCAL.parse()?])
    }
}

/// Network names are the IDs with a "name-" prefix.
pub struct FakeResolver;

impl NameResolver for FakeResolver {
    fn network_name(&self, network_id: &str) -> FabricNetResult<String> {
        Ok(format!("name-{}", network_id))
    }
}

/// Fabric which hands out one address too many.
pub struct GreedyFabric(DatastoreFabric);

impl Fabric for GreedyFabric {
    fn get_profile(&self, name: &str) -> FabricNetResult<ProfileRecord> {
        self.0.get_profile(name)
    }
    fn create_profile(&self, profile: &ProfileRecord) -> FabricNetResult<()> {
        self.0.create_profile(profile)
    }
    fn delete_profile(&self, name: &str) -> FabricNetResult<()> {
        self.0.delete_profile(name)
    }
    fn get_pool(&self, cidr: &IpNet) -> FabricNetResult<PoolRecord> {
        self.0.get_pool(cidr)
    }
    fn list_pools(&self) -> FabricNetResult<Vec<PoolRecord>> {
        self.0.list_pools()
    }
    fn create_pool(&self, pool: &PoolRecord) -> FabricNetResult<()> {
        self.0.create_pool(pool)
    }
    fn delete_pool(&self, cidr: &IpNet) -> FabricNetResult<()> {
        self.0.delete_pool(cidr)
    }
    fn get_workload_endpoint(
        &self,
        id: &WorkloadEndpointId,
    ) -> FabricNetResult<WorkloadEndpointRecord> {
        self.0.get_workload_endpoint(id)
    }
    fn create_workload_endpoint(&self, endpoint: &WorkloadEndpointRecord) -> FabricNetResult<()> {
        self.0.create_workload_endpoint(endpoint)
    }
    fn delete_workload_endpoint(&self, id: &WorkloadEndpointId) -> FabricNetResult<()> {
        self.0.delete_workload_endpoint(id)
    }
    fn auto_assign(
        &self,
        family: IpFamily,
        num: usize,
        hostname: &str,
    ) -> FabricNetResult<Vec<IpAddr>> {
        self.0.auto_assign(family, num + 1, hostname)
    }
    fn assign_ip(&self, ip: IpAddr, hostname: &str) -> FabricNetResult<()> {
        self.0.assign_ip(ip, hostname)
    }
    fn release_ips(&self, ips: &[IpAddr]) -> FabricNetResult<Vec<IpAddr>> {
        self.0.release_ips(ips)
    }
}

/// Drivers wired to one shared in memory store.
pub struct Harness {
    store: Arc<MemoryStore>,
    fabric: Arc<DatastoreFabric>,
    links: FakeLinks,
    network: NetworkDriver,
    ipam: IpamDriver,
}

impl Harness {
    fn new() -> Self {
        Self::with_links(FakeLinks::default())
    }

    fn with_links(links: FakeLinks) -> Self {
        let store = Arc::new(MemoryStore::new());
        let kv: Arc<dyn KeyValueStore> = store.clone();
        let fabric = Arc::new(DatastoreFabric::new(kv.clone()));
        let network = NetworkDriver::new(
            DriverConfig::new(HOSTNAME),
            fabric.clone(),
            NetworkMetadataStore::new(kv),
            Box::new(links.clone()),
            Box::new(FakeResolver),
        )
        .unwrap();
        let ipam = IpamDriver::new(IpamConfig::new(HOSTNAME), fabric.clone());
        Harness {
            store,
            fabric,
            links,
            network,
            ipam,
        }
    }

    /// A second set of drivers on the same store, as another process would see it.
    fn reopen(&self) -> (NetworkDriver, IpamDriver) {
        let kv: Arc<dyn KeyValueStore> = self.store.clone();
        let fabric = Arc::new(DatastoreFabric::new(kv.clone()));
        let network = NetworkDriver::new(
            DriverConfig::new(HOSTNAME),
            fabric.clone(),
            NetworkMetadataStore::new(kv),
            Box::new(self.links.clone()),
            Box::new(FakeResolver),
        )
        .unwrap();
        (network, IpamDriver::new(IpamConfig::new(HOSTNAME), fabric))
    }

    fn into_plugin(self) -> Plugin {
        Plugin::new(self.network, self.ipam)
    }

    fn add_pool(&self, cidr: &str, disabled: bool) {
        self.fabric
            .create_pool(&PoolRecord {
                cidr: cidr.parse().unwrap(),
                disabled,
                ipip_enabled: false,
                nat_outgoing: false,
            })
            .unwrap();
    }

    fn workload(&self, endpoint_id: &str) -> FabricNetResult<WorkloadEndpointRecord> {
        self.fabric.get_workload_endpoint(&WorkloadEndpointId {
            node: HOSTNAME.to_string(),
            orchestrator: "libnetwork".to_string(),
            workload: "libnetwork".to_string(),
            name: endpoint_id.to_string(),
        })
    }
}

fn ipam_data(gateway: &str, pool: &str) -> IpamData {
    IpamData {
        gateway: gateway.to_string(),
        pool: pool.to_string(),
        ..Default::default()
    }
}

fn create_network_req(id: &str, ipv4: Vec<IpamData>, ipv6: Vec<IpamData>) -> CreateNetworkRequest {
    CreateNetworkRequest {
        network_id: id.to_string(),
        options: HashMap::new(),
        ipv4_data: ipv4,
        ipv6_data: ipv6,
    }
}

fn create_endpoint_req(
    network_id: &str,
    endpoint_id: &str,
    v4: &str,
    v6: &str,
) -> CreateEndpointRequest {
    CreateEndpointRequest {
        network_id: network_id.to_string(),
        endpoint_id: endpoint_id.to_string(),
        interface: Some(EndpointInterface {
            address: v4.to_string(),
            address_ipv6: v6.to_string(),
            ..Default::default()
        }),
        options: HashMap::new(),
    }
}

fn join_req(network_id: &str, endpoint_id: &str) -> JoinRequest {
    JoinRequest {
        network_id: network_id.to_string(),
        endpoint_id: endpoint_id.to_string(),
        ..Default::default()
    }
}

fn leave_req(endpoint_id: &str) -> LeaveRequest {
    LeaveRequest {
        endpoint_id: endpoint_id.to_string(),
        ..Default::default()
    }
}

fn delete_endpoint_req(endpoint_id: &str) -> DeleteEndpointRequest {
    DeleteEndpointRequest {
        endpoint_id: endpoint_id.to_string(),
        ..Default::default()
    }
}

fn delete_network_req(network_id: &str) -> DeleteNetworkRequest {
    DeleteNetworkRequest {
        network_id: network_id.to_string(),
    }
}

fn request_address_req(pool_id: &str, address: &str) -> RequestAddressRequest {
    RequestAddressRequest {
        pool_id: pool_id.to_string(),
        address: address.to_string(),
        ..Default::default()
    }
}

fn request_pool_req(pool: &str, sub_pool: &str, v6: bool) -> RequestPoolRequest {
    RequestPoolRequest {
        pool: pool.to_string(),
        sub_pool: sub_pool.to_string(),
        v6,
        ..Default::default()
    }
}
