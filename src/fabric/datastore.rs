use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use log::{debug, info};

use crate::error::{ErrorWrap, FabricNetError, FabricNetResult};
use crate::ipam::util::all_addresses;
use crate::network::types::IpFamily;
use crate::store::{self, KeyValueStore};

use super::{Fabric, PoolRecord, ProfileRecord, WorkloadEndpointId, WorkloadEndpointRecord};

const PROFILES_PREFIX: &str = "fabric/v1/profiles/";
const POOLS_PREFIX: &str = "fabric/v1/pools/";
const WORKLOADS_PREFIX: &str = "fabric/v1/workloads/";
const BLOCKS_PREFIX: &str = "fabric/v1/ipam/blocks/";

// prefix length of the allocation blocks carved out of a pool
const BLOCK_PREFIX_LEN_V4: u8 = 26;
const BLOCK_PREFIX_LEN_V6: u8 = 122;

/// A slice of a pool from which addresses are handed out. A block with
/// affinity is preferred for assignments of that host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct AllocationBlock {
    #[serde(rename = "cidr")]
    cidr: IpNet,

    #[serde(rename = "affinity", default)]
    affinity: Option<String>,

    /// address -> host holding it
    #[serde(rename = "allocations", default)]
    allocations: BTreeMap<String, String>,
}

impl AllocationBlock {
    fn new(cidr: IpNet, affinity: Option<String>) -> Self {
        AllocationBlock {
            cidr,
            affinity,
            allocations: BTreeMap::new(),
        }
    }

    fn next_free(&self) -> Option<IpAddr> {
        all_addresses(&self.cidr).find(|ip| !self.allocations.contains_key(&ip.to_string()))
    }
}

fn cidr_key(cidr: &IpNet) -> String {
    cidr.trunc().to_string().replace('/', "-")
}

fn block_prefix_len(family: IpFamily) -> u8 {
    match family {
        IpFamily::V4 => BLOCK_PREFIX_LEN_V4,
        IpFamily::V6 => BLOCK_PREFIX_LEN_V6,
    }
}

/// Block of the pool which contains ip, pools smaller than a block form a
/// single block.
fn block_for(pool: &IpNet, ip: IpAddr) -> FabricNetResult<IpNet> {
    let len = block_prefix_len(IpFamily::of_net(pool));
    if pool.prefix_len() >= len {
        return Ok(pool.trunc());
    }
    Ok(IpNet::new(ip, len)?.trunc())
}

/// Every block of the pool in address order.
fn pool_blocks(pool: &IpNet) -> FabricNetResult<Box<dyn Iterator<Item = IpNet>>> {
    let len = block_prefix_len(IpFamily::of_net(pool));
    if pool.prefix_len() >= len {
        return Ok(Box::new(std::iter::once(pool.trunc())));
    }
    Ok(Box::new(pool.trunc().subnets(len)?))
}

/// Fabric backed by a keyed store, all objects are JSON records below
/// the fabric/v1/ prefix.
pub struct DatastoreFabric {
    store: Arc<dyn KeyValueStore>,
}

impl DatastoreFabric {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        DatastoreFabric { store }
    }

    fn profile_key(name: &str) -> String {
        format!("{}{}", PROFILES_PREFIX, name)
    }

    fn pool_key(cidr: &IpNet) -> String {
        format!("{}{}", POOLS_PREFIX, cidr_key(cidr))
    }

    fn workload_key(id: &WorkloadEndpointId) -> String {
        format!(
            "{}{}/{}/{}/{}",
            WORKLOADS_PREFIX, id.node, id.orchestrator, id.workload, id.name
        )
    }

    fn block_key(cidr: &IpNet) -> String {
        format!("{}{}", BLOCKS_PREFIX, cidr_key(cidr))
    }

    fn list_blocks(&self) -> FabricNetResult<Vec<AllocationBlock>> {
        store::list_json(self.store.as_ref(), BLOCKS_PREFIX)
    }

    /// Enabled pools of the family, these are the ones auto assignment may use.
    fn enabled_pools(&self, family: IpFamily) -> FabricNetResult<Vec<PoolRecord>> {
        Ok(self
            .list_pools()?
            .into_iter()
            .filter(|p| !p.disabled && IpFamily::of_net(&p.cidr) == family)
            .collect())
    }

    /// Take the next free address of the block. The block is read and
    /// written under the store lock so concurrent callers never get the same
    /// address.
    fn allocate_in(&self, cidr: &IpNet, hostname: &str) -> FabricNetResult<Option<IpAddr>> {
        let mut assigned = None;
        store::update_json(
            self.store.as_ref(),
            &Self::block_key(cidr),
            |block: Option<AllocationBlock>| {
                // released and removed since it was listed
                let mut block = match block {
                    Some(block) => block,
                    None => return Ok(None),
                };
                if let Some(ip) = block.next_free() {
                    block.allocations.insert(ip.to_string(), hostname.to_string());
                    assigned = Some(ip);
                }
                Ok(Some(block))
            },
        )?;
        Ok(assigned)
    }

    /// Claim the first block of the pools no other host has claimed yet.
    fn claim_block(&self, pools: &[PoolRecord], hostname: &str) -> FabricNetResult<Option<IpNet>> {
        for pool in pools {
            for cidr in pool_blocks(&pool.cidr)? {
                let block = AllocationBlock::new(cidr, Some(hostname.to_string()));
                match store::create_json(self.store.as_ref(), &Self::block_key(&cidr), &block) {
                    Ok(()) => {
                        info!("claimed block {} for host {}", cidr, hostname);
                        return Ok(Some(cidr));
                    }
                    Err(e) if e.is_already_exists() => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(None)
    }

    fn assign_one(&self, pools: &[PoolRecord], hostname: &str) -> FabricNetResult<Option<IpAddr>> {
        let blocks: Vec<AllocationBlock> = self
            .list_blocks()?
            .into_iter()
            .filter(|b| pools.iter().any(|p| p.cidr.trunc().contains(&b.cidr)))
            .collect();

        // blocks of this host first
        for block in blocks.iter().filter(|b| b.affinity.as_deref() == Some(hostname)) {
            if let Some(ip) = self.allocate_in(&block.cidr, hostname)? {
                return Ok(Some(ip));
            }
        }

        if let Some(cidr) = self.claim_block(pools, hostname)? {
            if let Some(ip) = self.allocate_in(&cidr, hostname)? {
                return Ok(Some(ip));
            }
        }

        // every block is claimed, borrow from the other hosts
        for block in blocks.iter().filter(|b| b.affinity.as_deref() != Some(hostname)) {
            if let Some(ip) = self.allocate_in(&block.cidr, hostname)? {
                debug!("borrowed {} from block {}", ip, block.cidr);
                return Ok(Some(ip));
            }
        }
        Ok(None)
    }
}

impl Fabric for DatastoreFabric {
    fn get_profile(&self, name: &str) -> FabricNetResult<ProfileRecord> {
        store::get_json(self.store.as_ref(), &Self::profile_key(name))?
            .ok_or_else(|| FabricNetError::NotFound(format!("profile {}", name)))
    }

    fn create_profile(&self, profile: &ProfileRecord) -> FabricNetResult<()> {
        store::create_json(
            self.store.as_ref(),
            &Self::profile_key(&profile.name),
            profile,
        )
        .wrap(format!("create profile {}", profile.name))
    }

    fn delete_profile(&self, name: &str) -> FabricNetResult<()> {
        if !self.store.delete(&Self::profile_key(name))? {
            return Err(FabricNetError::NotFound(format!("profile {}", name)));
        }
        Ok(())
    }

    fn get_pool(&self, cidr: &IpNet) -> FabricNetResult<PoolRecord> {
        store::get_json(self.store.as_ref(), &Self::pool_key(cidr))?
            .ok_or_else(|| FabricNetError::NotFound(format!("pool {}", cidr)))
    }

    fn list_pools(&self) -> FabricNetResult<Vec<PoolRecord>> {
        store::list_json(self.store.as_ref(), POOLS_PREFIX)
    }

    fn create_pool(&self, pool: &PoolRecord) -> FabricNetResult<()> {
        store::create_json(self.store.as_ref(), &Self::pool_key(&pool.cidr), pool)
            .wrap(format!("create pool {}", pool.cidr))
    }

    fn delete_pool(&self, cidr: &IpNet) -> FabricNetResult<()> {
        if !self.store.delete(&Self::pool_key(cidr))? {
            return Err(FabricNetError::NotFound(format!("pool {}", cidr)));
        }
        Ok(())
    }

    fn get_workload_endpoint(
        &self,
        id: &WorkloadEndpointId,
    ) -> FabricNetResult<WorkloadEndpointRecord> {
        store::get_json(self.store.as_ref(), &Self::workload_key(id))?
            .ok_or_else(|| FabricNetError::EndpointNotFound(id.name.clone()))
    }

    fn create_workload_endpoint(&self, endpoint: &WorkloadEndpointRecord) -> FabricNetResult<()> {
        store::create_json(
            self.store.as_ref(),
            &Self::workload_key(&endpoint.id),
            endpoint,
        )
        .wrap(format!("create workload endpoint {}", endpoint.id.name))
    }

    fn delete_workload_endpoint(&self, id: &WorkloadEndpointId) -> FabricNetResult<()> {
        if !self.store.delete(&Self::workload_key(id))? {
            return Err(FabricNetError::EndpointNotFound(id.name.clone()));
        }
        Ok(())
    }

    fn auto_assign(
        &self,
        family: IpFamily,
        num: usize,
        hostname: &str,
    ) -> FabricNetResult<Vec<IpAddr>> {
        let pools = self.enabled_pools(family)?;
        let mut ips = Vec::with_capacity(num);
        while ips.len() < num {
            match self.assign_one(&pools, hostname)? {
                Some(ip) => ips.push(ip),
                None => break,
            }
        }
        debug!("auto assigned {:?} to host {}", ips, hostname);
        Ok(ips)
    }

    fn assign_ip(&self, ip: IpAddr, hostname: &str) -> FabricNetResult<()> {
        let pool = self
            .list_pools()?
            .into_iter()
            .find(|p| p.cidr.contains(&ip))
            .ok_or_else(|| FabricNetError::UnknownPool(ip.to_string()))?;

        let cidr = block_for(&pool.cidr, ip)?;
        store::update_json(
            self.store.as_ref(),
            &Self::block_key(&cidr),
            |block: Option<AllocationBlock>| {
                let mut block = block.unwrap_or_else(|| AllocationBlock::new(cidr, None));
                match block.allocations.get(&ip.to_string()) {
                    Some(holder) if holder == hostname => {
                        debug!("{} already assigned to host {}", ip, hostname);
                    }
                    Some(holder) => {
                        return Err(FabricNetError::AddressInUse {
                            ip,
                            holder: holder.clone(),
                        })
                    }
                    None => {
                        block.allocations.insert(ip.to_string(), hostname.to_string());
                    }
                }
                Ok(Some(block))
            },
        )
    }

    fn release_ips(&self, ips: &[IpAddr]) -> FabricNetResult<Vec<IpAddr>> {
        let mut unallocated = Vec::new();
        for ip in ips {
            let cidr = match self.list_blocks()?.into_iter().find(|b| b.cidr.contains(ip)) {
                Some(block) => block.cidr,
                None => {
                    unallocated.push(*ip);
                    continue;
                }
            };

            let mut released = false;
            store::update_json(
                self.store.as_ref(),
                &Self::block_key(&cidr),
                |block: Option<AllocationBlock>| {
                    let mut block = match block {
                        Some(block) => block,
                        None => return Ok(None),
                    };
                    released = block.allocations.remove(&ip.to_string()).is_some();
                    if block.allocations.is_empty() && block.affinity.is_none() {
                        return Ok(None);
                    }
                    Ok(Some(block))
                },
            )?;
            if released {
                debug!("released {}", ip);
            } else {
                unallocated.push(*ip);
            }
        }
        Ok(unallocated)
    }
}
