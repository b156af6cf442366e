use std::sync::Arc;

use log::debug;

use crate::error::{FabricNetError, FabricNetResult};
use crate::store::{self, KeyValueStore};

use super::types::NetworkRecord;

const NETWORKS_PREFIX: &str = "fabricnet/v1/networks/";

/// Persists the IPAM decision of every network so later joins, possibly in
/// another process, can read it back.
#[derive(Clone)]
pub struct NetworkMetadataStore {
    store: Arc<dyn KeyValueStore>,
}

impl NetworkMetadataStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        NetworkMetadataStore { store }
    }

    fn key(network_id: &str) -> String {
        format!("{}{}", NETWORKS_PREFIX, network_id)
    }

    pub fn put(&self, record: &NetworkRecord) -> FabricNetResult<()> {
        debug!("storing metadata of network {}", record.network_id);
        store::put_json(self.store.as_ref(), &Self::key(&record.network_id), record)
    }

    /// Returns NotFound when no record is stored for the network.
    pub fn get(&self, network_id: &str) -> FabricNetResult<NetworkRecord> {
        store::get_json(self.store.as_ref(), &Self::key(network_id))?
            .ok_or_else(|| FabricNetError::NotFound(format!("network metadata {}", network_id)))
    }

    /// Returns false when no record was stored.
    pub fn delete(&self, network_id: &str) -> FabricNetResult<bool> {
        self.store.delete(&Self::key(network_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::{FamilyRecord, GatewayPool, IpamMode};
    use crate::store::{FileStore, MemoryStore};
    use std::collections::HashMap;

    fn record(id: &str) -> NetworkRecord {
        NetworkRecord {
            network_id: id.to_string(),
            profile_name: "web".to_string(),
            ipv4: Some(FamilyRecord {
                gateway_pool: GatewayPool {
                    gateway: "192.168.9.1/32".parse().unwrap(),
                    pool: "192.168.9.0/24".parse().unwrap(),
                },
                mode: IpamMode::ExternallyManaged,
                pool_created: true,
            }),
            ipv6: None,
            options: HashMap::new(),
        }
    }

    #[test]
    fn test_metadata_roundtrip() {
        let meta = NetworkMetadataStore::new(Arc::new(MemoryStore::new()));
        assert!(meta.get("net1").unwrap_err().is_not_found());

        meta.put(&record("net1")).unwrap();
        meta.put(&record("net2")).unwrap();
        assert_eq!(meta.get("net1").unwrap(), record("net1"));
        assert_eq!(meta.get("net2").unwrap(), record("net2"));

        assert!(meta.delete("net1").unwrap());
        assert!(!meta.delete("net1").unwrap());
        assert!(meta.get("net1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_metadata_survives_restart() {
        let tmpdir = tempfile::Builder::new()
            .prefix("fabricnet-tests")
            .tempdir()
            .unwrap();
        {
            let store = FileStore::new(tmpdir.path()).unwrap();
            NetworkMetadataStore::new(Arc::new(store))
                .put(&record("net1"))
                .unwrap();
        }
        let meta = NetworkMetadataStore::new(Arc::new(FileStore::new(tmpdir.path()).unwrap()));
        let got = meta.get("net1").unwrap();
        assert!(!got.is_fabric_managed(crate::network::types::IpFamily::V4));
        assert_eq!(got, record("net1"));
    }
}
