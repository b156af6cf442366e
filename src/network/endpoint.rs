use std::net::Ipv6Addr;

use log::{debug, info, warn};

use crate::{
    error::{FabricNetError, FabricNetResult},
    fabric::{WorkloadEndpointId, WorkloadEndpointRecord},
    network::{
        constants,
        core_utils::{generate_interface_name, parse_cidr},
        driver::NetworkDriver,
        link::first_link_local,
        types::{
            CreateEndpointRequest, CreateEndpointResponse, DeleteEndpointRequest,
            DiscoveryNotification, EndpointInterface, ExternalConnectivityRequest, InfoRequest,
            InfoResponse, InterfaceName, IpFamily, JoinRequest, JoinResponse, LeaveRequest,
            StaticRoute,
        },
    },
};

impl NetworkDriver {
    /// Identity of the workload endpoint, only depends on this host and the
    /// endpoint ID.
    fn workload_id(&self, endpoint_id: &str) -> WorkloadEndpointId {
        WorkloadEndpointId {
            node: self.config.hostname.clone(),
            orchestrator: self.config.orchestrator_id.clone(),
            workload: self.config.workload_id.clone(),
            name: endpoint_id.to_string(),
        }
    }

    fn host_interface_name(&self, endpoint_id: &str) -> FabricNetResult<String> {
        generate_interface_name(&self.config.interface_prefix, endpoint_id)
    }

    pub fn create_endpoint(
        &self,
        req: &CreateEndpointRequest,
    ) -> FabricNetResult<CreateEndpointResponse> {
        let (address, address_ipv6) = match &req.interface {
            Some(iface) => (iface.address.as_str(), iface.address_ipv6.as_str()),
            None => ("", ""),
        };
        if address.is_empty() && address_ipv6.is_empty() {
            return Err(FabricNetError::NoAddressAssigned);
        }

        // the container only gets single host routes
        let mut ip_networks = Vec::new();
        for addr in [address, address_ipv6] {
            if addr.is_empty() {
                continue;
            }
            let net = parse_cidr(addr)
                .map_err(|e| FabricNetError::wrap(format!("parse address {}", addr), e))?;
            ip_networks.push(ipnet::IpNet::from(net.addr()));
        }

        let profile_name = self.resolver.network_name(&req.network_id)?;
        // the network may have been created outside of this driver
        self.ensure_profile(&profile_name)?;

        let endpoint = WorkloadEndpointRecord {
            id: self.workload_id(&req.endpoint_id),
            interface_name: self.host_interface_name(&req.endpoint_id)?,
            mac: self.config.fixed_mac.clone(),
            ip_networks,
            profiles: vec![profile_name],
        };
        self.fabric.create_workload_endpoint(&endpoint)?;
        info!(
            "created workload endpoint {} with addresses {:?}",
            req.endpoint_id, endpoint.ip_networks
        );

        Ok(CreateEndpointResponse {
            interface: Some(EndpointInterface {
                mac_address: self.config.fixed_mac.clone(),
                ..Default::default()
            }),
        })
    }

    pub fn delete_endpoint(&self, req: &DeleteEndpointRequest) -> FabricNetResult<()> {
        match self
            .fabric
            .delete_workload_endpoint(&self.workload_id(&req.endpoint_id))
        {
            Ok(()) => {
                info!("removed workload endpoint {}", req.endpoint_id);
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!("workload endpoint {} already removed", req.endpoint_id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn endpoint_info(&self, req: &InfoRequest) -> FabricNetResult<InfoResponse> {
        debug!("endpoint info for {}", req.endpoint_id);
        Ok(InfoResponse::default())
    }

    /// Create the veth pair of the endpoint and compute the gateway and
    /// routes of the container. On error no interface is left behind.
    pub fn join(&self, req: &JoinRequest) -> FabricNetResult<JoinResponse> {
        let host = self.host_interface_name(&req.endpoint_id)?;
        let temp = generate_interface_name(constants::TEMP_INTERFACE_PREFIX, &req.endpoint_id)?;

        self.links
            .create_veth(&host, &temp)
            .map_err(|e| FabricNetError::VethSetupFailed(host.clone(), Box::new(e)))?;

        match self.configure_join(req, &host, &temp) {
            Ok(resp) => Ok(resp),
            Err(err) => {
                match self.links.delete(&host) {
                    Ok(_) => debug!("removed veth {} after failed join", host),
                    Err(del_err) => warn!("failed to remove veth {}: {}", host, del_err),
                }
                Err(err)
            }
        }
    }

    fn configure_join(
        &self,
        req: &JoinRequest,
        host: &str,
        temp: &str,
    ) -> FabricNetResult<JoinResponse> {
        self.links
            .set_mac(temp, &self.config.fixed_mac)
            .map_err(|e| FabricNetError::VethSetupFailed(host.to_string(), Box::new(e)))?;

        let record = match self.metadata.get(&req.network_id) {
            Ok(record) => record,
            Err(err) if err.is_not_found() => {
                return Err(FabricNetError::NetworkMetadataMissing(
                    req.network_id.clone(),
                ))
            }
            Err(err) => return Err(err),
        };

        let mut resp = JoinResponse {
            interface_name: InterfaceName {
                src_name: temp.to_string(),
                dst_prefix: self.config.interface_prefix.clone(),
            },
            host_interface_name: host.to_string(),
            ..Default::default()
        };

        // externally managed families keep the gateway of their IPAM driver
        if record.is_fabric_managed(IpFamily::V4) {
            let nexthop = self.config.ipv4_nexthop;
            resp.gateway = nexthop.to_string();
            resp.static_routes.push(StaticRoute {
                destination: format!("{}/32", nexthop),
                route_type: constants::ROUTE_TYPE_CONNECTED,
                next_hop: String::new(),
            });
        }

        if record.is_fabric_managed(IpFamily::V6) {
            let nexthop = self
                .host_link_local(host, temp)
                .map_err(|e| FabricNetError::VethSetupFailed(host.to_string(), Box::new(e)))?;
            resp.gateway_ipv6 = nexthop.to_string();
            resp.static_routes.push(StaticRoute {
                destination: format!("{}/128", nexthop),
                route_type: constants::ROUTE_TYPE_CONNECTED,
                next_hop: String::new(),
            });
        }

        info!("joined endpoint {} on {}", req.endpoint_id, host);
        Ok(resp)
    }

    /// Link local address of the host end, it is only assigned once both ends
    /// are up.
    fn host_link_local(&self, host: &str, temp: &str) -> FabricNetResult<Ipv6Addr> {
        self.links.set_up(temp)?;
        let addrs = self.links.ipv6_addresses(host)?;
        first_link_local(&addrs)
            .ok_or_else(|| FabricNetError::msg(format!("no link local IPv6 address on {}", host)))
    }

    pub fn leave(&self, req: &LeaveRequest) -> FabricNetResult<()> {
        let host = self.host_interface_name(&req.endpoint_id)?;
        if !self.links.delete(&host)? {
            debug!("interface {} of endpoint {} already gone", host, req.endpoint_id);
        }
        Ok(())
    }

    pub fn discover_new(&self, req: &DiscoveryNotification) -> FabricNetResult<()> {
        debug!("ignoring discovery of type {}", req.discovery_type);
        Ok(())
    }

    pub fn discover_delete(&self, req: &DiscoveryNotification) -> FabricNetResult<()> {
        debug!("ignoring discovery removal of type {}", req.discovery_type);
        Ok(())
    }

    pub fn program_external_connectivity(
        &self,
        req: &ExternalConnectivityRequest,
    ) -> FabricNetResult<()> {
        debug!("external connectivity of {} is handled by the fabric", req.endpoint_id);
        Ok(())
    }

    pub fn revoke_external_connectivity(
        &self,
        req: &ExternalConnectivityRequest,
    ) -> FabricNetResult<()> {
        debug!("external connectivity of {} is handled by the fabric", req.endpoint_id);
        Ok(())
    }
}
