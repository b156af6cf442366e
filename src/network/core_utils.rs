use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde_json::Value;

use crate::error::{FabricNetError, FabricNetResult};
use crate::ipam::IpamSentinels;
use crate::network::constants;
use crate::network::types::{GatewayPool, IpFamily, IpamData, IpamMode};

/// Derive the interface name of an endpoint, the result is the prefix
/// followed by the first 11 characters of the endpoint ID. Shorter IDs are
/// used as a whole.
pub fn generate_interface_name(prefix: &str, endpoint_id: &str) -> FabricNetResult<String> {
    if prefix.chars().count() > constants::MAX_INTERFACE_PREFIX_LEN {
        return Err(FabricNetError::InvalidPrefix(prefix.to_string()));
    }
    let id: String = endpoint_id
        .chars()
        .take(constants::ENDPOINT_ID_NAME_LEN)
        .collect();
    Ok(format!("{}{}", prefix, id))
}

/// Decide who owns address assignment from the gateway the orchestrator got
/// from the IPAM driver. Only the fabric IPAM hands out the sentinel gateway.
pub fn classify_ipam_mode(
    gateway: &IpNet,
    family: IpFamily,
    sentinels: &IpamSentinels,
) -> IpamMode {
    if gateway.trunc() == sentinels.gateway(family).trunc() {
        IpamMode::FabricManaged
    } else {
        IpamMode::ExternallyManaged
    }
}

/// Parse an address in CIDR notation, a plain address is taken as a host
/// network.
pub fn parse_cidr(value: &str) -> FabricNetResult<IpNet> {
    match IpNet::from_str(value) {
        Ok(net) => Ok(net),
        Err(_) => Ok(IpNet::from(IpAddr::from_str(value)?)),
    }
}

/// Get the gateway and pool of one address family from the IPAM data the
/// network was created with. None means the family is not used.
pub fn get_gateway_and_pool(
    data: &[IpamData],
    family: IpFamily,
) -> FabricNetResult<Option<GatewayPool>> {
    let entry = match data {
        [] => return Ok(None),
        [entry] => entry,
        _ => return Err(FabricNetError::MultipleGatewaysUnsupported(family)),
    };

    if entry.gateway.is_empty() || entry.pool.is_empty() {
        return Ok(None);
    }

    let parse = |what: &str, value: &str| {
        parse_cidr(value)
            .ok()
            .filter(|net| IpFamily::of_net(net) == family)
            .ok_or_else(|| {
                FabricNetError::InvalidIpamData(format!("{} {} {:?}", family, what, value))
            })
    };
    let gateway = parse("gateway", &entry.gateway)?;
    let pool = parse("pool", &entry.pool)?;

    Ok(Some(GatewayPool { gateway, pool }))
}

/// Parse a boolean driver option. The options are nested in the generic
/// option map of the network and may be set as JSON bool or as string.
pub fn parse_option_flag(options: &HashMap<String, Value>, name: &str) -> FabricNetResult<bool> {
    let generic = match options.get(constants::OPTION_GENERIC) {
        None | Some(Value::Null) => return Ok(false),
        Some(Value::Object(generic)) => generic,
        Some(other) => {
            return Err(FabricNetError::InvalidOptions(format!(
                "{} must be a map, got {}",
                constants::OPTION_GENERIC,
                other
            )))
        }
    };

    match generic.get(name) {
        // if no option is set return the default value
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(val)) => Ok(*val),
        Some(Value::String(val)) => val.parse::<bool>().map_err(|err| {
            FabricNetError::InvalidOptions(format!("unable to parse \"{}\": {}", name, err))
        }),
        Some(other) => Err(FabricNetError::InvalidOptions(format!(
            "unable to parse \"{}\": unexpected value {}",
            name, other
        ))),
    }
}

/// Name of this host, used for workload identity and IPAM host affinity.
pub fn get_hostname() -> FabricNetResult<String> {
    let name = nix::unistd::gethostname()?;
    name.into_string()
        .map_err(|name| FabricNetError::msg(format!("hostname {:?} is not valid utf-8", name)))
}
