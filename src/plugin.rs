//! Request surface of the plugin: maps remote driver method names to the
//! network and IPAM driver operations.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    error::{FabricNetError, FabricNetResult},
    ipam::IpamDriver,
    network::NetworkDriver,
};

pub const IMPLEMENTS_NETWORK_DRIVER: &str = "NetworkDriver";
pub const IMPLEMENTS_IPAM_DRIVER: &str = "IpamDriver";

/// Response of the handshake call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateResponse {
    #[serde(rename = "Implements")]
    pub implements: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EmptyResponse {}

/// Decode the request body, an empty body is the default request.
fn parse_request<T>(method: &str, body: &str) -> FabricNetResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body)
        .map_err(|e| FabricNetError::wrap(format!("decode {} request", method), e.into()))
}

fn respond<T: Serialize>(method: &str, resp: &T) -> FabricNetResult<String> {
    let out = serde_json::to_string(resp)?;
    debug!("{} response JSON={}", method, out);
    Ok(out)
}

pub struct Plugin {
    network: NetworkDriver,
    ipam: IpamDriver,
}

impl Plugin {
    pub fn new(network: NetworkDriver, ipam: IpamDriver) -> Self {
        Plugin { network, ipam }
    }

    /// Handle one request and return the response body.
    pub fn dispatch(&self, method: &str, body: &str) -> FabricNetResult<String> {
        debug!("{} JSON={}", method, body.trim());
        let empty = EmptyResponse::default();

        match method {
            "Plugin.Activate" => respond(
                method,
                &ActivateResponse {
                    implements: vec![
                        IMPLEMENTS_NETWORK_DRIVER.to_string(),
                        IMPLEMENTS_IPAM_DRIVER.to_string(),
                    ],
                },
            ),

            "NetworkDriver.GetCapabilities" => {
                respond(method, &self.network.get_capabilities())
            }
            "NetworkDriver.CreateNetwork" => {
                self.network.create_network(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.DeleteNetwork" => {
                self.network.delete_network(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.CreateEndpoint" => respond(
                method,
                &self.network.create_endpoint(&parse_request(method, body)?)?,
            ),
            "NetworkDriver.DeleteEndpoint" => {
                self.network.delete_endpoint(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.EndpointOperInfo" => respond(
                method,
                &self.network.endpoint_info(&parse_request(method, body)?)?,
            ),
            "NetworkDriver.Join" => {
                respond(method, &self.network.join(&parse_request(method, body)?)?)
            }
            "NetworkDriver.Leave" => {
                self.network.leave(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.DiscoverNew" => {
                self.network.discover_new(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.DiscoverDelete" => {
                self.network.discover_delete(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.ProgramExternalConnectivity" => {
                self.network.program_external_connectivity(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "NetworkDriver.RevokeExternalConnectivity" => {
                self.network.revoke_external_connectivity(&parse_request(method, body)?)?;
                respond(method, &empty)
            }

            "IpamDriver.GetCapabilities" => respond(method, &self.ipam.get_capabilities()),
            "IpamDriver.GetDefaultAddressSpaces" => {
                respond(method, &self.ipam.get_default_address_spaces())
            }
            "IpamDriver.RequestPool" => respond(
                method,
                &self.ipam.request_pool(&parse_request(method, body)?)?,
            ),
            "IpamDriver.ReleasePool" => {
                self.ipam.release_pool(&parse_request(method, body)?)?;
                respond(method, &empty)
            }
            "IpamDriver.RequestAddress" => respond(
                method,
                &self.ipam.request_address(&parse_request(method, body)?)?,
            ),
            "IpamDriver.ReleaseAddress" => {
                self.ipam.release_address(&parse_request(method, body)?)?;
                respond(method, &empty)
            }

            unknown => Err(FabricNetError::msg(format!("unknown method {}", unknown))),
        }
    }
}
