// Request and response types of the IPAM driver.

use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IpamCapabilitiesResponse {
    #[serde(rename = "RequiresMACAddress")]
    pub requires_mac_address: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressSpacesResponse {
    #[serde(rename = "LocalDefaultAddressSpace")]
    pub local_default_address_space: String,

    #[serde(rename = "GlobalDefaultAddressSpace")]
    pub global_default_address_space: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestPoolRequest {
    #[serde(rename = "AddressSpace", default)]
    pub address_space: String,

    /// Pool in CIDR form, empty when the caller did not ask for a subnet.
    #[serde(rename = "Pool", default)]
    pub pool: String,

    #[serde(rename = "SubPool", default)]
    pub sub_pool: String,

    #[serde(rename = "Options", default)]
    pub options: HashMap<String, String>,

    #[serde(rename = "V6", default)]
    pub v6: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPoolResponse {
    #[serde(rename = "PoolID")]
    pub pool_id: String,

    #[serde(rename = "Pool")]
    pub pool: String,

    #[serde(rename = "Data")]
    pub data: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReleasePoolRequest {
    #[serde(rename = "PoolID")]
    pub pool_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestAddressRequest {
    #[serde(rename = "PoolID")]
    pub pool_id: String,

    /// Specific address to reserve, empty for auto assignment.
    #[serde(rename = "Address", default)]
    pub address: String,

    #[serde(rename = "Options", default)]
    pub options: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestAddressResponse {
    /// Assigned address in CIDR form with a full length mask.
    #[serde(rename = "Address")]
    pub address: String,

    #[serde(rename = "Data", default)]
    pub data: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReleaseAddressRequest {
    #[serde(rename = "PoolID", default)]
    pub pool_id: String,

    #[serde(rename = "Address")]
    pub address: String,
}
