//Following module contains all the network constants

// network scope reported to the orchestrator, endpoints may live on any host
pub const SCOPE_GLOBAL: &str = "global";

// Interface naming
pub const DEFAULT_INTERFACE_PREFIX: &str = "fab";
pub const TEMP_INTERFACE_PREFIX: &str = "tmp";
pub const MAX_INTERFACE_PREFIX_LEN: usize = 4;
// number of endpoint id characters used in interface names
pub const ENDPOINT_ID_NAME_LEN: usize = 11;

// The MAC address of the interface in the container is arbitrary, so for
// simplicity a fixed MAC is used.
pub const DEFAULT_FIXED_MAC: &str = "EE:EE:EE:EE:EE:EE";

// Orchestrator and workload IDs used in our endpoint identification. Unique
// endpoint identification is provided by hostname and endpoint ID.
pub const DEFAULT_ORCHESTRATOR_ID: &str = "libnetwork";
pub const DEFAULT_WORKLOAD_ID: &str = "libnetwork";

// next hop handed to containers when the fabric owns IPv4 assignment
pub const DEFAULT_IPV4_NEXTHOP: &str = "169.254.1.1";

// static route type for a directly connected destination
pub const ROUTE_TYPE_CONNECTED: i32 = 1;

// Network options
pub const OPTION_GENERIC: &str = "com.docker.network.generic";
pub const OPTION_IPIP: &str = "ipip";
pub const OPTION_NAT_OUTGOING: &str = "nat-outgoing";
