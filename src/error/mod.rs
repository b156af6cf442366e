use std::error::Error;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::network::types::IpFamily;

pub type FabricNetResult<T> = Result<T, FabricNetError>;

/// wrap any result into a FabricNetError and add the given msg
#[macro_export]
macro_rules! wrap {
    ($result:expr, $msg:expr) => {
        $result.map_err(|err| $crate::error::FabricNetError::wrap($msg, err.into()))
    };
}

/// Contains a list of errors, this is useful for teardown operations since we
/// should cleanup as much as possible before return all encountered errors.
#[derive(Debug)]
pub struct FabricNetErrorList(Vec<FabricNetError>);

impl FabricNetErrorList {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn push(&mut self, err: FabricNetError) {
        match err {
            // make sure the flatten the error list, nested lists would just look ugly
            FabricNetError::List(mut list) => self.0.append(&mut list.0),
            err => self.0.push(err),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Turn the list into a result, Ok(()) when no error was collected.
    pub fn into_result(self) -> FabricNetResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FabricNetError::List(self))
        }
    }
}

// clippy wants the default implementation even if it is not needed
impl Default for FabricNetErrorList {
    fn default() -> Self {
        Self::new()
    }
}

pub trait ErrorWrap<T> {
    /// wrap FabricNetResult error into a FabricNetError and add the given msg
    fn wrap<S>(self, msg: S) -> FabricNetResult<T>
    where
        S: Into<String>;
}

impl<T> ErrorWrap<T> for FabricNetResult<T> {
    fn wrap<S>(self, msg: S) -> FabricNetResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|err| FabricNetError::wrap(msg, err))
    }
}

/// The main fabricnet error type
#[derive(Debug)]
pub enum FabricNetError {
    // A string message
    Message(String),
    // A chain of multiple errors
    Chain(String, Box<FabricNetError>),

    Io(std::io::Error),
    Serde(serde_json::Error),
    Nix(nix::Error),

    /// interface prefix longer than the allowed bound
    InvalidPrefix(String),
    /// more than one gateway/pool pair was given for one address family
    MultipleGatewaysUnsupported(IpFamily),
    SubPoolUnsupported,
    /// malformed network option flag, the string names the option
    InvalidOptions(String),
    /// gateway or pool which is no network of its address family
    InvalidIpamData(String),
    NoAddressAssigned,

    /// the requested pool does not match a configured pool
    UnknownPool(String),
    /// the network references a pool which no longer exists
    PoolDeleted(String),
    /// an existing fabric pool with this CIDR is open to auto assignment
    PoolConflict(String),
    NetworkNotFound(String),
    NetworkMetadataMissing(String),
    EndpointNotFound(String),

    PoolExhausted(IpFamily),
    UnexpectedAllocationCount(usize),
    AddressInUse { ip: IpAddr, holder: String },

    /// veth setup for the given host interface failed
    VethSetupFailed(String, Box<FabricNetError>),
    CommandTimeout { command: String, timeout: Duration },
    /// command exited with a non zero status
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// object lookup or delete on a missing key
    NotFound(String),
    /// exclusive create on an existing key
    AlreadyExists(String),

    List(FabricNetErrorList),
}

/// Error shape understood by remote driver callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonError {
    #[serde(rename = "Err")]
    pub error: String,
}

impl FabricNetError {
    pub fn msg<S>(msg: S) -> FabricNetError
    where
        S: Into<String>,
    {
        FabricNetError::Message(msg.into())
    }

    pub fn wrap<S>(msg: S, chained: FabricNetError) -> FabricNetError
    where
        S: Into<String>,
    {
        FabricNetError::Chain(msg.into(), Box::new(chained))
    }

    /// Serialize the error into the JSON error shape.
    pub fn to_json(&self) -> String {
        let to_json = JsonError {
            error: self.to_string(),
        };
        serde_json::to_string(&to_json).unwrap_or(format!(
            "Failed to serialize error message: {}",
            to_json.error
        ))
    }

    /// Print the error in the standardized JSON format.
    pub fn print_json(&self) {
        println!("{}", self.to_json());
    }

    /// unwrap the chain error recursively until we a non chain type error
    pub fn unwrap(&self) -> &FabricNetError {
        match self {
            FabricNetError::Chain(_, inner) => inner.unwrap(),
            _ => self,
        }
    }

    /// true when the root cause is a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.unwrap(),
            FabricNetError::NotFound(_) | FabricNetError::EndpointNotFound(_)
        )
    }

    /// true when the root cause is an exclusive create on an existing object
    pub fn is_already_exists(&self) -> bool {
        matches!(self.unwrap(), FabricNetError::AlreadyExists(_))
    }
}

impl fmt::Display for FabricNetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FabricNetError::Message(s) => write!(f, "{}", s),
            FabricNetError::Chain(s, e) => write!(f, "{}: {}", s, e),
            FabricNetError::Io(e) => write!(f, "IO error: {}", e),
            FabricNetError::Serde(e) => write!(f, "JSON Decoding error: {}", e),
            FabricNetError::Nix(e) => write!(f, "nix error: {}", e),
            FabricNetError::InvalidPrefix(p) => {
                write!(f, "interface prefix {:?} must be 4 characters or less", p)
            }
            FabricNetError::MultipleGatewaysUnsupported(family) => {
                write!(f, "unsupported: multiple gateways defined for {}", family)
            }
            FabricNetError::SubPoolUnsupported => write!(
                f,
                "sub pool configuration is not supported, addresses are assigned \
                 from the pre-configured fabric pools"
            ),
            FabricNetError::InvalidOptions(s) => write!(f, "invalid network options: {}", s),
            FabricNetError::InvalidIpamData(s) => write!(f, "invalid IPAM data: {}", s),
            FabricNetError::NoAddressAssigned => write!(f, "no address assigned for endpoint"),
            FabricNetError::UnknownPool(p) => write!(
                f,
                "the requested subnet {} must match the CIDR of a configured fabric pool",
                p
            ),
            FabricNetError::PoolDeleted(p) => write!(
                f,
                "the network references fabric pool {} which has been deleted, \
                 re-instate the pool before using the network",
                p
            ),
            FabricNetError::PoolConflict(p) => write!(
                f,
                "fabric pool {} is used for auto assignment and cannot back a network \
                 with its own IPAM driver, disable the pool first",
                p
            ),
            FabricNetError::NetworkNotFound(id) => write!(f, "network {} not found", id),
            FabricNetError::NetworkMetadataMissing(id) => {
                write!(f, "no metadata stored for network {}", id)
            }
            FabricNetError::EndpointNotFound(id) => write!(f, "endpoint {} not found", id),
            FabricNetError::PoolExhausted(family) => write!(
                f,
                "there are no available {} addresses in the configured fabric pools",
                family
            ),
            FabricNetError::UnexpectedAllocationCount(n) => {
                write!(f, "unexpected number of assigned IP addresses: {}", n)
            }
            FabricNetError::AddressInUse { ip, holder } => {
                write!(f, "address {} is already assigned to host {}", ip, holder)
            }
            FabricNetError::VethSetupFailed(name, e) => {
                write!(f, "veth setup for {} failed: {}", name, e)
            }
            FabricNetError::CommandTimeout { command, timeout } => write!(
                f,
                "command [{}] killed after timeout of {}s",
                command,
                timeout.as_secs()
            ),
            FabricNetError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                match code {
                    Some(code) => {
                        write!(f, "command [{}] failed with exit code {}", command, code)?
                    }
                    None => write!(f, "command [{}] terminated by signal", command)?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            FabricNetError::NotFound(key) => write!(f, "{} not found", key),
            FabricNetError::AlreadyExists(key) => write!(f, "{} already exists", key),
            FabricNetError::List(list) => {
                if list.0.len() == 1 {
                    write!(f, "{}", list.0[0])
                } else {
                    write!(f, "fabricnet encountered multiple errors:")?;
                    for e in &list.0 {
                        write!(f, "\n\t- {}", e)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl Error for FabricNetError {}

impl From<std::io::Error> for FabricNetError {
    fn from(err: std::io::Error) -> FabricNetError {
        FabricNetError::Io(err)
    }
}

impl From<serde_json::Error> for FabricNetError {
    fn from(err: serde_json::Error) -> FabricNetError {
        FabricNetError::Serde(err)
    }
}

impl From<nix::Error> for FabricNetError {
    fn from(err: nix::Error) -> FabricNetError {
        FabricNetError::Nix(err)
    }
}

impl From<ipnet::AddrParseError> for FabricNetError {
    fn from(e: ipnet::AddrParseError) -> Self {
        FabricNetError::Message(format!("{}", e))
    }
}

impl From<std::net::AddrParseError> for FabricNetError {
    fn from(e: std::net::AddrParseError) -> Self {
        FabricNetError::Message(format!("{}", e))
    }
}

impl From<ipnet::PrefixLenError> for FabricNetError {
    fn from(e: ipnet::PrefixLenError) -> Self {
        FabricNetError::Message(format!("{}", e))
    }
}
