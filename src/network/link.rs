use std::net::Ipv6Addr;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{FabricNetError, FabricNetResult};
use crate::exec;

/// Manipulation of host network interfaces.
pub trait LinkOps: Send + Sync {
    /// Create a veth pair and bring the host end up.
    fn create_veth(&self, host: &str, peer: &str) -> FabricNetResult<()>;
    fn set_mac(&self, name: &str, mac: &str) -> FabricNetResult<()>;
    fn set_up(&self, name: &str) -> FabricNetResult<()>;
    fn exists(&self, name: &str) -> FabricNetResult<bool>;
    /// Delete the interface, returns false if it did not exist.
    fn delete(&self, name: &str) -> FabricNetResult<bool>;
    /// IPv6 addresses currently assigned to the interface.
    fn ipv6_addresses(&self, name: &str) -> FabricNetResult<Vec<Ipv6Addr>>;
}

/// LinkOps implementation which runs the ip binary.
pub struct IpCommand {
    binary: String,
    timeout: Duration,
}

impl IpCommand {
    pub fn new(binary: &str, timeout: Duration) -> Self {
        IpCommand {
            binary: binary.to_string(),
            timeout,
        }
    }

    fn ip(&self, args: &[&str]) -> FabricNetResult<String> {
        exec::run(&self.binary, args, self.timeout)
    }
}

impl LinkOps for IpCommand {
    fn create_veth(&self, host: &str, peer: &str) -> FabricNetResult<()> {
        self.ip(&["link", "add", host, "type", "veth", "peer", "name", peer])?;
        info!("created veth pair {} <-> {}", host, peer);
        if let Err(err) = self.set_up(host) {
            // deleting one end removes the pair
            if let Err(del_err) = self.ip(&["link", "del", host]) {
                warn!("failed to remove veth {}: {}", host, del_err);
            }
            return Err(err);
        }
        Ok(())
    }

    fn set_mac(&self, name: &str, mac: &str) -> FabricNetResult<()> {
        self.ip(&["link", "set", "dev", name, "address", mac])?;
        debug!("set mac {} on {}", mac, name);
        Ok(())
    }

    fn set_up(&self, name: &str) -> FabricNetResult<()> {
        self.ip(&["link", "set", name, "up"])?;
        Ok(())
    }

    fn exists(&self, name: &str) -> FabricNetResult<bool> {
        match self.ip(&["link", "show", name]) {
            Ok(_) => Ok(true),
            Err(FabricNetError::CommandFailed { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn delete(&self, name: &str) -> FabricNetResult<bool> {
        if !self.exists(name)? {
            debug!("interface {} already removed", name);
            return Ok(false);
        }
        self.ip(&["link", "del", name])?;
        info!("removed interface {}", name);
        Ok(true)
    }

    fn ipv6_addresses(&self, name: &str) -> FabricNetResult<Vec<Ipv6Addr>> {
        let out = self.ip(&["-6", "addr", "show", "dev", name])?;
        Ok(parse_ipv6_addresses(&out))
    }
}

/// Extract the addresses from `ip -6 addr show` output, lines look like
/// `inet6 fe80::ecee:eeff:feee:eeee/64 scope link`.
pub fn parse_ipv6_addresses(output: &str) -> Vec<Ipv6Addr> {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            match words.next() {
                Some("inet6") => words.next(),
                _ => None,
            }
        })
        .filter_map(|addr| addr.split('/').next())
        .filter_map(|addr| addr.parse().ok())
        .collect()
}

/// First link local address, fe80::/10.
pub fn first_link_local(addrs: &[Ipv6Addr]) -> Option<Ipv6Addr> {
    addrs
        .iter()
        .find(|addr| (addr.segments()[0] & 0xffc0) == 0xfe80)
        .copied()
}
