use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use ipnet::IpNet;

pub fn next_ip(ip: &IpAddr) -> Option<IpAddr> {
    match ip {
        IpAddr::V4(ipv4) => {
            let ip = ipv4.octets();
            let ip_num = u32::from_be_bytes(ip);
            let (ip_num, overflow) = ip_num.overflowing_add(1);
            if overflow {
                return None;
            }
            Some(IpAddr::V4(Ipv4Addr::from(ip_num.to_be_bytes())))
        }
        IpAddr::V6(ipv6) => {
            let ip = ipv6.octets();
            let ip_num = u128::from_be_bytes(ip);
            let (ip_num, overflow) = ip_num.overflowing_add(1);
            if overflow {
                return None;
            }
            Some(IpAddr::V6(Ipv6Addr::from(ip_num.to_be_bytes())))
        }
    }
}

/// Iterate over every address of the subnet, including the network and
/// broadcast address since fabric workloads are routed as single hosts.
pub fn all_addresses(net: &IpNet) -> impl Iterator<Item = IpAddr> {
    let net = net.trunc();
    std::iter::successors(Some(net.network()), move |ip| {
        next_ip(ip).filter(|next| net.contains(next))
    })
}

/// Turn an address into a single host subnet, /32 for IPv4 and /128 for IPv6.
pub fn host_net(ip: IpAddr) -> IpNet {
    IpNet::from(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_ip() {
        let ip: IpAddr = "10.0.0.255".parse().unwrap();
        assert_eq!(next_ip(&ip), Some("10.0.1.0".parse().unwrap()));

        let ip: IpAddr = "255.255.255.255".parse().unwrap();
        assert_eq!(next_ip(&ip), None);

        let ip: IpAddr = "fd00::ffff".parse().unwrap();
        assert_eq!(next_ip(&ip), Some("fd00::1:0".parse().unwrap()));
    }

    #[test]
    fn test_all_addresses() {
        let net: IpNet = "10.1.2.5/30".parse().unwrap();
        let ips: Vec<IpAddr> = all_addresses(&net).collect();
        assert_eq!(
            ips,
            vec![
                "10.1.2.4".parse::<IpAddr>().unwrap(),
                "10.1.2.5".parse().unwrap(),
                "10.1.2.6".parse().unwrap(),
                "10.1.2.7".parse().unwrap(),
            ]
        );

        let net: IpNet = "fd00::/126".parse().unwrap();
        assert_eq!(all_addresses(&net).count(), 4);

        // the last subnet of the address space must terminate
        let net: IpNet = "255.255.255.254/31".parse().unwrap();
        assert_eq!(all_addresses(&net).count(), 2);
    }

    #[test]
    fn test_host_net() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(host_net(ip).to_string(), "10.0.0.5/32");
        let ip: IpAddr = "fd00::5".parse().unwrap();
        assert_eq!(host_net(ip).to_string(), "fd00::5/128");
    }
}
