use crate::error::P0fSynError;
use crate::output::IpPort;
use ipnet::Ipv4Net;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// An IPv4 host or network, as given to `--src` / `--dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMatcher {
    Host(Ipv4Addr),
    Net(Ipv4Net),
}

impl AddrMatcher {
    pub fn matches(&self, ip: &IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V4(ip) => *ip,
            IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                Some(ip) => ip,
                None => return false,
            },
        };
        match self {
            AddrMatcher::Host(host) => *host == ip,
            AddrMatcher::Net(net) => net.contains(&ip),
        }
    }
}

impl FromStr for AddrMatcher {
    type Err = P0fSynError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('/') {
            return s
                .parse::<Ipv4Net>()
                .map(AddrMatcher::Net)
                .map_err(|e| P0fSynError::Misconfiguration(format!("invalid IPv4 network `{s}`: {e}")));
        }

        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => Ok(AddrMatcher::Host(ip)),
            Ok(IpAddr::V6(ip)) => ip.to_ipv4_mapped().map(AddrMatcher::Host).ok_or_else(|| {
                P0fSynError::Misconfiguration(format!("only IPv4 addresses are supported: `{s}`"))
            }),
            Err(e) => Err(P0fSynError::Misconfiguration(format!(
                "invalid IPv4 address `{s}`: {e}"
            ))),
        }
    }
}

impl fmt::Display for AddrMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrMatcher::Host(ip) => write!(f, "{ip}"),
            AddrMatcher::Net(net) => write!(f, "{net}"),
        }
    }
}

/// Drops SYNs by port and by excluded source or destination address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketFilter {
    /// Keep only SYNs to this port.
    pub dport: Option<u16>,
    /// Keep only SYNs from this port.
    pub sport: Option<u16>,
    pub exclude_src: Option<AddrMatcher>,
    pub exclude_dst: Option<AddrMatcher>,
}

impl PacketFilter {
    pub fn allows(&self, source: &IpPort, destination: &IpPort) -> bool {
        if self.exclude_src.is_some_and(|m| m.matches(&source.ip)) {
            return false;
        }
        if self.exclude_dst.is_some_and(|m| m.matches(&destination.ip)) {
            return false;
        }
        if self.dport.is_some_and(|port| port != destination.port) {
            return false;
        }
        if self.sport.is_some_and(|port| port != source.port) {
            return false;
        }
        true
    }
}
