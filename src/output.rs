use crate::packet::PacketMeta;
use serde::Serialize;
use std::fmt;
use std::fmt::Formatter;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPort {
    pub ip: IpAddr,
    pub port: u16,
}

impl IpPort {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

/// One classified client SYN, as emitted by the capture tool.
///
/// Serializes to the flat JSON line
/// `{"label":..,"ttl":..,"win":..,"mss":..,"options":[..],"ecn":..,"dport":..,"src_ip":..,"dst_ip":..,"src_port":..,"dst_port":..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynEvent {
    pub label: String,
    pub ttl: i32,
    pub win: u16,
    pub mss: u16,
    pub options: Vec<String>,
    pub ecn: bool,
    pub dport: u16,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl SynEvent {
    pub fn new(label: &str, meta: PacketMeta, source: IpPort, destination: IpPort) -> Self {
        SynEvent {
            label: label.to_string(),
            ttl: meta.ttl,
            win: meta.window,
            mss: meta.mss,
            options: meta.options,
            ecn: meta.ecn,
            dport: destination.port,
            src_ip: source.ip,
            dst_ip: destination.ip,
            src_port: source.port,
            dst_port: destination.port,
        }
    }

    pub fn source(&self) -> IpPort {
        IpPort::new(self.src_ip, self.src_port)
    }

    pub fn destination(&self) -> IpPort {
        IpPort::new(self.dst_ip, self.dst_port)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for SynEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ".-[ {}/{} -> {}/{} (syn) ]-\n\
            |\n\
            | client   = {}/{}\n\
            | os       = {}\n\
            | ttl      = {}\n\
            | win      = {}\n\
            | mss      = {}\n\
            | olayout  = {}\n\
            | ecn      = {}\n\
            `----\n",
            self.src_ip,
            self.src_port,
            self.dst_ip,
            self.dst_port,
            self.src_ip,
            self.src_port,
            self.label,
            self.ttl,
            self.win,
            self.mss,
            if self.options.is_empty() {
                "none".to_string()
            } else {
                self.options.join(",")
            },
            if self.ecn { "yes" } else { "no" },
        )
    }
}
