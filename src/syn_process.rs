use crate::error::P0fSynError;
use crate::output::IpPort;
use crate::packet::PacketMeta;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::{TcpFlags, TcpPacket};
use pnet::packet::vlan::VlanPacket;
use pnet::packet::Packet;
use std::net::IpAddr;

/// Link layer of the captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Ethernet II, optionally 802.1Q tagged.
    Ethernet,
    /// Bare IP packets, no link header.
    RawIp,
}

/// Addresses and fingerprint inputs of one client SYN.
#[derive(Debug, Clone, PartialEq)]
pub struct SynPacket {
    pub source: IpPort,
    pub destination: IpPort,
    pub meta: PacketMeta,
}

/// SYN without ACK: the first packet of a client handshake.
pub fn from_client(tcp_flags: u8) -> bool {
    use TcpFlags::*;
    tcp_flags & SYN != 0 && tcp_flags & ACK == 0
}

/// Extracts the client SYN carried by a frame.
///
/// `Ok(None)` means a well formed TCP segment that is not a client SYN.
pub fn process_frame(frame: &[u8], link: LinkType) -> Result<Option<SynPacket>, P0fSynError> {
    match link {
        LinkType::Ethernet => EthernetPacket::new(frame)
            .ok_or_else(|| P0fSynError::UnexpectedPackage("ethernet packet too short".to_string()))
            .and_then(|packet| visit_ethernet(packet.get_ethertype(), packet.payload())),
        LinkType::RawIp => process_ipv4(frame),
    }
}

fn visit_ethernet(ethertype: EtherType, payload: &[u8]) -> Result<Option<SynPacket>, P0fSynError> {
    match ethertype {
        EtherTypes::Vlan => VlanPacket::new(payload)
            .ok_or_else(|| P0fSynError::UnexpectedPackage("vlan packet too short".to_string()))
            .and_then(|vlan| visit_ethernet(vlan.get_ethertype(), vlan.payload())),

        EtherTypes::Ipv4 => process_ipv4(payload),

        ty => Err(P0fSynError::UnsupportedProtocol(format!(
            "unsupported ethernet type: {ty}"
        ))),
    }
}

/// Extracts the client SYN from a bare IPv4 packet.
pub fn process_ipv4(payload: &[u8]) -> Result<Option<SynPacket>, P0fSynError> {
    let ipv4 = Ipv4Packet::new(payload)
        .ok_or_else(|| P0fSynError::UnexpectedPackage("ipv4 packet too short".to_string()))?;

    if ipv4.get_version() != 4 {
        return Err(P0fSynError::UnsupportedProtocol(format!(
            "unsupported IP version: {}",
            ipv4.get_version()
        )));
    }

    let header_len = usize::from(ipv4.get_header_length()) * 4;
    if header_len < Ipv4Packet::minimum_packet_size() || header_len > payload.len() {
        return Err(P0fSynError::UnexpectedPackage(format!(
            "invalid IPv4 header length: {header_len}"
        )));
    }

    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return Err(P0fSynError::UnsupportedProtocol(format!(
            "unsupported IPv4 packet with non-TCP payload: {}",
            ipv4.get_next_level_protocol()
        )));
    }

    let segment = payload.get(header_len..).unwrap_or_default();
    let tcp = TcpPacket::new(segment)
        .ok_or_else(|| P0fSynError::UnexpectedPackage("tcp packet too short".to_string()))?;

    let data_offset = usize::from(tcp.get_data_offset()) * 4;
    let options = segment
        .get(TcpPacket::minimum_packet_size()..data_offset)
        .ok_or_else(|| {
            P0fSynError::UnexpectedPackage(format!("invalid TCP data offset: {data_offset}"))
        })?;

    let flags = tcp.get_flags();
    if !from_client(flags) {
        return Ok(None);
    }

    let meta = PacketMeta::from_syn(
        ipv4.get_ttl(),
        tcp.get_window(),
        options,
        flags & TcpFlags::ECE != 0,
    );

    Ok(Some(SynPacket {
        source: IpPort::new(IpAddr::V4(ipv4.get_source()), tcp.get_source()),
        destination: IpPort::new(IpAddr::V4(ipv4.get_destination()), tcp.get_destination()),
        meta,
    }))
}
