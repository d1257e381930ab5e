use crate::tcp_options::decode_options;
use serde::Serialize;

/// What the detector sees of one client SYN.
///
/// `options` are free-form tags as decoded from the wire; the matcher normalizes
/// them itself, so callers may pass layouts produced by other capture backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PacketMeta {
    pub ttl: i32,
    pub window: u16,
    /// 0 when absent.
    pub mss: u16,
    /// Values ≤ 0 mean the option was not observed.
    pub wscale: i32,
    pub options: Vec<String>,
    pub ecn: bool,
}

impl PacketMeta {
    /// Builds the metadata of a SYN from its header fields and raw options region.
    pub fn from_syn(ttl: u8, window: u16, options: &[u8], ecn: bool) -> Self {
        let decoded = decode_options(options);
        PacketMeta {
            ttl: i32::from(ttl),
            window,
            mss: decoded.mss,
            wscale: decoded.wscale,
            options: decoded.layout_strings(),
            ecn,
        }
    }
}
