#![allow(dead_code)]

use p0f_syn::{Database, Entry, PacketMeta};

pub const SYN: u8 = 0x02;
pub const ACK: u8 = 0x10;
pub const ECE: u8 = 0x40;

/// mss 1460, sok, ts, nop, ws 7
pub const LINUX_OPTIONS: [u8; 20] = [
    0x02, 0x04, 0x05, 0xb4, 0x04, 0x02, 0x08, 0x0a, 0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x00,
    0x00, 0x01, 0x03, 0x03, 0x07,
];

/// mss 1460, nop, ws 8, nop, nop, sok
pub const WINDOWS_OPTIONS: [u8; 12] = [
    0x02, 0x04, 0x05, 0xb4, 0x01, 0x03, 0x03, 0x08, 0x01, 0x01, 0x04, 0x02,
];

pub fn load_db() -> Database {
    match Database::load_default() {
        Ok(db) => db,
        Err(e) => panic!("Failed to create default database: {e}"),
    }
}

pub fn tcp_request(label: &str, sigs: &[&str]) -> Entry {
    sigs.iter()
        .fold(Entry::new("tcp:request", label), |entry, sig| entry.with_sig(*sig))
}

pub fn meta(ttl: i32, window: u16, mss: u16, wscale: i32, options: &[&str]) -> PacketMeta {
    PacketMeta {
        ttl,
        window,
        mss,
        wscale,
        options: options.iter().map(|o| o.to_string()).collect(),
        ecn: false,
    }
}

pub fn linux_meta() -> PacketMeta {
    meta(57, 29200, 1460, 7, &["mss", "sok", "ts", "nop", "ws"])
}

pub fn windows_meta() -> PacketMeta {
    meta(113, 64240, 1460, 8, &["mss", "nop", "ws", "nop", "nop", "sok"])
}

#[derive(Clone, Debug)]
pub struct TcpSegment {
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub sport: u16,
    pub dport: u16,
    pub ttl: u8,
    pub window: u16,
    pub flags: u8,
    pub options: Vec<u8>,
}

impl TcpSegment {
    pub fn syn(options: &[u8]) -> Self {
        TcpSegment {
            src: [192, 168, 1, 20],
            dst: [10, 0, 0, 1],
            sport: 51234,
            dport: 443,
            ttl: 57,
            window: 29200,
            flags: SYN,
            options: options.to_vec(),
        }
    }

    /// Bare IPv4 packet. Options are padded with EOL to a 4 byte boundary.
    pub fn ipv4(&self) -> Vec<u8> {
        let mut options = self.options.clone();
        while options.len() % 4 != 0 {
            options.push(0);
        }
        let tcp_len = 20 + options.len();
        let total_len = (20 + tcp_len) as u16;

        let mut packet = vec![
            0x45, 0x00, // version 4, IHL 5, TOS
        ];
        packet.extend_from_slice(&total_len.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x00, 0x40, 0x00]); // id, DF
        packet.push(self.ttl);
        packet.push(0x06); // TCP
        packet.extend_from_slice(&[0x00, 0x00]); // checksum
        packet.extend_from_slice(&self.src);
        packet.extend_from_slice(&self.dst);

        packet.extend_from_slice(&self.sport.to_be_bytes());
        packet.extend_from_slice(&self.dport.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x00, 0x10, 0x00]); // seq
        packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // ack
        packet.push(((tcp_len / 4) as u8) << 4);
        packet.push(self.flags);
        packet.extend_from_slice(&self.window.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // checksum, urg
        packet.extend_from_slice(&options);
        packet
    }

    pub fn ethernet(&self) -> Vec<u8> {
        ethernet_frame(0x0800, &self.ipv4())
    }

    pub fn vlan(&self) -> Vec<u8> {
        let mut payload = vec![0x00, 0x64, 0x08, 0x00]; // VLAN 100, IPv4
        payload.extend_from_slice(&self.ipv4());
        ethernet_frame(0x8100, &payload)
    }
}

pub fn ethernet_frame(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // dst mac
        0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, // src mac
    ];
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
