use crate::options::OptionTag;
use pnet::packet::tcp::TcpOptionNumbers::{EOL, MSS, NOP, SACK_PERMITTED, TIMESTAMPS, WSCALE};

/// Option layout and values decoded from a TCP options region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedOptions {
    pub olayout: Vec<OptionTag>,
    /// 0 when no well-formed MSS option was seen.
    pub mss: u16,
    /// 0 when no well-formed window scale option was seen.
    pub wscale: i32,
}

impl DecodedOptions {
    pub fn layout_strings(&self) -> Vec<String> {
        self.olayout.iter().map(|o| o.as_str().to_string()).collect()
    }
}

/// Walks the raw TCP options of a SYN.
///
/// The bytes come off the wire, so nothing about them is trusted: a missing
/// length byte, a length below 2 or a length running past the buffer ends the
/// walk and whatever was decoded so far is returned.
pub fn decode_options(buf: &[u8]) -> DecodedOptions {
    let mut decoded = DecodedOptions::default();
    let mut i = 0usize;

    while let Some(&kind) = buf.get(i) {
        match kind {
            k if k == EOL.0 => break,
            k if k == NOP.0 => {
                decoded.olayout.push(OptionTag::Nop);
                i += 1;
                continue;
            }
            _ => {}
        }

        let len = match buf.get(i + 1) {
            Some(&len) => len as usize,
            None => break,
        };
        if len < 2 {
            break;
        }
        let body = match buf.get(i + 2..i + len) {
            Some(body) => body,
            None => break,
        };

        match kind {
            k if k == MSS.0 => {
                if let [hi, lo] = body {
                    decoded.mss = u16::from_be_bytes([*hi, *lo]);
                    decoded.olayout.push(OptionTag::Mss);
                }
            }
            k if k == WSCALE.0 => {
                if let [shift] = body {
                    decoded.wscale = i32::from(*shift);
                }
                decoded.olayout.push(OptionTag::Ws);
            }
            k if k == SACK_PERMITTED.0 => {
                decoded.olayout.push(OptionTag::Sok);
            }
            k if k == TIMESTAMPS.0 => {
                if body.len() == 8 {
                    decoded.olayout.push(OptionTag::Ts);
                }
            }
            _ => {}
        }

        i += len;
    }

    decoded
}
