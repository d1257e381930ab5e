use crate::error::P0fSynError;
use crate::syn_process::LinkType;
use pcap_file::pcap::PcapReader;
use pcap_file::DataLink;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver};
use std::fs::File;
use std::path::Path;
use tracing::debug;

enum Source {
    Network(Box<dyn DataLinkReceiver>),
    Pcap(PcapReader<File>),
}

/// Frames from a live interface or from a pcap file.
pub struct FrameSource {
    source: Source,
    link: LinkType,
}

impl FrameSource {
    /// Opens `interface_name` in promiscuous mode.
    pub fn network(interface_name: &str) -> Result<Self, P0fSynError> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface_name)
            .ok_or_else(|| {
                P0fSynError::Misconfiguration(format!(
                    "Could not find network interface: {interface_name}"
                ))
            })?;

        debug!("Using network interface: {}", interface.name);

        let config = Config {
            promiscuous: true,
            ..Config::default()
        };

        let rx = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(P0fSynError::UnsupportedProtocol(
                    "Unhandled channel type".to_string(),
                ))
            }
            Err(e) => {
                return Err(P0fSynError::Misconfiguration(format!(
                    "Unable to create channel: {e}"
                )))
            }
        };

        Ok(Self {
            source: Source::Network(rx),
            link: LinkType::Ethernet,
        })
    }

    /// Opens a classic pcap file with an Ethernet or raw IP link layer.
    pub fn pcap<P: AsRef<Path>>(path: P) -> Result<Self, P0fSynError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = PcapReader::new(file).map_err(|e| {
            P0fSynError::Parse(format!(
                "Failed to create PCAP reader for {}: {e}",
                path.display()
            ))
        })?;

        let link = match reader.header().datalink {
            DataLink::ETHERNET => LinkType::Ethernet,
            DataLink::RAW | DataLink::IPV4 => LinkType::RawIp,
            other => {
                return Err(P0fSynError::UnsupportedProtocol(format!(
                    "unsupported pcap link type: {other:?}"
                )))
            }
        };

        debug!("Reading {} ({:?})", path.display(), link);

        Ok(Self {
            source: Source::Pcap(reader),
            link,
        })
    }

    pub fn link_type(&self) -> LinkType {
        self.link
    }

    /// Next frame, `None` once a pcap file is exhausted.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, P0fSynError>> {
        match &mut self.source {
            Source::Network(rx) => match rx.next() {
                Ok(frame) => Some(Ok(frame.to_vec())),
                Err(e) => Some(Err(P0fSynError::Io(e))),
            },
            Source::Pcap(reader) => match reader.next_packet() {
                Some(Ok(packet)) => Some(Ok(packet.data.to_vec())),
                Some(Err(e)) => Some(Err(P0fSynError::Parse(format!(
                    "Error reading PCAP packet: {e}"
                )))),
                None => None,
            },
        }
    }
}
