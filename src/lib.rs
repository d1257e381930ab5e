#![forbid(unsafe_code)]

pub mod db;
mod db_parse;
pub mod options;
pub mod signature;
pub mod tcp_options;

pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod metrics_server;
pub mod output;
pub mod packet;
pub mod parallel;
pub mod process;
pub mod sampling;
pub mod signature_matcher;
pub mod syn_process;

// Re-exports
pub use config::PipelineConfig;
pub use db::{Database, Entry};
pub use detect::{detect, SynDetector, UNKNOWN_LABEL};
pub use error::*;
pub use metrics::{DropReason, SynMetrics};
pub use output::*;
pub use packet::PacketMeta;
pub use process::{SynPipeline, Verdict};
pub use signature_matcher::SignatureMatcher;
pub use syn_process::{LinkType, SynPacket};

use crate::capture::FrameSource;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, error};

/// Passive SYN fingerprinting over a capture.
///
/// Combines a [`SynDetector`] with the [`SynPipeline`] that decides which SYNs
/// get classified and keeps the counters.
pub struct SynAnalyzer<'a> {
    detector: SynDetector<'a>,
    pipeline: SynPipeline,
}

impl<'a> SynAnalyzer<'a> {
    pub fn new(database: &'a Database, pipeline: SynPipeline) -> Self {
        Self {
            detector: SynDetector::new(database),
            pipeline,
        }
    }

    pub fn detector(&self) -> &SynDetector<'a> {
        &self.detector
    }

    /// Classifies the client SYN carried by `frame`, if any.
    ///
    /// `Ok(None)` covers every frame that produced no event: segments other than
    /// a client SYN and SYNs the pipeline filtered or dropped.
    pub fn process_frame(
        &self,
        frame: &[u8],
        link: LinkType,
    ) -> Result<Option<SynEvent>, P0fSynError> {
        let syn = match syn_process::process_frame(frame, link)? {
            Some(syn) => syn,
            None => return Ok(None),
        };

        match self.pipeline.process(&self.detector, syn, &mut rand::rng()) {
            Verdict::Classified(event) => Ok(Some(event)),
            Verdict::Filtered | Verdict::Dropped(_) => Ok(None),
        }
    }

    fn process_with<F>(
        &self,
        mut packet_fn: F,
        link: LinkType,
        sender: Sender<SynEvent>,
        cancel_signal: Option<Arc<AtomicBool>>,
    ) -> Result<(), P0fSynError>
    where
        F: FnMut() -> Option<Result<Vec<u8>, P0fSynError>>,
    {
        while let Some(packet_result) = packet_fn() {
            if let Some(ref cancel) = cancel_signal {
                if cancel.load(Ordering::Relaxed) {
                    debug!("Cancellation signal received, stopping packet processing");
                    break;
                }
            }

            match packet_result {
                Ok(packet) => match self.process_frame(&packet, link) {
                    Ok(Some(event)) => {
                        if sender.send(event).is_err() {
                            error!("Receiver dropped, stopping packet processing");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!("Error processing packet: {}", e);
                    }
                },
                Err(e) => {
                    error!("Failed to read packet: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Classifies SYNs captured live on `interface_name` until cancelled.
    pub fn analyze_network(
        &self,
        interface_name: &str,
        sender: Sender<SynEvent>,
        cancel_signal: Option<Arc<AtomicBool>>,
    ) -> Result<(), P0fSynError> {
        let mut source = FrameSource::network(interface_name)?;
        let link = source.link_type();
        self.process_with(move || source.next_frame(), link, sender, cancel_signal)
    }

    /// Classifies the SYNs of a pcap file.
    pub fn analyze_pcap<P: AsRef<Path>>(
        &self,
        pcap_path: P,
        sender: Sender<SynEvent>,
        cancel_signal: Option<Arc<AtomicBool>>,
    ) -> Result<(), P0fSynError> {
        let mut source = FrameSource::pcap(pcap_path)?;
        let link = source.link_type();
        self.process_with(move || source.next_frame(), link, sender, cancel_signal)
    }
}
