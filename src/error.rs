use thiserror::Error;

/// Error handling for signature database loading, frame extraction and the capture plumbing.
///
/// The detection core never returns this type: malformed signatures and truncated
/// TCP options are recovered from locally.
#[derive(Error, Debug)]
pub enum P0fSynError {
    /// The signature file, or a single signature string, could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The captured frame carries something other than IPv4/TCP.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The captured frame is truncated or its headers are inconsistent.
    #[error("Invalid package: {0}")]
    UnexpectedPackage(String),

    /// Pipeline or command line settings are invalid.
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
