use crate::common::address::Short;
use crate::utils::search_window::SearchWindow;
use thiserror::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be opened
    #[error("Failed to open transport: {0}")]
    TransportOpen(#[source] DynError),
    /// A forward frame was only partially written
    #[error("Short write: {written} of {expected} bytes")]
    TransportWrite { written: usize, expected: usize },
    #[error("Failed to write frame: {0}")]
    TransportWriteIo(#[source] std::io::Error),
    /// No backward frame within the response window
    #[error("No answer within response window")]
    TransportReadTimeout,
    #[error("Failed to read answer: {0}")]
    TransportRead(#[source] std::io::Error),
    #[error("Protocol invariant violated: {0}")]
    ProtocolInvariant(String),
    /// A device did not confirm the short address it was programmed with
    #[error("Device did not accept short address {short}")]
    AddressValidation { short: Short },
    /// A commissioning pass failed part way through.
    /// Retrying requires a new INITIALISE.
    #[error("Commissioning aborted after {assigned} devices, search window {window}: {source}")]
    Commissioning {
        assigned: usize,
        window: SearchWindow,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::TransportReadTimeout => true,
            Error::Commissioning { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::TransportOpen(_)
            | Error::TransportWrite { .. }
            | Error::TransportWriteIo(_)
            | Error::TransportReadTimeout
            | Error::TransportRead(_) => true,
            Error::Commissioning { source, .. } => source.is_transport_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
