use serde_derive::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

pub type DynFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Byte oriented connection to the bus interface.
///
/// `read` must give up with an error of kind [`io::ErrorKind::TimedOut`]
/// when nothing arrives within the configured response window.
pub trait Transport: Send {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> DynFuture<'a, io::Result<usize>>;

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> DynFuture<'a, io::Result<usize>>;

    fn close(&mut self) -> DynFuture<'_, io::Result<()>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Line settings used when opening a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Upper bound for a single read
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            baud_rate: 1200,
            data_bits: 8,
            stop_bits: 2,
            parity: Parity::None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Pacing of bus traffic
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusTiming {
    /// Quiet period after every forward frame
    pub settle: Duration,
}

impl BusTiming {
    /// No pacing at all, for simulated buses
    pub const fn immediate() -> Self {
        BusTiming {
            settle: Duration::ZERO,
        }
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        BusTiming {
            settle: Duration::from_millis(10),
        }
    }
}
