pub mod codec;
pub mod command_utils;
pub mod transport;

#[cfg(feature = "serial")]
pub mod serial {
    #[allow(clippy::module_inception)]
    pub mod serial;
    pub use serial::SerialTransport;
}

#[cfg(any(test, feature = "simulator"))]
pub mod simulator {
    pub mod gear;
    pub mod simulator_bus;
    pub use gear::SimGear;
    pub use simulator_bus::{SimBus, SimFault};
    #[cfg(test)]
    mod test;
}

#[cfg(feature = "serial")]
/// Open a serial bus interface
pub fn open(
    port: &str,
    config: &transport::TransportConfig,
) -> Result<Box<dyn transport::Transport>, crate::error::Error> {
    Ok(Box::new(serial::SerialTransport::open(port, config)?))
}
