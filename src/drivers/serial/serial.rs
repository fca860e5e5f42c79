use crate::drivers::transport::{DynFuture, Parity, Transport, TransportConfig};
use crate::error::Error;
use futures::FutureExt;
use log::{debug, info};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{DataBits, SerialStream, StopBits};

fn data_bits(bits: u8) -> Result<DataBits, Error> {
    Ok(match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        _ => {
            return Err(Error::TransportOpen(
                format!("data_bits has invalid value {}", bits).into(),
            ))
        }
    })
}

fn stop_bits(bits: u8) -> Result<StopBits, Error> {
    Ok(match bits {
        1 => StopBits::One,
        2 => StopBits::Two,
        _ => {
            return Err(Error::TransportOpen(
                format!("stop_bits has invalid value {}", bits).into(),
            ))
        }
    })
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

/// Bus interface on a serial port
pub struct SerialTransport {
    serial: SerialStream,
    timeout: Duration,
}

impl SerialTransport {
    pub fn open(port: &str, config: &TransportConfig) -> Result<SerialTransport, Error> {
        info!("Opening {} {:?}", port, config);
        let builder = tokio_serial::new(port, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .stop_bits(stop_bits(config.stop_bits)?)
            .parity(parity(config.parity))
            .timeout(config.timeout);
        let serial =
            SerialStream::open(&builder).map_err(|e| Error::TransportOpen(Box::new(e)))?;
        Ok(SerialTransport {
            serial,
            timeout: config.timeout,
        })
    }
}

impl Transport for SerialTransport {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> DynFuture<'a, io::Result<usize>> {
        async move {
            self.serial.write_all(data).await?;
            Ok(data.len())
        }
        .boxed()
    }

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> DynFuture<'a, io::Result<usize>> {
        async move {
            match timeout(self.timeout, self.serial.read(buf)).await {
                Ok(r) => r,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "No data within response window",
                )),
            }
        }
        .boxed()
    }

    fn close(&mut self) -> DynFuture<'_, io::Result<()>> {
        async move {
            self.serial.flush().await?;
            self.serial.shutdown().await?;
            debug!("Serial port closed");
            Ok(())
        }
        .boxed()
    }
}
