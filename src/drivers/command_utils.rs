use super::codec::{self, Response, BACKWARD_FRAME_LEN, IDLE};
use super::transport::{BusTiming, Transport};
use crate::error::{Error, Result};
use crate::gear::cmd_defs::Command;
use log::debug;
use std::io;

/// Put exactly one forward frame on the bus. No retries.
pub async fn issue(transport: &mut dyn Transport, address: u8, command: u8) -> Result<()> {
    let frame = codec::encode_forward(address, command);
    debug!("Sending {:02x} {:02x}", address, command);
    let written = transport
        .write(&frame)
        .await
        .map_err(Error::TransportWriteIo)?;
    if written < frame.len() {
        return Err(Error::TransportWrite {
            written,
            expected: frame.len(),
        });
    }
    Ok(())
}

/// Read one backward frame and classify it.
///
/// Fails with [`Error::TransportReadTimeout`] if nothing at all arrives
/// within the response window. Bytes missing after a partial read are
/// treated as idle line.
pub async fn await_response(transport: &mut dyn Transport) -> Result<Response> {
    let mut buf = [IDLE; BACKWARD_FRAME_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        match transport.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) => return Err(Error::TransportRead(e)),
        }
    }
    if filled == 0 {
        return Err(Error::TransportReadTimeout);
    }
    debug!("Received {:02x?}", &buf[..filled]);
    Ok(codec::classify(&buf))
}

async fn settle(timing: &BusTiming) {
    if !timing.settle.is_zero() {
        tokio::time::sleep(timing.settle).await;
    }
}

/// Send a command followed by the settle delay. Commands that need to be
/// received twice are written as two frames.
pub async fn send<const TWICE: bool>(
    transport: &mut dyn Transport,
    timing: &BusTiming,
    cmd: Command<false, TWICE>,
) -> Result<()> {
    let repeat = if TWICE { 2 } else { 1 };
    for _ in 0..repeat {
        issue(transport, cmd.0[0], cmd.0[1]).await?;
        settle(timing).await;
    }
    Ok(())
}

/// Send a query and wait for the answer. A missing answer is a valid
/// outcome and is reported as [`Response::NoResponse`].
pub async fn query(
    transport: &mut dyn Transport,
    timing: &BusTiming,
    cmd: Command<true, false>,
) -> Result<Response> {
    issue(transport, cmd.0[0], cmd.0[1]).await?;
    settle(timing).await;
    match await_response(transport).await {
        Err(Error::TransportReadTimeout) => Ok(Response::NoResponse),
        res => res,
    }
}
