use crate::common::address::{Address, Short};
use crate::drivers::codec::Response;
use crate::drivers::command_utils::{query, send};
use crate::drivers::transport::{BusTiming, Transport};
use crate::error::{Error, Result};
use crate::gear::cmd_defs as cmd;
use crate::utils::address_set::AddressSet;
use log::{debug, info, warn};

/// Query the status of one short address. A failure to read an answer
/// counts as no device.
async fn probe(transport: &mut dyn Transport, timing: &BusTiming, addr: Short) -> Result<Response> {
    match query(transport, timing, cmd::QUERY_STATUS(addr)).await {
        Err(Error::TransportRead(e)) => {
            warn!("No valid answer from {}: {}", addr, e);
            Ok(Response::NoResponse)
        }
        res => res,
    }
}

/// Find the short addresses that have a device bound to them.
///
/// The bus is switched off before probing and back on when done. Each
/// device found is flashed on and off once.
pub async fn scan(transport: &mut dyn Transport, timing: &BusTiming) -> Result<AddressSet> {
    info!("Scanning short addresses");
    send(transport, timing, cmd::OFF(Address::Broadcast)).await?;
    let mut found = AddressSet::new();
    for addr in Short::all() {
        if probe(transport, timing, addr).await?.is_responded() {
            debug!("Found device at {}", addr);
            send(transport, timing, cmd::RECALL_MAX_LEVEL(addr)).await?;
            send(transport, timing, cmd::OFF(addr)).await?;
            found += addr;
        }
    }
    send(transport, timing, cmd::RECALL_MAX_LEVEL(Address::Broadcast)).await?;
    info!("Found {} devices: {}", found.len(), found);
    Ok(found)
}
