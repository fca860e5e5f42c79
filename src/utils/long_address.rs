use crate::common::address::Long;
use crate::drivers::command_utils::send;
use crate::drivers::transport::{BusTiming, Transport};
use crate::error::Result;
use crate::gear::cmd_defs as cmd;

/// High, middle and low byte of a random address
pub fn search_bytes(addr: Long) -> [u8; 3] {
    [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
}

/// Load the search address into all enabled devices. All three bytes are
/// always sent, and must not be interleaved with other traffic.
pub async fn set_search_addr(
    transport: &mut dyn Transport,
    timing: &BusTiming,
    addr: Long,
) -> Result<()> {
    let [h, m, l] = search_bytes(addr);
    send(transport, timing, cmd::SEARCHADDRH(h)).await?;
    send(transport, timing, cmd::SEARCHADDRM(m)).await?;
    send(transport, timing, cmd::SEARCHADDRL(l)).await?;
    Ok(())
}
