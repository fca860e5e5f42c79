//! Bit level framing of forward and backward frames.
//!
//! Every logical bit is sent as two physical bits so that the receiver can
//! recover the bit clock from the mid-bit transition. Physical bits are
//! packed MSB first, logical bits are walked MSB first. Bits after the last
//! data bit are left idle (high), which also forms the stop condition.

/// Idle line, eight physical bits
pub const IDLE: u8 = 0xff;

/// Start condition, leaves idle-high
const START: u8 = 0b01;
/// High-to-low transition
const ONE: u8 = 0b10;
/// Low-to-high transition
const ZERO: u8 = 0b01;

/// 2 start + 2 * 16 data + 4 stop bits, padded to whole bytes
pub const FORWARD_FRAME_LEN: usize = 5;
/// 2 start + 2 * 8 data + 4 stop bits, padded to whole bytes
pub const BACKWARD_FRAME_LEN: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Response {
    NoResponse,
    Responded,
}

impl Response {
    pub fn is_responded(&self) -> bool {
        matches!(self, Response::Responded)
    }
}

fn put_symbol(buf: &mut [u8], pos: usize, symbol: u8) {
    // Both physical bits of a symbol always land in the same byte
    let shift = 6 - (pos % 8);
    let byte = &mut buf[pos / 8];
    *byte = (*byte & !(0b11 << shift)) | (symbol << shift);
}

fn get_symbol(buf: &[u8], pos: usize) -> u8 {
    let shift = 6 - (pos % 8);
    (buf[pos / 8] >> shift) & 0b11
}

fn encode<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut buf = [IDLE; N];
    put_symbol(&mut buf, 0, START);
    let mut pos = 2;
    for &byte in data {
        for bit in (0..8u32).rev() {
            put_symbol(&mut buf, pos, if (byte >> bit) & 1 != 0 { ONE } else { ZERO });
            pos += 2;
        }
    }
    buf
}

fn decode<const D: usize>(buf: &[u8]) -> Option<[u8; D]> {
    if buf.len() * 8 < 2 + D * 16 || get_symbol(buf, 0) != START {
        return None;
    }
    let mut data = [0u8; D];
    let mut pos = 2;
    for byte in data.iter_mut() {
        for _ in 0..8 {
            *byte = (*byte << 1)
                | match get_symbol(buf, pos) {
                    ONE => 1,
                    ZERO => 0,
                    _ => return None,
                };
            pos += 2;
        }
    }
    Some(data)
}

/// Encode a forward frame. Never fails and the length is always the same.
pub fn encode_forward(address: u8, command: u8) -> [u8; FORWARD_FRAME_LEN] {
    encode(&[address, command])
}

pub fn encode_backward(answer: u8) -> [u8; BACKWARD_FRAME_LEN] {
    encode(&[answer])
}

/// Returns address and command bytes, or `None` on a framing error
pub fn decode_forward(buf: &[u8]) -> Option<[u8; 2]> {
    decode(buf)
}

/// Returns the answer byte, or `None` on a framing error. Several devices
/// answering different values at the same time shows up as a framing
/// error since the line is the logical AND of all drivers.
pub fn decode_backward(buf: &[u8]) -> Option<u8> {
    decode::<1>(buf).map(|d| d[0])
}

/// Any deviation from an idle line means that at least one device pulled
/// the line low.
pub fn classify(raw: &[u8]) -> Response {
    if raw.iter().all(|&b| b == IDLE) {
        Response::NoResponse
    } else {
        Response::Responded
    }
}
