use super::gear::SimGear;
use crate::drivers::codec::{self, BACKWARD_FRAME_LEN, IDLE};
use crate::drivers::transport::{DynFuture, Transport};
use futures::FutureExt;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;

/// One-shot faults for exercising error paths
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimFault {
    /// Next write fails
    WriteError,
    /// Next write only accepts part of the frame
    ShortWrite,
    /// Next read fails with something other than a timeout
    ReadError,
}

/// A bus populated with simulated gear.
///
/// Simultaneous answers are combined the way an open-drain line does it,
/// by AND-ing the backward frames together. Reading without a pending
/// answer times out immediately.
pub struct SimBus {
    gear: Vec<SimGear>,
    rng: StdRng,
    last_frame: Option<[u8; 2]>,
    pending: Vec<u8>,
    frames: Vec<[u8; 2]>,
    fault: Option<SimFault>,
    closed: bool,
}

impl SimBus {
    pub fn new(seed: u64) -> SimBus {
        SimBus {
            gear: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            last_frame: None,
            pending: Vec::new(),
            frames: Vec::new(),
            fault: None,
            closed: false,
        }
    }

    pub fn add_gear(&mut self, gear: SimGear) {
        self.gear.push(gear);
    }

    pub fn gear(&self) -> &[SimGear] {
        &self.gear
    }

    /// All forward frames seen so far
    pub fn frames(&self) -> &[[u8; 2]] {
        &self.frames
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    pub fn inject_fault(&mut self, fault: SimFault) {
        self.fault = Some(fault);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn forward(&mut self, frame: [u8; 2]) {
        // Configuration commands only take effect when received twice
        let twice = self.last_frame == Some(frame);
        self.last_frame = if twice { None } else { Some(frame) };
        self.frames.push(frame);
        let rng = &mut self.rng;
        let wired = self
            .gear
            .iter_mut()
            .filter_map(|g| g.forward16(frame, twice, &mut *rng))
            .map(codec::encode_backward)
            .reduce(|a, b| {
                let mut line = [IDLE; BACKWARD_FRAME_LEN];
                for (l, (a, b)) in line.iter_mut().zip(a.iter().zip(b.iter())) {
                    *l = a & b;
                }
                line
            });
        self.pending = wired.map(|w| w.to_vec()).unwrap_or_default();
    }

    fn write_frame(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "Bus closed"));
        }
        match self.fault.take() {
            Some(SimFault::WriteError) => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Simulated write error"))
            }
            Some(SimFault::ShortWrite) => return Ok(data.len() / 2),
            other => self.fault = other,
        }
        match codec::decode_forward(data) {
            Some(frame) => {
                debug!("Bus: {:02x} {:02x}", frame[0], frame[1]);
                self.forward(frame)
            }
            None => {
                warn!("Framing error on bus: {:02x?}", data);
                self.last_frame = None;
                self.pending.clear();
            }
        }
        Ok(data.len())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(SimFault::ReadError) = self.fault {
            self.fault = None;
            return Err(io::Error::new(io::ErrorKind::Other, "Simulated read error"));
        }
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "No answer"));
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Transport for SimBus {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> DynFuture<'a, io::Result<usize>> {
        let res = self.write_frame(data);
        async move { res }.boxed()
    }

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> DynFuture<'a, io::Result<usize>> {
        let res = self.read_frame(buf);
        async move { res }.boxed()
    }

    fn close(&mut self) -> DynFuture<'_, io::Result<()>> {
        self.closed = true;
        async { Ok(()) }.boxed()
    }
}
