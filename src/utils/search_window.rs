use crate::common::address::{Long, LONG_MAX};
use crate::drivers::codec::Response;
use crate::error::Error;

/// Upper bound for steps in a single binary search over 24 bits
pub const MAX_SEARCH_STEPS: u32 = 24;

/// Part of the random address space known to contain the next device.
///
/// No enabled device has a random address `<= low`, other than possibly
/// 0 while `low` is 0. While `high` is below the ceiling at least one
/// device has a random address `<= high`.
///
/// A converged window is ambiguous at the edges of the address space:
/// `[0, 1]` may hold a device at 0 or at 1, and a window left at the
/// ceiling may still hold a device at `LONG_MAX`. One extra COMPARE,
/// given by [`SearchWindow::boundary_check`], settles it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    low: Long,
    high: Long,
    steps: u32,
    boundary: Option<Response>,
}

impl Default for SearchWindow {
    fn default() -> Self {
        SearchWindow::new()
    }
}

impl SearchWindow {
    pub const fn new() -> SearchWindow {
        SearchWindow {
            low: 0,
            high: LONG_MAX,
            steps: 0,
            boundary: None,
        }
    }

    pub fn low(&self) -> Long {
        self.low
    }

    pub fn high(&self) -> Long {
        self.high
    }

    /// Steps taken since the window was last opened
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_converged(&self) -> bool {
        self.high - self.low <= 1
    }

    /// Search address for the next COMPARE
    pub fn candidate(&self) -> Long {
        (self.low + self.high) / 2
    }

    /// Narrow the window according to the answer to COMPARE with `candidate`
    /// as search address. Any answer means some device is at or below the
    /// candidate.
    pub fn narrow(&mut self, candidate: Long, response: Response) -> Result<(), Error> {
        if !(self.low < candidate && candidate < self.high) {
            return Err(Error::ProtocolInvariant(format!(
                "candidate {:06x} outside search window {}",
                candidate, self
            )));
        }
        if self.steps >= MAX_SEARCH_STEPS {
            return Err(Error::ProtocolInvariant(format!(
                "search window {} did not converge in {} steps",
                self, MAX_SEARCH_STEPS
            )));
        }
        self.steps += 1;
        match response {
            Response::Responded => self.high = candidate,
            Response::NoResponse => self.low = candidate,
        }
        Ok(())
    }

    /// Address to COMPARE against once converged, if the window is
    /// ambiguous and has not been checked yet
    pub fn boundary_check(&self) -> Option<Long> {
        if !self.is_converged() || self.boundary.is_some() {
            None
        } else if self.high == LONG_MAX {
            Some(LONG_MAX)
        } else if self.low == 0 {
            Some(0)
        } else {
            None
        }
    }

    /// Record the answer to the COMPARE asked for by `boundary_check`
    pub fn check(&mut self, addr: Long, response: Response) -> Result<(), Error> {
        if self.boundary_check() != Some(addr) {
            return Err(Error::ProtocolInvariant(format!(
                "unexpected boundary check {:06x} in search window {}",
                addr, self
            )));
        }
        self.boundary = Some(response);
        Ok(())
    }

    /// Random address of the device found by a converged search, if any.
    /// A search that never got an answer leaves `high` at the ceiling.
    pub fn isolated(&self) -> Option<Long> {
        if !self.is_converged() || self.boundary_check().is_some() {
            return None;
        }
        let at_boundary = self.boundary.map(|r| r.is_responded());
        if self.high == LONG_MAX {
            at_boundary.filter(|&r| r).map(|_| LONG_MAX)
        } else if at_boundary == Some(true) {
            Some(self.low)
        } else {
            Some(self.low + 1)
        }
    }

    /// Start searching for the next device. `low` is kept since devices
    /// found so far have been withdrawn.
    pub fn reopen(&mut self) {
        self.high = LONG_MAX;
        self.steps = 0;
        self.boundary = None;
    }
}

impl std::fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{:06x}, {:06x}]", self.low, self.high)
    }
}
