use crate::common::address::{Address, Long, Short};
use crate::drivers::command_utils::{query, send};
use crate::drivers::transport::{BusTiming, Transport};
use crate::error::{Error, Result};
use crate::gear::cmd_defs as cmd;
use crate::utils::address_set::AddressSet;
use crate::utils::long_address::set_search_addr;
use crate::utils::search_window::SearchWindow;
use log::{debug, info, warn};

/// Devices taking part in a commissioning pass
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every device, bound or not. Existing short addresses are replaced.
    All,
    /// Only devices without a short address
    Unaddressed,
}

/// A device that was given a short address
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Commissioned {
    pub short: Short,
    pub long: Long,
}

/// State of one commissioning run
struct Session {
    window: SearchWindow,
    // Short addresses that may not be handed out
    taken: AddressSet,
    assigned: Vec<Commissioned>,
}

impl Session {
    fn new(occupied: AddressSet) -> Session {
        Session {
            window: SearchWindow::new(),
            taken: occupied,
            assigned: Vec::new(),
        }
    }

    fn next_short(&self) -> Option<Short> {
        self.taken.first_free()
    }

    /// Devices are found in ascending order since found ones are withdrawn.
    /// Finding the same or a lower address means the last device never
    /// left the search.
    fn check_progress(&self, long: Long) -> Result<()> {
        match self.assigned.last() {
            Some(last) if long <= last.long => Err(Error::ProtocolInvariant(format!(
                "found {:06x} again after {:06x} was assigned short address {}",
                long, last.long, last.short
            ))),
            _ => Ok(()),
        }
    }

    fn bind(&mut self, short: Short, long: Long) {
        self.taken += short;
        self.assigned.push(Commissioned { short, long });
        self.window.reopen();
    }

    fn abort(&self, source: Error) -> Error {
        Error::Commissioning {
            assigned: self.assigned.len(),
            window: self.window,
            source: Box::new(source),
        }
    }
}

/// Finds unaddressed devices with a binary search over their random
/// addresses and gives each one a short address.
#[derive(Debug, Clone, Default)]
pub struct Commissioner {
    timing: BusTiming,
    verify: bool,
}

impl Commissioner {
    pub fn new(timing: BusTiming) -> Commissioner {
        Commissioner {
            timing,
            verify: false,
        }
    }

    /// Check with VERIFY SHORT ADDRESS that each device accepted its address
    pub fn verify_short_address(mut self, verify: bool) -> Commissioner {
        self.verify = verify;
        self
    }

    /// Give every device on the bus a new short address, starting from 0.
    ///
    /// Returns the devices in the order they were found, which is ascending
    /// random address.
    pub async fn commission(&self, transport: &mut dyn Transport) -> Result<Vec<Commissioned>> {
        self.run(transport, Scope::All, AddressSet::new()).await
    }

    /// Give devices without a short address the lowest addresses not in
    /// `occupied`. Bound devices are left alone.
    pub async fn extend(
        &self,
        transport: &mut dyn Transport,
        occupied: &AddressSet,
    ) -> Result<Vec<Commissioned>> {
        self.run(transport, Scope::Unaddressed, *occupied).await
    }

    /// Put devices back into a known initialisation state after an aborted
    /// pass. Random addresses are kept.
    pub async fn resynchronise(&self, transport: &mut dyn Transport, scope: Scope) -> Result<()> {
        info!("Resynchronising {:?}", scope);
        self.initialise(transport, scope).await
    }

    async fn run(
        &self,
        transport: &mut dyn Transport,
        scope: Scope,
        occupied: AddressSet,
    ) -> Result<Vec<Commissioned>> {
        info!("Commissioning {:?}", scope);
        let mut session = Session::new(occupied);
        let res = match self.prepare(transport, scope).await {
            Ok(()) => self.discover(transport, &mut session).await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            // Leave addressing mode even though the pass failed
            if let Err(te) = send(transport, &self.timing, cmd::TERMINATE()).await {
                warn!("Failed to terminate after aborted commissioning: {}", te);
            }
            return Err(session.abort(e));
        }
        if let Err(e) = self.finish(transport).await {
            return Err(session.abort(e));
        }
        info!("Commissioned {} devices", session.assigned.len());
        Ok(session.assigned)
    }

    async fn initialise(&self, transport: &mut dyn Transport, scope: Scope) -> Result<()> {
        let init = match scope {
            Scope::All => cmd::INITIALISE_ALL(),
            Scope::Unaddressed => cmd::INITIALISE_NO_ADDR(),
        };
        send(transport, &self.timing, init).await
    }

    async fn prepare(&self, transport: &mut dyn Transport, scope: Scope) -> Result<()> {
        send(transport, &self.timing, cmd::RESET(Address::Broadcast)).await?;
        send(transport, &self.timing, cmd::OFF(Address::Broadcast)).await?;
        self.initialise(transport, scope).await?;
        send(transport, &self.timing, cmd::RANDOMISE()).await?;
        Ok(())
    }

    async fn discover(&self, transport: &mut dyn Transport, session: &mut Session) -> Result<()> {
        while let Some(short) = session.next_short() {
            let Some(long) = self.find_lowest(transport, &mut session.window).await? else {
                debug!("No device above {:06x}", session.window.low());
                return Ok(());
            };
            session.check_progress(long)?;
            info!("Found {:06x}, assigning short address {}", long, short);
            self.program(transport, long, short).await?;
            session.bind(short, long);
        }
        info!("No short addresses left");
        Ok(())
    }

    /// Binary search for the enabled device with the lowest random address
    async fn find_lowest(
        &self,
        transport: &mut dyn Transport,
        window: &mut SearchWindow,
    ) -> Result<Option<Long>> {
        while !window.is_converged() {
            let candidate = window.candidate();
            set_search_addr(transport, &self.timing, candidate).await?;
            let response = query(transport, &self.timing, cmd::COMPARE()).await?;
            debug!("Compare {:06x}: {:?}", candidate, response);
            window.narrow(candidate, response)?;
        }
        if let Some(addr) = window.boundary_check() {
            set_search_addr(transport, &self.timing, addr).await?;
            let response = query(transport, &self.timing, cmd::COMPARE()).await?;
            debug!("Compare boundary {:06x}: {:?}", addr, response);
            window.check(addr, response)?;
        }
        Ok(window.isolated())
    }

    async fn program(&self, transport: &mut dyn Transport, long: Long, short: Short) -> Result<()> {
        set_search_addr(transport, &self.timing, long).await?;
        send(transport, &self.timing, cmd::PROGRAM_SHORT_ADDRESS(short)).await?;
        if self.verify {
            let answer = query(transport, &self.timing, cmd::VERIFY_SHORT_ADDRESS(short)).await?;
            if !answer.is_responded() {
                return Err(Error::AddressValidation { short });
            }
        }
        send(transport, &self.timing, cmd::WITHDRAW()).await?;
        send(transport, &self.timing, cmd::RECALL_MAX_LEVEL(short)).await?;
        send(transport, &self.timing, cmd::OFF(short)).await?;
        Ok(())
    }

    async fn finish(&self, transport: &mut dyn Transport) -> Result<()> {
        send(transport, &self.timing, cmd::TERMINATE()).await?;
        send(transport, &self.timing, cmd::RECALL_MAX_LEVEL(Address::Broadcast)).await?;
        Ok(())
    }
}
