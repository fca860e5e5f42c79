use crate::common::address::{Long, Short, LONG_MAX};
use crate::gear::cmd_defs::{opcode, YES};
use rand::Rng;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InitialisationState {
    Enabled,
    Disabled,
    Withdrawn,
}

pub mod status {
    pub const LAMP_ON: u8 = 0x04;
    pub const NO_ADDRESS: u8 = 0x40;
}

const MAX_LEVEL: u8 = 0xfe;

/// Simulated control gear
#[derive(Debug, Clone)]
pub struct SimGear {
    pub actual_level: u8,
    pub short_address: Option<Short>,
    pub search_address: Long,
    pub random_address: Long,
    /// RANDOMISE picks this value instead of a random one
    pub fixed_random: Option<Long>,
    pub initialisation_state: InitialisationState,
}

impl Default for SimGear {
    fn default() -> Self {
        SimGear::new()
    }
}

impl SimGear {
    pub fn new() -> SimGear {
        SimGear {
            actual_level: MAX_LEVEL,
            short_address: None,
            search_address: LONG_MAX,
            random_address: LONG_MAX,
            fixed_random: None,
            initialisation_state: InitialisationState::Disabled,
        }
    }

    /// Gear that always generates `long` when randomised
    pub fn with_random_address(long: Long) -> SimGear {
        SimGear {
            fixed_random: Some(long & LONG_MAX),
            ..SimGear::new()
        }
    }

    pub fn with_short_address(short: Short) -> SimGear {
        SimGear {
            short_address: Some(short),
            ..SimGear::new()
        }
    }

    fn status(&self) -> u8 {
        (if self.actual_level > 0 { status::LAMP_ON } else { 0 })
            | if self.short_address.is_none() {
                status::NO_ADDRESS
            } else {
                0
            }
    }

    fn selected(&self) -> bool {
        self.initialisation_state != InitialisationState::Disabled
            && self.search_address == self.random_address
    }

    fn device_cmd(&mut self, cmd: u8, twice: bool) -> Option<u8> {
        match cmd {
            opcode::OFF => self.actual_level = 0,
            opcode::RECALL_MAX_LEVEL => self.actual_level = MAX_LEVEL,
            opcode::RESET if twice => {
                self.actual_level = MAX_LEVEL;
                self.search_address = LONG_MAX;
                self.random_address = LONG_MAX;
            }
            opcode::QUERY_STATUS => return Some(self.status()),
            _ => {}
        }
        None
    }

    fn special_cmd<R: Rng>(&mut self, cmd: u8, data: u8, twice: bool, rng: &mut R) -> Option<u8> {
        let enabled = self.initialisation_state != InitialisationState::Disabled;
        match cmd {
            opcode::TERMINATE => {
                self.initialisation_state = InitialisationState::Disabled;
            }
            opcode::INITIALISE if twice => {
                let matches = match data {
                    opcode::INITIALISE_ALL => true,
                    opcode::INITIALISE_NO_ADDR => self.short_address.is_none(),
                    d if (d & 0x81) == 0x01 => {
                        self.short_address.map(|s| s.value()) == Some(d >> 1)
                    }
                    _ => false,
                };
                if matches {
                    self.initialisation_state = InitialisationState::Enabled;
                }
            }
            opcode::RANDOMISE if twice && enabled => {
                self.random_address = self
                    .fixed_random
                    .unwrap_or_else(|| rng.gen_range(0..=LONG_MAX));
            }
            opcode::COMPARE => {
                if self.initialisation_state == InitialisationState::Enabled
                    && self.random_address <= self.search_address
                {
                    return Some(YES);
                }
            }
            opcode::WITHDRAW => {
                if self.initialisation_state == InitialisationState::Enabled
                    && self.random_address == self.search_address
                {
                    self.initialisation_state = InitialisationState::Withdrawn;
                }
            }
            opcode::SEARCHADDRH if enabled => {
                self.search_address = (self.search_address & 0x00ffff) | ((data as Long) << 16);
            }
            opcode::SEARCHADDRM if enabled => {
                self.search_address = (self.search_address & 0xff00ff) | ((data as Long) << 8);
            }
            opcode::SEARCHADDRL if enabled => {
                self.search_address = (self.search_address & 0xffff00) | (data as Long);
            }
            opcode::PROGRAM_SHORT_ADDRESS if self.selected() => {
                if (data & 0x81) == 0x01 {
                    self.short_address = Some(Short::new(data >> 1));
                } else if data == 0xff {
                    self.short_address = None;
                }
            }
            opcode::VERIFY_SHORT_ADDRESS if enabled => {
                if self.short_address.is_some_and(|s| (s.value() << 1) | 1 == data) {
                    return Some(YES);
                }
            }
            _ => {}
        }
        None
    }

    /// Handle a forward frame. `twice` is true if the same frame was the
    /// previous one on the bus. Returns the answer, if any.
    pub fn forward16<R: Rng>(&mut self, frame: [u8; 2], twice: bool, rng: &mut R) -> Option<u8> {
        let [addr, cmd] = frame;
        if addr & 0x01 == 0 {
            // Direct arc power, only the level matters here
            if self.addressed(addr) {
                self.actual_level = cmd;
            }
            return None;
        }
        if self.addressed(addr) {
            self.device_cmd(cmd, twice)
        } else if (0xa1..=0xcb).contains(&addr) {
            self.special_cmd(addr, cmd, twice, rng)
        } else {
            None
        }
    }

    fn addressed(&self, addr: u8) -> bool {
        match addr >> 1 {
            a @ 0x00..=0x3f => self.short_address.map(|s| s.value()) == Some(a),
            0x7e => self.short_address.is_none(),
            0x7f => true,
            _ => false,
        }
    }
}
