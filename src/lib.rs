//! Bus master for DALI lighting control.
//!
//! Encodes forward frames for a byte oriented serial interface, classifies
//! backward frames, scans for bound short addresses and commissions
//! unaddressed devices.

pub mod common {
    pub mod address;
}

pub mod gear {
    pub mod cmd_defs;
}

pub mod drivers;

pub mod utils {
    pub mod address_set;
    pub mod commission;
    pub mod long_address;
    pub mod scan;
    pub mod search_window;
}

pub mod config;
pub mod error;

pub use error::Error;
