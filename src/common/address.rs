use core::str::FromStr;

/// Address byte as it appears first in a forward frame
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressByte(pub u8);

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AddressError {
    NotShort,
    InvalidAddress,
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            AddressError::NotShort => write!(fmt, "Not a short address"),
            AddressError::InvalidAddress => write!(fmt, "Invalid address"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Short address, 0..=63
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Short(u8);

impl Short {
    pub const COUNT: u8 = 64;

    pub fn new(a: u8) -> Short {
        assert!(a < Self::COUNT);
        Short(a)
    }

    pub fn try_new(a: u8) -> Result<Short, AddressError> {
        if a < Self::COUNT {
            Ok(Short(a))
        } else {
            Err(AddressError::InvalidAddress)
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All short addresses in ascending order
    pub fn all() -> impl Iterator<Item = Short> {
        (0..Self::COUNT).map(Short)
    }
}

impl From<Short> for AddressByte {
    fn from(short: Short) -> Self {
        AddressByte((short.0 << 1) | 1)
    }
}

impl TryFrom<AddressByte> for Short {
    type Error = AddressError;
    fn try_from(a: AddressByte) -> Result<Short, Self::Error> {
        match a.0 >> 1 {
            s @ 0..=0x3f if (a.0 & 1) == 1 => Ok(Short(s)),
            _ => Err(AddressError::NotShort),
        }
    }
}

impl std::fmt::Display for Short {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        self.0.fmt(fmt)
    }
}

impl FromStr for Short {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map_or(Err(AddressError::InvalidAddress), Short::try_new)
    }
}

/// Random address generated by a device during commissioning. Only the
/// lower 24 bits are used.
pub type Long = u32;

pub const LONG_MAX: Long = 0xffffff;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Address {
    Short(Short),
    Broadcast,
    BroadcastUnaddressed,
}

impl std::convert::From<Short> for Address {
    fn from(a: Short) -> Self {
        Address::Short(a)
    }
}

impl From<Address> for AddressByte {
    fn from(addr: Address) -> AddressByte {
        match addr {
            Address::Short(a) => a.into(),
            Address::Broadcast => AddressByte(0xff),
            Address::BroadcastUnaddressed => AddressByte(0xfd),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            Address::Short(a) => write!(fmt, "short {}", a),
            Address::Broadcast => write!(fmt, "broadcast"),
            Address::BroadcastUnaddressed => write!(fmt, "broadcast unaddressed"),
        }
    }
}
