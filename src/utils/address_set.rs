use crate::common::address::Short;
use core::ops::{Add, AddAssign};

/// Set of short addresses
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct AddressSet(u64);

impl AddressSet {
    pub fn new() -> AddressSet {
        AddressSet(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Short> {
        let set = *self;
        Short::all().filter(move |a| set.contains(*a))
    }

    pub fn to_vec(&self) -> Vec<Short> {
        self.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, addr: Short) -> bool {
        (self.0 & (1 << addr.value())) != 0
    }

    /// Lowest address not in the set
    pub fn first_free(&self) -> Option<Short> {
        match (!self.0).trailing_zeros() {
            64 => None,
            a => Some(Short::new(a as u8)),
        }
    }
}

impl FromIterator<Short> for AddressSet {
    fn from_iter<I: IntoIterator<Item = Short>>(iter: I) -> Self {
        iter.into_iter().fold(AddressSet::new(), |s, a| s + a)
    }
}

impl std::fmt::Display for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, a) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, "}}")
    }
}

impl Add<Short> for AddressSet {
    type Output = AddressSet;
    fn add(self, b: Short) -> Self::Output {
        Self(self.0 | (1u64 << b.value()))
    }
}

impl AddAssign<Short> for AddressSet {
    fn add_assign(&mut self, b: Short) {
        self.0 |= 1u64 << b.value();
    }
}
