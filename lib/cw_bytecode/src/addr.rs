//! Code address representation.

use serde::Serialize;
use std::fmt;

/// Offset of an instruction inside a method code attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Addr(pub usize);

impl Addr {
    #[inline]
    #[must_use]
    pub const fn entry() -> Self {
        Self(0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Addr {
    /// Target of a branch of `offset` bytes from `base_addr`, `None` when it
    /// would fall before the start of the code.
    #[must_use]
    pub const fn from_offset(base_addr: Self, offset: i32) -> Option<Self> {
        let distance = offset.unsigned_abs() as usize;
        let target = if offset.is_negative() {
            base_addr.0.checked_sub(distance)
        } else {
            base_addr.0.checked_add(distance)
        };
        match target {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn offset(self, offset: i32) -> Option<Self> {
        Self::from_offset(self, offset)
    }

    /// Signed distance from `self` to `target`, as encoded in branch instructions.
    #[must_use]
    pub fn distance_to(self, target: Self) -> i32 {
        target.0 as i32 - self.0 as i32
    }
}
