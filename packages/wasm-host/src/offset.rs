use std::fmt;

/// A 32-bit address into one guest's linear memory. Not a host pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestOffset(u32);

impl GuestOffset {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Interpret an `i32` returned by the guest. Negative values are not
    /// addresses.
    pub fn from_guest(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The wire form passed back into guest functions.
    pub fn to_guest(self) -> i32 {
        self.0 as i32
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GuestOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
