//! In-memory relay state: what we applied, what was asked for, and what
//! the bus last accepted.

/// Number of relay channels on the board.
pub const RELAY_COUNT: usize = 8;

/// A validated relay channel index in `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Accepts any integer the wire may carry; rejects everything outside
    /// `0..8`.
    pub fn new(index: i64) -> Option<Self> {
        if (0..RELAY_COUNT as i64).contains(&index) {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn mask(self) -> u8 {
        1 << self.0
    }

    /// Expander pin label number (`EXIO1`..`EXIO8`).
    pub const fn exio_pin(self) -> u8 {
        self.0 + 1
    }
}

/// Three 8-bit masks tracking relay state.
///
/// - `current`: what the device believes is driven on the outputs.
/// - `expected`: what the most recent commands asked for.
/// - `verified`: the last mask the bus accepted without error.
///
/// `current` is only ever moved away from `verified` transiently, while a
/// write is in flight.  A rejected write undoes the staged bit in both
/// `current` and `expected`, so a failed request never leaks into later
/// successful ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayBank {
    current: u8,
    expected: u8,
    verified: u8,
    /// `expected` as of the last commit or rollback.
    committed_expected: u8,
}

impl RelayBank {
    /// All relays off.
    pub const fn new() -> Self {
        Self {
            current: 0,
            expected: 0,
            verified: 0,
            committed_expected: 0,
        }
    }

    pub const fn current(&self) -> u8 {
        self.current
    }

    pub const fn expected(&self) -> u8 {
        self.expected
    }

    pub const fn verified(&self) -> u8 {
        self.verified
    }

    pub const fn is_on(&self, ch: Channel) -> bool {
        self.current & ch.mask() != 0
    }

    pub const fn expected_on(&self, ch: Channel) -> bool {
        self.expected & ch.mask() != 0
    }

    /// Record the request and optimistically update `current`.
    /// Returns the staged `current` mask to write out.
    pub fn stage(&mut self, ch: Channel, on: bool) -> u8 {
        self.expected = set_bit(self.expected, ch, on);
        self.current = set_bit(self.current, ch, on);
        self.current
    }

    /// The bus accepted the staged mask.
    pub fn commit(&mut self) {
        self.verified = self.current;
        self.committed_expected = self.expected;
    }

    /// The bus rejected the staged mask: fall back to the last accepted one
    /// and forget the request.
    pub fn rollback(&mut self) {
        self.current = self.verified;
        self.expected = self.committed_expected;
    }

    /// Per-channel view of `current`, channel 0 first.
    pub fn states(&self) -> [bool; RELAY_COUNT] {
        mask_to_bools(self.current)
    }
}

fn set_bit(mask: u8, ch: Channel, on: bool) -> u8 {
    if on { mask | ch.mask() } else { mask & !ch.mask() }
}

/// Expand a mask into per-channel booleans, bit 0 first.
pub fn mask_to_bools(mask: u8) -> [bool; RELAY_COUNT] {
    core::array::from_fn(|i| mask & (1 << i) != 0)
}
