//! C1 — Persistent State Store.
//!
//! `UpdateState` is the single enumerated value persisted across reboots.
//! The encoding is deliberately a recognizable small integer with every
//! other bit pattern — including a freshly-erased flash word — decoding to
//! `NONE`, so a torn write during power loss can never produce an
//! out-of-domain state.

use crate::error::BootResult;

/// The five states the bootloader's update lifecycle can persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateState {
    /// No update in flight; boot the app.
    None,
    /// A package is present and awaits installation.
    Received,
    /// Newly programmed image, not yet probed.
    ToTest,
    /// The current boot is a probe boot.
    Testing,
    /// The probed image confirmed itself.
    Done,
}

impl UpdateState {
    const TAG_RECEIVED: u32 = 1;
    const TAG_TO_TEST: u32 = 2;
    const TAG_TESTING: u32 = 3;
    const TAG_DONE: u32 = 4;

    /// Encode for storage. `NONE` is not given its own tag on purpose: any
    /// value outside the other four tags (including an erased `0xFFFF_FFFF`
    /// word or a zeroed word) decodes to `NONE`.
    pub fn encode(self) -> u32 {
        match self {
            UpdateState::None => 0,
            UpdateState::Received => Self::TAG_RECEIVED,
            UpdateState::ToTest => Self::TAG_TO_TEST,
            UpdateState::Testing => Self::TAG_TESTING,
            UpdateState::Done => Self::TAG_DONE,
        }
    }

    /// Decode a raw store word. Anything unrecognized, including a torn or
    /// erased value, collapses to `NONE`.
    pub fn decode(raw: u32) -> Self {
        match raw {
            Self::TAG_RECEIVED => UpdateState::Received,
            Self::TAG_TO_TEST => UpdateState::ToTest,
            Self::TAG_TESTING => UpdateState::Testing,
            Self::TAG_DONE => UpdateState::Done,
            _ => UpdateState::None,
        }
    }
}

/// C1 port. Implementations live outside the core (typically a reserved
/// on-chip flash sector); the core only needs read/write with a durable
/// torn-write-safe contract.
pub trait PersistentStore {
    fn read(&mut self) -> UpdateState;
    fn write(&mut self, state: UpdateState) -> BootResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_state() {
        for s in [
            UpdateState::None,
            UpdateState::Received,
            UpdateState::ToTest,
            UpdateState::Testing,
            UpdateState::Done,
        ] {
            assert_eq!(UpdateState::decode(s.encode()), s);
        }
    }

    #[test]
    fn unrecognized_patterns_collapse_to_none() {
        assert_eq!(UpdateState::decode(0xFFFF_FFFF), UpdateState::None);
        assert_eq!(UpdateState::decode(0xDEAD_BEEF), UpdateState::None);
        assert_eq!(UpdateState::decode(5), UpdateState::None);
    }
}
