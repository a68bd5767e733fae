//! The small tagged result type every phase returns.
//!
//! Plain enum, no `Error` trait impl — same style as
//! `crispy_common::protocol::AckStatus`. The set is closed and small enough
//! that a `thiserror`-style derive would add ceremony without adding
//! anything the orchestrators need: callers match on the variant, they
//! don't format it into a user-facing string.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// Magic mismatch, truncated header, or unreadable trailer.
    InvalidPackage,
    /// Verified checksum differs from the trailer.
    CrcMismatch,
    /// Filesystem read/write/seek/open failure.
    Io,
    /// A flash sector failed to erase.
    EraseFailed,
    /// A 32-byte flash block failed to commit after the driver's retry budget.
    WriteFailed,
    /// A program destination address was not 32-byte aligned.
    Misaligned,
    /// Rollback was attempted without one or both backup files present.
    NoBackup,
    /// No entry under the package search directory matched the naming convention.
    NotFound,
}

pub type BootResult<T> = Result<T, BootError>;
