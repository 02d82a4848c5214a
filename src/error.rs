// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the error surface shared by the paged store, record codec, and ring walker.
// Author: Lukas Bower

//! Error types returned while reading and decoding a trace buffer.

use std::error::Error as StdError;
use std::io;

/// Boxed transport error produced by a live page source.
pub type TransportError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, TraceBufferError>;

/// Structural violation detected while walking the record chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    /// A record offset lies at or beyond the ring length.
    #[error("record offset beyond buffer length {length}")]
    OffsetBeyondLength {
        /// Declared ring length in bytes.
        length: u32,
    },
    /// A record names itself as its predecessor.
    #[error("record links to itself")]
    SelfReference,
    /// The chain wrapped to a higher address more than once.
    #[error("chain wrapped more than once")]
    MultipleWraps,
    /// The chain returned to a record already decoded in this traversal.
    #[error("chain revisits an already decoded record")]
    Revisited,
    /// A record body extends past the end of the ring.
    #[error("record of {record_len} bytes overruns buffer length {length}")]
    RecordOverrunsBuffer {
        /// Total record length (header, label, payload).
        record_len: u64,
        /// Declared ring length in bytes.
        length: u32,
    },
}

/// Errors produced while reading or decoding a trace buffer.
#[derive(Debug, thiserror::Error)]
pub enum TraceBufferError {
    /// A requested range exceeds the known extent of the byte store.
    #[error("range 0x{offset:x}+{len} exceeds store limit 0x{limit:x}")]
    OutOfRange {
        /// First byte of the requested range.
        offset: u64,
        /// Requested length in bytes.
        len: u64,
        /// Declared upper bound of the store.
        limit: u64,
    },
    /// The ring structure violates its invariants at `offset`.
    #[error("corrupt trace buffer at offset 0x{offset:x}: {reason}")]
    CorruptBuffer {
        /// Offset of the record where the violation was detected.
        offset: u32,
        /// Detected violation.
        reason: Corruption,
    },
    /// The injected page fetch failed.
    #[error("transport failure reading 0x{address:x}: {source}")]
    Transport {
        /// Address the failing read targeted.
        address: u64,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// The page fetch returned the wrong number of bytes.
    #[error("short page at 0x{address:x}: expected {expected} bytes, got {actual}")]
    ShortPage {
        /// Page base address.
        address: u64,
        /// Configured page size.
        expected: usize,
        /// Bytes actually returned.
        actual: usize,
    },
    /// Snapshot file could not be read.
    #[error("snapshot i/o error: {0}")]
    Io(#[from] io::Error),
    /// Firmware image symbol lookup failed.
    #[error("elf error: {0}")]
    Elf(String),
    /// Decoder configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TraceBufferError {
    /// Build a corruption error for `offset`.
    #[must_use]
    pub fn corrupt(offset: u32, reason: Corruption) -> Self {
        Self::CorruptBuffer { offset, reason }
    }

    /// Return true when the error reports a corrupt ring structure.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptBuffer { .. })
    }
}
