// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decode firmware trace ring buffers read from a debug probe or a snapshot file.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Firmware trace buffer decoder.
//!
//! Three layers, each depending only on the one below:
//! - [`store`]: lazily paged byte store over target memory or a snapshot,
//! - [`codec`]: buffer/record header layouts and record decoding,
//! - [`walker`]: ring traversal rebuilding chronological order.
//!
//! [`TraceBuffer`] ties a header to its store for one decode session and
//! [`Formatter`] renders the resulting records.

pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod probe;
pub mod session;
pub mod store;
pub mod symbol;
pub mod walker;

pub use codec::{
    decode_record, BufferHeader, LogLevel, Payload, Record, RecordHeader, BUFFER_HEADER_LEN,
    FLAG_BINARY, RECORD_HEADER_LEN, SENTINEL,
};
pub use config::{DecoderConfig, DEFAULT_PAGE_SIZE, DEFAULT_SYMBOL};
pub use error::{Corruption, Result, TraceBufferError};
pub use format::Formatter;
pub use probe::{ProbeMemory, ProbeSource};
pub use session::TraceBuffer;
pub use store::{FnSource, Layout, PageSource, PagedStore, SnapshotSource};
pub use symbol::{find_symbol, locate_buffer, parse_address};
pub use walker::{decode_chronological, tail, walk, RingWalker, Termination, Walk};
