// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Adapt a word-granular debug-probe memory read into a trace buffer page source.
// Author: Lukas Bower

//! Live target access.
//!
//! The trace buffer in target memory is an 8-byte header followed by the ring
//! region. Ring offset `n` therefore lives at `base + 8 + n`.

use log::debug;

use crate::codec::{BufferHeader, BUFFER_HEADER_LEN};
use crate::error::{Result, TraceBufferError, TransportError};
use crate::store::PageSource;

const WORD: usize = 4;

/// Memory read primitive exposed by a debug probe session.
pub trait ProbeMemory {
    /// Error reported by the probe transport.
    type Error: Into<TransportError>;

    /// Read `words` 32-bit words starting at `address`.
    fn read_words(
        &mut self,
        address: u64,
        words: usize,
    ) -> core::result::Result<Vec<u8>, Self::Error>;
}

/// Read `len` bytes at `address`, rounding the transfer up to whole words.
pub fn read_bytes<P: ProbeMemory>(probe: &mut P, address: u64, len: usize) -> Result<Vec<u8>> {
    let words = len.div_ceil(WORD);
    let mut bytes = probe
        .read_words(address, words)
        .map_err(|err| TraceBufferError::Transport {
            address,
            source: err.into(),
        })?;
    if bytes.len() < len {
        return Err(TraceBufferError::ShortPage {
            address,
            expected: len,
            actual: bytes.len(),
        });
    }
    bytes.truncate(len);
    Ok(bytes)
}

/// Read the buffer header at the start of the trace buffer.
pub fn read_header<P: ProbeMemory>(probe: &mut P, base: u64) -> Result<BufferHeader> {
    let bytes = read_bytes(probe, base, BUFFER_HEADER_LEN)?;
    let mut raw = [0u8; BUFFER_HEADER_LEN];
    raw.copy_from_slice(&bytes);
    Ok(BufferHeader::from_bytes(&raw))
}

/// Page source reading ring pages through a probe.
#[derive(Debug)]
pub struct ProbeSource<P> {
    probe: P,
    base: u64,
}

impl<P: ProbeMemory> ProbeSource<P> {
    /// Create a source for the trace buffer whose header starts at `base`.
    #[must_use]
    pub fn new(probe: P, base: u64) -> Self {
        Self { probe, base }
    }

    /// Address of the first ring byte in target memory.
    pub fn ring_start(&self) -> Result<u64> {
        self.ring_address(0, BUFFER_HEADER_LEN)
    }

    fn ring_address(&self, offset: u64, len: usize) -> Result<u64> {
        self.base
            .checked_add(BUFFER_HEADER_LEN as u64)
            .and_then(|start| start.checked_add(offset))
            .ok_or(TraceBufferError::OutOfRange {
                offset,
                len: len as u64,
                limit: u64::MAX - self.base,
            })
    }

    /// Borrow the underlying probe.
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }
}

impl<P: ProbeMemory> PageSource for ProbeSource<P> {
    fn fetch_page(&mut self, base: u64, page_size: usize) -> Result<Vec<u8>> {
        let address = self.ring_address(base, page_size)?;
        debug!("probe read 0x{address:08x} ({page_size} bytes)");
        read_bytes(&mut self.probe, address, page_size)
    }
}
