// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Tie a buffer header to its paged store for one decode session.
// Author: Lukas Bower

//! Decode sessions over snapshots and live targets.

use std::path::Path;

use log::{debug, info};

use crate::codec::{BufferHeader, Record, BUFFER_HEADER_LEN};
use crate::config::DecoderConfig;
use crate::error::{Result, TraceBufferError};
use crate::probe::{read_header, ProbeMemory, ProbeSource};
use crate::store::{PageSource, PagedStore, SnapshotSource};
use crate::walker::{self, RingWalker, Walk};

/// A trace buffer opened for decoding.
///
/// The session owns its page cache; walking the ring repeatedly reuses the
/// pages already fetched.
#[derive(Debug)]
pub struct TraceBuffer<S> {
    header: BufferHeader,
    store: PagedStore<S>,
}

impl<S: PageSource> TraceBuffer<S> {
    /// Assemble a session from a decoded header and a store over the ring region.
    #[must_use]
    pub fn new(header: BufferHeader, store: PagedStore<S>) -> Self {
        info!(
            "trace buffer length {} last record 0x{:x}",
            header.length, header.last_record
        );
        Self { header, store }
    }

    /// Return the buffer header.
    #[must_use]
    pub fn header(&self) -> BufferHeader {
        self.header
    }

    /// Borrow the paged store.
    #[must_use]
    pub fn store(&self) -> &PagedStore<S> {
        &self.store
    }

    /// Start a newest-first traversal.
    pub fn walker(&mut self) -> RingWalker<'_, S> {
        RingWalker::new(&mut self.store, self.header)
    }

    /// Walk the whole ring, keeping traversal details.
    pub fn walk(&mut self) -> Result<Walk> {
        walker::walk(&mut self.store, self.header)
    }

    /// Decode every live record, oldest first.
    pub fn records(&mut self) -> Result<Vec<Record>> {
        walker::decode_chronological(&mut self.store, self.header)
    }

    /// Decode the newest `count` records, oldest first.
    pub fn tail(&mut self, count: usize) -> Result<Vec<Record>> {
        walker::tail(&mut self.store, self.header, count)
    }
}

impl TraceBuffer<SnapshotSource> {
    /// Open a snapshot: the 8-byte header followed by the raw ring region.
    pub fn from_snapshot(mut bytes: Vec<u8>, config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        if bytes.len() < BUFFER_HEADER_LEN {
            return Err(TraceBufferError::OutOfRange {
                offset: 0,
                len: BUFFER_HEADER_LEN as u64,
                limit: bytes.len() as u64,
            });
        }
        let ring = bytes.split_off(BUFFER_HEADER_LEN);
        let mut raw = [0u8; BUFFER_HEADER_LEN];
        raw.copy_from_slice(&bytes);
        let header = BufferHeader::from_bytes(&raw);
        Ok(Self::new(header, PagedStore::snapshot(ring, config.page_size)))
    }

    /// Read a snapshot file and open it.
    pub fn open_snapshot(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("reading snapshot {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::from_snapshot(bytes, config)
    }
}

impl<P: ProbeMemory> TraceBuffer<ProbeSource<P>> {
    /// Open the buffer whose header lives at `base` in target memory.
    pub fn open_live(probe: P, base: u64, config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        let mut source = ProbeSource::new(probe, base);
        let ring_start = source.ring_start()?;
        info!("reading trace buffer header at 0x{base:08x}");
        let header = read_header(source.probe_mut(), base)?;
        debug!("ring region starts at 0x{ring_start:08x}");
        let store = PagedStore::new(source, config.page_size);
        Ok(Self::new(header, store))
    }
}
