// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Walk the backward-linked record ring and rebuild chronological order.
// Author: Lukas Bower

//! Ring traversal.
//!
//! Records only store the offset of their predecessor, so the walk starts at
//! the newest record and follows `prev_offset` links. Once the chain has
//! wrapped (jumped to a higher address), it stops as soon as the next link
//! points below the end of the newest record: everything there has been
//! overwritten by newer data.

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::codec::{decode_body, read_record_header, BufferHeader, Record, SENTINEL};
use crate::error::{Corruption, Result, TraceBufferError};
use crate::store::{PageSource, PagedStore};

/// How a completed traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The oldest record had no predecessor.
    Sentinel,
    /// The chain reached memory already covered by the newest record.
    Wrap,
}

/// Newest-first iterator over the records of one ring.
///
/// The iterator is fused: after yielding an error or the oldest record it
/// returns `None`. A fresh walker over the same store restarts the traversal
/// without re-fetching cached pages.
pub struct RingWalker<'a, S> {
    store: &'a mut PagedStore<S>,
    length: u32,
    cursor: Option<u32>,
    first_record_end: Option<u64>,
    wrapped: bool,
    visited: HashSet<u32>,
    termination: Option<Termination>,
}

impl<'a, S: PageSource> RingWalker<'a, S> {
    /// Start a traversal at the newest record named by `header`.
    pub fn new(store: &'a mut PagedStore<S>, header: BufferHeader) -> Self {
        let cursor = (!header.is_empty()).then_some(header.last_record);
        Self {
            store,
            length: header.length,
            cursor,
            first_record_end: None,
            wrapped: false,
            visited: HashSet::new(),
            termination: header.is_empty().then_some(Termination::Sentinel),
        }
    }

    /// Return true once the chain has wrapped.
    #[must_use]
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Return how the traversal ended, or `None` while it is still running
    /// or after it failed.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Return how many records have been decoded so far.
    #[must_use]
    pub fn decoded(&self) -> usize {
        self.visited.len()
    }

    fn step(&mut self, cursor: u32) -> Result<Record> {
        if cursor >= self.length {
            return Err(TraceBufferError::corrupt(
                cursor,
                Corruption::OffsetBeyondLength {
                    length: self.length,
                },
            ));
        }
        if !self.visited.insert(cursor) {
            return Err(TraceBufferError::corrupt(cursor, Corruption::Revisited));
        }
        let header = read_record_header(&mut *self.store, cursor)?;
        let record_len = header.record_len();
        if u64::from(cursor) + record_len > u64::from(self.length) {
            return Err(TraceBufferError::corrupt(
                cursor,
                Corruption::RecordOverrunsBuffer {
                    record_len,
                    length: self.length,
                },
            ));
        }
        let record = decode_body(&mut *self.store, cursor, header)?;
        trace!(
            "record 0x{:x} prev 0x{:x} len {}",
            record.offset,
            record.prev_offset,
            record.length
        );
        let first_record_end = *self.first_record_end.get_or_insert(record.end());

        let next = record.prev_offset;
        if next == SENTINEL {
            // The only record without a predecessor sits at offset 0 and is
            // the first one a wrap overwrites.
            if self.wrapped {
                return Err(TraceBufferError::corrupt(cursor, Corruption::MultipleWraps));
            }
            self.termination = Some(Termination::Sentinel);
            return Ok(record);
        }
        if next == cursor {
            return Err(TraceBufferError::corrupt(cursor, Corruption::SelfReference));
        }
        if next > cursor {
            if self.wrapped {
                return Err(TraceBufferError::corrupt(cursor, Corruption::MultipleWraps));
            }
            debug!("ring wraps from 0x{cursor:x} to 0x{next:x}");
            self.wrapped = true;
        }
        if self.wrapped && u64::from(next) < first_record_end {
            self.termination = Some(Termination::Wrap);
            return Ok(record);
        }
        self.cursor = Some(next);
        Ok(record)
    }
}

impl<S: PageSource> Iterator for RingWalker<'_, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        match self.step(cursor) {
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                warn!("trace walk aborted: {err}");
                Some(Err(err))
            }
        }
    }
}

/// Result of a complete traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    /// Records in chronological (oldest-first) order.
    pub records: Vec<Record>,
    /// Whether the chain wrapped.
    pub wrapped: bool,
    /// How the traversal ended.
    pub termination: Termination,
}

/// Walk the whole ring, returning records oldest-first with traversal details.
pub fn walk<S: PageSource>(store: &mut PagedStore<S>, header: BufferHeader) -> Result<Walk> {
    let mut walker = RingWalker::new(store, header);
    let mut records = walker.by_ref().collect::<Result<Vec<_>>>()?;
    records.reverse();
    Ok(Walk {
        records,
        wrapped: walker.wrapped(),
        termination: walker.termination().unwrap_or(Termination::Sentinel),
    })
}

/// Decode every live record in chronological order.
pub fn decode_chronological<S: PageSource>(
    store: &mut PagedStore<S>,
    header: BufferHeader,
) -> Result<Vec<Record>> {
    walk(store, header).map(|walk| walk.records)
}

/// Decode only the newest `count` records, returned oldest-first.
pub fn tail<S: PageSource>(
    store: &mut PagedStore<S>,
    header: BufferHeader,
    count: usize,
) -> Result<Vec<Record>> {
    let mut records = RingWalker::new(store, header)
        .take(count)
        .collect::<Result<Vec<_>>>()?;
    records.reverse();
    Ok(records)
}
