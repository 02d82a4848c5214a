// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Cache fixed-size pages of an expensive-to-read address space on demand.
// Author: Lukas Bower

//! Lazily paged view over target memory or a snapshot.
//!
//! The store is the single authority deciding which pages are fetched. A page
//! is fetched at most once per store; loaded pages are never invalidated since
//! the buffer is treated as static for the duration of one decode session.

use log::debug;

use crate::error::{Result, TraceBufferError, TransportError};

/// Source of page contents for a [`PagedStore`].
pub trait PageSource {
    /// Fetch exactly `page_size` bytes starting at page-aligned `base`.
    fn fetch_page(&mut self, base: u64, page_size: usize) -> Result<Vec<u8>>;
}

/// Page source for snapshot stores; every fetch fails.
///
/// A snapshot supplies all of its bytes up front, so a fetch can only mean the
/// caller asked for data that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSource {
    len: u64,
}

impl SnapshotSource {
    /// Return the snapshot length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Return true when the snapshot holds no ring bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PageSource for SnapshotSource {
    fn fetch_page(&mut self, base: u64, page_size: usize) -> Result<Vec<u8>> {
        Err(TraceBufferError::OutOfRange {
            offset: base,
            len: page_size as u64,
            limit: self.len,
        })
    }
}

/// Page source backed by a closure returning page bytes.
pub struct FnSource<F> {
    fetch: F,
}

impl<F> FnSource<F> {
    /// Wrap a fetch closure.
    #[must_use]
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<F, E> PageSource for FnSource<F>
where
    F: FnMut(u64) -> core::result::Result<Vec<u8>, E>,
    E: Into<TransportError>,
{
    fn fetch_page(&mut self, base: u64, _page_size: usize) -> Result<Vec<u8>> {
        (self.fetch)(base).map_err(|err| TraceBufferError::Transport {
            address: base,
            source: err.into(),
        })
    }
}

/// Fixed-size layout decodable from a byte range of the store.
pub trait Layout: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode from exactly [`Layout::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Self;
}

/// Byte store caching pages fetched from a [`PageSource`].
///
/// Not thread-safe; a store belongs to one decode session.
#[derive(Debug)]
pub struct PagedStore<S> {
    source: S,
    page_size: usize,
    buffer: Vec<u8>,
    loaded: Vec<bool>,
    limit: Option<u64>,
    fetches: usize,
}

impl<S: PageSource> PagedStore<S> {
    /// Create an empty store fetching `page_size` pages from `source`.
    ///
    /// `page_size` must be non-zero; use [`crate::DecoderConfig::validate`]
    /// for externally supplied values.
    #[must_use]
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            buffer: Vec::new(),
            loaded: Vec::new(),
            limit: None,
            fetches: 0,
        }
    }

    /// Declare an upper bound; reads ending past it fail with `OutOfRange`.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return exactly `len` bytes starting at `offset`, loading pages as needed.
    pub fn read_range(&mut self, offset: u64, len: usize) -> Result<&[u8]> {
        let end = self.checked_end(offset, len)?;
        if len == 0 {
            return Ok(&[]);
        }
        let first = page_index(offset, self.page_size)?;
        let last = page_index(end - 1, self.page_size)?;
        for page in first..=last {
            self.ensure_page(page)?;
        }
        let start = to_usize(offset)?;
        let stop = to_usize(end)?;
        self.buffer
            .get(start..stop)
            .ok_or(TraceBufferError::OutOfRange {
                offset,
                len: len as u64,
                limit: self.buffer.len() as u64,
            })
    }

    /// Decode a fixed-size layout at `offset`.
    pub fn read_struct<T: Layout>(&mut self, offset: u64) -> Result<T> {
        let bytes = self.read_range(offset, T::SIZE)?;
        Ok(T::decode(bytes))
    }

    fn checked_end(&self, offset: u64, len: usize) -> Result<u64> {
        let overflow = TraceBufferError::OutOfRange {
            offset,
            len: len as u64,
            limit: self.limit.unwrap_or(u64::MAX),
        };
        let Some(end) = offset.checked_add(len as u64) else {
            return Err(overflow);
        };
        match self.limit {
            Some(limit) if end > limit => Err(overflow),
            _ => Ok(end),
        }
    }

    fn ensure_page(&mut self, page: usize) -> Result<()> {
        if self.loaded.len() <= page {
            self.loaded.resize(page + 1, false);
        }
        if self.loaded[page] {
            return Ok(());
        }
        let base = page * self.page_size;
        let address = base as u64;
        debug!("loading page 0x{address:08x}");
        let data = self.source.fetch_page(address, self.page_size)?;
        if data.len() != self.page_size {
            return Err(TraceBufferError::ShortPage {
                address,
                expected: self.page_size,
                actual: data.len(),
            });
        }
        let end = base + self.page_size;
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[base..end].copy_from_slice(&data);
        self.loaded[page] = true;
        self.fetches += 1;
        Ok(())
    }
}

impl PagedStore<SnapshotSource> {
    /// Build a store holding `bytes` in full, bounded by their length.
    #[must_use]
    pub fn snapshot(bytes: Vec<u8>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let len = bytes.len();
        let pages = len.div_ceil(page_size);
        Self {
            source: SnapshotSource { len: len as u64 },
            page_size,
            buffer: bytes,
            loaded: vec![true; pages],
            limit: Some(len as u64),
            fetches: 0,
        }
    }
}

impl<S> PagedStore<S> {
    /// Return the configured page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Return the declared upper bound, if any.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Return how many pages have been fetched from the source.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Return how many pages are resident.
    #[must_use]
    pub fn loaded_pages(&self) -> usize {
        self.loaded.iter().filter(|loaded| **loaded).count()
    }

    /// Borrow the page source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| TraceBufferError::OutOfRange {
        offset: value,
        len: 0,
        limit: usize::MAX as u64,
    })
}

fn page_index(offset: u64, page_size: usize) -> Result<usize> {
    Ok(to_usize(offset)? / page_size)
}
