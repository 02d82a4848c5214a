// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Build trace ring images the way the firmware writer lays them out.
// Author: Lukas Bower
#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use tracebuffer::{
    BufferHeader, ProbeMemory, RecordHeader, FLAG_BINARY, RECORD_HEADER_LEN, SENTINEL,
};

/// Install the test logger once per binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One record placed by [`RingImage::log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub offset: u32,
    pub len: u32,
    pub timestamp: u64,
    pub pass: usize,
    pub label: String,
}

/// In-memory trace buffer populated with the firmware placement rules:
/// records are word aligned and restart at offset 0 when the next one does
/// not fit before the end of the ring.
#[derive(Debug, Clone)]
pub struct RingImage {
    ring: Vec<u8>,
    last: u32,
    pass: usize,
    clock: u64,
    pub written: Vec<Written>,
}

impl RingImage {
    pub fn new(length: usize) -> Self {
        Self {
            ring: vec![0u8; length],
            last: SENTINEL,
            pass: 0,
            clock: 0,
            written: Vec::new(),
        }
    }

    pub fn log(
        &mut self,
        label: impl AsRef<[u8]>,
        loglevel: u16,
        data: &[u8],
        binary: bool,
    ) -> u32 {
        let label = label.as_ref();
        let record_len = RECORD_HEADER_LEN + label.len() + data.len();
        assert!(record_len <= self.ring.len(), "record larger than ring");
        let (offset, prev) = if self.last == SENTINEL {
            (0usize, SENTINEL)
        } else {
            let prev = self.last;
            let at = prev as usize;
            let mut raw = [0u8; RECORD_HEADER_LEN];
            raw.copy_from_slice(&self.ring[at..at + RECORD_HEADER_LEN]);
            let header = RecordHeader::from_bytes(&raw);
            let mut next = at + header.record_len() as usize;
            if next % 4 != 0 {
                next += 4 - next % 4;
            }
            if next + record_len > self.ring.len() {
                next = 0;
                self.pass += 1;
            }
            (next, prev)
        };
        self.clock += 1;
        let header = RecordHeader {
            prev_offset: prev,
            label_len: label.len() as u32,
            data_len: data.len() as u32,
            loglevel,
            flags: if binary { FLAG_BINARY } else { 0 },
            timestamp: self.clock * 10,
        };
        self.put(offset as u32, header, label, data);
        self.last = offset as u32;
        self.written.push(Written {
            offset: offset as u32,
            len: record_len as u32,
            timestamp: header.timestamp,
            pass: self.pass,
            label: String::from_utf8_lossy(label).into_owned(),
        });
        offset as u32
    }

    /// Write a record verbatim, bypassing the placement rules.
    pub fn put(&mut self, offset: u32, header: RecordHeader, label: &[u8], data: &[u8]) {
        let at = offset as usize;
        self.ring[at..at + RECORD_HEADER_LEN].copy_from_slice(&header.to_bytes());
        let body = at + RECORD_HEADER_LEN;
        self.ring[body..body + label.len()].copy_from_slice(label);
        let data_at = body + label.len();
        self.ring[data_at..data_at + data.len()].copy_from_slice(data);
    }

    pub fn set_last(&mut self, offset: u32) {
        self.last = offset;
    }

    pub fn header(&self) -> BufferHeader {
        BufferHeader {
            length: self.ring.len() as u32,
            last_record: self.last,
        }
    }

    pub fn ring(&self) -> &[u8] {
        &self.ring
    }

    /// Header followed by the ring region, as dumped from target memory.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = self.header().to_bytes().to_vec();
        out.extend_from_slice(&self.ring);
        out
    }

    /// Records the decoder must return, oldest first.
    pub fn expected_live(&self) -> Vec<Written> {
        let Some(newest) = self.written.last() else {
            return Vec::new();
        };
        let first_end = newest.offset + newest.len;
        let current = newest.pass;
        self.written
            .iter()
            .filter(|w| w.pass == current || (w.pass + 1 == current && w.offset >= first_end))
            .cloned()
            .collect()
    }
}

/// Simulated debug probe exposing the snapshot at `base` and counting reads.
#[derive(Clone, Debug)]
pub struct FakeProbe {
    pub base: u64,
    pub memory: Vec<u8>,
    pub reads: Rc<RefCell<Vec<(u64, usize)>>>,
    pub fail_above: Option<u64>,
}

impl FakeProbe {
    pub fn new(base: u64, image: &RingImage) -> Self {
        Self {
            base,
            memory: image.snapshot(),
            reads: Rc::new(RefCell::new(Vec::new())),
            fail_above: None,
        }
    }
}

impl ProbeMemory for FakeProbe {
    type Error = io::Error;

    fn read_words(&mut self, address: u64, words: usize) -> io::Result<Vec<u8>> {
        self.reads.borrow_mut().push((address, words));
        if let Some(limit) = self.fail_above {
            if address >= limit {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "probe timed out"));
            }
        }
        let len = words * 4;
        let start = address
            .checked_sub(self.base)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "below buffer"))?
            as usize;
        // Memory past the dump reads back as zeroes, like unused target RAM.
        let mut out = vec![0u8; len];
        if start < self.memory.len() {
            let end = (start + len).min(self.memory.len());
            out[..end - start].copy_from_slice(&self.memory[start..end]);
        }
        Ok(out)
    }
}
