// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decode trace buffer and record headers and record bodies from the firmware wire layout.
// Author: Lukas Bower

//! Fixed little-endian layouts shared with the firmware trace writer.
//!
//! Buffer header (8 bytes): `length:u32`, `last_record:u32`.
//! Record header (24 bytes): `prev_offset:u32`, `label_len:u32`,
//! `data_len:u32`, `loglevel:u16`, `flags:u16`, `timestamp:u64`, followed by
//! `label_len` label bytes and `data_len` payload bytes.

use core::fmt;

use crate::error::Result;
use crate::store::{Layout, PageSource, PagedStore};

/// Reserved offset meaning "no record".
pub const SENTINEL: u32 = 0xFFFF_FFFF;
/// Encoded size of the buffer header.
pub const BUFFER_HEADER_LEN: usize = 8;
/// Encoded size of a record header.
pub const RECORD_HEADER_LEN: usize = 24;
/// Record flag marking the payload as binary.
pub const FLAG_BINARY: u16 = 1;

/// Header preceding the ring region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHeader {
    /// Capacity of the ring region in bytes.
    pub length: u32,
    /// Offset of the newest record, or [`SENTINEL`] when empty.
    pub last_record: u32,
}

impl BufferHeader {
    /// Decode the header from its wire form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; BUFFER_HEADER_LEN]) -> Self {
        <Self as Layout>::decode(bytes)
    }

    /// Encode the header to its wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; BUFFER_HEADER_LEN] {
        let mut out = [0u8; BUFFER_HEADER_LEN];
        out[0..4].copy_from_slice(&self.length.to_le_bytes());
        out[4..8].copy_from_slice(&self.last_record.to_le_bytes());
        out
    }

    /// Return true when no record has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.last_record == SENTINEL
    }
}

impl Layout for BufferHeader {
    const SIZE: usize = BUFFER_HEADER_LEN;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            length: le_u32(bytes, 0),
            last_record: le_u32(bytes, 4),
        }
    }
}

/// Fixed header at the start of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Offset of the chronologically previous record, or [`SENTINEL`].
    pub prev_offset: u32,
    /// Label length in bytes.
    pub label_len: u32,
    /// Payload length in bytes.
    pub data_len: u32,
    /// Raw log level.
    pub loglevel: u16,
    /// Record flags; bit 0 marks a binary payload.
    pub flags: u16,
    /// Firmware tick counter at write time.
    pub timestamp: u64,
}

impl RecordHeader {
    /// Decode the header from its wire form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; RECORD_HEADER_LEN]) -> Self {
        <Self as Layout>::decode(bytes)
    }

    /// Encode the header to its wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut out = [0u8; RECORD_HEADER_LEN];
        out[0..4].copy_from_slice(&self.prev_offset.to_le_bytes());
        out[4..8].copy_from_slice(&self.label_len.to_le_bytes());
        out[8..12].copy_from_slice(&self.data_len.to_le_bytes());
        out[12..14].copy_from_slice(&self.loglevel.to_le_bytes());
        out[14..16].copy_from_slice(&self.flags.to_le_bytes());
        out[16..24].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    /// Total encoded record length: header, label, and payload.
    #[must_use]
    pub fn record_len(&self) -> u64 {
        RECORD_HEADER_LEN as u64 + u64::from(self.label_len) + u64::from(self.data_len)
    }

    /// Return true when the payload is binary.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.flags & FLAG_BINARY != 0
    }
}

impl Layout for RecordHeader {
    const SIZE: usize = RECORD_HEADER_LEN;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            prev_offset: le_u32(bytes, 0),
            label_len: le_u32(bytes, 4),
            data_len: le_u32(bytes, 8),
            loglevel: le_u16(bytes, 12),
            flags: le_u16(bytes, 14),
            timestamp: le_u64(bytes, 16),
        }
    }
}

/// Firmware log levels, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum LogLevel {
    /// Nothing is logged.
    Silent = 0,
    /// Critical failures.
    Critical = 1,
    /// Errors.
    Error = 2,
    /// Warnings.
    Warning = 3,
    /// Notable conditions.
    Notice = 4,
    /// Informational messages.
    Info = 5,
    /// Diagnostic detail.
    Diagnostic = 6,
    /// Trace detail.
    Trace = 7,
    /// Everything.
    All = 8,
    /// Level inherited from the parent facility.
    Inherit = 9,
}

impl LogLevel {
    /// All levels indexed by their wire value.
    pub const ALL_LEVELS: [LogLevel; 10] = [
        LogLevel::Silent,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Diagnostic,
        LogLevel::Trace,
        LogLevel::All,
        LogLevel::Inherit,
    ];

    /// Map a raw wire value; unknown values yield `None`.
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL_LEVELS.get(usize::from(raw)).copied()
    }

    /// Return the upper-case level name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Silent => "SILENT",
            Self::Critical => "CRITICAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Diagnostic => "DIAGNOSTIC",
            Self::Trace => "TRACE",
            Self::All => "ALL",
            Self::Inherit => "INHERIT",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text payload, decoded lossily as UTF-8.
    Text(String),
    /// Binary payload kept verbatim.
    Binary(Vec<u8>),
}

impl Payload {
    /// Return the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

/// One decoded trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Offset of the record within the ring.
    pub offset: u32,
    /// Offset of the previous record, or [`SENTINEL`].
    pub prev_offset: u32,
    /// Encoded length: header, label, and payload.
    pub length: u64,
    /// Facility label.
    pub label: String,
    /// Raw log level.
    pub loglevel: u16,
    /// Raw record flags.
    pub flags: u16,
    /// Firmware tick counter at write time.
    pub timestamp: u64,
    /// Decoded payload.
    pub payload: Payload,
}

impl Record {
    /// Return the log level if it is one the firmware defines.
    #[must_use]
    pub fn level(&self) -> Option<LogLevel> {
        LogLevel::from_raw(self.loglevel)
    }

    /// Offset one past the last byte of the record.
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + self.length
    }
}

/// Read the record header at `offset`.
pub fn read_record_header<S: PageSource>(
    store: &mut PagedStore<S>,
    offset: u32,
) -> Result<RecordHeader> {
    store.read_struct(u64::from(offset))
}

/// Decode the label and payload following an already decoded `header`.
pub fn decode_body<S: PageSource>(
    store: &mut PagedStore<S>,
    offset: u32,
    header: RecordHeader,
) -> Result<Record> {
    let label_start = u64::from(offset) + RECORD_HEADER_LEN as u64;
    let label = String::from_utf8_lossy(store.read_range(label_start, header.label_len as usize)?)
        .into_owned();
    let data_start = label_start + u64::from(header.label_len);
    let data = store.read_range(data_start, header.data_len as usize)?;
    let payload = if header.is_binary() {
        Payload::Binary(data.to_vec())
    } else {
        Payload::Text(String::from_utf8_lossy(data).into_owned())
    };
    Ok(Record {
        offset,
        prev_offset: header.prev_offset,
        length: header.record_len(),
        label,
        loglevel: header.loglevel,
        flags: header.flags,
        timestamp: header.timestamp,
        payload,
    })
}

/// Fully decode the record at `offset`.
pub fn decode_record<S: PageSource>(store: &mut PagedStore<S>, offset: u32) -> Result<Record> {
    let header = read_record_header(store, offset)?;
    decode_body(store, offset, header)
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from(le_u32(bytes, at)) | (u64::from(le_u32(bytes, at + 4)) << 32)
}
