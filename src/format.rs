// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Render decoded trace records as aligned text lines.
// Author: Lukas Bower

//! Text rendering of a chronological record sequence.
//!
//! Column widths are computed over the whole sequence before any line is
//! produced so every line aligns:
//! `<timestamp> | <label> | <LEVL> | <payload>`.

use std::io::{self, Write};

use crate::codec::{BufferHeader, LogLevel, Payload, Record};

const LEVEL_WIDTH: usize = 4;

/// Aligned line renderer for one record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Formatter {
    label_width: usize,
    timestamp_width: usize,
}

impl Formatter {
    /// Measure column widths over `records`.
    #[must_use]
    pub fn for_records(records: &[Record]) -> Self {
        records.iter().fold(Self::default(), |widths, record| Self {
            label_width: widths.label_width.max(record.label.chars().count()),
            timestamp_width: widths
                .timestamp_width
                .max(record.timestamp.to_string().len()),
        })
    }

    /// Render one record.
    #[must_use]
    pub fn line(&self, record: &Record) -> String {
        format!(
            "{:>tw$} | {:<lw$} | {:<vw$} | {}",
            record.timestamp,
            record.label,
            level_label(record.loglevel),
            payload_text(&record.payload),
            tw = self.timestamp_width,
            lw = self.label_width,
            vw = LEVEL_WIDTH,
        )
    }

    /// Render every record in order.
    #[must_use]
    pub fn render(records: &[Record]) -> Vec<String> {
        let formatter = Self::for_records(records);
        records.iter().map(|record| formatter.line(record)).collect()
    }

    /// Write every record as one line to `out`.
    pub fn write_all<W: Write>(records: &[Record], out: &mut W) -> io::Result<()> {
        for line in Self::render(records) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    /// Describe the buffer header.
    #[must_use]
    pub fn summary(header: &BufferHeader) -> Vec<String> {
        let mut lines = vec![format!("Buffer size: {}", header.length)];
        if header.is_empty() {
            lines.push("The buffer is empty.".to_owned());
        } else {
            lines.push(format!("Last record: 0x{:x}", header.last_record));
        }
        lines
    }
}

/// Short level name, or the raw number for levels the firmware does not define.
#[must_use]
pub fn level_label(raw: u16) -> String {
    match LogLevel::from_raw(raw) {
        Some(level) => level.name().chars().take(LEVEL_WIDTH).collect(),
        None => raw.to_string(),
    }
}

/// Payload as displayed: text without trailing line endings, binary as hex.
#[must_use]
pub fn payload_text(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.trim_end_matches(|c| c == '\r' || c == '\n').to_owned(),
        Payload::Binary(bytes) => {
            let hex = bytes
                .iter()
                .map(|byte| hex::encode([*byte]))
                .collect::<Vec<_>>()
                .join(" ");
            format!("BIN: {hex}")
        }
    }
}
