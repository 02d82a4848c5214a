// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide decoder configuration with environment-driven defaults.
// Author: Lukas Bower

//! Decoder settings.

use crate::error::{Result, TraceBufferError};

/// Default size of a cached page in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 0x10000;
/// Default firmware symbol naming the trace buffer storage.
pub const DEFAULT_SYMBOL: &str = "tracebuffer_contents";
/// Environment variable overriding the page size.
pub const PAGE_SIZE_ENV: &str = "TRACEBUFFER_PAGE_SIZE";
/// Environment variable overriding the buffer symbol name.
pub const SYMBOL_ENV: &str = "TRACEBUFFER_SYMBOL";

/// Runtime configurable decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Size of each fetched page in bytes.
    pub page_size: usize,
    /// Symbol used to locate the buffer in a firmware ELF.
    pub symbol: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            page_size: std::env::var(PAGE_SIZE_ENV)
                .ok()
                .and_then(|value| parse_size(&value))
                .unwrap_or(DEFAULT_PAGE_SIZE),
            symbol: std::env::var(SYMBOL_ENV).unwrap_or_else(|_| DEFAULT_SYMBOL.to_owned()),
        }
    }
}

impl DecoderConfig {
    /// Construct a configuration with an explicit page size.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Check the configuration before it drives a store.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(TraceBufferError::Config("page size must be non-zero".into()));
        }
        // Probe reads move whole 32-bit words.
        if self.page_size % 4 != 0 {
            return Err(TraceBufferError::Config(format!(
                "page size {} is not a multiple of 4",
                self.page_size
            )));
        }
        if self.symbol.is_empty() {
            return Err(TraceBufferError::Config("symbol name must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
