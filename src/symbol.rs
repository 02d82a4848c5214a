// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Locate the trace buffer base address in a firmware ELF image.
// Author: Lukas Bower

//! Firmware ELF symbol lookup.

use log::debug;
use xmas_elf::sections::SectionData;
use xmas_elf::symbol_table::Entry;
use xmas_elf::ElfFile;

use crate::config::DecoderConfig;
use crate::error::{Result, TraceBufferError};

/// Return the address of symbol `name` in the ELF image `image`.
pub fn find_symbol(image: &[u8], name: &str) -> Result<u64> {
    let elf = ElfFile::new(image).map_err(|err| TraceBufferError::Elf(err.to_owned()))?;
    let mut saw_table = false;
    for section in elf.section_iter() {
        let address = match section.get_data(&elf) {
            Ok(SectionData::SymbolTable32(entries)) => {
                saw_table = true;
                entries
                    .iter()
                    .find(|entry| entry.get_name(&elf) == Ok(name))
                    .map(|entry| entry.value())
            }
            Ok(SectionData::SymbolTable64(entries)) => {
                saw_table = true;
                entries
                    .iter()
                    .find(|entry| entry.get_name(&elf) == Ok(name))
                    .map(|entry| entry.value())
            }
            _ => None,
        };
        if let Some(address) = address {
            debug!("symbol {name} at 0x{address:08x}");
            return Ok(address);
        }
    }
    if !saw_table {
        return Err(TraceBufferError::Elf("image has no symbol table".into()));
    }
    Err(TraceBufferError::Elf(format!("symbol {name} not found")))
}

/// Return the trace buffer base named by `config.symbol`.
pub fn locate_buffer(image: &[u8], config: &DecoderConfig) -> Result<u64> {
    find_symbol(image, &config.symbol)
}

/// Parse a decimal or `0x`-prefixed hexadecimal address.
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| TraceBufferError::Config(format!("invalid address {text:?}")))
}
