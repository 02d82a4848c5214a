// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate trace buffer symbol lookup in firmware ELF images.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use tracebuffer::{find_symbol, locate_buffer, DecoderConfig, TraceBufferError, DEFAULT_SYMBOL};

const EHDR_LEN: usize = 52;
const SHDR_LEN: usize = 40;
const SYM_LEN: usize = 16;

fn pad_to(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[allow(clippy::too_many_arguments)]
fn section_header(
    out: &mut Vec<u8>,
    name: u32,
    kind: u32,
    offset: usize,
    size: usize,
    link: u32,
    info: u32,
    align: u32,
    entsize: u32,
) {
    put_u32(out, name);
    put_u32(out, kind);
    put_u32(out, 0); // flags
    put_u32(out, 0); // addr
    put_u32(out, offset as u32);
    put_u32(out, size as u32);
    put_u32(out, link);
    put_u32(out, info);
    put_u32(out, align);
    put_u32(out, entsize);
}

/// Minimal little-endian ELF32 image for an ARM target with the given
/// symbols. `with_symtab == false` leaves the symbol table out.
fn elf_image(symbols: &[(&str, u32)], with_symtab: bool) -> Vec<u8> {
    let mut strtab = vec![0u8];
    let mut entries = vec![0u8; SYM_LEN];
    for (name, value) in symbols {
        let name_off = strtab.len() as u32;
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);
        put_u32(&mut entries, name_off);
        put_u32(&mut entries, *value);
        put_u32(&mut entries, 0x1000); // size
        entries.push(0x11); // STB_GLOBAL | STT_OBJECT
        entries.push(0);
        put_u16(&mut entries, 1);
    }
    let shstrtab = b"\0.symtab\0.strtab\0.shstrtab\0".to_vec();
    let (symtab_name, strtab_name, shstrtab_name) = (1u32, 9u32, 17u32);

    let mut out = vec![0u8; EHDR_LEN];
    pad_to(&mut out, 8);
    let strtab_off = out.len();
    out.extend_from_slice(&strtab);
    pad_to(&mut out, 8);
    let shstrtab_off = out.len();
    out.extend_from_slice(&shstrtab);
    pad_to(&mut out, 8);
    let symtab_off = out.len();
    if with_symtab {
        out.extend_from_slice(&entries);
    }
    pad_to(&mut out, 8);
    let shoff = out.len();

    let mut sections = vec![0u8; SHDR_LEN];
    let mut count = 1u16;
    if with_symtab {
        section_header(
            &mut sections,
            symtab_name,
            2,
            symtab_off,
            entries.len(),
            2, // links to .strtab
            1,
            4,
            SYM_LEN as u32,
        );
        count += 1;
    }
    section_header(&mut sections, strtab_name, 3, strtab_off, strtab.len(), 0, 0, 1, 0);
    count += 1;
    let shstrndx = count;
    section_header(
        &mut sections,
        shstrtab_name,
        3,
        shstrtab_off,
        shstrtab.len(),
        0,
        0,
        1,
        0,
    );
    count += 1;
    out.extend_from_slice(&sections);

    let mut header = Vec::with_capacity(EHDR_LEN);
    header.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    header.extend_from_slice(&[0u8; 8]);
    put_u16(&mut header, 2); // ET_EXEC
    put_u16(&mut header, 40); // EM_ARM
    put_u32(&mut header, 1);
    put_u32(&mut header, 0x0010_0000); // entry
    put_u32(&mut header, 0); // phoff
    put_u32(&mut header, shoff as u32);
    put_u32(&mut header, 0x0500_0000); // flags
    put_u16(&mut header, EHDR_LEN as u16);
    put_u16(&mut header, 32);
    put_u16(&mut header, 0);
    put_u16(&mut header, SHDR_LEN as u16);
    put_u16(&mut header, count);
    put_u16(&mut header, shstrndx);
    out[..EHDR_LEN].copy_from_slice(&header);
    out
}

#[test]
fn finds_trace_buffer_symbol() {
    let image = elf_image(
        &[("main", 0x0010_0000), (DEFAULT_SYMBOL, 0x0011_2340)],
        true,
    );
    assert_eq!(find_symbol(&image, DEFAULT_SYMBOL).expect("symbol"), 0x0011_2340);
    assert_eq!(find_symbol(&image, "main").expect("main"), 0x0010_0000);
}

#[test]
fn locate_uses_configured_symbol() {
    let image = elf_image(&[("ipmc_trace", 0x2000_0000)], true);
    let config = DecoderConfig {
        page_size: 0x1000,
        symbol: "ipmc_trace".to_owned(),
    };
    assert_eq!(locate_buffer(&image, &config).expect("locate"), 0x2000_0000);
}

#[test]
fn missing_symbol_is_reported() {
    let image = elf_image(&[("main", 0x0010_0000)], true);
    let err = find_symbol(&image, DEFAULT_SYMBOL).expect_err("absent");
    match err {
        TraceBufferError::Elf(message) => assert!(message.contains(DEFAULT_SYMBOL)),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn stripped_image_has_no_symbol_table() {
    let image = elf_image(&[], false);
    let err = find_symbol(&image, DEFAULT_SYMBOL).expect_err("stripped");
    match err {
        TraceBufferError::Elf(message) => assert!(message.contains("no symbol table")),
        other => panic!("unexpected error {other:?}"),
    }
}
