//! Shared fixture builders: minimal but structurally valid EPUB, MOBI and
//! FB2 files, written to a tempdir.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

// --- EPUB ---

/// Build a minimal EPUB: stored mimetype entry first, container.xml, OPF,
/// and one chapter per entry in `chapters` (href, xhtml bytes).
pub fn build_epub(title: &str, author: &str, chapters: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    // mimetype must be first and uncompressed so sniffing sees it in the prefix
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, (href, _)) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            r#"<item id="ch{i}" href="{href}" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
    }
    let opf = format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier>urn:uuid:fixture</dc:identifier>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    );
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    for (href, html) in chapters {
        zip.start_file(format!("OEBPS/{href}"), deflated).unwrap();
        zip.write_all(html.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

// --- MOBI ---

pub const MOBI_NULL_INDEX: u32 = 0xFFFFFFFF;

/// Build a minimal uncompressed MOBI: PDB header, record 0 with MOBI header
/// (+ optional EXTH records), one text record, then any image records.
pub fn build_mobi(title: &str, text: &[u8], exth: &[(u32, Vec<u8>)], images: &[&[u8]]) -> Vec<u8> {
    // Record 0: 16-byte PalmDoc header + 232-byte MOBI header
    let mut rec0 = vec![0u8; 16 + 232];
    rec0[0..2].copy_from_slice(&1u16.to_be_bytes()); // no compression
    rec0[4..8].copy_from_slice(&(text.len() as u32).to_be_bytes());
    rec0[8..10].copy_from_slice(&1u16.to_be_bytes()); // one text record
    rec0[10..12].copy_from_slice(&4096u16.to_be_bytes());
    rec0[16..20].copy_from_slice(b"MOBI");
    rec0[20..24].copy_from_slice(&232u32.to_be_bytes()); // header length
    rec0[28..32].copy_from_slice(&65001u32.to_be_bytes()); // UTF-8

    let first_image = if images.is_empty() { MOBI_NULL_INDEX } else { 2 };
    rec0[0x6C..0x70].copy_from_slice(&first_image.to_be_bytes());

    let mut exth_block = Vec::new();
    if !exth.is_empty() {
        rec0[0x80..0x84].copy_from_slice(&0x40u32.to_be_bytes()); // EXTH flag
        let mut records = Vec::new();
        for (record_type, content) in exth {
            records.extend_from_slice(&record_type.to_be_bytes());
            records.extend_from_slice(&((content.len() + 8) as u32).to_be_bytes());
            records.extend_from_slice(content);
        }
        exth_block.extend_from_slice(b"EXTH");
        exth_block.extend_from_slice(&((records.len() + 12) as u32).to_be_bytes());
        exth_block.extend_from_slice(&(exth.len() as u32).to_be_bytes());
        exth_block.extend_from_slice(&records);
    }

    let title_offset = (rec0.len() + exth_block.len()) as u32;
    rec0[0x54..0x58].copy_from_slice(&title_offset.to_be_bytes());
    rec0[0x58..0x5C].copy_from_slice(&(title.len() as u32).to_be_bytes());
    rec0.extend_from_slice(&exth_block);
    rec0.extend_from_slice(title.as_bytes());

    let mut records: Vec<&[u8]> = vec![&rec0, text];
    records.extend(images.iter().copied());
    assemble_pdb(&records, b"BOOKMOBI")
}

/// Wrap records in a Palm database image with the given type/creator.
pub fn assemble_pdb(records: &[&[u8]], type_creator: &[u8; 8]) -> Vec<u8> {
    let header_len = 78 + records.len() * 8;
    let mut out = vec![0u8; header_len];
    out[..7].copy_from_slice(b"fixture");
    out[60..68].copy_from_slice(type_creator);
    out[76..78].copy_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = header_len as u32;
    for (i, record) in records.iter().enumerate() {
        let pos = 78 + i * 8;
        out[pos..pos + 4].copy_from_slice(&offset.to_be_bytes());
        offset += record.len() as u32;
    }
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

// --- FB2 ---

pub fn build_fb2(title: &str, author_last: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0"
             xmlns:l="http://www.w3.org/1999/xlink">
  <description>
    <title-info>
      <genre>prose</genre>
      <author><last-name>{author_last}</last-name></author>
      <book-title>{title}</book-title>
      <lang>en</lang>
    </title-info>
  </description>
  <body><section><p>Some text.</p></section></body>
</FictionBook>"#
    )
}
