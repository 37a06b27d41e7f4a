//! MOBI backend tests against Palm databases built in-process.

mod common;

use tempfile::TempDir;

use folio::{Doc, DocKind, DocumentProperty, EbookKind, Error, MobiDoc};

use common::{assemble_pdb, build_mobi, write_fixture};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n0000fake png payload";

#[test]
fn test_mobi_text_and_title() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        dir.path(),
        "names.mobi",
        &build_mobi("True Names", b"<html><body>Mr. Slippery</body></html>", &[], &[]),
    );

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    assert_eq!(
        mobi.property(DocumentProperty::Title).as_deref(),
        Some("True Names")
    );
    let html = String::from_utf8_lossy(mobi.html_data()).into_owned();
    assert!(html.contains("Mr. Slippery"));
}

#[test]
fn test_exth_metadata_wins_over_header_title() {
    let dir = TempDir::new().unwrap();
    let exth = vec![
        (503u32, b"Updated Title".to_vec()),
        (100, b"Vernor Vinge".to_vec()),
        (101, b"Tor".to_vec()),
        (109, b"(c) 1981".to_vec()),
    ];
    let path = write_fixture(
        dir.path(),
        "names.mobi",
        &build_mobi("Header Title", b"<p>x</p>", &exth, &[]),
    );

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    assert_eq!(
        mobi.property(DocumentProperty::Title).as_deref(),
        Some("Updated Title")
    );
    assert_eq!(
        mobi.property(DocumentProperty::Author).as_deref(),
        Some("Vernor Vinge")
    );
    assert_eq!(mobi.property(DocumentProperty::Publisher).as_deref(), Some("Tor"));
    assert_eq!(
        mobi.property(DocumentProperty::Copyright).as_deref(),
        Some("(c) 1981")
    );
    assert_eq!(mobi.property(DocumentProperty::ModificationDate), None);
}

#[test]
fn test_cover_via_exth_record() {
    let dir = TempDir::new().unwrap();
    let exth = vec![(201u32, 0u32.to_be_bytes().to_vec())];
    let path = write_fixture(
        dir.path(),
        "cover.mobi",
        &build_mobi("T", b"<p>x</p>", &exth, &[PNG]),
    );

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    let cover = mobi.cover_image().expect("cover record");
    assert_eq!(cover.media_type, "image/png");
    assert_eq!(cover.data, PNG);
}

#[test]
fn test_no_cover_without_exth_record() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        dir.path(),
        "plain.mobi",
        &build_mobi("T", b"<p>x</p>", &[], &[PNG]),
    );

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    assert!(mobi.cover_image().is_none());
}

#[test]
fn test_palmdoc_compressed_text() {
    // ASCII bytes in the literal range pass through PalmDOC decompression
    // unchanged, so plain text doubles as a compressed record
    let dir = TempDir::new().unwrap();
    let mut bytes = build_mobi("T", b"plain literal text", &[], &[]);
    // rec0 starts after the 78-byte header and two 8-byte record entries
    bytes[94..96].copy_from_slice(&2u16.to_be_bytes());
    let path = write_fixture(dir.path(), "palm.mobi", &bytes);

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    assert_eq!(mobi.html_data(), b"plain literal text");
}

#[test]
fn test_encrypted_book_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut bytes = build_mobi("T", b"<p>x</p>", &[], &[]);
    bytes[106..108].copy_from_slice(&2u16.to_be_bytes()); // encryption type
    let path = write_fixture(dir.path(), "drm.mobi", &bytes);

    assert!(matches!(
        MobiDoc::create_from_file(&path),
        Err(Error::InvalidMobi(_))
    ));
}

#[test]
fn test_plain_palmdoc_database() {
    // TEXtREAd databases carry only the 16-byte PalmDoc header; the title
    // falls back to the database name
    let dir = TempDir::new().unwrap();
    let text = b"Just some old Palm text.";
    let mut rec0 = vec![0u8; 16];
    rec0[0..2].copy_from_slice(&1u16.to_be_bytes());
    rec0[4..8].copy_from_slice(&(text.len() as u32).to_be_bytes());
    rec0[8..10].copy_from_slice(&1u16.to_be_bytes());
    let bytes = assemble_pdb(&[&rec0, text], b"TEXtREAd");
    let path = write_fixture(dir.path(), "old.prc", &bytes);

    assert!(MobiDoc::is_supported_file(&path, false));
    assert!(MobiDoc::is_supported_file(&path, true));

    let mobi = MobiDoc::create_from_file(&path).unwrap();
    assert_eq!(
        mobi.property(DocumentProperty::Title).as_deref(),
        Some("fixture")
    );
    assert_eq!(mobi.html_data(), text);
}

#[test]
fn test_truncated_record_table_is_invalid() {
    let dir = TempDir::new().unwrap();
    let mut bytes = build_mobi("T", b"<p>x</p>", &[], &[]);
    bytes[76..78].copy_from_slice(&40u16.to_be_bytes()); // claim 40 records
    let path = write_fixture(dir.path(), "lies.mobi", &bytes);

    assert!(matches!(
        MobiDoc::create_from_file(&path),
        Err(Error::InvalidMobi(_))
    ));
}

#[test]
fn test_mobi_dispatches_through_doc() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        dir.path(),
        "book.azw",
        &build_mobi("Azw Book", b"<p>x</p>", &[], &[]),
    );

    let doc = Doc::create_from_file(&path);
    assert_eq!(doc.kind(), DocKind::Ebook(EbookKind::Mobi));
    assert_eq!(
        doc.property(DocumentProperty::Title).as_deref(),
        Some("Azw Book")
    );
    assert!(doc.as_mobi().is_some());
    assert!(doc.as_epub().is_none());
}
