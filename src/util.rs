//! Shared helpers: bounded file sniffing, extension checks, text decoding.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Maximum number of bytes any content sniff may read.
///
/// Probes must stay cheap even for pathological files, so sniffing never
/// reads past this prefix.
pub(crate) const SNIFF_PREFIX_LEN: usize = 1024;

/// Read up to `max_len` bytes from the start of a file.
///
/// Returns fewer bytes when the file is shorter; a missing or unreadable file
/// is an error (callers treat it as "probe declines").
pub(crate) fn read_prefix(path: &Path, max_len: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(max_len);
    file.take(max_len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Case-insensitive extension check (`has_extension(path, "epub")`).
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Case-insensitive suffix check on the file name, for multi-dot extensions
/// like `.fb2.zip` that `Path::extension` cannot express.
pub(crate) fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| {
            n.len() >= suffix.len() && n[n.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
        })
}

/// Decode bytes to a string, handling various encodings.
///
/// Tries UTF-8 first (BOM handled by encoding_rs), then the hint encoding
/// (e.g. from an XML declaration or a MOBI codepage), then falls back to
/// Windows-1252, which is a superset of ISO-8859-1 and common in old ebooks.
pub(crate) fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an XML declaration, if one is present in
/// the prefix (`<?xml version="1.0" encoding="windows-1251"?>`).
pub(crate) fn extract_xml_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let start = memchr::memmem::find(head, b"encoding=")? + b"encoding=".len();
    let quote = *head.get(start)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let rest = &head[start + 1..];
    let end = memchr::memchr(quote, rest)?;
    Some(String::from_utf8_lossy(&rest[..end]).to_string())
}

/// Detect an image MIME type from magic bytes.
///
/// Covers the formats that appear as ebook cover art. Returns `None` for
/// unrecognized data.
pub(crate) fn detect_image_mime(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }
    // JPEG: FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 {
        return Some("image/jpeg");
    }
    // PNG: 89 50 4E 47 (.PNG)
    if data[..4] == [0x89, 0x50, 0x4E, 0x47] {
        return Some("image/png");
    }
    // GIF: 47 49 46 (GIF)
    if data[..3] == *b"GIF" {
        return Some("image/gif");
    }
    // SVG is XML text
    if data.starts_with(b"<?xml") || data.starts_with(b"<svg") {
        return Some("image/svg+xml");
    }
    None
}
