//! FictionBook2 backend: plain or zipped FB2 XML.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::props::{DocumentProperty, ImageData};
use crate::util::{
    SNIFF_PREFIX_LEN, decode_text, detect_image_mime, extract_xml_encoding, file_name_ends_with,
    has_extension, read_prefix,
};

/// An opened FictionBook2 document.
///
/// Metadata comes from `description/title-info` (and `document-info` /
/// `publish-info`); the cover image is resolved from the `coverpage`
/// reference to an embedded base64 `binary` element. Text data is the
/// document XML, re-encoded as UTF-8.
#[derive(Debug)]
pub struct Fb2Doc {
    path: PathBuf,
    title: Option<String>,
    authors: Vec<String>,
    genres: Vec<String>,
    language: Option<String>,
    date: Option<String>,
    publisher: Option<String>,
    program_used: Option<String>,
    cover: Option<ImageData>,
    xml_data: Vec<u8>,
}

impl Fb2Doc {
    /// Probe whether a file looks like an FB2 document.
    ///
    /// Extension mode accepts `.fb2` and `.fb2.zip`. Sniff mode looks for
    /// the `<FictionBook` root element within a bounded prefix; zipped FB2
    /// is only recognized by extension since its prefix is ZIP data.
    pub fn is_supported_file(path: &Path, sniff: bool) -> bool {
        if sniff {
            let Ok(prefix) = read_prefix(path, SNIFF_PREFIX_LEN) else {
                return false;
            };
            return memchr::memmem::find(&prefix, b"<FictionBook").is_some();
        }
        has_extension(path, "fb2") || file_name_ends_with(path, ".fb2.zip")
    }

    /// Open and fully parse an FB2 file.
    pub fn create_from_file(path: &Path) -> Result<Self> {
        let mut raw = Vec::new();
        File::open(path)?.read_to_end(&mut raw)?;

        if raw.starts_with(b"PK\x03\x04") {
            raw = unzip_fb2(raw)?;
        }

        let hint = extract_xml_encoding(&raw);
        let text = decode_text(&raw, hint.as_deref()).into_owned();
        let mut doc = parse_fb2(&text)?;

        doc.path = path.to_path_buf();
        doc.xml_data = text.into_bytes();
        debug!(path = %path.display(), has_cover = doc.cover.is_some(), "opened FB2");
        Ok(doc)
    }

    /// The path this document was opened from.
    pub fn file_name(&self) -> &Path {
        &self.path
    }

    pub fn property(&self, prop: DocumentProperty) -> Option<String> {
        let value = match prop {
            DocumentProperty::Title => self.title.clone(),
            DocumentProperty::Author => Some(self.authors.join(", ")),
            DocumentProperty::Subject => Some(self.genres.join("; ")),
            DocumentProperty::CreationDate => self.date.clone(),
            DocumentProperty::Publisher => self.publisher.clone(),
            DocumentProperty::CreatorApp => self.program_used.clone(),
            DocumentProperty::Copyright | DocumentProperty::ModificationDate => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// The document XML, re-encoded as UTF-8.
    pub fn html_data(&self) -> &[u8] {
        &self.xml_data
    }

    pub fn cover_image(&self) -> Option<&ImageData> {
        self.cover.as_ref()
    }

    /// The language declared in `title-info/lang`, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Extract the FB2 payload from a `.fb2.zip` container: the first entry
/// named `*.fb2`, or the first entry at all.
fn unzip_fb2(raw: Vec<u8>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(raw))?;
    let name = archive
        .file_names()
        .find(|n| n.to_ascii_lowercase().ends_with(".fb2"))
        .map(str::to_string);

    let mut entry = match name {
        Some(name) => archive.by_name(&name)?,
        None => archive.by_index(0)?,
    };
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn parse_fb2(content: &str) -> Result<Fb2Doc> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut doc = Fb2Doc {
        path: PathBuf::new(),
        title: None,
        authors: Vec::new(),
        genres: Vec::new(),
        language: None,
        date: None,
        publisher: None,
        program_used: None,
        cover: None,
        xml_data: Vec::new(),
    };

    let mut saw_root = false;
    // Element ancestry as local names, e.g. ["FictionBook", "description", ..]
    let mut stack: Vec<String> = Vec::new();
    let mut buf_text = String::new();
    // Author name parts accumulate across first-name/middle-name/last-name.
    let mut author_parts: Vec<String> = Vec::new();
    let mut cover_href: Option<String> = None;
    // (id, content-type) of the binary currently being collected.
    let mut binary: Option<(String, Option<String>)> = None;
    let mut binary_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = local_name_str(e.name().as_ref());
                if local == "FictionBook" {
                    saw_root = true;
                }
                if local == "binary" {
                    let mut id = None;
                    let mut content_type = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                            b"content-type" => {
                                content_type =
                                    Some(String::from_utf8_lossy(&attr.value).to_string())
                            }
                            _ => {}
                        }
                    }
                    if let Some(id) = id {
                        binary = Some((id, content_type));
                        binary_text.clear();
                    }
                }
                stack.push(local);
                buf_text.clear();
            }
            Ok(Event::Empty(e)) => {
                let local = local_name_str(e.name().as_ref());
                if local == "image" && in_path(&stack, &["title-info", "coverpage"]) {
                    for attr in e.attributes().flatten() {
                        if local_name_str(attr.key.as_ref()) == "href" {
                            let href = String::from_utf8_lossy(&attr.value).to_string();
                            cover_href = Some(href.trim_start_matches('#').to_string());
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = String::from_utf8_lossy(e.as_ref());
                if binary.is_some() {
                    binary_text.push_str(&text);
                } else {
                    buf_text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                let local = local_name_str(e.name().as_ref());
                // Pop first so `stack` holds the ended element's ancestry.
                stack.pop();
                let text = buf_text.trim();

                if in_path(&stack, &["description", "title-info"]) {
                    match local.as_str() {
                        "book-title" if doc.title.is_none() && !text.is_empty() => {
                            doc.title = Some(text.to_string())
                        }
                        "genre" if !text.is_empty() => doc.genres.push(text.to_string()),
                        "lang" if !text.is_empty() => doc.language = Some(text.to_string()),
                        "date" if !text.is_empty() && doc.date.is_none() => {
                            doc.date = Some(text.to_string())
                        }
                        _ => {}
                    }
                }
                if in_path(&stack, &["title-info", "author"]) && !text.is_empty() {
                    match local.as_str() {
                        "first-name" | "middle-name" | "last-name" | "nickname" => {
                            author_parts.push(text.to_string())
                        }
                        _ => {}
                    }
                }
                match local.as_str() {
                    "author" if in_path(&stack, &["description", "title-info"]) => {
                        if !author_parts.is_empty() {
                            doc.authors.push(author_parts.join(" "));
                            author_parts.clear();
                        }
                    }
                    "program-used" if in_path(&stack, &["description", "document-info"]) => {
                        if !text.is_empty() {
                            doc.program_used = Some(text.to_string());
                        }
                    }
                    "publisher" if in_path(&stack, &["description", "publish-info"]) => {
                        if !text.is_empty() {
                            doc.publisher = Some(text.to_string());
                        }
                    }
                    "binary" => {
                        if let Some((id, content_type)) = binary.take()
                            && cover_href.as_deref() == Some(id.as_str())
                        {
                            doc.cover = decode_cover(&binary_text, content_type);
                        }
                    }
                    _ => {}
                }

                buf_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::InvalidFb2("no FictionBook root element".into()));
    }
    Ok(doc)
}

fn decode_cover(base64_text: &str, content_type: Option<String>) -> Option<ImageData> {
    let compact: String = base64_text.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64.decode(compact.as_bytes()) {
        Ok(data) => {
            let media_type = content_type
                .or_else(|| detect_image_mime(&data).map(str::to_string))
                .unwrap_or_else(|| "application/octet-stream".to_string());
            Some(ImageData::new(data, media_type))
        }
        Err(e) => {
            warn!(error = %e, "cover binary is not valid base64");
            None
        }
    }
}

/// True if `tail` matches the innermost elements of the ancestry stack.
fn in_path(stack: &[String], tail: &[&str]) -> bool {
    stack.len() >= tail.len()
        && stack[stack.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

fn local_name_str(name: &[u8]) -> String {
    let local = match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    String::from_utf8_lossy(local).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FB2: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0"
             xmlns:l="http://www.w3.org/1999/xlink">
  <description>
    <title-info>
      <genre>prose</genre>
      <author><first-name>Lev</first-name><last-name>Tolstoy</last-name></author>
      <book-title>Kholstomer</book-title>
      <lang>ru</lang>
      <date>1886</date>
      <coverpage><image l:href="#cover.png"/></coverpage>
    </title-info>
    <document-info>
      <program-used>folio-test</program-used>
    </document-info>
    <publish-info>
      <publisher>Posrednik</publisher>
    </publish-info>
  </description>
  <body><section><p>text</p></section></body>
  <binary id="cover.png" content-type="image/png">iVBORw0KGgo=</binary>
</FictionBook>"##;

    #[test]
    fn test_parse_fb2_metadata() {
        let doc = parse_fb2(FB2).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Kholstomer"));
        assert_eq!(doc.authors, vec!["Lev Tolstoy"]);
        assert_eq!(doc.genres, vec!["prose"]);
        assert_eq!(doc.language.as_deref(), Some("ru"));
        assert_eq!(doc.date.as_deref(), Some("1886"));
        assert_eq!(doc.publisher.as_deref(), Some("Posrednik"));
        assert_eq!(doc.program_used.as_deref(), Some("folio-test"));
    }

    #[test]
    fn test_parse_fb2_cover_binary() {
        let doc = parse_fb2(FB2).unwrap();
        let cover = doc.cover.expect("cover should be decoded");
        assert_eq!(cover.media_type, "image/png");
        // "iVBORw0KGgo=" decodes to the PNG signature
        assert_eq!(&cover.data[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_parse_fb2_rejects_other_xml() {
        let err = parse_fb2("<?xml version=\"1.0\"?><html/>").unwrap_err();
        assert!(matches!(err, Error::InvalidFb2(_)));
    }

    #[test]
    fn test_in_path() {
        let stack: Vec<String> = ["FictionBook", "description", "title-info"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(in_path(&stack, &["description", "title-info"]));
        assert!(!in_path(&stack, &["document-info"]));
    }
}
