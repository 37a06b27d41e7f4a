//! EPUB backend: ZIP container + OPF package metadata.

mod opf;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::props::DocumentProperty;
use crate::util::{SNIFF_PREFIX_LEN, has_extension, read_prefix};

pub(crate) use opf::{OpfMetadata, parse_container_xml, parse_opf, strip_bom};

/// An opened EPUB document.
///
/// Construction fully parses the package: container.xml, the OPF metadata
/// and manifest, and the spine content documents. The decoded text data is
/// the concatenation of the spine documents in reading order.
pub struct EpubDoc {
    path: PathBuf,
    metadata: OpfMetadata,
    html_data: Vec<u8>,
}

impl EpubDoc {
    /// Probe whether a file looks like an EPUB.
    ///
    /// Extension mode checks the file name only. Sniff mode reads a bounded
    /// prefix and requires the ZIP local-header magic plus the EPUB
    /// `mimetype` declaration, which a conforming EPUB stores uncompressed
    /// as the first entry.
    pub fn is_supported_file(path: &Path, sniff: bool) -> bool {
        if sniff {
            let Ok(prefix) = read_prefix(path, SNIFF_PREFIX_LEN) else {
                return false;
            };
            return prefix.starts_with(b"PK\x03\x04")
                && memchr::memmem::find(&prefix, b"application/epub+zip").is_some();
        }
        has_extension(path, "epub")
    }

    /// Open and fully parse an EPUB file.
    pub fn create_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let container = read_entry(&mut archive, "META-INF/container.xml")
            .map_err(|_| Error::InvalidEpub("missing META-INF/container.xml".into()))?;
        let opf_path = parse_container_xml(&container)?;

        let opf_bytes = read_entry(&mut archive, &opf_path)
            .map_err(|_| Error::InvalidEpub(format!("missing package document {opf_path}")))?;
        let opf_text = String::from_utf8(strip_bom(&opf_bytes).to_vec())?;
        let opf = parse_opf(&opf_text)?;

        let opf_dir = match opf_path.rfind('/') {
            Some(pos) => &opf_path[..pos],
            None => "",
        };

        // Concatenate spine documents in reading order. A broken manifest
        // reference is skipped, not fatal.
        let mut html_data = Vec::new();
        for id in &opf.spine_ids {
            let Some((href, _media_type)) = opf.manifest.get(id) else {
                warn!(idref = %id, "spine itemref has no manifest item");
                continue;
            };
            let entry = resolve_href(opf_dir, href);
            match read_entry(&mut archive, &entry) {
                Ok(bytes) => html_data.extend_from_slice(&bytes),
                Err(e) => warn!(entry = %entry, error = %e, "failed to read spine document"),
            }
        }

        debug!(path = %path.display(), spine = opf.spine_ids.len(), "opened EPUB");
        Ok(Self {
            path: path.to_path_buf(),
            metadata: opf.metadata,
            html_data,
        })
    }

    /// The path this document was opened from.
    pub fn file_name(&self) -> &Path {
        &self.path
    }

    pub fn property(&self, prop: DocumentProperty) -> Option<String> {
        let value = match prop {
            DocumentProperty::Title => Some(self.metadata.title.clone()),
            DocumentProperty::Author => Some(self.metadata.authors.join(", ")),
            DocumentProperty::Publisher => self.metadata.publisher.clone(),
            DocumentProperty::Subject => Some(self.metadata.subjects.join("; ")),
            DocumentProperty::CreationDate => self.metadata.date.clone(),
            DocumentProperty::Copyright => self.metadata.rights.clone(),
            DocumentProperty::ModificationDate | DocumentProperty::CreatorApp => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// Concatenated spine document bytes.
    pub fn html_data(&self) -> &[u8] {
        &self.html_data
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Resolve a (possibly percent-encoded) manifest href against the OPF
/// directory, collapsing `.` and `..` segments.
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let decoded = percent_decode_str(href).decode_utf8_lossy();

    let mut segments: Vec<&str> = if opf_dir.is_empty() {
        Vec::new()
    } else {
        opf_dir.split('/').collect()
    };
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_href_relative() {
        assert_eq!(resolve_href("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_href("", "ch1.xhtml"), "ch1.xhtml");
    }

    #[test]
    fn test_resolve_href_parent_dir() {
        assert_eq!(
            resolve_href("OEBPS/text", "../styles/main.css"),
            "OEBPS/styles/main.css"
        );
    }

    #[test]
    fn test_resolve_href_percent_encoded() {
        assert_eq!(resolve_href("OEBPS", "my%20chapter.xhtml"), "OEBPS/my chapter.xhtml");
    }
}
