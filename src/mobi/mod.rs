//! MOBI backend: Palm database container, MOBI/EXTH headers, PalmDOC text.

mod headers;
mod palmdoc;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::props::{DocumentProperty, ImageData};
use crate::util::{decode_text, detect_image_mime, has_extension, read_prefix};

pub(crate) use headers::{Compression, ExthHeader, MobiHeader, NULL_INDEX, PdbInfo};

/// An opened MOBI (or plain PalmDoc) document.
///
/// Construction parses the PDB record table, the MOBI and EXTH headers, and
/// decompresses the full text stream. Encrypted books and HUFF/CDIC
/// compression are rejected.
pub struct MobiDoc {
    path: PathBuf,
    title: String,
    exth: ExthHeader,
    html_data: Vec<u8>,
    cover: Option<ImageData>,
}

impl MobiDoc {
    /// Probe whether a file looks like a Palm book database.
    ///
    /// Extension mode accepts `.mobi`, `.prc` and `.azw`. Sniff mode reads
    /// the 68-byte PDB header prefix and checks the type/creator magic
    /// (`BOOKMOBI` or `TEXtREAd`).
    pub fn is_supported_file(path: &Path, sniff: bool) -> bool {
        if sniff {
            let Ok(prefix) = read_prefix(path, 68) else {
                return false;
            };
            if prefix.len() < 68 {
                return false;
            }
            let ident = &prefix[60..68];
            return ident == b"BOOKMOBI" || ident.eq_ignore_ascii_case(b"TEXTREAD");
        }
        has_extension(path, "mobi") || has_extension(path, "prc") || has_extension(path, "azw")
    }

    /// Open and fully parse a MOBI file.
    pub fn create_from_file(path: &Path) -> Result<Self> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        let file_len = data.len() as u64;

        let pdb = PdbInfo::parse(&data)?;
        let (start, end) = pdb.record_range(0, file_len)?;
        let record0 = &data[start as usize..end as usize];
        let mobi = MobiHeader::parse(record0)?;

        if mobi.encryption != 0 {
            return Err(Error::InvalidMobi("encrypted books are not supported".into()));
        }
        match mobi.compression {
            Compression::None | Compression::PalmDoc => {}
            Compression::Huffman => {
                return Err(Error::InvalidMobi(
                    "HUFF/CDIC compression is not supported".into(),
                ));
            }
            Compression::Unknown(n) => {
                return Err(Error::InvalidMobi(format!("unknown compression type {n}")));
            }
        }

        // EXTH metadata is optional; a malformed block degrades to no
        // metadata rather than failing the load.
        let exth = match mobi.exth_offset(record0) {
            Some(offset) => match ExthHeader::parse(&record0[offset..], mobi.encoding) {
                Ok(exth) => exth,
                Err(e) => {
                    warn!(error = %e, "ignoring malformed EXTH block");
                    ExthHeader::default()
                }
            },
            None => ExthHeader::default(),
        };

        // Decompress the text stream (records 1..=count).
        let mut text = Vec::new();
        for i in 1..=mobi.text_record_count as usize {
            let (start, end) = pdb.record_range(i, file_len)?;
            let record = &data[start as usize..end as usize];
            let record = strip_trailing_data(record, mobi.extra_data_flags);
            match mobi.compression {
                Compression::PalmDoc => text.extend_from_slice(&palmdoc::decompress(record)),
                _ => text.extend_from_slice(record),
            }
        }
        let html_data = decode_text(&text, mobi.encoding.label())
            .into_owned()
            .into_bytes();

        let cover = extract_cover(&data, &pdb, &mobi, &exth, file_len);

        let title = exth
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                if mobi.title.is_empty() {
                    pdb.name.clone()
                } else {
                    mobi.title.clone()
                }
            });

        debug!(path = %path.display(), records = pdb.num_records, "opened MOBI");
        Ok(Self {
            path: path.to_path_buf(),
            title,
            exth,
            html_data,
            cover,
        })
    }

    /// The path this document was opened from.
    pub fn file_name(&self) -> &Path {
        &self.path
    }

    pub fn property(&self, prop: DocumentProperty) -> Option<String> {
        let value = match prop {
            DocumentProperty::Title => Some(self.title.clone()),
            DocumentProperty::Author => Some(self.exth.authors.join(", ")),
            DocumentProperty::Publisher => self.exth.publisher.clone(),
            DocumentProperty::Subject => Some(self.exth.subjects.join("; ")),
            DocumentProperty::CreationDate => self.exth.pub_date.clone(),
            DocumentProperty::Copyright => self.exth.rights.clone(),
            DocumentProperty::CreatorApp => self.exth.contributor.clone(),
            DocumentProperty::ModificationDate => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// The decompressed book HTML, re-encoded as UTF-8.
    pub fn html_data(&self) -> &[u8] {
        &self.html_data
    }

    pub fn cover_image(&self) -> Option<&ImageData> {
        self.cover.as_ref()
    }
}

/// Locate the cover image record via EXTH 201 + the first-image index.
fn extract_cover(
    data: &[u8],
    pdb: &PdbInfo,
    mobi: &MobiHeader,
    exth: &ExthHeader,
    file_len: u64,
) -> Option<ImageData> {
    let cover_offset = exth.cover_offset?;
    if mobi.first_image_index == NULL_INDEX {
        return None;
    }
    let index = mobi.first_image_index.checked_add(cover_offset)? as usize;
    let (start, end) = match pdb.record_range(index, file_len) {
        Ok(range) => range,
        Err(e) => {
            warn!(error = %e, "cover offset points outside the record table");
            return None;
        }
    };
    let bytes = &data[start as usize..end as usize];
    let media_type = detect_image_mime(bytes)?;
    Some(ImageData::new(bytes.to_vec(), media_type))
}

/// Remove per-record trailing data entries declared by the MOBI
/// extra-data flags (bits 1-15: backward-varint-sized entries; bit 0:
/// multibyte character overlap).
fn strip_trailing_data(record: &[u8], flags: u16) -> &[u8] {
    if flags == 0 || record.is_empty() {
        return record;
    }

    let mut end = record.len();

    for bit in 1..16 {
        if flags & (1 << bit) != 0 {
            if end == 0 {
                break;
            }
            // Backward varint: low 7 bits are value, a set high bit stops
            let mut size = 0usize;
            let mut shift = 0;
            for j in (0..end).rev() {
                let byte = record[j];
                size |= ((byte & 0x7F) as usize) << shift;
                shift += 7;
                if byte & 0x80 != 0 || shift >= 28 {
                    break;
                }
            }
            if size > 0 && size <= end {
                end -= size;
            }
        }
    }

    if flags & 1 != 0 && end > 0 {
        let overlap = (record[end - 1] & 3) as usize + 1;
        if overlap <= end {
            end -= overlap;
        }
    }

    &record[..end]
}

/// Test/tooling backend: wraps already-decoded HTML bytes without any file
/// behind it. Constructed directly, bypassing format detection; reports no
/// file name and no metadata.
pub struct MobiTestDoc {
    html_data: Vec<u8>,
}

impl MobiTestDoc {
    pub fn new(html_data: impl Into<Vec<u8>>) -> Self {
        Self {
            html_data: html_data.into(),
        }
    }

    pub fn html_data(&self) -> &[u8] {
        &self.html_data
    }
}
