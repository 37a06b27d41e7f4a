//! PDB / MOBI / EXTH header parsing.

use crate::error::{Error, Result};
use crate::util::decode_text;

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// PDB (Palm Database) header info extracted from bytes.
#[derive(Debug)]
pub struct PdbInfo {
    /// Database name (bytes 0-31, null-terminated).
    pub name: String,
    pub num_records: u16,
    /// Record offsets within the file.
    pub record_offsets: Vec<u32>,
}

impl PdbInfo {
    /// Parse the PDB header from the first 78+ bytes of a file.
    ///
    /// Accepts `BOOKMOBI` (MOBI) and `TEXtREAd` (plain PalmDoc) databases.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 78 {
            return Err(Error::InvalidMobi("PDB header too short".into()));
        }

        let name_end = data[..32].iter().position(|&b| b == 0).unwrap_or(32);
        let name = String::from_utf8_lossy(&data[..name_end]).to_string();

        // Bytes 60-67: type/creator
        let ident = &data[60..68];
        if ident != b"BOOKMOBI" && !ident.eq_ignore_ascii_case(b"TEXTREAD") {
            return Err(Error::InvalidMobi(format!(
                "unknown book type: {:?}",
                String::from_utf8_lossy(ident)
            )));
        }

        // Bytes 76-77: number of records
        let num_records = u16::from_be_bytes([data[76], data[77]]);
        if num_records == 0 {
            return Err(Error::InvalidMobi("PDB has no records".into()));
        }

        // Record info list: 8 bytes per record, starting at byte 78
        let records_start = 78;
        let records_len = num_records as usize * 8;
        if data.len() < records_start + records_len {
            return Err(Error::InvalidMobi("PDB record list truncated".into()));
        }

        let mut record_offsets = Vec::with_capacity(num_records as usize);
        for i in 0..num_records as usize {
            let pos = records_start + i * 8;
            let offset =
                u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            record_offsets.push(offset);
        }

        Ok(Self {
            name,
            num_records,
            record_offsets,
        })
    }

    /// Byte range of a record within the file.
    pub fn record_range(&self, index: usize, file_len: u64) -> Result<(u64, u64)> {
        if index >= self.record_offsets.len() {
            return Err(Error::InvalidMobi(format!(
                "record index {index} out of bounds"
            )));
        }

        let start = self.record_offsets[index] as u64;
        let end = if index + 1 < self.record_offsets.len() {
            self.record_offsets[index + 1] as u64
        } else {
            file_len
        };
        if start > end || end > file_len {
            return Err(Error::InvalidMobi(format!(
                "record {index} has invalid bounds"
            )));
        }

        Ok((start, end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl Encoding {
    /// encoding_rs label for this codepage, if known.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Encoding::Cp1252 => Some("windows-1252"),
            Encoding::Utf8 => Some("utf-8"),
            Encoding::Unknown(_) => None,
        }
    }
}

/// MOBI header (record 0).
///
/// A `TEXtREAd` database has only the 16-byte PalmDoc header; all MOBI
/// fields then keep their defaults.
#[derive(Debug, Clone)]
pub struct MobiHeader {
    pub compression: Compression,
    pub text_record_count: u16,
    pub text_record_size: u16,
    pub encryption: u16,
    pub encoding: Encoding,
    pub first_image_index: u32,
    /// Full book title from the header's title offset/length.
    pub title: String,
    pub exth_flags: u32,
    pub extra_data_flags: u16,
}

impl MobiHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::InvalidMobi("MOBI header too short".into()));
        }

        let compression = match u16::from_be_bytes([data[0], data[1]]) {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        };

        let text_record_count = u16::from_be_bytes([data[8], data[9]]);
        let text_record_size = u16::from_be_bytes([data[10], data[11]]);
        let encryption = u16::from_be_bytes([data[12], data[13]]);

        // Plain PalmDoc: nothing beyond the 16-byte header
        if data.len() <= 16 {
            return Ok(Self {
                compression,
                text_record_count,
                text_record_size,
                encryption,
                encoding: Encoding::Cp1252,
                first_image_index: NULL_INDEX,
                title: String::new(),
                exth_flags: 0,
                extra_data_flags: 0,
            });
        }

        if data.len() < 32 {
            return Err(Error::InvalidMobi("MOBI header truncated".into()));
        }

        let header_length = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        let codepage = u32::from_be_bytes([data[28], data[29], data[30], data[31]]);

        let encoding = match codepage {
            1252 => Encoding::Cp1252,
            65001 => Encoding::Utf8,
            n => Encoding::Unknown(n),
        };

        // Title offset and length at 0x54-0x5C
        let title = if data.len() >= 0x5C {
            let title_offset =
                u32::from_be_bytes([data[0x54], data[0x55], data[0x56], data[0x57]]) as usize;
            let title_length =
                u32::from_be_bytes([data[0x58], data[0x59], data[0x5A], data[0x5B]]) as usize;
            if title_length > 0 && title_offset.saturating_add(title_length) <= data.len() {
                decode_text(&data[title_offset..title_offset + title_length], encoding.label())
                    .to_string()
            } else {
                String::new()
            }
        } else {
            String::new()
        };

        let first_image_index = if data.len() >= 0x70 {
            u32::from_be_bytes([data[0x6C], data[0x6D], data[0x6E], data[0x6F]])
        } else {
            NULL_INDEX
        };

        let exth_flags = if data.len() >= 0x84 {
            u32::from_be_bytes([data[0x80], data[0x81], data[0x82], data[0x83]])
        } else {
            0
        };

        let extra_data_flags = if data.len() >= 0xF4 && header_length >= 0xE4 {
            u16::from_be_bytes([data[0xF2], data[0xF3]])
        } else {
            0
        };

        Ok(Self {
            compression,
            text_record_count,
            text_record_size,
            encryption,
            encoding,
            first_image_index,
            title,
            exth_flags,
            extra_data_flags,
        })
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }

    /// Offset of the EXTH block within record 0: right after the MOBI header.
    pub fn exth_offset(&self, record0: &[u8]) -> Option<usize> {
        if !self.has_exth() || record0.len() < 24 {
            return None;
        }
        let header_length =
            u32::from_be_bytes([record0[20], record0[21], record0[22], record0[23]]) as usize;
        let offset = 16 + header_length;
        (offset < record0.len()).then_some(offset)
    }
}

/// EXTH header (extended metadata records).
#[derive(Debug, Default)]
pub struct ExthHeader {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub pub_date: Option<String>,
    pub rights: Option<String>,
    /// EXTH 108 "contributor", typically the producing application.
    pub contributor: Option<String>,
    pub cover_offset: Option<u32>,
}

impl ExthHeader {
    pub fn parse(data: &[u8], encoding: Encoding) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::InvalidMobi("EXTH header too short".into()));
        }
        if &data[0..4] != b"EXTH" {
            return Err(Error::InvalidMobi("invalid EXTH signature".into()));
        }

        let record_count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let mut exth = ExthHeader::default();
        let mut pos = 12;

        let decode =
            |bytes: &[u8]| -> String { decode_text(bytes, encoding.label()).trim().to_string() };

        for _ in 0..record_count {
            if pos + 8 > data.len() {
                break;
            }

            let record_type =
                u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            let record_len =
                u32::from_be_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                    as usize;
            if record_len < 8 || pos + record_len > data.len() {
                break;
            }

            let content = &data[pos + 8..pos + record_len];

            match record_type {
                100 => exth.authors.push(decode(content)),
                101 => exth.publisher = Some(decode(content)),
                103 => exth.description = Some(decode(content)),
                105 => {
                    for subject in decode(content).split(';') {
                        let s = subject.trim().to_string();
                        if !s.is_empty() {
                            exth.subjects.push(s);
                        }
                    }
                }
                106 => exth.pub_date = Some(decode(content)),
                108 => exth.contributor = Some(decode(content)),
                109 => exth.rights = Some(decode(content)),
                201 => {
                    if content.len() >= 4 {
                        let val =
                            u32::from_be_bytes([content[0], content[1], content[2], content[3]]);
                        if val != NULL_INDEX {
                            exth.cover_offset = Some(val);
                        }
                    }
                }
                503 => exth.title = Some(decode(content)),
                _ => {}
            }

            pos += record_len;
        }

        Ok(exth)
    }
}
