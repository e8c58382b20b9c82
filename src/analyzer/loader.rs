//! Encoding-resilient source loading
//!
//! Candidates are tried strictly in order and the first one that decodes
//! without error wins. No content sniffing: Shift-JIS accepts many EUC-JP
//! byte sequences, so such files come back as Shift-JIS.
//!
//! `shift_jis` decodes with the WHATWG mapping, which is Windows-31J
//! (CP932). NEC and IBM extension rows such as circled digits are accepted,
//! so some files that a strict JIS X 0208 decoder rejects load as Shift-JIS
//! here instead of falling through to `latin-1`.

use encoding_rs::{EUC_JP, Encoding, ISO_2022_JP, SHIFT_JIS};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

use super::scanner::ScannedFile;
use crate::types::{JspError, Result, SourceEncoding, SourceFile};

#[derive(Debug, Clone)]
pub struct Loader {
    encodings: Vec<SourceEncoding>,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            encodings: SourceEncoding::FALLBACK_ORDER.to_vec(),
        }
    }
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom candidate list. Without latin-1 at the end, decoding
    /// can fail.
    pub fn with_encodings(encodings: Vec<SourceEncoding>) -> Self {
        Self { encodings }
    }

    pub fn encodings(&self) -> &[SourceEncoding] {
        &self.encodings
    }

    /// Read a file and decode it. The handle is closed before decoding.
    pub fn load(&self, path: &Path) -> Result<(String, SourceEncoding)> {
        let bytes = fs::read(path)?;
        self.decode(&bytes).ok_or_else(|| JspError::Decode {
            path: path.to_path_buf(),
        })
    }

    /// Load a scanned file into a [`SourceFile`]
    pub fn load_source(&self, file: &ScannedFile) -> Result<SourceFile> {
        let (text, encoding) = self.load(&file.path)?;
        if encoding != SourceEncoding::Utf8 {
            debug!("{} decoded as {}", file.relative_path, encoding);
        }
        Ok(SourceFile::new(
            file.path.clone(),
            file.relative_path.clone(),
            file.kind,
            text,
            encoding,
            file.size,
        ))
    }

    pub fn decode(&self, bytes: &[u8]) -> Option<(String, SourceEncoding)> {
        self.encodings.iter().find_map(|&encoding| {
            let decoded = decode_as(bytes, encoding);
            if decoded.is_none() {
                trace!("{} rejected", encoding);
            }
            decoded.map(|text| (text, encoding))
        })
    }
}

/// Strict decode: `None` on the first malformed sequence
pub fn decode_as(bytes: &[u8], encoding: SourceEncoding) -> Option<String> {
    match encoding {
        SourceEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
        SourceEncoding::ShiftJis => strict(SHIFT_JIS, bytes),
        SourceEncoding::EucJp => strict(EUC_JP, bytes),
        SourceEncoding::Iso2022Jp => strict(ISO_2022_JP, bytes),
        // every byte maps to the code point of the same value
        SourceEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
