//! Trailer metadata extraction
//!
//! Some replays carry an appended trailer written by a shader-patch extension. Its layout,
//! read backwards from the end of the file:
//!
//! ```text
//! ... | extra data blocks ... | signature (23 bytes) | extra-data offset: i32 | version: i32 |
//! ```
//!
//! The extra data is a run of `i32` length-prefixed blocks. The first block declaring more
//! than [`TEXT_BLOCK_MIN_LEN`] bytes is taken to be INI text, which lists one
//! `DRIVER_NAME=<value>` line per car in car-slot order. That threshold is a heuristic of the
//! format and is applied as is.
//!
//! Extraction is best-effort: [`driver_names`] never fails, it returns an empty list when
//! anything about the trailer is missing or malformed.

use thiserror::Error;
use tracing::{debug, trace};

use super::reader::ByteReader;

/// Signature that precedes the trailer's offset and version fields.
pub const TRAILER_SIGNATURE: &str = "__AC_SHADERS_PATCH_v1__";

/// Only trailer version understood.
pub const TRAILER_VERSION: i32 = 1;

/// Blocks longer than this are treated as the INI text block.
pub const TEXT_BLOCK_MIN_LEN: i32 = 255;

const DRIVER_NAME_KEY: &str = "DRIVER_NAME=";

/// Reason trailer metadata could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrailerError {
    #[error("buffer too small for a trailer")]
    TooSmall,
    #[error("trailer signature not found")]
    MissingSignature,
    #[error("trailer fields truncated")]
    Truncated,
    #[error("unsupported trailer version {0}")]
    UnsupportedVersion(i32),
    #[error("extra data offset {0} outside buffer")]
    BadOffset(i32),
    #[error("no text block found in extra data")]
    NoTextBlock,
    #[error("text block could not be decoded")]
    MalformedText,
}

/// Driver names listed in the trailer, in car-slot order.
///
/// Returns an empty list when the trailer is absent or unusable.
pub fn driver_names(data: &[u8]) -> Vec<String> {
    match read_trailer_text(data) {
        Ok(text) => {
            let names = parse_driver_names(text);
            debug!("Trailer metadata lists {} drivers", names.len());
            names
        }
        Err(reason) => {
            debug!("Trailer metadata unavailable: {}", reason);
            Vec::new()
        }
    }
}

/// Locate the trailer and return its INI text block.
pub fn read_trailer_text(data: &[u8]) -> Result<&str, TrailerError> {
    let signature = TRAILER_SIGNATURE.as_bytes();
    if data.len() <= signature.len() + 8 {
        return Err(TrailerError::TooSmall);
    }

    let signature_offset = data.len() - signature.len() - 8;
    let mut reader = ByteReader::at(data, signature_offset).map_err(|_| TrailerError::TooSmall)?;
    let found = reader.take(signature.len()).map_err(|_| TrailerError::Truncated)?;
    if found != signature {
        return Err(TrailerError::MissingSignature);
    }

    let extra_offset = reader.read_i32().map_err(|_| TrailerError::Truncated)?;
    let version = reader.read_i32().map_err(|_| TrailerError::Truncated)?;
    if version != TRAILER_VERSION {
        return Err(TrailerError::UnsupportedVersion(version));
    }
    if extra_offset <= 0 || extra_offset as usize >= data.len() {
        return Err(TrailerError::BadOffset(extra_offset));
    }

    let mut reader = ByteReader::at(data, extra_offset as usize)
        .map_err(|_| TrailerError::BadOffset(extra_offset))?;
    find_text_block(&mut reader)?;
    reader.read_string().map_err(|_| TrailerError::MalformedText)
}

/// Advance past short blocks until the reader sits on the text block's length prefix.
fn find_text_block(reader: &mut ByteReader<'_>) -> Result<(), TrailerError> {
    while reader.remaining() >= 4 {
        let block_start = reader.position();
        let block_len = reader.read_i32().map_err(|_| TrailerError::Truncated)?;

        if block_len > TEXT_BLOCK_MIN_LEN {
            reader.seek(block_start).map_err(|_| TrailerError::Truncated)?;
            return Ok(());
        }
        if block_len <= 0 {
            break;
        }

        trace!("Skipping {}-byte extra data block at offset {}", block_len, block_start);
        if reader.skip(block_len as usize).is_err() || reader.remaining() == 0 {
            break;
        }
    }
    Err(TrailerError::NoTextBlock)
}

/// Collect every `DRIVER_NAME=` value from INI text.
///
/// Values are trimmed and a single pair of surrounding quotes is removed; empty values are
/// dropped.
pub fn parse_driver_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(DRIVER_NAME_KEY) {
        let value_start = &rest[start + DRIVER_NAME_KEY.len()..];
        let end = value_start.find('\n').unwrap_or(value_start.len());
        let name = strip_quotes(value_start[..end].trim());
        if !name.is_empty() {
            names.push(name.to_owned());
        }
        rest = &value_start[end..];
    }

    names
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
