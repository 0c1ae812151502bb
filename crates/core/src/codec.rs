// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged binary codec for opaque object-store blobs.
//!
//! Every blob starts with a one-byte format tag so readers can reject
//! foreign or future encodings instead of misparsing them. The only tag in
//! this build is bincode.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Format tag for bincode-encoded bodies.
pub const FORMAT_BINCODE: u8 = 0x01;

/// Errors from blob encode/decode
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty blob")]
    Empty,
    #[error("unknown format tag: {0:#04x}")]
    UnknownFormat(u8),
    #[error("encode failed: {0}")]
    Encode(#[source] bincode::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] bincode::Error),
}

/// Encode a value as a tagged blob.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serialize(value).map_err(CodecError::Encode)?;
    let mut blob = Vec::with_capacity(body.len() + 1);
    blob.push(FORMAT_BINCODE);
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Decode a tagged blob back into a value.
pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> Result<T, CodecError> {
    let (tag, body) = blob.split_first().ok_or(CodecError::Empty)?;
    if *tag != FORMAT_BINCODE {
        return Err(CodecError::UnknownFormat(*tag));
    }
    bincode::deserialize(body).map_err(CodecError::Decode)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
