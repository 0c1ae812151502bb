// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    steps: u64,
    sections: Vec<Vec<u8>>,
}

fn payload() -> Payload {
    Payload {
        name: "exp/A".to_string(),
        steps: 12_000,
        sections: vec![vec![0, 1, 2], vec![]],
    }
}

#[test]
fn round_trip() {
    let blob = encode(&payload()).unwrap();
    let back: Payload = decode(&blob).unwrap();
    assert_eq!(back, payload());
}

#[test]
fn blob_is_tagged() {
    let blob = encode(&payload()).unwrap();
    assert_eq!(blob[0], FORMAT_BINCODE);
}

#[test]
fn empty_blob_is_rejected() {
    assert!(matches!(decode::<Payload>(&[]), Err(CodecError::Empty)));
}

#[test]
fn unknown_tag_is_rejected() {
    let mut blob = encode(&payload()).unwrap();
    blob[0] = 0x7f;
    assert!(matches!(
        decode::<Payload>(&blob),
        Err(CodecError::UnknownFormat(0x7f))
    ));
}

#[test]
fn truncated_body_is_a_decode_error() {
    let blob = encode(&payload()).unwrap();
    assert!(matches!(
        decode::<Payload>(&blob[..2]),
        Err(CodecError::Decode(_))
    ));
}
