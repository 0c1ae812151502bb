// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_id_display() {
    let id = JobId::new("attempt-1");
    assert_eq!(id.to_string(), "attempt-1");
}

#[test]
fn job_id_equality() {
    let id1 = JobId::new("a");
    let id2 = JobId::new("a");
    let id3 = JobId::new("b");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
}

#[test]
fn job_id_serde() {
    let id = JobId::new("my-attempt");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"my-attempt\"");

    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn short_truncates() {
    assert_eq!("abcdefgh".short(4), "abcd");
    assert_eq!("abc".short(4), "abc");
    assert_eq!(JobId::new("abcdefgh").short(6), "abcdef");
}

#[test]
fn uuid_gen_is_unique_and_simple() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 32);
    assert!(!a.contains('-'));
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("job");
    assert_eq!(gen.next(), "job-1");
    assert_eq!(gen.next(), "job-2");
}
