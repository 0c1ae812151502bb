// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    running = { JobState::Running, 0 },
    success = { JobState::Success, 1 },
    failure = { JobState::Failure, 2 },
    aborted = { JobState::Aborted, 3 },
    timeout = { JobState::Timeout, 4 },
    starting = { JobState::Starting, 5 },
    preempted = { JobState::Preempted, 6 },
    armed = { JobState::Armed, 7 },
    unknown = { JobState::Unknown, -1 },
)]
fn wire_codes_round_trip(state: JobState, code: i32) {
    assert_eq!(state.code(), code);
    assert_eq!(JobState::from_code(code), state);
}

#[test]
fn unrecognized_code_decodes_to_unknown() {
    assert_eq!(JobState::from_code(42), JobState::Unknown);
    assert_eq!(JobState::from_code(-7), JobState::Unknown);
}

#[test]
fn terminal_and_active_sets() {
    assert!(JobState::Success.is_terminal());
    assert!(JobState::Failure.is_terminal());
    assert!(JobState::Preempted.is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(!JobState::Armed.is_terminal());

    assert!(JobState::Starting.is_active());
    assert!(JobState::Armed.is_active());
    assert!(JobState::Running.is_active());
    assert!(!JobState::Success.is_active());
}

#[test]
fn parse_state_names() {
    assert_eq!("running".parse::<JobState>().unwrap(), JobState::Running);
    assert_eq!("PREEMPTED".parse::<JobState>().unwrap(), JobState::Preempted);
    assert!("bogus".parse::<JobState>().is_err());
}

#[test]
fn record_yaml_wire_format() {
    let record = JobStateRecord::with_node(JobState::Armed, "polytax-3");
    let yaml = record.to_yaml().unwrap();

    // The wire form carries the integer code, not the name.
    assert!(yaml.contains("state: 7"), "unexpected yaml: {yaml}");
    assert!(yaml.contains("tpu_name: polytax-3"));

    let parsed = JobStateRecord::from_yaml(&yaml).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn record_without_node_name() {
    let yaml = "state: 5\n";
    let parsed = JobStateRecord::from_yaml(yaml).unwrap();
    assert_eq!(parsed.state, JobState::Starting);
    assert!(parsed.tpu_name.is_empty());
}

#[test]
fn record_with_unknown_code_parses() {
    let yaml = "state: 99\ntpu_name: gone\n";
    let parsed = JobStateRecord::from_yaml(yaml).unwrap();
    assert_eq!(parsed.state, JobState::Unknown);
}
