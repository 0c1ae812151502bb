// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    trailing_semicolon = {
        &["export A=1;"], "run", "export A=1; run"
    },
    bare_statement = {
        &["export A=1"], "run", "export A=1; run"
    },
    two_statements = {
        &["export A=1;", "export B=2"], "run", "export A=1; export B=2; run"
    },
)]
fn env_prefixing(env: &[&str], cmd: &str, expected: &str) {
    let env: Vec<String> = env.iter().map(|s| s.to_string()).collect();
    assert_eq!(with_env(cmd, &env), expected);
}

#[test]
fn no_env_statements_leaves_cmd_untouched() {
    assert_eq!(with_env("echo hi", &[]), "echo hi");
}

#[test]
fn require_success_passes_zero() {
    let output = SshOutput::ok("done");
    assert_eq!(output.clone().require_success().unwrap(), output);
}

#[test]
fn require_success_flags_nonzero() {
    let output = SshOutput::failed(2, "pip exploded");
    assert!(matches!(
        output.require_success(),
        Err(DriverError::RemoteNonZero(2))
    ));
}

#[test]
fn ssh_timeout_is_not_fatal() {
    let err = DriverError::SshTimeout(std::time::Duration::from_secs(300));
    assert!(err.is_ssh_timeout());
    let err = DriverError::RemoteNonZero(1);
    assert!(!err.is_ssh_timeout());
}
