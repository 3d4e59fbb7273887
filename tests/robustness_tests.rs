use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_malformed_commands_are_skipped() {
    let file = common::commands_file(&[
        "register, alice, ,",
        "register, bob, ,",
        // Unknown operation
        "withdraw, alice, , 10",
        // Non-numeric amount
        "send, alice, bob, lots",
        // Malformed item id
        "buy, alice, hoody,",
        // Valid transfer
        "send, alice, bob, 10",
    ]);

    let mut cmd = Command::new(cargo_bin!("merch-ledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading command"))
        .stdout(predicate::str::contains(r#"{"username":"alice","coins":990"#))
        .stdout(predicate::str::contains(r#"{"username":"bob","coins":1010"#));
}

#[test]
fn test_rejected_operations_leave_balances_unchanged() {
    let file = common::commands_file(&[
        "register, alice, ,",
        "register, bob, ,",
        // Duplicate registration
        "register, alice, ,",
        // Non-positive amounts
        "send, alice, bob, 0",
        "send, alice, bob, -50",
        // Self transfer
        "send, alice, alice, 10",
        // Unknown receiver and sender
        "send, alice, carol, 10",
        "send, carol, alice, 10",
        // Unknown item
        "buy, alice, 99,",
        // Amount far beyond any balance
        "send, alice, bob, 9223372036854775807",
    ]);

    let mut cmd = Command::new(cargo_bin!("merch-ledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing command"))
        .stdout(predicate::str::contains(
            r#"{"username":"alice","coins":1000,"inventory":[],"coinHistory":{"received":[],"sent":[]}}"#,
        ))
        .stdout(predicate::str::contains(
            r#"{"username":"bob","coins":1000,"inventory":[],"coinHistory":{"received":[],"sent":[]}}"#,
        ))
        .stdout(predicate::str::contains("carol").not());
}
