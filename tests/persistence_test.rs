#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: register two users and move some coins
    let csv1 = common::commands_file(&[
        "register, alice, ,",
        "register, bob, ,",
        "send, alice, bob, 100",
    ]);

    let mut cmd1 = Command::new(cargo_bin!("merch-ledger"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(r#""username":"alice","coins":900"#));
    assert!(stdout1.contains(r#""username":"bob","coins":1100"#));

    // 2. Second run: the users already exist and keep their balances
    let csv2 = common::commands_file(&[
        "register, alice, ,",
        "send, alice, bob, 50",
        "buy, bob, 4,",
    ]);

    let mut cmd2 = Command::new(cargo_bin!("merch-ledger"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    let stderr2 = String::from_utf8_lossy(&output2.stderr);

    assert!(stderr2.contains("username already exists"));
    assert!(stdout2.contains(r#""username":"alice","coins":850"#));
    assert!(stdout2.contains(
        r#"{"username":"bob","coins":1140,"inventory":[{"type":"pen","quantity":1}],"coinHistory":{"received":[{"fromUser":"alice","amount":100},{"fromUser":"alice","amount":50}],"sent":[]}}"#
    ));
}
