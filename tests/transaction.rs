//! Transaction and savepoint orchestration against a scripted backend.

mod common;

use common::MockBackend;
use pgconn::{Connection, Error, IsolationLevel, LogLevel, TransactionStatus};

#[test]
fn with_transaction_commits_on_success() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN; SET TRANSACTION ISOLATION LEVEL READ COMMITTED;");
        s.send_command_complete("BEGIN");
        s.send_command_complete("SET");
        s.send_ready(b'T');

        s.expect_query("UPDATE t SET x = 1");
        s.send_command_complete("UPDATE 3");
        s.send_ready(b'T');

        s.expect_query("COMMIT;");
        s.send_command_complete("COMMIT");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    let affected = conn
        .with_transaction(IsolationLevel::ReadCommitted, |conn| {
            conn.query_drop("UPDATE t SET x = 1")
        })
        .unwrap();
    assert_eq!(affected, 3);
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn with_transaction_rolls_back_on_error() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN; SET TRANSACTION ISOLATION LEVEL READ COMMITTED;");
        s.send_command_complete("BEGIN");
        s.send_command_complete("SET");
        s.send_ready(b'T');

        s.expect_query("SELECT * FROM nosuchtable");
        s.send_error("42P01", "relation \"nosuchtable\" does not exist");
        s.send_ready(b'E');

        s.expect_query("ROLLBACK;");
        s.send_command_complete("ROLLBACK");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    let err = conn
        .with_transaction(IsolationLevel::ReadCommitted, |conn| {
            conn.query_drop("SELECT * FROM nosuchtable").map(|_| ())
        })
        .unwrap_err();
    assert_eq!(err.sqlstate(), Some("42P01"));
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn with_transaction_serializable_isolation() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN; SET TRANSACTION ISOLATION LEVEL SERIALIZABLE;");
        s.send_command_complete("BEGIN");
        s.send_command_complete("SET");
        s.send_ready(b'T');

        s.expect_query("COMMIT;");
        s.send_command_complete("COMMIT");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    conn.with_transaction(IsolationLevel::Serializable, |_conn| Ok(()))
        .unwrap();

    conn.close().unwrap();
    mock.join();
}

#[test]
fn nested_transaction_runs_body_without_begin() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN");
        s.send_command_complete("BEGIN");
        s.send_ready(b'T');

        // The nested call must not BEGIN or COMMIT.
        s.expect_query("SELECT 1");
        s.send_row_description(&[("?column?", 23)]);
        s.send_data_row(&[Some(b"1")]);
        s.send_command_complete("SELECT 1");
        s.send_ready(b'T');

        s.expect_query("COMMIT");
        s.send_command_complete("COMMIT");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    conn.query_drop("BEGIN").unwrap();
    assert_eq!(conn.transaction_status(), TransactionStatus::InTransaction);

    conn.with_transaction(IsolationLevel::ReadCommitted, |conn| {
        conn.query_drop("SELECT 1").map(|_| ())
    })
    .unwrap();
    // Still in the caller's transaction.
    assert_eq!(conn.transaction_status(), TransactionStatus::InTransaction);

    conn.query_drop("COMMIT").unwrap();
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn failed_transaction_rejects_new_scopes() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN");
        s.send_command_complete("BEGIN");
        s.send_ready(b'T');

        s.expect_query("SELECT * FROM nosuchtable");
        s.send_error("42P01", "relation \"nosuchtable\" does not exist");
        s.send_ready(b'E');

        // Neither with_transaction nor with_savepoint may touch the wire
        // while the transaction is failed.
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    conn.query_drop("BEGIN").unwrap();
    let _ = conn.query_drop("SELECT * FROM nosuchtable").unwrap_err();
    assert_eq!(conn.transaction_status(), TransactionStatus::Failed);

    let err = conn
        .with_transaction(IsolationLevel::ReadCommitted, |_conn| Ok(()))
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));

    let err = conn
        .with_savepoint(IsolationLevel::ReadCommitted, |_conn| Ok(()))
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));

    conn.close().unwrap();
    mock.join();
}

#[test]
fn savepoint_rolls_back_inner_failure_and_outer_commits() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        // Outer with_savepoint is not in a transaction: it delegates to
        // with_transaction.
        s.expect_query("BEGIN; SET TRANSACTION ISOLATION LEVEL READ COMMITTED;");
        s.send_command_complete("BEGIN");
        s.send_command_complete("SET");
        s.send_ready(b'T');

        // Inner with_savepoint allocates sp1.
        s.expect_query("SAVEPOINT sp1");
        s.send_command_complete("SAVEPOINT");
        s.send_ready(b'T');

        s.expect_query("SELECT * FROM nosuchtable");
        s.send_error("42P01", "relation \"nosuchtable\" does not exist");
        s.send_ready(b'E');

        s.expect_query("ROLLBACK TO sp1");
        s.send_command_complete("ROLLBACK");
        s.send_ready(b'T');

        // Outer body continues and commits.
        s.expect_query("UPDATE t SET x = 1");
        s.send_command_complete("UPDATE 1");
        s.send_ready(b'T');

        s.expect_query("COMMIT;");
        s.send_command_complete("COMMIT");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    conn.with_savepoint(IsolationLevel::ReadCommitted, |conn| {
        let inner = conn.with_savepoint(IsolationLevel::ReadCommitted, |conn| {
            conn.query_drop("SELECT * FROM nosuchtable").map(|_| ())
        });
        assert!(inner.is_err());

        // The savepoint rollback restored the transaction; keep going.
        conn.query_drop("UPDATE t SET x = 1").map(|_| ())
    })
    .unwrap();

    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn swallowed_failure_still_rolls_back() {
    let mock = MockBackend::start(|s| {
        s.handshake();

        s.expect_query("BEGIN; SET TRANSACTION ISOLATION LEVEL READ COMMITTED;");
        s.send_command_complete("BEGIN");
        s.send_command_complete("SET");
        s.send_ready(b'T');

        s.expect_query("SELECT * FROM nosuchtable");
        s.send_error("42P01", "relation \"nosuchtable\" does not exist");
        s.send_ready(b'E');

        // Body swallowed the error but the transaction is failed: the
        // orchestrator must roll back, not commit.
        s.expect_query("ROLLBACK;");
        s.send_command_complete("ROLLBACK");
        s.send_ready(b'I');

        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    conn.with_transaction(IsolationLevel::ReadCommitted, |conn| {
        let _ = conn.query_drop("SELECT * FROM nosuchtable");
        Ok(())
    })
    .unwrap();
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}
