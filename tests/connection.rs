//! Startup, simple query and dispatch behavior against a scripted backend.

mod common;

use common::MockBackend;
use pgconn::{ConnStatus, Connection, Error, LogLevel, TransactionStatus};

#[test]
fn connect_applies_defaults_and_captures_state() {
    let mock = MockBackend::start(|s| {
        let params = s.handshake();
        assert!(params.contains(&("user".to_string(), "alice".to_string())));
        assert!(params.contains(&("database".to_string(), "test".to_string())));
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice dbname=test"), LogLevel::Nothing)
        .unwrap();

    assert_eq!(conn.status(), ConnStatus::Ready);
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);
    assert_eq!(conn.runtime_parameter("server_version"), Some("13.3"));
    assert_eq!(conn.runtime_parameter("nonexistent"), None);
    assert_eq!(conn.backend_key(), Some((1234, 5678)));

    conn.close().unwrap();
    assert_eq!(conn.status(), ConnStatus::Disconnected);
    mock.join();
}

#[test]
fn database_defaults_to_user() {
    let mock = MockBackend::start(|s| {
        let params = s.handshake();
        assert!(params.contains(&("database".to_string(), "alice".to_string())));
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();
    conn.close().unwrap();
    mock.join();
}

#[test]
fn simple_query_streams_rows() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("SELECT 1");
        s.send_row_description(&[("?column?", 23)]);
        s.send_data_row(&[Some(b"1")]);
        s.send_command_complete("SELECT 1");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    {
        let mut rows = conn.query("SELECT 1").unwrap();
        assert_eq!(rows.columns().len(), 1);
        assert_eq!(rows.columns()[0].name(), "?column?");
        assert_eq!(rows.columns()[0].type_oid(), 23);

        assert!(rows.next().unwrap());
        let (value,): (i32,) = rows.scan().unwrap();
        assert_eq!(value, 1);
        let (text,): (String,) = rows.scan().unwrap();
        assert_eq!(text, "1");

        assert!(!rows.next().unwrap());
        // The SELECT tag does not report rows affected.
        assert_eq!(rows.rows_affected(), 0);
        assert_eq!(rows.command_tag(), "SELECT 1");
    }

    assert_eq!(conn.status(), ConnStatus::Ready);
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn rowless_command_completes_eagerly() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("INSERT INTO t VALUES (1)");
        s.send_command_complete("INSERT 0 1");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    let affected = conn.query_drop("INSERT INTO t VALUES (1)").unwrap();
    assert_eq!(affected, 1);
    assert_eq!(conn.status(), ConnStatus::Ready);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn empty_query_yields_terminal_empty_result() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("");
        s.send_empty_query_response();
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    let mut rows = conn.query("").unwrap();
    assert!(rows.is_complete());
    assert!(!rows.next().unwrap());
    assert_eq!(rows.rows_affected(), 0);
    drop(rows);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn null_fields_scan_as_none() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("SELECT name FROM t");
        s.send_row_description(&[("name", 25)]);
        s.send_data_row(&[None]);
        s.send_command_complete("SELECT 1");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    {
        let mut rows = conn.query("SELECT name FROM t").unwrap();
        assert!(rows.next().unwrap());
        let (name,): (Option<String>,) = rows.scan().unwrap();
        assert_eq!(name, None);
        // A non-nullable target must refuse the NULL.
        let plain: Result<(String,), Error> = rows.scan();
        assert!(plain.is_err());
        assert!(!rows.next().unwrap());
    }

    conn.close().unwrap();
    mock.join();
}

#[test]
fn server_error_drains_and_connection_recovers() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("SELECT * FROM nosuchtable");
        s.send_error("42P01", "relation \"nosuchtable\" does not exist");
        s.send_ready(b'I');
        s.expect_query("SELECT 1");
        s.send_row_description(&[("?column?", 23)]);
        s.send_data_row(&[Some(b"1")]);
        s.send_command_complete("SELECT 1");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    let err = conn.query("SELECT * FROM nosuchtable").unwrap_err();
    assert_eq!(err.sqlstate(), Some("42P01"));

    // The error was drained through ReadyForQuery: the very next operation
    // succeeds.
    assert_eq!(conn.status(), ConnStatus::Ready);
    let mut rows = conn.query("SELECT 1").unwrap();
    assert!(rows.next().unwrap());
    assert!(!rows.next().unwrap());
    drop(rows);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn md5_password_authentication() {
    let mock = MockBackend::start(|s| {
        s.read_startup();
        s.send_auth_md5([0x01, 0x02, 0x03, 0x04]);

        // "md5" + hex(md5(hex(md5(password || user)) || salt))
        let expected = {
            use md5::{Digest, Md5};
            let inner = format!("{:x}", Md5::digest(b"secretalice"));
            let mut outer = Md5::new();
            outer.update(inner.as_bytes());
            outer.update([0x01, 0x02, 0x03, 0x04]);
            format!("md5{:x}", outer.finalize())
        };
        assert_eq!(s.expect_password(), expected);

        s.send_auth_ok();
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(
        &mock.conn_str("user=alice password=secret"),
        LogLevel::Nothing,
    )
    .unwrap();
    assert_eq!(conn.status(), ConnStatus::Ready);

    conn.close().unwrap();
    mock.join();
}

#[test]
fn cleartext_password_authentication() {
    let mock = MockBackend::start(|s| {
        s.read_startup();
        s.send_auth_cleartext();
        assert_eq!(s.expect_password(), "secret");
        s.send_auth_ok();
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(
        &mock.conn_str("user=alice password=secret"),
        LogLevel::Nothing,
    )
    .unwrap();

    conn.close().unwrap();
    mock.join();
}

#[test]
fn unsupported_auth_method_fails() {
    let mock = MockBackend::start(|s| {
        s.read_startup();
        s.send_auth_unsupported(2); // Kerberos V5
    });

    let err = Connection::connect(
        &mock.conn_str("user=alice password=secret"),
        LogLevel::Nothing,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    mock.join();
}

#[test]
fn missing_password_fails_before_sending() {
    let mock = MockBackend::start(|s| {
        s.read_startup();
        s.send_auth_cleartext();
    });

    let err = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    mock.join();
}

#[test]
fn startup_error_surfaces_immediately() {
    let mock = MockBackend::start(|s| {
        s.read_startup();
        s.send_error_severity("FATAL", "3D000", "database \"nosuchdb\" does not exist");
    });

    let err = Connection::connect(
        &mock.conn_str("user=alice dbname=nosuchdb"),
        LogLevel::Nothing,
    )
    .unwrap_err();
    assert_eq!(err.sqlstate(), Some("3D000"));
    mock.join();
}

#[test]
fn async_messages_are_handled_mid_query() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("SELECT n FROM t");
        s.send_row_description(&[("n", 23)]);
        s.send_data_row(&[Some(b"1")]);
        s.send_notice("01000", "something noteworthy");
        s.send_notification(99, "updates", "payload");
        s.send_parameter_status("TimeZone", "UTC");
        s.send_data_row(&[Some(b"2")]);
        s.send_command_complete("SELECT 2");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    {
        let mut rows = conn.query("SELECT n FROM t").unwrap();
        let mut values = Vec::new();
        while rows.next().unwrap() {
            let (n,): (i32,) = rows.scan().unwrap();
            values.push(n);
        }
        assert_eq!(values, vec![1, 2]);
    }

    // Async messages never reached the result stream; they updated the
    // connection instead.
    assert_eq!(conn.runtime_parameter("TimeZone"), Some("UTC"));
    let notifications = conn.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].pid, 99);
    assert_eq!(notifications[0].channel, "updates");
    assert_eq!(notifications[0].payload, "payload");
    assert!(conn.take_notifications().is_empty());

    conn.close().unwrap();
    mock.join();
}

#[test]
fn operations_after_close_fail() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();
    conn.close().unwrap();

    assert!(matches!(conn.query("SELECT 1"), Err(Error::Closed)));
    assert!(matches!(conn.close(), Err(Error::Closed)));
    mock.join();
}

#[test]
fn scan_before_next_is_a_usage_error() {
    let mock = MockBackend::start(|s| {
        s.handshake();
        s.expect_query("SELECT 1");
        s.send_row_description(&[("?column?", 23)]);
        s.send_data_row(&[Some(b"1")]);
        s.send_command_complete("SELECT 1");
        s.send_ready(b'I');
        s.expect_terminate();
    });

    let mut conn = Connection::connect(&mock.conn_str("user=alice"), LogLevel::Nothing).unwrap();

    {
        let rows = conn.query("SELECT 1").unwrap();
        let scanned: Result<(i32,), Error> = rows.scan();
        assert!(matches!(scanned, Err(Error::Usage(_))));
    }

    conn.close().unwrap();
    mock.join();
}
