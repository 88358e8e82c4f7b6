//! Connection state machine and message dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::conversion::ToParams;
use crate::error::{Error, Result, ServerError};
use crate::logging::LogLevel;
use crate::opts::Opts;
use crate::protocol::backend::query::CommandComplete;
use crate::protocol::backend::{
    self, AuthenticationMessage, BackendKeyData, ErrorResponse, NoticeResponse,
    NotificationResponse, ParameterDescription, ParameterStatus, ReadyForQuery,
};
use crate::protocol::frontend::{self, auth::ScramClient};
use crate::protocol::types::{Oid, TransactionStatus};
use crate::rows::{Rows, RowsInit, columns_from_payload};
use crate::statement::Statement;
use crate::stream::Stream;

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

/// Connection lifecycle status.
///
/// Exactly one state holds at a time. `ProcessingQuery` means an unclosed
/// result set is bound to the connection; every other operation is rejected
/// until it drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    /// No usable socket; only possible transition is a fresh connect.
    Disconnected,
    /// Between request/response cycles; any operation may start.
    Ready,
    /// A result set is streaming; the connection belongs to it.
    ProcessingQuery,
}

/// An asynchronous notification captured from LISTEN/NOTIFY.
///
/// Notifications are retained on the connection as they arrive and handed
/// out via [`Connection::take_notifications`]. There is no push delivery.
#[derive(Debug, Clone)]
pub struct Notification {
    /// PID of the notifying backend.
    pub pid: u32,
    /// Channel name.
    pub channel: String,
    /// Notification payload.
    pub payload: String,
}

/// A blocking, single-owner connection to a PostgreSQL server.
///
/// One connection runs one operation at a time; requests are written as
/// complete groups and every response is drained through ReadyForQuery
/// before the next operation starts. Fatal failures (I/O, protocol,
/// authentication, FATAL server errors) move the connection to
/// [`ConnStatus::Disconnected`] and release its buffers.
pub struct Connection {
    stream: Option<Stream>,
    status: ConnStatus,
    transaction_status: TransactionStatus,
    backend_key: Option<(u32, u32)>,
    runtime_params: HashMap<String, String>,
    notifications: Vec<Notification>,
    write_buffer: Vec<u8>,
    next_statement_id: u64,
    next_portal_id: u64,
    next_savepoint_id: u64,
    log_level: LogLevel,
    connection_id: u32,
}

impl Connection {
    /// Connect using a connection string.
    ///
    /// Accepts libpq-style `keyword=value` strings (`host`, `port`,
    /// `dbname`, `user`, `password`, `timeout`) as well as `postgres://`
    /// URLs. `log_level` gates how chatty the connection is via `tracing`.
    pub fn connect(conn_str: &str, log_level: LogLevel) -> Result<Self> {
        let opts = Opts::try_from(conn_str)?;
        Self::connect_with(&opts, log_level)
    }

    /// Connect using already-parsed options.
    pub fn connect_with(opts: &Opts, log_level: LogLevel) -> Result<Self> {
        let stream = Stream::connect(&opts.host, opts.port, opts.timeout)?;
        let mut conn = Self::new_with(Some(stream), log_level);
        conn.startup(opts)?;
        if conn.log_level >= LogLevel::Debug {
            tracing::debug!(
                "connected to {}:{} as {} (database {})",
                opts.host,
                opts.port,
                opts.user,
                opts.database_or_user()
            );
        }
        Ok(conn)
    }

    fn new_with(stream: Option<Stream>, log_level: LogLevel) -> Self {
        Self {
            stream,
            status: ConnStatus::Disconnected,
            transaction_status: TransactionStatus::Idle,
            backend_key: None,
            runtime_params: HashMap::new(),
            notifications: Vec::new(),
            write_buffer: Vec::with_capacity(1024),
            next_statement_id: 1,
            next_portal_id: 1,
            next_savepoint_id: 1,
            log_level,
            connection_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    // === Accessors ===

    /// Current connection status.
    pub fn status(&self) -> ConnStatus {
        self.status
    }

    /// Transaction status from the last ReadyForQuery message.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Look up a server-reported runtime parameter (e.g. `client_encoding`).
    ///
    /// The map holds every name seen via ParameterStatus; repeated reports
    /// overwrite earlier values.
    pub fn runtime_parameter(&self, name: &str) -> Option<&str> {
        self.runtime_params.get(name).map(String::as_str)
    }

    /// Backend process id and secret key from BackendKeyData, captured for
    /// out-of-band cancellation. No cancel channel is implemented here.
    pub fn backend_key(&self) -> Option<(u32, u32)> {
        self.backend_key
    }

    /// Take the notifications captured so far.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // === Startup and authentication ===

    fn startup(&mut self, opts: &Opts) -> Result<()> {
        self.write_buffer.clear();
        {
            let database = opts.database_or_user();
            let mut params: Vec<(&str, &str)> = vec![
                ("user", &opts.user),
                ("database", database),
                ("client_encoding", "UTF8"),
            ];
            for (name, value) in &opts.params {
                params.push((name, value));
            }
            frontend::write_startup(&mut self.write_buffer, &params);
        }
        self.send_and_flush()?;

        let mut scram: Option<ScramClient> = None;
        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::AUTHENTICATION => {
                    let payload = self.frame().to_vec();
                    self.respond_auth(&payload, opts, &mut scram)?;
                }
                backend::msg_type::ERROR_RESPONSE => {
                    // The server has not promised a ReadyForQuery yet, so the
                    // error surfaces immediately and the connection is torn
                    // down.
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    let err = Error::Server(fields);
                    self.drop_stream();
                    return Err(err);
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    return Ok(());
                }
                other => {
                    if self.log_level >= LogLevel::Debug {
                        tracing::debug!("skipping startup message '{}'", other as char);
                    }
                }
            }
        }
    }

    fn respond_auth(
        &mut self,
        payload: &[u8],
        opts: &Opts,
        scram: &mut Option<ScramClient>,
    ) -> Result<()> {
        let message = AuthenticationMessage::parse(payload)?;
        match message {
            AuthenticationMessage::Ok => Ok(()),
            AuthenticationMessage::CleartextPassword => {
                let password = Self::required_password(opts)?;
                self.write_buffer.clear();
                frontend::write_password(&mut self.write_buffer, password);
                self.send_and_flush()
            }
            AuthenticationMessage::Md5Password { salt } => {
                let password = Self::required_password(opts)?;
                let hashed = frontend::md5_password(&opts.user, password, &salt);
                self.write_buffer.clear();
                frontend::write_password(&mut self.write_buffer, &hashed);
                self.send_and_flush()
            }
            AuthenticationMessage::Sasl { ref mechanisms } => {
                if !mechanisms.contains(&"SCRAM-SHA-256") {
                    return Err(Error::Auth(format!(
                        "no supported SASL mechanism, server offers: {:?}",
                        mechanisms
                    )));
                }
                let password = Self::required_password(opts)?;
                let client = ScramClient::new(password);
                let client_first = client.client_first_message();
                self.write_buffer.clear();
                frontend::write_sasl_initial_response(
                    &mut self.write_buffer,
                    "SCRAM-SHA-256",
                    client_first.as_bytes(),
                );
                *scram = Some(client);
                self.send_and_flush()
            }
            AuthenticationMessage::SaslContinue { data } => {
                let client = scram
                    .as_mut()
                    .ok_or_else(|| Error::Protocol("SASL continue before SASL start".into()))?;
                let server_first = simdutf8::compat::from_utf8(data)
                    .map_err(|e| Error::Auth(format!("invalid server-first-message: {}", e)))?;
                let client_final = client.process_server_first(server_first).map_err(Error::Auth)?;
                self.write_buffer.clear();
                frontend::write_sasl_response(&mut self.write_buffer, client_final.as_bytes());
                self.send_and_flush()
            }
            AuthenticationMessage::SaslFinal { data } => {
                let client = scram
                    .as_ref()
                    .ok_or_else(|| Error::Protocol("SASL final before SASL start".into()))?;
                let server_final = simdutf8::compat::from_utf8(data)
                    .map_err(|e| Error::Auth(format!("invalid server-final-message: {}", e)))?;
                client.verify_server_final(server_final).map_err(Error::Auth)
            }
            other => Err(Error::Auth(format!(
                "unsupported authentication method: {}",
                other.method_name()
            ))),
        }
    }

    fn required_password(opts: &Opts) -> Result<&str> {
        opts.password
            .as_deref()
            .ok_or_else(|| Error::Auth("password required but not provided".into()))
    }

    // === Caller-facing operations ===

    /// Run a simple query and return a streaming result set.
    ///
    /// The response is read eagerly up to the RowDescription so column
    /// metadata is available before the first row; rows are then pulled on
    /// demand. For statements that return no rows the response is consumed
    /// here and the returned cursor is already complete.
    pub fn query(&mut self, sql: &str) -> Result<Rows<'_>> {
        let init = {
            let result = self.query_start(sql);
            self.seal(result)?
        };
        Ok(Rows::new(self, init))
    }

    /// Run a simple query, discard any rows, and return rows affected.
    pub fn query_drop(&mut self, sql: &str) -> Result<u64> {
        let mut rows = self.query(sql)?;
        rows.close()?;
        Ok(rows.rows_affected())
    }

    fn query_start(&mut self, sql: &str) -> Result<RowsInit> {
        self.require_ready("query")?;
        self.log_command(sql);

        self.write_buffer.clear();
        frontend::write_query(&mut self.write_buffer, sql);
        self.send_and_flush()?;
        self.status = ConnStatus::ProcessingQuery;

        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::ROW_DESCRIPTION => {
                    let columns = columns_from_payload(self.frame())?;
                    return Ok(RowsInit::streaming(columns));
                }
                backend::msg_type::COMMAND_COMPLETE => {
                    let complete = CommandComplete::parse(self.frame())?;
                    let command_tag = complete.tag.to_string();
                    let rows_affected = complete.rows_affected().unwrap_or(0);
                    self.drain_and_surface(None)?;
                    return Ok(RowsInit::finished(command_tag, rows_affected));
                }
                backend::msg_type::EMPTY_QUERY_RESPONSE => {
                    self.drain_and_surface(None)?;
                    return Ok(RowsInit::finished(String::new(), 0));
                }
                backend::msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    self.drain_and_surface(Some(fields))?;
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    return Ok(RowsInit::finished(String::new(), 0));
                }
                other => {
                    if self.log_level >= LogLevel::Debug {
                        tracing::debug!("skipping message '{}' before result", other as char);
                    }
                }
            }
        }
    }

    /// Prepare a statement, letting the server infer parameter types.
    pub fn prepare(&mut self, sql: &str) -> Result<Statement> {
        self.prepare_typed(sql, &[])
    }

    /// Prepare a statement with explicitly declared parameter OIDs
    /// (0 lets the server infer the type of that parameter).
    pub fn prepare_typed(&mut self, sql: &str, param_oids: &[Oid]) -> Result<Statement> {
        let result = self.prepare_start(sql, param_oids);
        self.seal(result)
    }

    fn prepare_start(&mut self, sql: &str, param_oids: &[Oid]) -> Result<Statement> {
        self.require_ready("prepare")?;
        self.log_command(sql);

        let name = format!("stmt{}", self.next_statement_id);
        self.next_statement_id += 1;

        self.write_buffer.clear();
        frontend::write_parse(&mut self.write_buffer, &name, sql, param_oids);
        frontend::write_describe_statement(&mut self.write_buffer, &name);
        frontend::write_sync(&mut self.write_buffer);
        self.send_and_flush()?;

        let mut declared: Vec<Oid> = param_oids.to_vec();
        let mut columns = Vec::new();
        let mut retained: Option<ServerError> = None;

        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::PARSE_COMPLETE | backend::msg_type::NO_DATA => {}
                backend::msg_type::PARAMETER_DESCRIPTION => {
                    declared = ParameterDescription::parse(self.frame())?.oids().to_vec();
                }
                backend::msg_type::ROW_DESCRIPTION => {
                    columns = columns_from_payload(self.frame())?;
                }
                backend::msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    if retained.is_none() {
                        retained = Some(fields);
                    }
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    break;
                }
                other => {
                    if self.log_level >= LogLevel::Debug {
                        tracing::debug!("skipping message '{}' during prepare", other as char);
                    }
                }
            }
        }

        if let Some(fields) = retained {
            return Err(Error::Server(fields));
        }

        Ok(Statement {
            name,
            sql: sql.to_string(),
            param_oids: declared,
            columns,
            connection_id: self.connection_id,
            closed: false,
        })
    }

    /// Execute a prepared statement with the given parameter values.
    ///
    /// Sends Bind, Execute, Close(portal) and Sync as one flushed group; a
    /// fresh portal name is generated per execution and always closed.
    pub fn execute<P: ToParams>(&mut self, statement: &Statement, params: &P) -> Result<Rows<'_>> {
        let init = {
            let result = self.execute_start(statement, params);
            self.seal(result)?
        };
        Ok(Rows::new(self, init))
    }

    fn execute_start<P: ToParams>(
        &mut self,
        statement: &Statement,
        params: &P,
    ) -> Result<RowsInit> {
        self.require_ready("execute")?;
        self.check_statement(statement)?;
        if statement.closed {
            return Err(Error::Usage(format!(
                "statement {} is closed",
                statement.name
            )));
        }
        if params.param_count() != statement.param_oids.len() {
            return Err(Error::Usage(format!(
                "statement {} expects {} parameters, got {}",
                statement.name,
                statement.param_oids.len(),
                params.param_count()
            )));
        }
        self.log_command(&statement.sql);

        let portal = format!("portal{}", self.next_portal_id);
        self.next_portal_id += 1;

        self.write_buffer.clear();
        frontend::write_bind(
            &mut self.write_buffer,
            &portal,
            &statement.name,
            params,
            &statement.param_oids,
            &[],
        )?;
        frontend::write_execute(&mut self.write_buffer, &portal, 0);
        frontend::write_close_portal(&mut self.write_buffer, &portal);
        frontend::write_sync(&mut self.write_buffer);
        self.send_and_flush()?;
        self.status = ConnStatus::ProcessingQuery;

        // Read eagerly through BindComplete so bind errors surface here
        // rather than from the first cursor advance.
        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::BIND_COMPLETE => {
                    return Ok(RowsInit::streaming(statement.columns.clone()));
                }
                backend::msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    self.drain_and_surface(Some(fields))?;
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    return Ok(RowsInit::finished(String::new(), 0));
                }
                other => {
                    if self.log_level >= LogLevel::Debug {
                        tracing::debug!("skipping message '{}' before bind", other as char);
                    }
                }
            }
        }
    }

    /// Close a prepared statement on the server.
    ///
    /// Idempotent: closing an already-closed statement is a no-op.
    pub fn close_statement(&mut self, statement: &mut Statement) -> Result<()> {
        let result = self.close_statement_start(statement);
        self.seal(result)
    }

    fn close_statement_start(&mut self, statement: &mut Statement) -> Result<()> {
        if statement.closed {
            return Ok(());
        }
        self.check_statement(statement)?;
        self.require_ready("close statement")?;

        self.write_buffer.clear();
        frontend::write_close_statement(&mut self.write_buffer, &statement.name);
        frontend::write_sync(&mut self.write_buffer);
        self.send_and_flush()?;

        // The server-side statement is gone regardless of how the drain
        // below resolves.
        statement.closed = true;

        let mut retained: Option<ServerError> = None;
        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::CLOSE_COMPLETE => {}
                backend::msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    if retained.is_none() {
                        retained = Some(fields);
                    }
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    break;
                }
                other => {
                    if self.log_level >= LogLevel::Debug {
                        tracing::debug!("skipping message '{}' during close", other as char);
                    }
                }
            }
        }

        match retained {
            Some(fields) => Err(Error::Server(fields)),
            None => Ok(()),
        }
    }

    fn check_statement(&self, statement: &Statement) -> Result<()> {
        if statement.connection_id != self.connection_id {
            return Err(Error::Usage(format!(
                "statement {} was prepared on a different connection",
                statement.name
            )));
        }
        Ok(())
    }

    /// Close the connection, sending Terminate and dropping the socket.
    ///
    /// A connection that is already disconnected reports [`Error::Closed`].
    pub fn close(&mut self) -> Result<()> {
        match self.status {
            ConnStatus::Disconnected => Err(Error::Closed),
            ConnStatus::ProcessingQuery => {
                // A leaked result set left the response unread: drain it so
                // Terminate is not sent mid-response.
                let _ = self.drain_and_surface(None);
                self.terminate()
            }
            ConnStatus::Ready => self.terminate(),
        }
    }

    fn terminate(&mut self) -> Result<()> {
        self.write_buffer.clear();
        frontend::write_terminate(&mut self.write_buffer);
        let result = self.send_and_flush();
        self.drop_stream();
        result
    }

    // === Dispatch ===

    /// Read frames until a synchronous message arrives, returning its tag.
    ///
    /// Asynchronous messages are consumed here: ParameterStatus updates the
    /// runtime-parameter map (last write wins), NoticeResponse is logged at
    /// warning level, NotificationResponse is captured, and BackendKeyData
    /// records the cancel key. The payload of the returned message is in
    /// [`Connection::frame`].
    pub(crate) fn read_sync_message(&mut self) -> Result<u8> {
        loop {
            let stream = self.stream.as_mut().ok_or(Error::Closed)?;
            let tag = stream.read_frame()?;
            match tag {
                backend::msg_type::PARAMETER_STATUS => {
                    let status = ParameterStatus::parse(&stream.frame)?;
                    let name = status.name.to_string();
                    let value = status.value.to_string();
                    self.runtime_params.insert(name, value);
                }
                backend::msg_type::NOTICE_RESPONSE => {
                    let fields = NoticeResponse::parse(&stream.frame)?.into_fields();
                    if self.log_level >= LogLevel::Warning {
                        tracing::warn!("{fields}");
                    }
                }
                backend::msg_type::NOTIFICATION_RESPONSE => {
                    let notification = NotificationResponse::parse(&stream.frame)?;
                    let notification = Notification {
                        pid: notification.pid,
                        channel: notification.channel.to_string(),
                        payload: notification.payload.to_string(),
                    };
                    self.notifications.push(notification);
                }
                backend::msg_type::BACKEND_KEY_DATA => {
                    let key = BackendKeyData::parse(&stream.frame)?;
                    self.backend_key = Some((key.process_id(), key.secret()));
                }
                _ => return Ok(tag),
            }
        }
    }

    /// Payload of the last frame read.
    pub(crate) fn frame(&self) -> &[u8] {
        match &self.stream {
            Some(stream) => &stream.frame,
            None => &[],
        }
    }

    /// Consume synchronous messages through ReadyForQuery, retaining the
    /// first server error and surfacing it once the terminator arrives.
    pub(crate) fn drain_and_surface(&mut self, first: Option<ServerError>) -> Result<()> {
        let mut retained = first;
        loop {
            let tag = self.read_sync_message()?;
            match tag {
                backend::msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.frame())?.into_fields();
                    if retained.is_none() {
                        retained = Some(fields);
                    }
                }
                backend::msg_type::READY_FOR_QUERY => {
                    self.finish_ready()?;
                    break;
                }
                other => {
                    if self.log_level >= LogLevel::Verbose {
                        tracing::trace!("draining message '{}'", other as char);
                    }
                }
            }
        }

        match retained {
            Some(fields) => {
                if self.log_level >= LogLevel::Error {
                    tracing::error!("{fields}");
                }
                let err = Error::Server(fields);
                self.note_failure(&err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Record the transaction status byte of a ReadyForQuery frame and
    /// return to the ready state.
    pub(crate) fn finish_ready(&mut self) -> Result<()> {
        let ready = ReadyForQuery::parse(self.frame())?;
        let status = ready.transaction_status().ok_or_else(|| {
            Error::Protocol(format!(
                "unknown transaction status: {}",
                ready.status as char
            ))
        })?;
        self.transaction_status = status;
        self.status = ConnStatus::Ready;
        Ok(())
    }

    /// Drop the connection on fatal errors; non-fatal ones leave the state
    /// untouched.
    pub(crate) fn note_failure(&mut self, err: &Error) {
        if err.is_fatal() {
            if self.log_level >= LogLevel::Fatal {
                tracing::error!("connection failed: {err}");
            }
            self.drop_stream();
        }
    }

    fn seal<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.note_failure(err);
        }
        result
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        self.status = ConnStatus::Disconnected;
    }

    fn send_and_flush(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        stream.send(&self.write_buffer)?;
        stream.flush()
    }

    fn require_ready(&self, operation: &str) -> Result<()> {
        match self.status {
            ConnStatus::Ready => Ok(()),
            ConnStatus::Disconnected => Err(Error::Closed),
            ConnStatus::ProcessingQuery => Err(Error::Usage(format!(
                "cannot {operation} while a result set is open"
            ))),
        }
    }

    fn log_command(&self, sql: &str) {
        if self.log_level >= LogLevel::Command {
            tracing::info!("executing: {sql}");
        }
    }

    pub(crate) fn alloc_savepoint_name(&mut self) -> String {
        let name = format!("sp{}", self.next_savepoint_id);
        self.next_savepoint_id += 1;
        name
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.status != ConnStatus::Disconnected {
            // Best effort Terminate; the socket is dropped either way.
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .field("transaction_status", &self.transaction_status)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disconnected() -> Connection {
        Connection::new_with(None, LogLevel::Nothing)
    }

    #[test]
    fn operations_on_disconnected_connection_fail() {
        let mut conn = disconnected();
        assert!(matches!(conn.query("SELECT 1"), Err(Error::Closed)));
        assert!(matches!(conn.prepare("SELECT 1"), Err(Error::Closed)));
        assert!(matches!(conn.close(), Err(Error::Closed)));
    }

    #[test]
    fn operations_while_processing_are_usage_errors() {
        let mut conn = disconnected();
        conn.status = ConnStatus::ProcessingQuery;
        assert!(matches!(conn.query("SELECT 1"), Err(Error::Usage(_))));
        assert!(matches!(conn.prepare("SELECT 1"), Err(Error::Usage(_))));
    }

    #[test]
    fn savepoint_names_are_monotonic() {
        let mut conn = disconnected();
        assert_eq!(conn.alloc_savepoint_name(), "sp1");
        assert_eq!(conn.alloc_savepoint_name(), "sp2");
        assert_eq!(conn.alloc_savepoint_name(), "sp3");
    }

    #[test]
    fn connection_ids_are_distinct() {
        let a = disconnected();
        let b = disconnected();
        assert_ne!(a.connection_id, b.connection_id);
    }

    #[test]
    fn statement_from_other_connection_is_rejected() {
        let mut a = disconnected();
        a.status = ConnStatus::Ready;
        let b = disconnected();
        let statement = Statement {
            name: "stmt1".into(),
            sql: "SELECT 1".into(),
            param_oids: Vec::new(),
            columns: Vec::new(),
            connection_id: b.connection_id,
            closed: false,
        };
        assert!(matches!(
            a.execute(&statement, &()),
            Err(Error::Usage(_))
        ));
    }
}
