//! Lazy result-set cursor.

use crate::connection::Connection;
use crate::conversion::FromRow;
use crate::error::{Error, Result};
use crate::protocol::backend::query::{CommandComplete, DataRow, RowDescription};
use crate::protocol::backend::{ErrorResponse, msg_type};
use crate::protocol::types::{FormatCode, Oid};

/// Metadata for one column of a result set.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    table_oid: Oid,
    column_id: i16,
    type_oid: Oid,
    type_size: i16,
    type_modifier: i32,
    format: FormatCode,
}

impl Column {
    pub(crate) fn new(
        name: String,
        table_oid: Oid,
        column_id: i16,
        type_oid: Oid,
        type_size: i16,
        type_modifier: i32,
        format: FormatCode,
    ) -> Self {
        Self {
            name,
            table_oid,
            column_id,
            type_oid,
            type_size,
            type_modifier,
            format,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table OID (0 if not a table column).
    pub fn table_oid(&self) -> Oid {
        self.table_oid
    }

    /// Column attribute number (0 if not a table column).
    pub fn column_id(&self) -> i16 {
        self.column_id
    }

    /// Data type OID.
    pub fn type_oid(&self) -> Oid {
        self.type_oid
    }

    /// Type size (-1 for variable length).
    pub fn type_size(&self) -> i16 {
        self.type_size
    }

    /// Type modifier (type-specific).
    pub fn type_modifier(&self) -> i32 {
        self.type_modifier
    }

    /// Format code of the field values.
    pub fn format(&self) -> FormatCode {
        self.format
    }
}

/// Parse a RowDescription payload into owned column metadata.
pub(crate) fn columns_from_payload(payload: &[u8]) -> Result<Vec<Column>> {
    let description = RowDescription::parse(payload)?;
    Ok(description
        .fields()
        .iter()
        .map(|field| {
            Column::new(
                field.name.to_string(),
                field.table_oid(),
                field.column_id(),
                field.type_oid(),
                field.type_size(),
                field.type_modifier(),
                field.format(),
            )
        })
        .collect())
}

/// Initial cursor state handed from the connection to a fresh [`Rows`].
pub(crate) struct RowsInit {
    pub(crate) columns: Vec<Column>,
    pub(crate) command_tag: String,
    pub(crate) rows_affected: u64,
    pub(crate) done: bool,
}

impl RowsInit {
    /// A cursor that still has messages to stream.
    pub(crate) fn streaming(columns: Vec<Column>) -> Self {
        Self {
            columns,
            command_tag: String::new(),
            rows_affected: 0,
            done: false,
        }
    }

    /// A cursor whose response was fully consumed at operation start.
    pub(crate) fn finished(command_tag: String, rows_affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            command_tag,
            rows_affected,
            done: true,
        }
    }
}

/// A streaming result set.
///
/// Holds a mutable borrow of its connection: while a `Rows` is live no
/// other operation can use the connection. Rows are pulled from the wire
/// on demand by [`next`](Rows::next); dropping the cursor drains the
/// remaining messages so the connection returns to the ready state.
#[derive(Debug)]
pub struct Rows<'conn> {
    conn: &'conn mut Connection,
    columns: Vec<Column>,
    row: Vec<Option<Vec<u8>>>,
    command_tag: String,
    rows_affected: u64,
    current: bool,
    done: bool,
}

impl<'conn> Rows<'conn> {
    pub(crate) fn new(conn: &'conn mut Connection, init: RowsInit) -> Self {
        Self {
            conn,
            columns: init.columns,
            row: Vec::new(),
            command_tag: init.command_tag,
            rows_affected: init.rows_affected,
            current: false,
            done: init.done,
        }
    }

    /// Column metadata of the result set.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The CommandComplete tag, available once the cursor is exhausted.
    pub fn command_tag(&self) -> &str {
        &self.command_tag
    }

    /// Rows affected as reported by the command tag (0 when the tag does
    /// not report a count). Final once the cursor is exhausted or closed.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Returns true once the response has been fully consumed.
    pub fn is_complete(&self) -> bool {
        self.done
    }

    /// Advance to the next row.
    ///
    /// Blocks until a row arrives or the result terminates. Returns `false`
    /// once the stream is exhausted; the connection is ready again at that
    /// point.
    pub fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        match self.advance() {
            Ok(has_row) => {
                self.current = has_row;
                if !has_row {
                    self.done = true;
                }
                Ok(has_row)
            }
            Err(err) => {
                self.current = false;
                self.done = true;
                self.conn.note_failure(&err);
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<bool> {
        loop {
            let tag = self.conn.read_sync_message()?;
            match tag {
                msg_type::DATA_ROW => {
                    let parsed = DataRow::parse(self.conn.frame())?;
                    self.row.clear();
                    for value in parsed.iter() {
                        self.row.push(value.map(|bytes| bytes.to_vec()));
                    }
                    return Ok(true);
                }
                msg_type::COMMAND_COMPLETE => {
                    let complete = CommandComplete::parse(self.conn.frame())?;
                    self.command_tag = complete.tag.to_string();
                    self.rows_affected = complete.rows_affected().unwrap_or(0);
                    self.conn.drain_and_surface(None)?;
                    return Ok(false);
                }
                msg_type::EMPTY_QUERY_RESPONSE => {
                    self.conn.drain_and_surface(None)?;
                    return Ok(false);
                }
                msg_type::ERROR_RESPONSE => {
                    let fields = ErrorResponse::parse(self.conn.frame())?.into_fields();
                    self.conn.drain_and_surface(Some(fields))?;
                }
                msg_type::READY_FOR_QUERY => {
                    // Terminator without CommandComplete: the result is over.
                    self.conn.finish_ready()?;
                    return Ok(false);
                }
                msg_type::ROW_DESCRIPTION => {
                    // A later statement of a multi-statement query: adopt its
                    // column metadata and keep streaming.
                    self.columns = columns_from_payload(self.conn.frame())?;
                }
                msg_type::PARSE_COMPLETE
                | msg_type::BIND_COMPLETE
                | msg_type::CLOSE_COMPLETE
                | msg_type::NO_DATA
                | msg_type::PORTAL_SUSPENDED => {}
                other => {
                    tracing::debug!("skipping unexpected message '{}'", other as char);
                }
            }
        }
    }

    /// Decode the current row into a tuple of scan targets.
    ///
    /// NULL fields require `Option<T>` targets.
    pub fn scan<'row, T: FromRow<'row>>(&'row self) -> Result<T> {
        if !self.current {
            return Err(Error::Usage(
                "no current row; call next() before scan()".into(),
            ));
        }
        T::from_row(&self.columns, &self.row)
    }

    /// Drain the remaining response and mark the cursor complete.
    ///
    /// Idempotent; on a non-terminal cursor this consumes messages through
    /// ReadyForQuery.
    pub fn close(&mut self) -> Result<()> {
        while self.next()? {}
        Ok(())
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        if !self.done {
            // Best effort: the connection must not be left mid-response.
            let _ = self.close();
        }
    }
}
