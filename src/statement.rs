//! Prepared statement handle.

use crate::protocol::types::Oid;
use crate::rows::Column;

/// A server-side prepared statement.
///
/// Created by [`Connection::prepare`](crate::Connection::prepare). The
/// handle stores the statement's generated name, its declared parameter
/// types and the result columns from the Describe response. Executing or
/// closing it goes through the connection that prepared it; using it with
/// another connection is a usage error.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) name: String,
    pub(crate) sql: String,
    pub(crate) param_oids: Vec<Oid>,
    pub(crate) columns: Vec<Column>,
    pub(crate) connection_id: u32,
    pub(crate) closed: bool,
}

impl Statement {
    /// The generated statement name (unique within the connection).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SQL text this statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Declared parameter type OIDs, as described by the server.
    pub fn param_types(&self) -> &[Oid] {
        &self.param_oids
    }

    /// Result column metadata (empty for statements returning no data).
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns true once the statement has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
