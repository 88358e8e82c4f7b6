//! A synchronous PostgreSQL client driver.
//!
//! Speaks the v3 frontend/backend wire protocol over TCP to servers 7.4 and
//! later. One connection is single-owner and blocking: operations run one
//! at a time, each request group is flushed whole, and every response is
//! drained through ReadyForQuery before the next operation starts.
//!
//! # Example
//!
//! ```no_run
//! use pgconn::{Connection, LogLevel};
//!
//! fn main() -> pgconn::Result<()> {
//!     let mut conn = Connection::connect("user=postgres dbname=mydb", LogLevel::Warning)?;
//!
//!     let mut rows = conn.query("SELECT id, name FROM users")?;
//!     while rows.next()? {
//!         let (id, name): (i32, String) = rows.scan()?;
//!         println!("{id}: {name}");
//!     }
//!     drop(rows);
//!
//!     let stmt = conn.prepare("INSERT INTO users (name) VALUES ($1)")?;
//!     conn.execute(&stmt, &("alice",))?.close()?;
//!
//!     conn.close()?;
//!     Ok(())
//! }
//! ```

// private
mod connection;
mod error;
mod logging;
mod opts;
mod rows;
mod statement;
mod stream;
mod transaction;

// pub
pub mod conversion;
pub mod protocol;

pub use connection::{ConnStatus, Connection, Notification};
pub use conversion::{FromRow, FromWireValue, ToParams, ToWireValue};
pub use error::{Error, Result, ServerError};
pub use logging::LogLevel;
pub use opts::Opts;
pub use protocol::types::TransactionStatus;
pub use rows::{Column, Rows};
pub use statement::Statement;
pub use transaction::IsolationLevel;
