//! Transaction and savepoint orchestration.

use crate::connection::{ConnStatus, Connection};
use crate::error::{Error, Result};
use crate::protocol::types::TransactionStatus;

/// Transaction isolation level for [`Connection::with_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Statements see only rows committed before they began.
    ReadCommitted,
    /// Full serializable isolation.
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling of the isolation level.
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl Connection {
    /// Run `body` inside a transaction.
    ///
    /// If no transaction is open, one is begun at the given isolation level
    /// and committed after `body` succeeds; if `body` fails (or left the
    /// transaction in the failed state) the transaction is rolled back and
    /// the original error is surfaced. If a transaction is already open on
    /// entry, `body` simply runs inside it with no implicit BEGIN or
    /// COMMIT. Entering with a failed transaction is an error.
    pub fn with_transaction<T, F>(&mut self, isolation: IsolationLevel, body: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        if self.transaction_status().is_failed() {
            return Err(Error::Usage(
                "transaction is in a failed state; roll back first".into(),
            ));
        }

        let opened = !self.transaction_status().in_transaction();
        if opened {
            self.query_drop(&format!(
                "BEGIN; SET TRANSACTION ISOLATION LEVEL {};",
                isolation.as_sql()
            ))?;
        }

        match body(self) {
            Ok(value) => {
                if opened {
                    match self.transaction_status() {
                        TransactionStatus::InTransaction => {
                            self.query_drop("COMMIT;")?;
                        }
                        TransactionStatus::Failed => {
                            // The server reported an in-transaction error that
                            // the body swallowed; the only way forward is back.
                            self.query_drop("ROLLBACK;")?;
                        }
                        TransactionStatus::Idle => {}
                    }
                }
                Ok(value)
            }
            Err(err) => {
                if opened && self.status() == ConnStatus::Ready {
                    // Surface the original error even if the rollback fails.
                    let _ = self.query_drop("ROLLBACK;");
                }
                Err(err)
            }
        }
    }

    /// Run `body` under a savepoint.
    ///
    /// Outside a transaction this delegates to
    /// [`with_transaction`](Connection::with_transaction). Inside one, a
    /// savepoint `sp<N>` is established; if `body` fails the connection
    /// rolls back to it and surfaces the original error, otherwise the
    /// savepoint is left in place for the enclosing scope to resolve.
    pub fn with_savepoint<T, F>(&mut self, isolation: IsolationLevel, body: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        match self.transaction_status() {
            TransactionStatus::Failed => Err(Error::Usage(
                "transaction is in a failed state; roll back first".into(),
            )),
            TransactionStatus::Idle => self.with_transaction(isolation, body),
            TransactionStatus::InTransaction => {
                let name = self.alloc_savepoint_name();
                self.query_drop(&format!("SAVEPOINT {name}"))?;
                match body(self) {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        if self.status() == ConnStatus::Ready {
                            // ROLLBACK TO is valid even in a failed
                            // transaction; the original error wins either way.
                            let _ = self.query_drop(&format!("ROLLBACK TO {name}"));
                        }
                        Err(err)
                    }
                }
            }
        }
    }
}
