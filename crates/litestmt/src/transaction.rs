use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Error, ErrorDetail, Result};
use crate::statement::Statement;

/// Locking behaviour requested by `BEGIN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransactionMode {
	/// Locks are taken when the database is first read or written.
	Deferred,
	/// A write lock is taken immediately.
	Immediate,
	/// An exclusive lock is taken immediately.
	Exclusive,
}

impl TransactionMode {
	const fn begin_sql(self) -> &'static str {
		match self {
			Self::Deferred => "BEGIN DEFERRED",
			Self::Immediate => "BEGIN IMMEDIATE",
			Self::Exclusive => "BEGIN EXCLUSIVE",
		}
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum State {
	Active,
	Committed,
	RolledBack,
}

/// An open transaction. Rolls back on drop unless committed.
#[derive(Debug)]
pub struct Transaction<'conn> {
	conn: &'conn Connection,
	mode: TransactionMode,
	state: State,
}

impl<'conn> Transaction<'conn> {
	pub(crate) fn begin(conn: &'conn Connection, mode: TransactionMode) -> Result<Self> {
		conn.execute_batch(mode.begin_sql()).map_err(|err| Error::Transaction(err.detail().clone()))?;
		debug!(?mode, "began transaction");
		Ok(Self { conn, mode, state: State::Active })
	}

	pub fn prepare(&self, sql: &str) -> Result<Statement<'conn>> {
		self.conn.prepare(sql)
	}

	pub fn execute_batch(&self, sql: &str) -> Result<()> {
		self.conn.execute_batch(sql)
	}

	pub fn commit(&mut self) -> Result<()> {
		self.finish("COMMIT", State::Committed)
	}

	pub fn rollback(&mut self) -> Result<()> {
		self.finish("ROLLBACK", State::RolledBack)
	}

	#[must_use]
	pub fn is_active(&self) -> bool {
		self.state == State::Active
	}

	#[must_use]
	pub const fn mode(&self) -> TransactionMode {
		self.mode
	}

	fn finish(&mut self, sql: &str, next: State) -> Result<()> {
		match self.state {
			State::Active => {}
			State::Committed => {
				return Err(Error::Transaction(ErrorDetail::message("transaction already committed")));
			}
			State::RolledBack => {
				return Err(Error::Transaction(ErrorDetail::message("transaction already rolled back")));
			}
		}

		self.conn.execute_batch(sql).map_err(|err| Error::Transaction(err.detail().clone()))?;
		self.state = next;
		debug!(sql, "finished transaction");
		Ok(())
	}
}

impl Drop for Transaction<'_> {
	fn drop(&mut self) {
		if self.state != State::Active {
			return;
		}

		match self.conn.execute_batch("ROLLBACK") {
			Ok(()) => debug!(mode = ?self.mode, "rolled back uncommitted transaction"),
			Err(err) => warn!(error = %err, "rollback of uncommitted transaction failed"),
		}
	}
}
