//! Running one statement over many records inside a single transaction.

use std::iter::Peekable;

use tracing::debug;

use crate::error::{Error, ErrorDetail, Result};
use crate::statement::Statement;
use crate::transaction::{Transaction, TransactionMode};
use crate::value::Value;

/// A source of records for [`Statement::execute_many`]. The source decides
/// which parameter each field of a record is bound to.
pub trait BatchSource {
	fn has_next(&mut self) -> bool;

	/// Binds the next record onto `stmt`'s parameters.
	fn bind_next(&mut self, stmt: &mut Statement<'_>) -> Result<()>;
}

/// Feeds rows of [`Value`]s positionally, parameter `1` first.
pub struct ValueRows<I: Iterator<Item = Vec<Value>>> {
	rows: Peekable<I>,
}

impl<I: Iterator<Item = Vec<Value>>> ValueRows<I> {
	pub fn new<T: IntoIterator<IntoIter = I>>(rows: T) -> Self {
		Self { rows: rows.into_iter().peekable() }
	}
}

impl<I: Iterator<Item = Vec<Value>>> BatchSource for ValueRows<I> {
	fn has_next(&mut self) -> bool {
		self.rows.peek().is_some()
	}

	fn bind_next(&mut self, stmt: &mut Statement<'_>) -> Result<()> {
		let row = self
			.rows
			.next()
			.ok_or_else(|| Error::Misuse(ErrorDetail::message("batch source has no more records")))?;
		stmt.bind_values(&row)
	}
}

impl Statement<'_> {
	/// Binds and executes every record from `source` inside one transaction,
	/// then finalizes the statement and commits. Returns the number of records
	/// executed.
	///
	/// The first failure is returned as is. The transaction is then rolled back,
	/// so none of the batch is kept, and the statement is left prepared, so the
	/// caller can run another batch on it or finalize it.
	pub fn execute_many<S: BatchSource + ?Sized>(
		&mut self,
		source: &mut S,
		mode: TransactionMode,
	) -> Result<usize> {
		let mut tx = Transaction::begin(self.connection(), mode)?;

		let mut executed = 0;
		while source.has_next() {
			self.rewind()?;
			source.bind_next(self)?;
			self.execute()?;
			executed += 1;
		}

		self.finalize();
		tx.commit()?;
		debug!(executed, sql = %self.query(), "executed batch");
		Ok(executed)
	}
}
