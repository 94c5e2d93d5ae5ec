//! Scope guards that tie a statement's cleanup to the end of a block.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::error::Result;
use crate::statement::Statement;

/// Executes a statement once and finalizes it when the guard goes out of scope.
///
/// ```no_run
/// # fn demo(db: &litestmt::Connection) -> litestmt::Result<i64> {
/// let mut stmt = db.prepare("select count(*) from t")?;
/// let row = litestmt::Finalizer::new(&mut stmt)?;
/// let count = row.value(0)?.as_i64();
/// Ok(count)
/// # }
/// ```
pub struct Finalizer<'s, 'conn> {
	stmt: &'s mut Statement<'conn>,
}

impl<'s, 'conn> Finalizer<'s, 'conn> {
	/// Runs `stmt` once. If that fails the statement is finalized before the
	/// error is returned.
	pub fn new(stmt: &'s mut Statement<'conn>) -> Result<Self> {
		if let Err(err) = stmt.execute() {
			debug!(error = %err, "execute failed, finalizing statement");
			stmt.finalize();
			return Err(err);
		}
		Ok(Self { stmt })
	}
}

impl<'conn> Deref for Finalizer<'_, 'conn> {
	type Target = Statement<'conn>;

	fn deref(&self) -> &Self::Target {
		&*self.stmt
	}
}

impl DerefMut for Finalizer<'_, '_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self.stmt
	}
}

impl Drop for Finalizer<'_, '_> {
	fn drop(&mut self) {
		self.stmt.finalize();
	}
}

/// Resets a statement when the guard goes out of scope, leaving it ready to be
/// bound and stepped again.
pub struct Resetter<'s, 'conn> {
	stmt: &'s mut Statement<'conn>,
}

impl<'s, 'conn> Resetter<'s, 'conn> {
	pub const fn new(stmt: &'s mut Statement<'conn>) -> Self {
		Self { stmt }
	}
}

impl<'conn> Deref for Resetter<'_, 'conn> {
	type Target = Statement<'conn>;

	fn deref(&self) -> &Self::Target {
		&*self.stmt
	}
}

impl DerefMut for Resetter<'_, '_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self.stmt
	}
}

impl Drop for Resetter<'_, '_> {
	fn drop(&mut self) {
		if let Err(err) = self.stmt.reset() {
			debug!(error = %err, "reset on scope exit failed");
		}
	}
}
