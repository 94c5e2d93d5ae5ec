use core::ffi::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::column::ColumnValue;
use crate::connection::Connection;
use crate::error::{Error, ErrorDetail, Result};
use crate::value::Value;
use crate::{SQLITE_DONE, SQLITE_OK, SQLITE_RANGE, SQLITE_ROW, SQLITE_UTF8, ffi, sqlite_transient};

/// A prepared statement and the position of its row cursor.
///
/// The compiled handle is owned exclusively: [`Statement::try_clone`] compiles
/// a second handle from the same query text rather than sharing this one. The
/// handle is released by [`Statement::finalize`] or on drop, whichever comes
/// first.
///
/// While prepared, the statement is in one of three sub-states: ready (just
/// prepared or reset), positioned on a row, or exhausted. `has_row` and
/// `exhausted` are never both set.
#[derive(Debug)]
pub struct Statement<'conn> {
	conn: &'conn Connection,
	query: String,
	tail: String,
	stmt: Option<NonNull<ffi::Sqlite3Stmt>>,
	has_row: bool,
	exhausted: bool,
	step_failed: bool,
}

impl<'conn> Statement<'conn> {
	/// Creates the statement and compiles `query` right away.
	pub fn new(conn: &'conn Connection, query: impl Into<String>) -> Result<Self> {
		let mut stmt = Self::unprepared(conn, query);
		stmt.prepare()?;
		Ok(stmt)
	}

	/// Creates the statement without compiling it. Everything except
	/// [`Statement::prepare`] fails with [`Error::NotPrepared`] until it is.
	pub fn unprepared(conn: &'conn Connection, query: impl Into<String>) -> Self {
		Self {
			conn,
			query: query.into(),
			tail: String::new(),
			stmt: None,
			has_row: false,
			exhausted: false,
			step_failed: false,
		}
	}

	/// Compiles a fresh, independent handle from this statement's query text.
	pub fn try_clone(&self) -> Result<Self> {
		Self::new(self.conn, self.query.clone())
	}

	/// Compiles the query text, releasing any handle already held.
	pub fn prepare(&mut self) -> Result<()> {
		self.finalize();
		self.tail.clear();

		let (stmt, tail) = self.conn.prepare_raw(&self.query)?;
		let stmt = stmt.ok_or_else(|| {
			Error::Prepare(ErrorDetail::message("query text contains no SQL statement"))
		})?;

		self.tail = tail.to_string();
		self.stmt = Some(stmt);
		debug!(sql = %self.query, tail = %self.tail, "prepared statement");
		Ok(())
	}

	/// Releases the compiled handle. Safe to call any number of times.
	pub fn finalize(&mut self) {
		if let Some(stmt) = self.stmt.take() {
			let _ = unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
			debug!(sql = %self.query, "finalized statement");
		}
		self.clear_cursor();
	}

	/// Rewinds to the freshly prepared state. Bound parameters are kept.
	pub fn reset(&mut self) -> Result<()> {
		let stmt = self.handle()?;
		let code = unsafe { ffi::sqlite3_reset(stmt) };
		if code != SQLITE_OK {
			return Err(Error::Reset(self.conn.error_detail(code)));
		}
		self.clear_cursor();
		Ok(())
	}

	/// Rewinds before the next run. After a failed step `sqlite3_reset` reports
	/// that step's error again while still rewinding, so that echo is not a
	/// failure here.
	pub(crate) fn rewind(&mut self) -> Result<()> {
		match self.reset() {
			Err(Error::Reset(detail)) if self.step_failed => {
				trace!(sql = %self.query, error = %detail, "cleared earlier step failure");
				self.clear_cursor();
				Ok(())
			}
			other => other,
		}
	}

	const fn clear_cursor(&mut self) {
		self.has_row = false;
		self.exhausted = false;
		self.step_failed = false;
	}

	/// Advances to the next row. Returns `false` once the statement has run to
	/// completion; calling again before [`Statement::reset`] is an error.
	pub fn next(&mut self) -> Result<bool> {
		let stmt = self.handle()?;
		if self.exhausted {
			return Err(Error::already_done());
		}

		let code = unsafe { ffi::sqlite3_step(stmt) };
		trace!(sql = %self.query, code, "stepped statement");
		match code {
			SQLITE_ROW => {
				self.has_row = true;
				self.step_failed = false;
				Ok(true)
			}
			SQLITE_DONE => {
				self.has_row = false;
				self.exhausted = true;
				self.step_failed = false;
				Ok(false)
			}
			_ => {
				self.step_failed = true;
				Err(Error::Step(self.conn.error_detail(code)))
			}
		}
	}

	/// Steps once for statements that are not expected to return rows.
	pub fn execute(&mut self) -> Result<()> {
		self.next().map(|_| ())
	}

	pub fn column_count(&self) -> Result<usize> {
		let stmt = self.handle()?;
		let n = unsafe { ffi::sqlite3_column_count(stmt) };
		usize::try_from(n).map_err(|_| {
			Error::ColumnCount(ErrorDetail::message(format!("SQLite reported {n} columns")))
		})
	}

	/// Accessor for column `index` of the current row. Nothing is decoded until
	/// one of its getters is called.
	pub fn value(&self, index: c_int) -> Result<ColumnValue<'_>> {
		let stmt = self.row_handle()?;
		let count = self.column_count()?;
		if !usize::try_from(index).is_ok_and(|i| i < count) {
			return Err(Error::Misuse(ErrorDetail::native(
				SQLITE_RANGE,
				format!("column index {index} out of range 0..{count}"),
			)));
		}
		Ok(ColumnValue::new(stmt, index))
	}

	/// The whole current row, decoded by each column's storage class.
	pub fn row_values(&self) -> Result<Vec<Value>> {
		let stmt = self.row_handle()?;
		let count = self.column_count()?;
		let mut row = Vec::with_capacity(count);
		for i in 0..count {
			let index = c_int::try_from(i).map_err(|_| {
				Error::ColumnCount(ErrorDetail::message("column index did not fit in c_int"))
			})?;
			row.push(ColumnValue::new(stmt, index).to_value());
		}
		Ok(row)
	}

	pub fn column_name(&self, index: c_int) -> Result<Option<String>> {
		let stmt = self.handle()?;
		let ptr = unsafe { ffi::sqlite3_column_name(stmt, index) };
		if ptr.is_null() {
			Ok(None)
		} else {
			Ok(Some(unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }))
		}
	}

	pub fn parameter_count(&self) -> Result<usize> {
		let stmt = self.handle()?;
		let n = unsafe { ffi::sqlite3_bind_parameter_count(stmt) };
		Ok(usize::try_from(n).unwrap_or_default())
	}

	pub fn bind(&mut self, index: c_int, value: &Value) -> Result<()> {
		match value {
			Value::Null => self.bind_null(index),
			Value::Integer(v) => self.bind_i64(index, *v),
			Value::Float(v) => self.bind_f64(index, *v),
			Value::Text(v) => self.bind_text(index, v),
			Value::Blob(v) => self.bind_blob(index, v),
		}
	}

	/// Binds `values` to parameters `1..=values.len()`. The statement must take
	/// exactly that many parameters.
	pub fn bind_values(&mut self, values: &[Value]) -> Result<()> {
		let expected = self.parameter_count()?;
		if values.len() != expected {
			return Err(Error::Bind(ErrorDetail::native(
				SQLITE_RANGE,
				format!("expected {expected} binding values, got {}", values.len()),
			)));
		}

		for (offset, value) in values.iter().enumerate() {
			let index = c_int::try_from(offset + 1).map_err(|_| {
				Error::Bind(ErrorDetail::message("binding index did not fit in c_int"))
			})?;
			self.bind(index, value)?;
		}

		Ok(())
	}

	/// Binds by parameter name. A bare `name` matches `:name`, `@name` or `$name`.
	pub fn bind_named(&mut self, name: &str, value: &Value) -> Result<()> {
		let stmt = self.handle()?;
		for candidate in binding_name_candidates(name) {
			let candidate = CString::new(candidate)
				.map_err(|_| Error::Bind(ErrorDetail::message("binding name contains a NUL byte")))?;

			let index = unsafe { ffi::sqlite3_bind_parameter_index(stmt, candidate.as_ptr()) };
			if index > 0 {
				return self.bind(index, value);
			}
		}

		Err(Error::Bind(ErrorDetail::native(SQLITE_RANGE, format!("unknown named parameter: {name}"))))
	}

	pub fn bind_null(&mut self, index: c_int) -> Result<()> {
		let stmt = self.handle()?;
		let code = unsafe { ffi::sqlite3_bind_null(stmt, index) };
		self.check_bind(code)
	}

	pub fn bind_int(&mut self, index: c_int, value: i32) -> Result<()> {
		let stmt = self.handle()?;
		let code = unsafe { ffi::sqlite3_bind_int(stmt, index, value) };
		self.check_bind(code)
	}

	pub fn bind_i64(&mut self, index: c_int, value: i64) -> Result<()> {
		let stmt = self.handle()?;
		let code = unsafe { ffi::sqlite3_bind_int64(stmt, index, value) };
		self.check_bind(code)
	}

	pub fn bind_f64(&mut self, index: c_int, value: f64) -> Result<()> {
		let stmt = self.handle()?;
		let code = unsafe { ffi::sqlite3_bind_double(stmt, index, value) };
		self.check_bind(code)
	}

	pub fn bind_text(&mut self, index: c_int, value: &str) -> Result<()> {
		let stmt = self.handle()?;
		let len = u64::try_from(value.len())
			.map_err(|_| Error::Bind(ErrorDetail::message("text parameter is too large")))?;

		let code = unsafe {
			ffi::sqlite3_bind_text64(
				stmt,
				index,
				value.as_ptr().cast::<c_char>(),
				len,
				Some(sqlite_transient()),
				SQLITE_UTF8,
			)
		};
		self.check_bind(code)
	}

	pub fn bind_blob(&mut self, index: c_int, value: &[u8]) -> Result<()> {
		let stmt = self.handle()?;
		let len = u64::try_from(value.len())
			.map_err(|_| Error::Bind(ErrorDetail::message("blob parameter is too large")))?;

		let code = unsafe {
			ffi::sqlite3_bind_blob64(stmt, index, value.as_ptr().cast(), len, Some(sqlite_transient()))
		};
		self.check_bind(code)
	}

	/// The query text this statement compiles.
	#[must_use]
	pub fn query(&self) -> &str {
		&self.query
	}

	/// SQL left over after the first statement in the query text.
	#[must_use]
	pub fn tail(&self) -> &str {
		&self.tail
	}

	/// The SQL SQLite compiled, as it reports it.
	pub fn sql(&self) -> Result<Option<String>> {
		let stmt = self.handle()?;
		let ptr = unsafe { ffi::sqlite3_sql(stmt) };
		if ptr.is_null() {
			Ok(None)
		} else {
			Ok(Some(unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }))
		}
	}

	pub fn is_readonly(&self) -> Result<bool> {
		let stmt = self.handle()?;
		Ok(unsafe { ffi::sqlite3_stmt_readonly(stmt) } != 0)
	}

	#[must_use]
	pub const fn is_prepared(&self) -> bool {
		self.stmt.is_some()
	}

	#[must_use]
	pub const fn has_row(&self) -> bool {
		self.has_row
	}

	#[must_use]
	pub const fn is_exhausted(&self) -> bool {
		self.exhausted
	}

	#[must_use]
	pub const fn connection(&self) -> &'conn Connection {
		self.conn
	}

	fn handle(&self) -> Result<*mut ffi::Sqlite3Stmt> {
		self.stmt.map(NonNull::as_ptr).ok_or_else(Error::not_prepared)
	}

	fn row_handle(&self) -> Result<NonNull<ffi::Sqlite3Stmt>> {
		let stmt = self.stmt.ok_or_else(Error::not_prepared)?;
		if self.exhausted {
			return Err(Error::already_done());
		}
		if !self.has_row {
			return Err(Error::NoResult(ErrorDetail::message("no result row")));
		}
		Ok(stmt)
	}

	fn check_bind(&self, code: c_int) -> Result<()> {
		if code == SQLITE_OK { Ok(()) } else { Err(Error::Bind(self.conn.error_detail(code))) }
	}
}

impl Drop for Statement<'_> {
	fn drop(&mut self) {
		self.finalize();
	}
}

fn binding_name_candidates(name: &str) -> Vec<String> {
	if name.starts_with(':')
		|| name.starts_with('@')
		|| name.starts_with('$')
		|| name.starts_with('?')
	{
		vec![name.to_string()]
	} else {
		vec![format!(":{name}"), format!("@{name}"), format!("${name}")]
	}
}
