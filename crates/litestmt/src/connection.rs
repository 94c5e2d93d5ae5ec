use core::ffi::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::ptr::NonNull;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, ErrorDetail, Result};
use crate::statement::Statement;
use crate::transaction::{Transaction, TransactionMode};
use crate::value::Value;
use crate::{SQLITE_DONE, SQLITE_MISUSE, SQLITE_OK, SQLITE_ROW, ffi};

const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
const SQLITE_OPEN_URI: c_int = 0x0000_0040;

/// How a database file is opened. The default is read-write, created if
/// missing, with URI filenames accepted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OpenOptions {
	read_only: bool,
	create: bool,
	uri: bool,
	busy_timeout: Option<Duration>,
}

impl Default for OpenOptions {
	fn default() -> Self {
		Self { read_only: false, create: true, uri: true, busy_timeout: None }
	}
}

impl OpenOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub const fn read_only(mut self, read_only: bool) -> Self {
		self.read_only = read_only;
		self
	}

	#[must_use]
	pub const fn create(mut self, create: bool) -> Self {
		self.create = create;
		self
	}

	#[must_use]
	pub const fn uri(mut self, uri: bool) -> Self {
		self.uri = uri;
		self
	}

	/// Retry for up to `timeout` when another connection holds a lock.
	#[must_use]
	pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
		self.busy_timeout = Some(timeout);
		self
	}

	const fn flags(&self) -> c_int {
		let mut flags = if self.read_only { SQLITE_OPEN_READONLY } else { SQLITE_OPEN_READWRITE };
		if self.create && !self.read_only {
			flags |= SQLITE_OPEN_CREATE;
		}
		if self.uri {
			flags |= SQLITE_OPEN_URI;
		}
		flags
	}
}

#[derive(Debug)]
pub struct Connection {
	db: NonNull<ffi::Sqlite3>,
}

impl Connection {
	pub fn open(path: &str) -> Result<Self> {
		Self::open_with(path, &OpenOptions::default())
	}

	pub fn open_in_memory() -> Result<Self> {
		Self::open(":memory:")
	}

	pub fn open_with(path: &str, options: &OpenOptions) -> Result<Self> {
		let path_c = CString::new(path)
			.map_err(|_| Error::Open(ErrorDetail::message("database path contains a NUL byte")))?;

		let mut db: *mut ffi::Sqlite3 = std::ptr::null_mut();
		let code = unsafe {
			ffi::sqlite3_open_v2(path_c.as_ptr(), &raw mut db, options.flags(), std::ptr::null())
		};
		if code != SQLITE_OK {
			let detail = ErrorDetail::native(code, db_error_message(db));
			if !db.is_null() {
				let _ = unsafe { ffi::sqlite3_close_v2(db) };
			}
			return Err(Error::Open(detail));
		}

		let db = NonNull::new(db).ok_or_else(|| {
			Error::Open(ErrorDetail::native(SQLITE_MISUSE, "SQLite returned a null connection handle"))
		})?;
		let conn = Self { db };

		let _ = unsafe { ffi::sqlite3_extended_result_codes(db.as_ptr(), 1) };

		if let Some(timeout) = options.busy_timeout {
			let ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
			let code = unsafe { ffi::sqlite3_busy_timeout(db.as_ptr(), ms) };
			if code != SQLITE_OK {
				return Err(Error::Open(conn.error_detail(code)));
			}
		}

		debug!(path, "opened connection");
		Ok(conn)
	}

	/// Compiles the first statement in `sql`.
	pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
		Statement::new(self, sql)
	}

	/// Compiles the first statement in `sql`, returning its handle (`None` when
	/// `sql` holds only whitespace or comments) and the unconsumed remainder.
	pub(crate) fn prepare_raw<'q>(
		&self,
		sql: &'q str,
	) -> Result<(Option<NonNull<ffi::Sqlite3Stmt>>, &'q str)> {
		let len = c_int::try_from(sql.len())
			.map_err(|_| Error::Prepare(ErrorDetail::message("query text is too large")))?;

		let mut stmt: *mut ffi::Sqlite3Stmt = std::ptr::null_mut();
		let mut tail: *const c_char = std::ptr::null();
		let code = unsafe {
			ffi::sqlite3_prepare_v2(
				self.db.as_ptr(),
				sql.as_ptr().cast::<c_char>(),
				len,
				&raw mut stmt,
				&raw mut tail,
			)
		};
		if code != SQLITE_OK {
			return Err(Error::Prepare(self.error_detail(code)));
		}

		let consumed = if tail.is_null() {
			sql.len()
		} else {
			tail.addr().saturating_sub(sql.as_ptr().addr()).min(sql.len())
		};
		Ok((NonNull::new(stmt), sql.get(consumed..).unwrap_or_default()))
	}

	/// Runs every statement in `sql`, discarding any rows they produce.
	pub fn execute_batch(&self, sql: &str) -> Result<()> {
		let mut rest = sql;
		while !rest.trim().is_empty() {
			let (stmt, tail) = self.prepare_raw(rest)?;
			let Some(stmt) = stmt else {
				if tail.len() == rest.len() {
					break;
				}
				rest = tail;
				continue;
			};
			let code = loop {
				let code = unsafe { ffi::sqlite3_step(stmt.as_ptr()) };
				if code != SQLITE_ROW {
					break code;
				}
			};
			let failure = (code != SQLITE_DONE).then(|| self.error_detail(code));
			let _ = unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
			if let Some(detail) = failure {
				return Err(Error::Step(detail));
			}
			rest = tail;
		}
		Ok(())
	}

	pub fn query_all(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
		let mut stmt = self.prepare(sql)?;
		let mut rows = Vec::new();
		while stmt.next()? {
			rows.push(stmt.row_values()?);
		}
		Ok(rows)
	}

	pub fn query_row(&self, sql: &str) -> Result<Option<Vec<Value>>> {
		let mut stmt = self.prepare(sql)?;
		if !stmt.next()? {
			return Ok(None);
		}

		let row = stmt.row_values()?;
		if stmt.next()? {
			return Err(Error::Misuse(ErrorDetail::native(
				SQLITE_MISUSE,
				"query returned more than one row",
			)));
		}

		Ok(Some(row))
	}

	pub fn transaction(&self) -> Result<Transaction<'_>> {
		self.transaction_with_mode(TransactionMode::Immediate)
	}

	pub fn transaction_with_mode(&self, mode: TransactionMode) -> Result<Transaction<'_>> {
		Transaction::begin(self, mode)
	}

	/// Code and message of the most recent failure on this connection.
	#[must_use]
	pub fn last_error(&self) -> ErrorDetail {
		let code = unsafe { ffi::sqlite3_extended_errcode(self.db.as_ptr()) };
		self.error_detail(code)
	}

	/// `false` while a transaction is open.
	#[must_use]
	pub fn is_autocommit(&self) -> bool {
		unsafe { ffi::sqlite3_get_autocommit(self.db.as_ptr()) != 0 }
	}

	#[must_use]
	pub fn changes(&self) -> i64 {
		unsafe { ffi::sqlite3_changes64(self.db.as_ptr()) }
	}

	#[must_use]
	pub fn last_insert_rowid(&self) -> i64 {
		unsafe { ffi::sqlite3_last_insert_rowid(self.db.as_ptr()) }
	}

	#[must_use]
	pub const fn as_ptr(&self) -> *mut ffi::Sqlite3 {
		self.db.as_ptr()
	}

	pub(crate) fn error_detail(&self, code: c_int) -> ErrorDetail {
		ErrorDetail::native(code, db_error_message(self.db.as_ptr()))
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		let _ = unsafe { ffi::sqlite3_close_v2(self.db.as_ptr()) };
	}
}

fn db_error_message(db: *mut ffi::Sqlite3) -> String {
	if db.is_null() {
		return "SQLite error".to_string();
	}

	let message_ptr = unsafe { ffi::sqlite3_errmsg(db) };
	if message_ptr.is_null() {
		return "SQLite error".to_string();
	}

	unsafe { CStr::from_ptr(message_ptr).to_string_lossy().into_owned() }
}
