//! Error types for litestmt

use core::ffi::c_int;
use std::fmt;

use thiserror::Error;

/// Result type alias for litestmt operations
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, as reported by SQLite or by the statement's own checks.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ErrorDetail {
	/// A result code and `sqlite3_errmsg` text from the native layer.
	Native { code: c_int, message: String },
	/// A precondition violation detected without asking SQLite.
	Message(String),
}

impl ErrorDetail {
	pub(crate) fn message(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}

	pub(crate) fn native(code: c_int, message: impl Into<String>) -> Self {
		Self::Native { code, message: message.into() }
	}

	#[must_use]
	pub const fn code(&self) -> Option<c_int> {
		match self {
			Self::Native { code, .. } => Some(*code),
			Self::Message(_) => None,
		}
	}

	#[must_use]
	pub fn text(&self) -> &str {
		match self {
			Self::Native { message, .. } | Self::Message(message) => message,
		}
	}
}

impl fmt::Display for ErrorDetail {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Native { code, message } => write!(f, "SQLite error {code}: {message}"),
			Self::Message(message) => f.write_str(message),
		}
	}
}

/// Errors that can occur while driving a statement
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
	/// Opening or configuring the connection failed
	#[error("open failed: {0}")]
	Open(ErrorDetail),

	/// The query text could not be compiled
	#[error("prepare failed: {0}")]
	Prepare(ErrorDetail),

	/// The statement holds no compiled handle
	#[error("statement not prepared: {0}")]
	NotPrepared(ErrorDetail),

	/// A parameter could not be bound
	#[error("bind failed: {0}")]
	Bind(ErrorDetail),

	/// Stepping returned something other than a row or completion
	#[error("step failed: {0}")]
	Step(ErrorDetail),

	/// The statement already ran to completion
	#[error("statement already done: {0}")]
	AlreadyDone(ErrorDetail),

	/// No row has been produced yet
	#[error("no result: {0}")]
	NoResult(ErrorDetail),

	/// Rewinding the statement failed
	#[error("reset failed: {0}")]
	Reset(ErrorDetail),

	/// The column count could not be determined
	#[error("column count failed: {0}")]
	ColumnCount(ErrorDetail),

	/// Beginning, committing or rolling back a transaction failed
	#[error("transaction failed: {0}")]
	Transaction(ErrorDetail),

	/// The API was used with arguments SQLite cannot accept
	#[error("misuse: {0}")]
	Misuse(ErrorDetail),
}

impl Error {
	#[must_use]
	pub const fn detail(&self) -> &ErrorDetail {
		match self {
			Self::Open(detail)
			| Self::Prepare(detail)
			| Self::NotPrepared(detail)
			| Self::Bind(detail)
			| Self::Step(detail)
			| Self::AlreadyDone(detail)
			| Self::NoResult(detail)
			| Self::Reset(detail)
			| Self::ColumnCount(detail)
			| Self::Transaction(detail)
			| Self::Misuse(detail) => detail,
		}
	}

	/// Native result code, when SQLite reported one.
	#[must_use]
	pub const fn code(&self) -> Option<c_int> {
		self.detail().code()
	}

	pub(crate) fn not_prepared() -> Self {
		Self::NotPrepared(ErrorDetail::message("statement unprepared"))
	}

	pub(crate) fn already_done() -> Self {
		Self::AlreadyDone(ErrorDetail::message("statement already done"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn native_detail_formats_like_sqlite() {
		let err = Error::Step(ErrorDetail::native(19, "NOT NULL constraint failed: t.a"));
		assert_eq!(err.to_string(), "step failed: SQLite error 19: NOT NULL constraint failed: t.a");
		assert_eq!(err.code(), Some(19));
	}

	#[test]
	fn message_detail_has_no_code() {
		let err = Error::already_done();
		assert_eq!(err.code(), None);
		assert_eq!(err.detail().text(), "statement already done");
	}
}
