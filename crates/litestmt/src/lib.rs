//! Resource-safe SQLite prepared statements.
//!
//! A [`Statement`] owns one compiled statement handle and tracks where it is
//! in its lifecycle (prepared, positioned on a row, exhausted). Every misuse of
//! that lifecycle is reported as an [`Error`] instead of reaching SQLite.
//! [`Finalizer`] and [`Resetter`] tie cleanup to a scope, and
//! [`Statement::execute_many`] runs a whole batch inside one [`Transaction`].

mod batch;
mod column;
mod connection;
mod error;
mod guard;
mod statement;
mod transaction;
mod value;

pub use litestmt_sqlite_ffi::ffi;

pub use batch::{BatchSource, ValueRows};
pub use column::{ColumnType, ColumnValue};
pub use connection::{Connection, OpenOptions};
pub use error::{Error, ErrorDetail, Result};
pub use guard::{Finalizer, Resetter};
pub use statement::Statement;
pub use transaction::{Transaction, TransactionMode};
pub use value::Value;

use core::ffi::c_int;

pub(crate) const SQLITE_OK: c_int = 0;
pub(crate) const SQLITE_MISUSE: c_int = 21;
pub(crate) const SQLITE_RANGE: c_int = 25;
pub(crate) const SQLITE_ROW: c_int = 100;
pub(crate) const SQLITE_DONE: c_int = 101;

pub(crate) const SQLITE_INTEGER: c_int = 1;
pub(crate) const SQLITE_FLOAT: c_int = 2;
pub(crate) const SQLITE_TEXT: c_int = 3;
pub(crate) const SQLITE_BLOB: c_int = 4;

pub(crate) const SQLITE_UTF8: u8 = 1;

pub(crate) fn sqlite_transient() -> unsafe extern "C" fn(*mut std::ffi::c_void) {
	unsafe { std::mem::transmute::<isize, unsafe extern "C" fn(*mut std::ffi::c_void)>(-1_isize) }
}

pub fn sqlite_lib_version() -> String {
	litestmt_sqlite_ffi::sqlite_lib_version()
}

pub fn sqlite_lib_version_number() -> i32 {
	litestmt_sqlite_ffi::sqlite_lib_version_number()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sqlite_version_number_is_sane() {
		assert!(sqlite_lib_version_number() >= 3_000_000);
		assert!(!sqlite_lib_version().is_empty());
	}
}
