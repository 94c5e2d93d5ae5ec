use core::ffi::c_int;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::value::Value;
use crate::{SQLITE_BLOB, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_TEXT, ffi};

/// Storage class of a column in the current row.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColumnType {
	Null,
	Integer,
	Float,
	Text,
	Blob,
}

/// One column of the statement's current row.
///
/// Obtained from [`Statement::value`](crate::Statement::value). It borrows the
/// statement, so the row cannot be advanced while the accessor is alive. Every
/// getter asks SQLite again; nothing is cached. Reading a column as a type other
/// than its storage class uses SQLite's own conversions (an integer read as text
/// yields its decimal form) instead of failing.
#[derive(Debug, Copy, Clone)]
pub struct ColumnValue<'stmt> {
	stmt: NonNull<ffi::Sqlite3Stmt>,
	index: c_int,
	_row: PhantomData<&'stmt ()>,
}

impl ColumnValue<'_> {
	pub(crate) const fn new(stmt: NonNull<ffi::Sqlite3Stmt>, index: c_int) -> Self {
		Self { stmt, index, _row: PhantomData }
	}

	#[must_use]
	pub const fn index(&self) -> c_int {
		self.index
	}

	#[must_use]
	pub fn column_type(&self) -> ColumnType {
		match unsafe { ffi::sqlite3_column_type(self.stmt.as_ptr(), self.index) } {
			SQLITE_INTEGER => ColumnType::Integer,
			SQLITE_FLOAT => ColumnType::Float,
			SQLITE_TEXT => ColumnType::Text,
			SQLITE_BLOB => ColumnType::Blob,
			_ => ColumnType::Null,
		}
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		self.column_type() == ColumnType::Null
	}

	/// Lower 32 bits of the integer value, as `sqlite3_column_int` truncates.
	#[must_use]
	pub fn as_int(&self) -> i32 {
		unsafe { ffi::sqlite3_column_int(self.stmt.as_ptr(), self.index) }
	}

	#[must_use]
	pub fn as_i64(&self) -> i64 {
		unsafe { ffi::sqlite3_column_int64(self.stmt.as_ptr(), self.index) }
	}

	#[must_use]
	pub fn as_f64(&self) -> f64 {
		unsafe { ffi::sqlite3_column_double(self.stmt.as_ptr(), self.index) }
	}

	/// Text form of the column. NULL reads as an empty string; invalid UTF-8 is
	/// replaced.
	#[must_use]
	pub fn as_text(&self) -> String {
		let ptr = unsafe { ffi::sqlite3_column_text(self.stmt.as_ptr(), self.index) };
		let bytes = unsafe { ffi::sqlite3_column_bytes(self.stmt.as_ptr(), self.index) };
		if ptr.is_null() || bytes <= 0 {
			return String::new();
		}

		let slice = unsafe { std::slice::from_raw_parts(ptr, usize::try_from(bytes).unwrap_or_default()) };
		String::from_utf8_lossy(slice).into_owned()
	}

	/// Raw bytes of the column. NULL and zero-length blobs read as empty.
	#[must_use]
	pub fn as_blob(&self) -> Vec<u8> {
		let ptr = unsafe { ffi::sqlite3_column_blob(self.stmt.as_ptr(), self.index) };
		let bytes = unsafe { ffi::sqlite3_column_bytes(self.stmt.as_ptr(), self.index) };
		if ptr.is_null() || bytes <= 0 {
			return Vec::new();
		}

		let slice = unsafe {
			std::slice::from_raw_parts(ptr.cast::<u8>(), usize::try_from(bytes).unwrap_or_default())
		};
		slice.to_vec()
	}

	/// Decodes the column by its storage class.
	#[must_use]
	pub fn to_value(&self) -> Value {
		match self.column_type() {
			ColumnType::Null => Value::Null,
			ColumnType::Integer => Value::Integer(self.as_i64()),
			ColumnType::Float => Value::Float(self.as_f64()),
			ColumnType::Text => Value::Text(self.as_text()),
			ColumnType::Blob => Value::Blob(self.as_blob()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Connection;

	#[test]
	fn getters_read_each_storage_class() {
		let db = Connection::open_in_memory().expect("open memory database");
		let mut stmt =
			db.prepare("select null, 42, 2.5, 'txt', x'0102'").expect("prepare select");
		assert!(stmt.next().expect("row"));

		let types: Vec<_> = (0..5)
			.map(|i| stmt.value(i).expect("column").column_type())
			.collect();
		assert_eq!(
			types,
			vec![
				ColumnType::Null,
				ColumnType::Integer,
				ColumnType::Float,
				ColumnType::Text,
				ColumnType::Blob
			]
		);

		assert!(stmt.value(0).expect("null").is_null());
		assert_eq!(stmt.value(1).expect("int").as_i64(), 42);
		assert!((stmt.value(2).expect("float").as_f64() - 2.5).abs() < f64::EPSILON);
		assert_eq!(stmt.value(3).expect("text").as_text(), "txt");
		assert_eq!(stmt.value(4).expect("blob").as_blob(), vec![1, 2]);
		assert_eq!(stmt.value(4).expect("blob").index(), 4);
	}

	#[test]
	fn reads_coerce_between_storage_classes() {
		let db = Connection::open_in_memory().expect("open memory database");
		let mut stmt = db.prepare("select 123, '77abc', 1.75, null").expect("prepare select");
		assert!(stmt.next().expect("row"));

		assert_eq!(stmt.value(0).expect("int").as_text(), "123");
		assert_eq!(stmt.value(1).expect("text").as_i64(), 77);
		assert_eq!(stmt.value(2).expect("float").as_i64(), 1);
		assert_eq!(stmt.value(2).expect("float").as_text(), "1.75");
		assert_eq!(stmt.value(3).expect("null").as_i64(), 0);
		assert_eq!(stmt.value(3).expect("null").as_text(), "");
		assert!(stmt.value(3).expect("null").as_blob().is_empty());
	}

	#[test]
	fn as_int_truncates_like_sqlite() {
		let db = Connection::open_in_memory().expect("open memory database");
		let mut stmt = db.prepare("select 4294967297").expect("prepare select");
		assert!(stmt.next().expect("row"));

		let column = stmt.value(0).expect("column");
		assert_eq!(column.as_i64(), 4_294_967_297);
		assert_eq!(column.as_int(), 1);
	}
}
