/// An owned SQLite value, used for binding parameters and for whole-row reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Integer(i64),
	Float(f64),
	Text(String),
	Blob(Vec<u8>),
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Integer(i64::from(value))
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<&[u8]> for Value {
	fn from(value: &[u8]) -> Self {
		Self::Blob(value.to_vec())
	}
}

impl From<Vec<u8>> for Value {
	fn from(value: Vec<u8>) -> Self {
		Self::Blob(value)
	}
}

impl<T: Into<Self>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversions_pick_storage_class() {
		assert_eq!(Value::from(-3_i32), Value::Integer(-3));
		assert_eq!(Value::from("x"), Value::Text("x".to_string()));
		assert_eq!(Value::from(&b"\x00\x01"[..]), Value::Blob(vec![0, 1]));
		assert_eq!(Value::from(None::<i64>), Value::Null);
		assert_eq!(Value::from(Some(2.5)), Value::Float(2.5));
	}
}
