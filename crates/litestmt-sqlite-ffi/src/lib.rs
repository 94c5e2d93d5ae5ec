use std::ffi::CStr;

pub mod ffi;

#[cfg(feature = "bundled-sqlite")]
use libsqlite3_sys as _;

pub fn sqlite_lib_version_number() -> i32 {
	unsafe { ffi::sqlite3_libversion_number() }
}

pub fn sqlite_lib_version() -> String {
	unsafe { CStr::from_ptr(ffi::sqlite3_libversion()).to_string_lossy().into_owned() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn has_sqlite_version_number() {
		assert!(sqlite_lib_version_number() >= 3_000_000);
	}

	#[test]
	fn version_text_matches_number() {
		let text = sqlite_lib_version();
		let major = sqlite_lib_version_number() / 1_000_000;
		assert!(text.starts_with(&format!("{major}.")));
	}
}
