use std::env;

fn main() {
	// The bundled amalgamation is compiled and linked by libsqlite3-sys.
	if env::var_os("CARGO_FEATURE_BUNDLED_SQLITE").is_some() {
		return;
	}

	link_system();
}

fn link_system() {
	let linked = pkg_config::Config::new()
		.atleast_version("3.37.0")
		.print_system_libs(false)
		.probe("sqlite3")
		.is_ok();

	if !linked {
		println!("cargo:rustc-link-lib=dylib=sqlite3");
	}
}
