use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Builds the path of the temporary sibling used while writing `path`.
///
/// Example:
/// `data/chain.bin` → `data/.chain.bin.tmp`
pub(crate) fn temporary_path<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
	let path = path.as_ref();

	let parent = path.parent().unwrap_or_else(|| Path::new("."));
	let file_name = path
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	let mut name = std::ffi::OsString::from(".");
	name.push(file_name);
	name.push(".tmp");
	Ok(parent.join(name))
}

/// Writes `bytes` to `path` so that readers see either the old file or the
/// complete new one.
///
/// The data goes to a temporary sibling first, is synced, then renamed over `path`.
/// The temporary file is removed if any step fails.
pub(crate) fn write_atomically<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let tmp = temporary_path(path)?;

	let result = (|| {
		let mut file = File::create(&tmp)?;
		file.write_all(bytes)?;
		file.sync_all()?;
		fs::rename(&tmp, path)
	})();

	if result.is_err() {
		let _ = fs::remove_file(&tmp);
	}
	result
}
