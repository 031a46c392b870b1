//! Utilities for command handlers.

use std::{
	fs,
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// A writer wrapper that silently handles broken pipe errors.
///
/// When the underlying writer returns a broken pipe error (EPIPE), this wrapper
/// converts it to a successful write. This allows commands to exit cleanly when
/// output is piped to a process that closes early (e.g., `kutils values keys | head -1`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}

/// `dir`, or the current directory. The directory is created when missing.
pub fn output_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
	let dir = match dir {
		Some(dir) => dir,
		None => std::env::current_dir().context("failed to get current directory")?,
	};
	fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
	Ok(dir)
}

/// Write one path per line
pub fn write_paths<W: Write>(writer: &mut W, paths: &[impl AsRef<Path>]) -> Result<()> {
	for path in paths {
		writeln!(writer, "{}", path.as_ref().display())?;
	}
	Ok(())
}
