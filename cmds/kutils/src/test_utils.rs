//! Test utilities shared across test modules.

use std::{
	cell::RefCell,
	io::{self, ErrorKind, Write},
};

use crate::process::{CmdOutput, CommandError, CommandRunner};

/// A writer that always returns BrokenPipe errors.
///
/// This writer immediately returns `ErrorKind::BrokenPipe` on any write attempt,
/// simulating what happens when stdout is connected to a process that has exited.
pub struct BrokenPipeWriter;

impl Write for BrokenPipeWriter {
	fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}

	fn flush(&mut self) -> io::Result<()> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}
}

/// A command runner answering from canned outputs.
///
/// Commands are matched by the prefix of their space joined form, the first
/// registered match wins. Anything else exits with 127.
#[derive(Default)]
pub struct FakeRunner {
	outputs: Vec<(String, i32, String, String)>,
	calls: RefCell<Vec<Vec<String>>>,
}

impl FakeRunner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Successful run printing `stdout`
	pub fn with_output(mut self, prefix: &str, stdout: &str) -> Self {
		self.outputs
			.push((prefix.to_string(), 0, stdout.to_string(), String::new()));
		self
	}

	/// Failed run printing `stderr`
	pub fn with_failure(mut self, prefix: &str, stderr: &str) -> Self {
		self.outputs
			.push((prefix.to_string(), 1, String::new(), stderr.to_string()));
		self
	}

	/// Every command run so far
	pub fn calls(&self) -> Vec<Vec<String>> {
		self.calls.borrow().clone()
	}
}

impl CommandRunner for FakeRunner {
	fn run(&self, cmd: &[String]) -> Result<CmdOutput, CommandError> {
		if cmd.is_empty() {
			return Err(CommandError::Empty);
		}
		self.calls.borrow_mut().push(cmd.to_vec());
		let joined = cmd.join(" ");
		let (exit_code, stdout, stderr) = self
			.outputs
			.iter()
			.find(|(prefix, ..)| joined.starts_with(prefix.as_str()))
			.map_or_else(
				|| (127, String::new(), format!("unexpected command: {joined}")),
				|(_, code, stdout, stderr)| (*code, stdout.clone(), stderr.clone()),
			);
		Ok(CmdOutput {
			command: cmd.to_vec(),
			exit_code,
			stdout,
			stderr,
		})
	}
}
