//! Running external commands (`helm`, `kubectl`, `git`).

use std::{
	fmt,
	path::Path,
	process::{Command, Stdio},
};

use chrono::Local;
use thiserror::Error;
use tracing::{error, info};

/// Longest stdout prefix written to the log
pub const MAX_STD_OUT_LEN: usize = 2000;

#[derive(Debug, Error)]
pub enum CommandError {
	#[error("empty command line")]
	Empty,
	#[error("failed to execute {command}")]
	Spawn {
		command: String,
		#[source]
		source: std::io::Error,
	},
}

/// Finished process with trimmed output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
	pub command: Vec<String>,
	/// `-1` when the process was killed by a signal
	pub exit_code: i32,
	pub stdout: String,
	pub stderr: String,
}

impl CmdOutput {
	/// Exit code, except that a successful run which still wrote to stderr
	/// reports the stderr length.
	pub fn return_code(&self) -> i64 {
		if self.exit_code == 0 && !self.stderr.is_empty() {
			self.stderr.len() as i64
		} else {
			i64::from(self.exit_code)
		}
	}

	pub fn success(&self) -> bool {
		self.return_code() == 0
	}

	pub fn error_msg(&self) -> String {
		format!(
			"{self}: ret code {}, stdout {}, stderr {}",
			self.return_code(),
			self.stdout,
			self.stderr
		)
	}

	/// Stdout, or stderr when nothing was written to stdout
	pub fn stdout_or_stderr(&self) -> &str {
		if self.stdout.is_empty() {
			&self.stderr
		} else {
			&self.stdout
		}
	}
}

impl fmt::Display for CmdOutput {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self.command)
	}
}

/// Something able to execute a command line
pub trait CommandRunner {
	fn run(&self, cmd: &[String]) -> Result<CmdOutput, CommandError>;
}

/// Runs commands as child processes of kutils
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
	fn run(&self, cmd: &[String]) -> Result<CmdOutput, CommandError> {
		run_cmd(cmd)
	}
}

pub fn run_cmd(cmd: &[String]) -> Result<CmdOutput, CommandError> {
	run_cmd_in(cmd, None)
}

/// Run `cmd` (optionally in `dir`), logging the command and its output.
pub fn run_cmd_in(cmd: &[String], dir: Option<&Path>) -> Result<CmdOutput, CommandError> {
	let (program, args) = cmd.split_first().ok_or(CommandError::Empty)?;
	let msg = format!("Running {cmd:?}");
	info!("{msg}");

	let mut command = Command::new(program);
	command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
	if let Some(dir) = dir {
		command.current_dir(dir);
	}
	let output = command.output().map_err(|source| CommandError::Spawn {
		command: format!("{cmd:?}"),
		source,
	})?;

	let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
	info!("{msg} : stdout = {}", truncate(&stdout, MAX_STD_OUT_LEN));
	if !stderr.is_empty() {
		error!("{msg} : stderr = {stderr}");
	}
	Ok(CmdOutput {
		command: cmd.to_vec(),
		exit_code: output.status.code().unwrap_or(-1),
		stdout,
		stderr,
	})
}

fn truncate(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

/// Build an owned command line
pub fn cmd<I, S>(parts: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	parts.into_iter().map(Into::into).collect()
}

/// `Date:` line of the last commit touching `rel_path`, empty when unknown
pub fn git_last_file_change(git_dir: &Path, rel_path: &Path) -> String {
	let rel_path = rel_path.to_string_lossy();
	let git_log = cmd(["git", "log", "-1", "--", rel_path.as_ref()]);
	match run_cmd_in(&git_log, Some(git_dir)) {
		Ok(output) => date_line(&output.stdout),
		Err(e) => {
			error!("git log failed: {e}");
			String::new()
		}
	}
}

fn date_line(git_log: &str) -> String {
	git_log
		.lines()
		.find(|line| line.starts_with("Date:"))
		.map(|line| line.trim().to_string())
		.unwrap_or_default()
}

/// Local time as `20240131_235959`
pub fn time_stamp() -> String {
	Local::now().format("%Y%m%d_%H%M%S").to_string()
}
