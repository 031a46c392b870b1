//! Sizing INI files.
//!
//! The sizing repository is a set of INI files read on top of each other:
//! `sizings.ini` names the files of a sizing, every one of them adds or
//! overrides sections. Values may reference each other with `${option}` (same
//! section or `DEFAULT`) and `${section:option}`; `$$` is a literal `$`.
//!
//! Option names are case-sensitive. Options of the `DEFAULT` section are
//! visible from every other section.

use std::{
	fs,
	path::{Path, PathBuf},
	sync::LazyLock,
};

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Nesting limit of `${..}` references
pub const MAX_INTERPOLATION_DEPTH: usize = 10;

static SECTION_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\[(?P<header>.+)\]\s*$").expect("section regex is valid"));
static OPTION_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(?P<option>.*?)\s*[=:]\s*(?P<value>.*)$").expect("option regex is valid"));

#[derive(Debug, Error)]
pub enum SizingConfigError {
	#[error("missing sizing file {0}")]
	MissingFile(PathBuf),
	#[error("failed to read {path}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("{source_name}:{line}: {message}")]
	Syntax {
		source_name: String,
		line: usize,
		message: String,
	},
	#[error("no section [{0}]")]
	NoSection(String),
	#[error("no option {option} in section [{section}]")]
	NoOption { section: String, option: String },
	#[error("bad value substitution in [{section}] {option}: {message}")]
	Interpolation {
		section: String,
		option: String,
		message: String,
	},
	#[error("interpolation of [{section}] {option} is nested deeper than {MAX_INTERPOLATION_DEPTH} levels")]
	InterpolationDepth { section: String, option: String },
	#[error("[{section}] {option} is not a boolean: {value}")]
	NotBool {
		section: String,
		option: String,
		value: String,
	},
}

type Options = IndexMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Ini {
	defaults: Options,
	sections: IndexMap<String, Options>,
}

impl Ini {
	pub fn new() -> Self {
		Self::default()
	}

	/// Read several files in order. Every file must exist.
	pub fn read_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), SizingConfigError> {
		for path in paths {
			self.read_file(path.as_ref())?;
		}
		Ok(())
	}

	#[instrument(skip_all, fields(path = %path.display()))]
	pub fn read_file(&mut self, path: &Path) -> Result<(), SizingConfigError> {
		if !path.is_file() {
			return Err(SizingConfigError::MissingFile(path.to_path_buf()));
		}
		let content = fs::read_to_string(path).map_err(|source| SizingConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		self.read_str(&content, &path.display().to_string())
	}

	/// Parse INI text. Sections already known are extended, options overridden.
	pub fn read_str(&mut self, content: &str, source_name: &str) -> Result<(), SizingConfigError> {
		let syntax = |line: usize, message: &str| SizingConfigError::Syntax {
			source_name: source_name.to_string(),
			line,
			message: message.to_string(),
		};

		let mut section: Option<String> = None;
		// option being built and the indentation of its first line
		let mut current: Option<(String, usize)> = None;

		for (idx, raw_line) in content.lines().enumerate() {
			let lineno = idx + 1;
			let trimmed = raw_line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
				continue;
			}
			let indent = raw_line.len() - raw_line.trim_start().len();

			if let (Some(section), Some((option, option_indent))) = (&section, &current) {
				if indent > *option_indent {
					let options = self.section_mut(section);
					if let Some(value) = options.get_mut(option) {
						if !value.is_empty() {
							value.push('\n');
						}
						value.push_str(trimmed);
					}
					continue;
				}
			}

			if let Some(caps) = SECTION_RE.captures(trimmed) {
				let name = caps["header"].to_string();
				if name != DEFAULT_SECTION {
					self.sections.entry(name.clone()).or_default();
				}
				section = Some(name);
				current = None;
				continue;
			}

			let Some(section) = &section else {
				return Err(syntax(lineno, "option outside of a section header"));
			};
			let Some(caps) = OPTION_RE.captures(trimmed) else {
				return Err(syntax(lineno, "expected `option = value`"));
			};
			let option = caps["option"].trim().to_string();
			if option.is_empty() {
				return Err(syntax(lineno, "empty option name"));
			}
			let value = caps["value"].trim().to_string();
			self.section_mut(section).insert(option.clone(), value);
			current = Some((option, indent));
		}
		Ok(())
	}

	fn section_mut(&mut self, section: &str) -> &mut Options {
		if section == DEFAULT_SECTION {
			&mut self.defaults
		} else {
			self.sections.entry(section.to_string()).or_default()
		}
	}

	/// Section names in the order they were first seen, `DEFAULT` excluded
	pub fn sections(&self) -> impl Iterator<Item = &str> {
		self.sections.keys().map(String::as_str)
	}

	pub fn has_section(&self, section: &str) -> bool {
		self.sections.contains_key(section)
	}

	/// Uninterpolated value, falling back to `DEFAULT`
	pub fn raw(&self, section: &str, option: &str) -> Option<&str> {
		self.sections
			.get(section)
			.and_then(|options| options.get(option))
			.or_else(|| self.defaults.get(option))
			.map(String::as_str)
	}

	/// Interpolated value. A missing section is an error, a missing option is `None`.
	pub fn get(&self, section: &str, option: &str) -> Result<Option<String>, SizingConfigError> {
		self.check_section(section)?;
		match self.raw(section, option) {
			Some(raw) => self.interpolate(section, option, raw, 1).map(Some),
			None => Ok(None),
		}
	}

	pub fn get_bool(&self, section: &str, option: &str) -> Result<Option<bool>, SizingConfigError> {
		let Some(value) = self.get(section, option)? else {
			return Ok(None);
		};
		match value.to_lowercase().as_str() {
			"1" | "yes" | "true" | "on" => Ok(Some(true)),
			"0" | "no" | "false" | "off" => Ok(Some(false)),
			_ => Err(SizingConfigError::NotBool {
				section: section.to_string(),
				option: option.to_string(),
				value,
			}),
		}
	}

	/// All interpolated options of a section, inherited `DEFAULT` options first.
	pub fn options(&self, section: &str) -> Result<Options, SizingConfigError> {
		let own = if section == DEFAULT_SECTION {
			&self.defaults
		} else {
			self.sections
				.get(section)
				.ok_or_else(|| SizingConfigError::NoSection(section.to_string()))?
		};
		let mut merged = self.defaults.clone();
		for (option, value) in own {
			merged.insert(option.clone(), value.clone());
		}
		merged
			.into_iter()
			.map(|(option, raw)| {
				let value = self.interpolate(section, &option, &raw, 1)?;
				Ok((option, value))
			})
			.collect()
	}

	fn check_section(&self, section: &str) -> Result<(), SizingConfigError> {
		if section == DEFAULT_SECTION || self.sections.contains_key(section) {
			Ok(())
		} else {
			Err(SizingConfigError::NoSection(section.to_string()))
		}
	}

	fn interpolate(&self, section: &str, option: &str, raw: &str, depth: usize) -> Result<String, SizingConfigError> {
		if depth > MAX_INTERPOLATION_DEPTH {
			return Err(SizingConfigError::InterpolationDepth {
				section: section.to_string(),
				option: option.to_string(),
			});
		}
		let bad = |message: String| SizingConfigError::Interpolation {
			section: section.to_string(),
			option: option.to_string(),
			message,
		};

		let mut out = String::with_capacity(raw.len());
		let mut rest = raw;
		while let Some(pos) = rest.find('$') {
			out.push_str(&rest[..pos]);
			rest = &rest[pos..];
			if let Some(after) = rest.strip_prefix("$$") {
				out.push('$');
				rest = after;
				continue;
			}
			let Some(body) = rest.strip_prefix("${") else {
				return Err(bad(format!("'$' must be followed by '$' or '{{', found: {rest:?}")));
			};
			let Some(end) = body.find('}') else {
				return Err(bad(format!("unterminated reference: {rest:?}")));
			};
			let reference = &body[..end];
			rest = &body[end + 1..];

			let (ref_section, ref_option) = match reference.split(':').collect::<Vec<_>>()[..] {
				[ref_option] => (section, ref_option),
				[ref_section, ref_option] => (ref_section, ref_option),
				_ => return Err(bad(format!("more than one ':' in reference ${{{reference}}}"))),
			};
			if ref_section != section {
				self.check_section(ref_section)
					.map_err(|_| bad(format!("section [{ref_section}] referenced by ${{{reference}}} not found")))?;
			}
			let Some(value) = self.raw(ref_section, ref_option) else {
				return Err(bad(format!("option {ref_option} referenced by ${{{reference}}} not found")));
			};
			if value.contains('$') {
				out.push_str(&self.interpolate(ref_section, ref_option, value, depth + 1)?);
			} else {
				out.push_str(value);
			}
		}
		out.push_str(rest);
		debug!(section, option, value = %out, "interpolated");
		Ok(out)
	}
}

/// Split on `split_by` and strip the parts
pub fn split_strip(value: &str, split_by: char) -> Vec<String> {
	value.split(split_by).map(|part| part.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	fn parse(content: &str) -> Ini {
		let mut ini = Ini::new();
		ini.read_str(content, "test.ini").unwrap();
		ini
	}

	#[test]
	fn test_defaults_are_inherited() {
		let ini = parse(indoc! {"
			[DEFAULT]
			commonExtraEnvEnabled = true
			javaOpts = -Xmx1g

			[dpm]
			javaOpts: -Xmx2g
			memory.requests = 2Gi
		"});
		assert_eq!(ini.sections().collect::<Vec<_>>(), ["dpm"]);
		assert_eq!(ini.get("dpm", "javaOpts").unwrap().as_deref(), Some("-Xmx2g"));
		assert_eq!(ini.get_bool("dpm", "commonExtraEnvEnabled").unwrap(), Some(true));
		assert_eq!(ini.get("dpm", "replicas").unwrap(), None);

		let options = ini.options("dpm").unwrap();
		let keys: Vec<&str> = options.keys().map(String::as_str).collect();
		assert_eq!(keys, ["commonExtraEnvEnabled", "javaOpts", "memory.requests"]);
	}

	#[test]
	fn test_keys_are_case_sensitive() {
		let ini = parse("[mmmBe]\nJavaOpts = a\njavaOpts = b\n");
		assert_eq!(ini.get("mmmBe", "JavaOpts").unwrap().as_deref(), Some("a"));
		assert_eq!(ini.get("mmmBe", "javaOpts").unwrap().as_deref(), Some("b"));
	}

	#[test]
	fn test_extended_interpolation() {
		let ini = parse(indoc! {"
			[DEFAULT]
			heap = 512m

			[common]
			opts = -Xmx${heap}

			[dpe]
			javaOpts = ${common:opts} -Dprice=$$5
			memory = ${heap}
		"});
		assert_eq!(ini.get("dpe", "javaOpts").unwrap().as_deref(), Some("-Xmx512m -Dprice=$5"));
		assert_eq!(ini.get("dpe", "memory").unwrap().as_deref(), Some("512m"));
	}

	#[test]
	fn test_interpolation_errors() {
		let ini = parse(indoc! {"
			[a]
			missing = ${nope}
			other = ${b:x}
			dollar = 5$
			loop = ${loop}
		"});
		assert_matches!(ini.get("a", "missing"), Err(SizingConfigError::Interpolation { .. }));
		assert_matches!(ini.get("a", "other"), Err(SizingConfigError::Interpolation { .. }));
		assert_matches!(ini.get("a", "dollar"), Err(SizingConfigError::Interpolation { .. }));
		assert_matches!(ini.get("a", "loop"), Err(SizingConfigError::InterpolationDepth { .. }));
		assert_matches!(ini.get("b", "x"), Err(SizingConfigError::NoSection(_)));
	}

	#[test]
	fn test_continuation_lines() {
		let ini = parse(indoc! {"
			[dpm]
			extraEnv =
			    A=1;
			    B=2
			replicas = 1
		"});
		assert_eq!(ini.get("dpm", "extraEnv").unwrap().as_deref(), Some("A=1;\nB=2"));
		assert_eq!(ini.get("dpm", "replicas").unwrap().as_deref(), Some("1"));
	}

	#[test]
	fn test_syntax_errors_carry_line() {
		let mut ini = Ini::new();
		let err = ini.read_str("# comment\nkey = value\n", "bad.ini").unwrap_err();
		assert_matches!(err, SizingConfigError::Syntax { line: 2, .. });
		let err = ini.read_str("[a]\nno delimiter\n", "bad.ini").unwrap_err();
		assert_eq!(err.to_string(), "bad.ini:2: expected `option = value`");
	}

	#[test]
	fn test_later_files_override() {
		let temp = TempDir::new().unwrap();
		let first = temp.path().join("first.ini");
		let second = temp.path().join("second.ini");
		fs::write(&first, "[dpm]\nreplicas = 1\ncpu.requests = 1\n").unwrap();
		fs::write(&second, "[dpm]\nreplicas = 3\n[dpe]\nreplicas = 2\n").unwrap();

		let mut ini = Ini::new();
		ini.read_files(&[&first, &second]).unwrap();
		assert_eq!(ini.get("dpm", "replicas").unwrap().as_deref(), Some("3"));
		assert_eq!(ini.get("dpm", "cpu.requests").unwrap().as_deref(), Some("1"));
		assert_eq!(ini.sections().collect::<Vec<_>>(), ["dpm", "dpe"]);

		let err = ini.read_file(&temp.path().join("missing.ini")).unwrap_err();
		assert_matches!(err, SizingConfigError::MissingFile(_));
	}

	#[test]
	fn test_split_strip() {
		assert_eq!(split_strip(" a ; b=1 ;c", ';'), ["a", "b=1", "c"]);
	}
}
