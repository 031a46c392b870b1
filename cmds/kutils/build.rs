use std::process::Command;

fn main() {
	// Re-run if git HEAD changes
	println!("cargo:rerun-if-changed=.git/HEAD");
	println!("cargo:rerun-if-changed=.git/refs/");

	println!("cargo:rustc-env=KUTILS_VERSION={}", version());
}

fn version() -> String {
	let cargo_version = env!("CARGO_PKG_VERSION");

	if let Some(tag) = git(&["describe", "--tags", "--exact-match", "HEAD"]) {
		// v0.1.3 -> 0.1.3
		return tag.strip_prefix('v').unwrap_or(&tag).to_string();
	}

	if let Some(commit) = git(&["rev-parse", "--short", "HEAD"]) {
		return format!("{cargo_version}-{commit}");
	}

	cargo_version.to_string()
}

fn git(args: &[&str]) -> Option<String> {
	let output = Command::new("git").args(args).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let out = String::from_utf8(output.stdout).ok()?;
	Some(out.trim().to_string())
}
