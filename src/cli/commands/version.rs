//! Version command implementation.

/// The version line, e.g. `dropmirror 0.1.0 (release)`.
#[must_use]
pub fn version_line() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    format!("dropmirror {version} ({build})")
}

/// Execute the version command.
pub fn execute() {
    println!("{}", version_line());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line() {
        let line = version_line();
        assert!(line.starts_with("dropmirror "));
        assert!(line.contains(env!("CARGO_PKG_VERSION")));
        assert!(line.ends_with("(dev)") || line.ends_with("(release)"));
    }
}
