//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code
//! - No blocking I/O inside async code
//!
//! The helpers here scan the production sources of the workspace line by line.
//! Everything from the first `#[cfg(test)]` of a file onwards counts as test
//! code and is skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["tui/src", "conductor/core/src"];

/// Workspace root (two levels above this crate)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files under `dir`
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// A source file split into lines
pub struct SourceFile {
    /// Path as scanned
    pub path: PathBuf,
    /// Every line of the file
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file; unreadable files are skipped
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        })
    }

    /// Build from literal lines (detector tests)
    pub fn from_lines(path: &str, lines: &[&str]) -> Self {
        Self {
            path: PathBuf::from(path),
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    /// Number of lines before the test module
    pub fn production_len(&self) -> usize {
        self.lines
            .iter()
            .position(|line| line.trim_start().starts_with("#[cfg(test)]"))
            .unwrap_or(self.lines.len())
    }

    /// `(index, code)` for every production line, comments stripped
    pub fn production_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines[..self.production_len()]
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx, code_part(line)))
            .filter(|(_, code)| !code.trim().is_empty())
    }

    /// Index of the nearest function signature at or above `idx`
    pub fn enclosing_fn(&self, idx: usize) -> Option<usize> {
        (0..=idx.min(self.lines.len().saturating_sub(1)))
            .rev()
            .find(|&i| is_fn_signature(&self.lines[i]))
    }

    /// Whether `idx` sits inside an `async fn`
    pub fn in_async_fn(&self, idx: usize) -> bool {
        self.enclosing_fn(idx)
            .is_some_and(|i| self.lines[i].contains("async fn"))
    }

    /// Lowercased lines within `before` lines above and `after` lines below `idx`
    pub fn context(&self, idx: usize, before: usize, after: usize) -> Vec<String> {
        let start = idx.saturating_sub(before);
        let end = (idx + after + 1).min(self.lines.len());
        self.lines[start..end]
            .iter()
            .map(|l| l.to_lowercase())
            .collect()
    }

    /// Record a violation at `idx`
    pub fn violation(&self, idx: usize, reason: &'static str) -> Violation {
        Violation {
            path: self.path.clone(),
            line: idx + 1,
            text: self.lines[idx].trim().to_string(),
            reason,
        }
    }
}

/// A rule broken at one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending line, trimmed
    pub text: String,
    /// What rule it breaks
    pub reason: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.text
        )
    }
}

/// Code before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a line opens a function (`fn`, `pub fn`, `async fn`, `pub(crate) async fn`, ...)
pub fn is_fn_signature(line: &str) -> bool {
    let mut rest = line.trim_start();
    loop {
        let stripped = ["pub(crate) ", "pub(super) ", "pub ", "async ", "const ", "unsafe "]
            .iter()
            .find_map(|prefix| rest.strip_prefix(prefix));
        match stripped {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest.starts_with("fn ")
}

/// Scan every production file with `check`
pub fn scan<F>(mut check: F) -> Vec<Violation>
where
    F: FnMut(&SourceFile, &str, &mut Vec<Violation>),
{
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for path in rust_files(&root.join(dir)) {
            if let Some(file) = SourceFile::load(&path) {
                check(&file, dir, &mut violations);
            }
        }
    }

    violations
}

/// Print violations and fail the test
pub fn report(violations: &[Violation], title: &str, guidance: &[&str]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ CRITICAL: {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!();
    for line in guidance {
        eprintln!("{line}");
    }

    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature_detection() {
        assert!(is_fn_signature("fn main() {"));
        assert!(is_fn_signature("    pub fn load_config() -> Result<()> {"));
        assert!(is_fn_signature("    pub async fn settle(&mut self) {"));
        assert!(is_fn_signature("pub(crate) async fn gate(&self) {"));
        assert!(!is_fn_signature("    let f = fn_pointer;"));
        assert!(!is_fn_signature("// fn commented()"));
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let file = SourceFile::from_lines(
            "x.rs",
            &[
                "fn a() {}",
                "// comment only",
                "#[cfg(test)]",
                "mod tests {",
                "    fn b() {}",
                "}",
            ],
        );
        let lines: Vec<_> = file.production_lines().collect();
        assert_eq!(lines, vec![(0, "fn a() {}")]);
    }

    #[test]
    fn test_enclosing_async_fn() {
        let file = SourceFile::from_lines(
            "x.rs",
            &[
                "pub fn load() {",
                "    read();",
                "}",
                "pub async fn fetch(&self) {",
                "    call().await;",
                "}",
            ],
        );
        assert!(!file.in_async_fn(1));
        assert!(file.in_async_fn(4));
        assert_eq!(file.enclosing_fn(4), Some(3));
    }

    #[test]
    fn test_workspace_root_holds_production_dirs() {
        let root = workspace_root();
        for dir in PRODUCTION_DIRS {
            assert!(root.join(dir).is_dir(), "missing {dir}");
        }
    }
}
