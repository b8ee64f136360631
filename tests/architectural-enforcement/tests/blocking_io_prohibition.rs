//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the TUI and core MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::process` and async
//! `reqwest`, not `std::fs`, `std::net`, `std::process` or `reqwest::blocking`.
//! Non-async functions (config loading and logging setup, before the runtime
//! starts) may block.

use architectural_enforcement::{report, scan, SourceFile, Violation};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = scan(|file, _dir, violations| check_file(file, violations));

    report(
        &violations,
        "Blocking I/O calls found in production code!",
        &[
            "❌ FORBIDDEN blocking I/O:",
            "  - std::fs::read(), std::fs::write(), std::fs::File",
            "  - std::net::TcpStream, std::net::TcpListener",
            "  - std::process::Command::output()",
            "  - reqwest::blocking::*",
            "",
            "✅ REQUIRED async I/O:",
            "  - tokio::fs::read().await, tokio::fs::write().await",
            "  - reqwest::Client::get().send().await",
            "",
            "✅ ACCEPTABLE blocking I/O:",
            "  - Non-async functions (before the tokio runtime starts)",
            "  - Test code",
        ],
    );
}

fn check_file(file: &SourceFile, violations: &mut Vec<Violation>) {
    for (idx, code) in file.production_lines() {
        let in_sync_fn = file.enclosing_fn(idx).is_some() && !file.in_async_fn(idx);

        if code.contains("reqwest::blocking") {
            violations.push(file.violation(idx, "Blocking HTTP client"));
            continue;
        }

        if (code.contains("std::io::stdin()") || code.contains("std::io::stdout()"))
            && file.in_async_fn(idx)
        {
            violations.push(file.violation(idx, "Blocking stdin/stdout in async"));
            continue;
        }

        if in_sync_fn {
            continue;
        }

        if code.contains("std::fs::") || code.contains("use std::fs") {
            violations.push(file.violation(idx, "Blocking file I/O"));
        } else if code.contains("std::net::") || code.contains("use std::net") {
            violations.push(file.violation(idx, "Blocking network I/O"));
        } else if code.contains("std::process::Command") {
            violations.push(file.violation(idx, "Blocking process I/O"));
        }
    }
}

// ============================================================================
// Detector self-tests
// ============================================================================

fn violations_in(lines: &[&str]) -> Vec<Violation> {
    let file = SourceFile::from_lines("conductor/core/src/x.rs", lines);
    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    violations
}

#[test]
fn test_blocking_io_in_async_fn_detected() {
    let violations = violations_in(&[
        "pub async fn load(&self) -> Result<String> {",
        "    let contents = std::fs::read_to_string(\"file.txt\")?;",
        "}",
    ]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].line, 2);
    assert_eq!(violations[0].reason, "Blocking file I/O");
}

#[test]
fn test_blocking_io_in_sync_fn_allowed() {
    let violations = violations_in(&[
        "pub fn load_config_with_env(path: &Path) -> Result<Config> {",
        "    let contents = std::fs::read_to_string(path)?;",
        "}",
    ]);
    assert!(violations.is_empty());
}

#[test]
fn test_blocking_io_in_test_module_allowed() {
    let violations = violations_in(&[
        "pub async fn real() {}",
        "#[cfg(test)]",
        "mod tests {",
        "    async fn helper() { std::fs::write(\"x\", \"y\").unwrap(); }",
        "}",
    ]);
    assert!(violations.is_empty());
}

#[test]
fn test_blocking_http_client_always_flagged() {
    let violations = violations_in(&[
        "fn fetch() {",
        "    let body = reqwest::blocking::get(url)?.text()?;",
        "}",
    ]);
    assert_eq!(violations.len(), 1);
}
