//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the TUI and core MUST NOT call sleep methods.
//! Waiting happens on I/O, channels, or `tokio::time::interval`.
//! **Exceptions**: Frame rate limiting (TUI only), exponential backoff (retry
//! logic only), simulated latency in the in-memory backend, test code

use architectural_enforcement::{report, scan, SourceFile, Violation};

struct SleepPolicy {
    allow_frame_limiting: bool,
    allow_backoff: bool,
    allow_simulated_latency: bool,
}

fn policy_for(dir: &str) -> SleepPolicy {
    match dir {
        "tui/src" => SleepPolicy {
            allow_frame_limiting: true,
            allow_backoff: true,
            allow_simulated_latency: false,
        },
        _ => SleepPolicy {
            allow_frame_limiting: false,
            allow_backoff: true,
            allow_simulated_latency: true,
        },
    }
}

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(|file, dir, violations| {
        check_file(file, &policy_for(dir), violations);
    });

    report(
        &violations,
        "Sleep calls found in production code!",
        &[
            "✅ ACCEPTABLE sleep uses:",
            "  - Frame rate limiting in the TUI",
            "  - Exponential backoff in retry logic",
            "  - Simulated latency in the in-memory backend",
            "  - Periodic tasks using tokio::time::interval()",
            "",
            "❌ FORBIDDEN:",
            "  - Sleep in polling loops",
            "  - Sleep as poor man's synchronization",
            "  - Sleep to 'wait' for a backend result (await the task instead)",
        ],
    );
}

fn check_file(file: &SourceFile, policy: &SleepPolicy, violations: &mut Vec<Violation>) {
    for (idx, code) in file.production_lines() {
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            continue;
        }

        if policy.allow_frame_limiting && is_frame_limiting_context(file, idx) {
            continue;
        }
        if policy.allow_backoff && is_backoff_context(file, idx) {
            continue;
        }
        if policy.allow_simulated_latency && is_simulated_latency_context(file, idx) {
            continue;
        }
        if is_interval_pattern(file, idx) {
            continue;
        }

        violations.push(file.violation(idx, "sleep call"));
    }
}

/// Sleep used for frame rate limiting
fn is_frame_limiting_context(file: &SourceFile, idx: usize) -> bool {
    file.context(idx, 10, 4).iter().any(|line| {
        line.contains("frame")
            || line.contains("fps")
            || line.contains("rate limit")
            || line.contains("tick_rate")
    })
}

/// Sleep used for exponential backoff
fn is_backoff_context(file: &SourceFile, idx: usize) -> bool {
    let context = file.context(idx, 15, 4);

    let has_backoff_calc = context
        .iter()
        .any(|line| line.contains("<<") || line.contains("pow") || line.contains("* 2"));
    let has_retry_context = context.iter().any(|line| {
        line.contains("retry")
            || line.contains("reconnect")
            || line.contains("backoff")
            || line.contains("attempt")
    });

    has_backoff_calc && has_retry_context
}

/// Sleep standing in for network latency of an in-process backend
fn is_simulated_latency_context(file: &SourceFile, idx: usize) -> bool {
    file.path.ends_with("backend/memory.rs")
        && file
            .context(idx, 3, 0)
            .iter()
            .any(|line| line.contains("simulated latency"))
}

/// Periodic work driven by `tokio::time::interval`
fn is_interval_pattern(file: &SourceFile, idx: usize) -> bool {
    file.context(idx, 20, 4)
        .iter()
        .any(|line| line.contains("interval.tick()") || line.contains("tokio::time::interval"))
}

// ============================================================================
// Detector self-tests
// ============================================================================

fn violations_in(path: &str, lines: &[&str], policy: &SleepPolicy) -> usize {
    let file = SourceFile::from_lines(path, lines);
    let mut violations = Vec::new();
    check_file(&file, policy, &mut violations);
    violations.len()
}

#[test]
fn test_sleep_violation_detection() {
    let lines = [
        "pub async fn wait_for_reply() {",
        "    tokio::time::sleep(Duration::from_millis(10)).await;",
        "}",
    ];
    assert_eq!(violations_in("conductor/core/src/x.rs", &lines, &policy_for("conductor/core/src")), 1);
}

#[test]
fn test_sleep_in_test_module_is_ignored() {
    let lines = [
        "pub fn real() {}",
        "#[cfg(test)]",
        "mod tests {",
        "    async fn helper() { tokio::time::sleep(d).await; }",
        "}",
    ];
    assert_eq!(violations_in("tui/src/x.rs", &lines, &policy_for("tui/src")), 0);
}

#[test]
fn test_backoff_detection() {
    let lines = [
        "async fn reconnect() {",
        "    let delay = base_delay * (1 << attempt);",
        "    tracing::info!(attempt, \"Retry\");",
        "    tokio::time::sleep(Duration::from_millis(delay)).await;",
        "}",
    ];
    let file = SourceFile::from_lines("x.rs", &lines);
    assert!(is_backoff_context(&file, 3));
}

#[test]
fn test_frame_limiting_detection() {
    let lines = [
        "async fn render_loop() {",
        "    let frame_duration = Duration::from_millis(100); // 10 FPS",
        "    loop {",
        "        render();",
        "        tokio::time::sleep(frame_duration).await;",
        "    }",
        "}",
    ];
    let file = SourceFile::from_lines("tui/src/app.rs", &lines);
    assert!(is_frame_limiting_context(&file, 4));
}

#[test]
fn test_simulated_latency_only_in_memory_backend() {
    let lines = [
        "async fn gate(&self) {",
        "    // Simulated latency for demo mode",
        "    tokio::time::sleep(latency).await;",
        "}",
    ];
    let core = policy_for("conductor/core/src");
    assert_eq!(violations_in("conductor/core/src/backend/memory.rs", &lines, &core), 0);
    assert_eq!(violations_in("conductor/core/src/backend/http.rs", &lines, &core), 1);
}
