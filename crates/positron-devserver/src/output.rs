//! Recognizing readiness and port changes in dev-server output.

use std::sync::OnceLock;

use regex::Regex;

fn port_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"localhost:(\d+)").ok())
        .as_ref()
}

/// What one output line tells us.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineSignal {
    pub ready: bool,
    /// Port announced on a `Local:` line.
    pub port: Option<u16>,
}

/// Inspect a line of output. Matching is case-insensitive; `patterns` are
/// the configured readiness markers. A `Local:` line always counts as ready
/// and may carry the port the server actually bound.
pub fn scan_line(line: &str, patterns: &[String]) -> LineSignal {
    let lower = line.to_lowercase();
    let mut signal = LineSignal {
        ready: patterns
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase())),
        port: None,
    };

    if lower.contains("local:") {
        signal.ready = true;
        signal.port = port_pattern()
            .and_then(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
    }
    signal
}
