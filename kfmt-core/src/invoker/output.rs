//! Cleanup of ktlint's stdout and stderr

use std::sync::LazyLock;

use regex::Regex;

/// ktlint log lines: `HH:MM:SS.mmm [thread] message`
static LOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+ \[[^\]\r\n]+\] .*(?:\r\n|\n|\r|$)")
        .expect("log line pattern is valid")
});

/// Remove timestamped log lines interleaved with the formatted code
pub fn strip_log_lines(output: &str) -> String {
    LOG_LINE.replace_all(output, "").into_owned()
}

/// The tool's own diagnostic from a failed run
///
/// Starts at the first `marker` found in stderr, then stdout, dropping shell
/// noise printed before it. Falls back to the trimmed stderr.
pub fn extract_diagnostic(stderr: &str, stdout: &str, marker: &str) -> Option<String> {
    for stream in [stderr, stdout] {
        if let Some(idx) = stream.find(marker) {
            return Some(stream[idx..].trim_end().to_string());
        }
    }
    let stderr = stderr.trim();
    (!stderr.is_empty()).then(|| stderr.to_string())
}
