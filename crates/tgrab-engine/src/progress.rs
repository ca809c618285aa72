//! Progress line parsing.
//!
//! yt-dlp's output format is undocumented and varies by player client, so
//! parsing is deliberately best-effort: each line is run through a small
//! ordered rule set and the first rule that produces a structured update
//! wins. Lines nothing matches carry no progress information and yield
//! nothing; they are still forwarded to subscribers as raw log events by
//! the download loop.

use regex::Regex;
use std::sync::OnceLock;

use tgrab_models::ProgressUpdate;

/// Marker prefix emitted by the `--progress-template` we pass to the tool.
pub const PROGRESS_MARKER: &str = "download:";

type ParseRule = fn(&str) -> Option<ProgressUpdate>;

/// Rules in priority order. The structured template shape beats the
/// human-readable one when a line could match both.
const RULES: &[ParseRule] = &[parse_template_line, parse_plain_percent_line];

/// Parse one raw output line into zero-or-one progress update.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    RULES.iter().find_map(|rule| rule(line))
}

/// Structured shape: the `download:` marker followed by a JSON blob with
/// string-typed `percent`/`speed` fields. Field values go through the same
/// forgiving float extraction the original frontend relied on, so "NA" or a
/// missing key degrades to 0 instead of dropping the line.
fn parse_template_line(line: &str) -> Option<ProgressUpdate> {
    let start = line.find(PROGRESS_MARKER)?;
    let payload = line[start + PROGRESS_MARKER.len()..].trim();
    let blob: serde_json::Value = serde_json::from_str(payload).ok()?;

    let percent = blob.get("percent").and_then(value_to_float).unwrap_or(0.0);
    let speed = blob
        .get("speed")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let eta = blob
        .get("eta")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Some(ProgressUpdate { percent, speed, eta })
}

/// Human-readable shape: a line with both a `%` token and the word `of`
/// (e.g. `  38.0% of  10.00MiB at  500.00KiB/s`). Only the bare percentage
/// is recoverable.
fn parse_plain_percent_line(line: &str) -> Option<ProgressUpdate> {
    if !(line.contains('%') && line.contains("of")) {
        return None;
    }

    let caps = percent_regex().captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(ProgressUpdate::new(percent))
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid regex"))
}

/// `parseFloat` semantics: longest numeric prefix after optional sign,
/// `None` when there is none.
fn lenient_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                end += 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }
    s[..end].parse().ok()
}

fn value_to_float(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => lenient_float(s),
        _ => None,
    }
}
