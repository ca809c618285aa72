//! Tool availability and metadata probes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Check that the extraction binary resolves on PATH.
pub fn check_ytdlp(binary: &str) -> EngineResult<PathBuf> {
    which::which(binary).map_err(|_| EngineError::YtDlpNotFound)
}

/// Ask the tool for its version string. Used by the startup probe and the
/// readiness check.
pub async fn ytdlp_version(binary: &str) -> EngineResult<String> {
    check_ytdlp(binary)?;

    let output = Command::new(binary).arg("--version").output().await?;
    if !output.status.success() {
        return Err(EngineError::probe_failed("--version exited non-zero"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Arguments for a metadata-only invocation: a single fast web_creator
/// probe, no media download.
fn metadata_args(url: &str) -> Vec<String> {
    vec![
        "--dump-json".into(),
        "--no-warnings".into(),
        "--socket-timeout".into(),
        "15".into(),
        "--retries".into(),
        "1".into(),
        "--extractor-args".into(),
        "youtube:player_client=web_creator".into(),
        "--age-limit".into(),
        "99".into(),
        url.into(),
    ]
}

/// Run the tool in metadata-only mode and parse its JSON description of the
/// video. The process is killed when `timeout` elapses.
pub async fn fetch_metadata_json(
    binary: &str,
    url: &str,
    timeout: Duration,
) -> EngineResult<serde_json::Value> {
    check_ytdlp(binary)?;
    debug!(url, "Fetching metadata via yt-dlp");

    let output = Command::new(binary)
        .args(metadata_args(url))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| EngineError::Timeout(timeout.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().last().unwrap_or("Unknown error").to_string();
        return Err(EngineError::probe_failed(reason));
    }

    parse_metadata_output(&String::from_utf8_lossy(&output.stdout))
}

/// The tool may print warnings before the JSON document; the last line is
/// the one that matters.
fn parse_metadata_output(stdout: &str) -> EngineResult<serde_json::Value> {
    let last = stdout
        .trim()
        .lines()
        .last()
        .ok_or_else(|| EngineError::probe_failed("empty metadata output"))?;
    Ok(serde_json::from_str(last)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ytdlp() {
        assert!(check_ytdlp("sh").is_ok());
        assert!(matches!(
            check_ytdlp("tgrab-definitely-missing-binary"),
            Err(EngineError::YtDlpNotFound)
        ));
    }

    #[test]
    fn test_metadata_args() {
        let args = metadata_args("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(args.contains(&"--dump-json".to_string()));
        assert!(args.contains(&"youtube:player_client=web_creator".to_string()));
        assert_eq!(
            args.last().unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_parse_metadata_output_takes_last_line() {
        let stdout = "some warning\n{\"title\":\"Test\",\"duration\":212.0}\n";
        let value = parse_metadata_output(stdout).unwrap();
        assert_eq!(value["title"], "Test");
    }

    #[test]
    fn test_parse_metadata_output_rejects_garbage() {
        assert!(parse_metadata_output("").is_err());
        assert!(parse_metadata_output("not json").is_err());
    }
}
