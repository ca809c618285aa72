//! Extraction strategy chain.
//!
//! Each strategy spoofs a different YouTube player client. They are tried
//! strictly in declaration order; the later entries get through for content
//! the primary client refuses (age gates, region locks).

use std::path::Path;

use tgrab_models::MediaFormat;

/// Progress template handed to yt-dlp. Emits one structured line per
/// progress tick that the parser picks up by its `download:` marker.
pub const PROGRESS_TEMPLATE: &str =
    r#"download:{"percent":"%(progress.percent)s","speed":"%(progress.speed)s"}"#;

/// One client-spoofing profile for the extraction tool.
///
/// Static configuration data, shared read-only across jobs. Per-job
/// traversal state lives in the download loop, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyConfig {
    /// Short name used in logs and metrics labels
    pub name: &'static str,

    /// Value for `--extractor-args youtube:player_client=`
    pub player_client: &'static str,

    /// Value for `--user-agent`
    pub user_agent: &'static str,

    /// Extra `--add-header` values
    pub extra_headers: &'static [&'static str],

    /// Whether to pass `--geo-bypass`
    pub geo_bypass: bool,
}

/// The fallback chain, in attempt order.
pub fn strategy_chain() -> &'static [StrategyConfig] {
    const CHAIN: &[StrategyConfig] = &[
        // iOS app with full client spoofing
        StrategyConfig {
            name: "ios",
            player_client: "ios",
            user_agent: "com.google.ios.youtube/19.29.1 (iPhone16,2; U; CPU iOS 17_5_1 like Mac OS X;)",
            extra_headers: &["X-YouTube-Client-Name:5", "X-YouTube-Client-Version:19.29.1"],
            geo_bypass: false,
        },
        // Android test-suite client
        StrategyConfig {
            name: "android_testsuite",
            player_client: "android_testsuite",
            user_agent: "Mozilla/5.0 (Linux; Android 11; Pixel 4) AppleWebKit/537.36",
            extra_headers: &[],
            geo_bypass: false,
        },
        // Media Connect client, gets through for restricted content
        StrategyConfig {
            name: "mediaconnect",
            player_client: "mediaconnect",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            extra_headers: &[],
            geo_bypass: true,
        },
    ];
    CHAIN
}

/// Build the full argument vector for one attempt.
///
/// Layout: shared base flags, the strategy's client spoofing, format
/// selection for the requested output, target URL last.
pub fn build_args(
    strategy: &StrategyConfig,
    format: MediaFormat,
    output_dir: &Path,
    url: &str,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--output".into(),
        format!("{}/%(title)s.%(ext)s", output_dir.display()),
        "--no-warnings".into(),
        "--socket-timeout".into(),
        "20".into(),
        "--no-check-certificate".into(),
        "--extractor-args".into(),
        format!("youtube:player_client={}", strategy.player_client),
        "--user-agent".into(),
        strategy.user_agent.into(),
    ];

    for header in strategy.extra_headers {
        args.push("--add-header".into());
        args.push((*header).into());
    }

    if strategy.geo_bypass {
        args.push("--geo-bypass".into());
    }

    args.push("--write-thumbnail".into());
    args.push("--progress-template".into());
    args.push(PROGRESS_TEMPLATE.into());

    match format {
        MediaFormat::Mp3 => {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                "192K".to_string(),
            ]);
        }
        MediaFormat::Mp4 => {
            args.extend(["-f".to_string(), "best[ext=mp4]/best".to_string()]);
        }
    }

    args.push(url.into());
    args
}
