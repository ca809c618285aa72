//! Extraction engine integration tests.

use std::time::Duration;

/// Test that the extraction tool resolves and reports a version.
#[tokio::test]
#[ignore = "requires yt-dlp"]
async fn test_ytdlp_version() {
    dotenvy::dotenv().ok();

    let binary = std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string());
    let version = tgrab_engine::ytdlp_version(&binary)
        .await
        .expect("Failed to get yt-dlp version");
    println!("yt-dlp version: {}", version);
    assert!(!version.is_empty());
}

/// Test the metadata probe against a real video.
#[tokio::test]
#[ignore = "requires yt-dlp and network"]
async fn test_metadata_probe() {
    dotenvy::dotenv().ok();

    let binary = std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string());
    let value = tgrab_engine::fetch_metadata_json(
        &binary,
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        Duration::from_secs(30),
    )
    .await
    .expect("Failed to fetch metadata");

    let title = value["title"].as_str().expect("Metadata has no title");
    println!("Resolved title: {}", title);
    assert!(value["duration"].as_f64().is_some());
}

/// Test a full download cycle end to end.
#[tokio::test]
#[ignore = "requires yt-dlp and network"]
async fn test_full_download_cycle() {
    use std::sync::Arc;
    use tgrab_engine::{DownloadEngine, EngineConfig};
    use tgrab_events::JobRegistry;
    use tgrab_models::{DownloadEvent, DownloadJob, MediaFormat};

    dotenvy::dotenv().ok();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = EngineConfig {
        downloads_dir: dir.path().to_path_buf(),
        attempt_timeout: Duration::from_secs(300),
        ..EngineConfig::default()
    };

    let registry = Arc::new(JobRegistry::new());
    let engine = DownloadEngine::new(config, Arc::clone(&registry));

    // Short public-domain test video
    let job = DownloadJob::new(
        "https://www.youtube.com/watch?v=jNQXAC9IVRw",
        "jNQXAC9IVRw",
        MediaFormat::Mp3,
    );
    let id = registry.register(job).await;
    let mut events = registry.subscribe(&id).await;

    let runner = tokio::spawn(async move { engine.execute(id).await });

    // Drain the stream until the terminal event
    let mut saw_progress = false;
    loop {
        match events.recv().await {
            Ok(DownloadEvent::Progress { progress, .. }) => {
                saw_progress = true;
                println!("progress: {:.1}%", progress);
            }
            Ok(DownloadEvent::Log { message, .. }) => {
                println!("log: {}", message);
            }
            Ok(DownloadEvent::Complete { files, .. }) => {
                println!("complete: {} file(s)", files.len());
                assert!(!files.is_empty());
                break;
            }
            Ok(DownloadEvent::Error { error, .. }) => {
                panic!("Download failed: {}", error);
            }
            Err(e) => panic!("Event stream ended early: {}", e),
        }
    }

    assert!(saw_progress, "No progress events were observed");
    runner.await.expect("Engine task failed");
}

/// Test the registry event cycle without touching the network.
#[tokio::test]
async fn test_registry_event_cycle() {
    use std::sync::Arc;
    use tgrab_events::JobRegistry;
    use tgrab_models::{ArtifactFile, DownloadEvent, DownloadJob, MediaFormat, ProgressUpdate};

    let registry = Arc::new(JobRegistry::new());
    let job = DownloadJob::new(
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "dQw4w9WgXcQ",
        MediaFormat::Mp4,
    );
    let id = registry.register(job).await;

    // Subscribe in a separate task
    let registry_clone = Arc::clone(&registry);
    let id_clone = id.clone();
    let subscriber = tokio::spawn(async move {
        let mut stream = registry_clone.subscribe(&id_clone).await;
        let mut messages = Vec::new();

        // Collect messages with timeout
        let timeout = tokio::time::timeout(Duration::from_secs(2), async {
            while let Ok(event) = stream.recv().await {
                let terminal = event.is_terminal();
                messages.push(event);
                if terminal {
                    break;
                }
            }
        });

        let _ = timeout.await;
        messages
    });

    // Give the subscriber time to attach
    tokio::time::sleep(Duration::from_millis(100)).await;

    registry.publish_log(&id, "Trying strategy 1...").await;
    registry
        .publish_progress(&id, ProgressUpdate::new(50.0))
        .await;
    registry
        .complete(
            &id,
            vec![ArtifactFile::new("clip.mp4", "/downloads/x/clip.mp4")],
        )
        .await
        .expect("Failed to complete job");

    let messages = subscriber.await.expect("Subscriber task failed");
    println!("Received {} messages", messages.len());
    assert_eq!(messages.len(), 3);
    assert!(matches!(messages.last(), Some(DownloadEvent::Complete { .. })));
}
