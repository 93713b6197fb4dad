//! Integration tests for batch processing and archive assembly.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tikgrab_core::{
    AttemptOutcome, AudioBridge, AudioError, Backend, BackendPriority, BatchCoordinator,
    BatchError, BatchOptions, HttpClient, MediaRecord, Resolver, Transcoder,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::ZipArchive;

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Answers from a fixed URL-to-outcome table; unknown URLs fail.
struct TableBackend {
    outcomes: HashMap<String, AttemptOutcome>,
}

#[async_trait]
impl Backend for TableBackend {
    fn name(&self) -> &str {
        "Table"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Primary
    }

    async fn attempt(&self, url: &str) -> AttemptOutcome {
        self.outcomes
            .get(url)
            .cloned()
            .unwrap_or_else(|| AttemptOutcome::failure("post not found"))
    }
}

fn resolver_with(outcomes: Vec<(&str, AttemptOutcome)>) -> Arc<Resolver> {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(TableBackend {
        outcomes: outcomes
            .into_iter()
            .map(|(url, outcome)| (url.to_string(), outcome))
            .collect(),
    }));
    Arc::new(resolver)
}

fn video(id: &str, title: &str, download_url: String) -> AttemptOutcome {
    AttemptOutcome::Success(MediaRecord {
        id: id.to_string(),
        title: title.to_string(),
        download_url,
        ..MediaRecord::default()
    })
}

fn no_audio() -> BatchOptions {
    BatchOptions {
        include_audio: false,
        ..BatchOptions::default()
    }
}

fn read_entries(archive: &[u8]) -> HashMap<String, Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut entries = HashMap::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        entries.insert(file.name().to_string(), bytes);
    }
    entries
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| (*u).to_string()).collect()
}

#[tokio::test]
async fn test_batch_slideshow_image_failure_becomes_placeholder() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/a/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-1".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/2.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-b".to_vec()))
        .mount(&server)
        .await;

    let slideshow = AttemptOutcome::Success(MediaRecord {
        id: "1".to_string(),
        title: "Beach day".to_string(),
        images: vec![
            format!("{}/a/1.jpg", server.uri()),
            format!("{}/a/2.jpg", server.uri()),
        ],
        ..MediaRecord::default()
    });
    let resolver = resolver_with(vec![
        ("https://t/a", slideshow),
        ("https://t/b", video("2", "Skate", format!("{}/b.mp4", server.uri()))),
    ]);

    let coordinator =
        BatchCoordinator::new(resolver, HttpClient::new().unwrap(), None, no_audio()).unwrap();
    let output = coordinator
        .process_batch(&urls(&["https://t/a", "https://t/b"]))
        .await
        .unwrap();

    let entries = read_entries(&output.archive);
    assert_eq!(entries["images/Beach day/img-1.jpg"], b"jpeg-1");
    let placeholder = String::from_utf8(entries["images/Beach day/img-2-FAILED.txt"].clone()).unwrap();
    assert!(placeholder.starts_with(&format!("Failed to download: {}/a/2.jpg", server.uri())));
    assert!(placeholder.contains("Reason: "));
    assert_eq!(entries["videos/Skate.mp4"], b"mp4-b");
    assert!(entries.contains_key("results.json"));
    assert_eq!(output.manifest.success_count(), 2);
}

#[tokio::test]
async fn test_batch_isolates_failed_item() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
        .mount(&server)
        .await;

    let resolver = resolver_with(vec![
        ("https://t/1", video("1", "One", format!("{}/1.mp4", server.uri()))),
        ("https://t/3", video("3", "Three", format!("{}/3.mp4", server.uri()))),
    ]);
    let coordinator =
        BatchCoordinator::new(resolver, HttpClient::new().unwrap(), None, no_audio()).unwrap();

    let output = coordinator
        .process_batch(&urls(&["https://t/1", "https://t/2", "https://t/3"]))
        .await
        .unwrap();

    assert_eq!(output.manifest.success_count(), 2);
    assert_eq!(output.manifest.failure_count(), 1);
    let failed = &output.manifest.results[1];
    assert!(!failed.success);
    assert_eq!(failed.url, "https://t/2");
    assert!(failed.error.as_deref().unwrap().contains("post not found"));

    let entries = read_entries(&output.archive);
    assert!(entries.contains_key("videos/One.mp4"));
    assert!(entries.contains_key("videos/Three.mp4"));
}

#[tokio::test]
async fn test_batch_all_failures_still_archives_manifest() {
    let resolver = resolver_with(Vec::new());
    let coordinator =
        BatchCoordinator::new(resolver, HttpClient::new().unwrap(), None, no_audio()).unwrap();

    let output = coordinator
        .process_batch(&urls(&["https://t/x", "https://t/y"]))
        .await
        .unwrap();

    let entries = read_entries(&output.archive);
    assert_eq!(entries.len(), 1);
    let manifest: serde_json::Value = serde_json::from_slice(&entries["results.json"]).unwrap();
    assert_eq!(manifest["methodsTried"], serde_json::json!(["Table"]));
    assert_eq!(manifest["results"].as_array().unwrap().len(), 2);
    assert!(manifest["generatedAt"].is_string());
    assert_eq!(output.manifest.failure_count(), 2);
}

#[tokio::test]
async fn test_batch_manifest_keeps_input_order() {
    let resolver = resolver_with(vec![
        ("https://t/2", video("2", "", String::new())),
    ]);
    let coordinator =
        BatchCoordinator::new(resolver, HttpClient::new().unwrap(), None, no_audio()).unwrap();

    let input = urls(&["https://t/1", "https://t/2", "https://t/3"]);
    let results = coordinator.resolve_all(&input).await.unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, vec!["https://t/1", "https://t/2", "https://t/3"]);
    // A record without media is rejected by the chain.
    assert!(results.iter().all(|r| !r.success));
}

#[tokio::test]
async fn test_batch_empty_input_is_error() {
    let coordinator = BatchCoordinator::new(
        resolver_with(Vec::new()),
        HttpClient::new().unwrap(),
        None,
        no_audio(),
    )
    .unwrap();
    assert!(matches!(
        coordinator.process_batch(&[]).await,
        Err(BatchError::EmptyBatch)
    ));
}

/// Fails after a short delay and tracks the peak number of overlapping calls.
struct SlowBackend {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Backend for SlowBackend {
    fn name(&self) -> &str {
        "Slow"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Primary
    }

    async fn attempt(&self, _url: &str) -> AttemptOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        AttemptOutcome::failure("slow")
    }
}

#[tokio::test]
async fn test_batch_respects_concurrency_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut resolver = Resolver::new();
    resolver.register(Box::new(SlowBackend {
        in_flight: Arc::clone(&in_flight),
        peak: Arc::clone(&peak),
    }));

    let options = BatchOptions {
        concurrency: 2,
        ..no_audio()
    };
    let coordinator =
        BatchCoordinator::new(Arc::new(resolver), HttpClient::new().unwrap(), None, options)
            .unwrap();

    let input: Vec<String> = (0..6).map(|i| format!("https://t/{i}")).collect();
    let output = coordinator.process_batch(&input).await.unwrap();

    assert_eq!(output.manifest.failure_count(), 6);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

/// Fails after a per-URL delay.
struct DelayedBackend {
    delays: HashMap<String, Duration>,
}

#[async_trait]
impl Backend for DelayedBackend {
    fn name(&self) -> &str {
        "Delayed"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Primary
    }

    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let delay = self.delays.get(url).copied().unwrap_or_default();
        tokio::time::sleep(delay).await;
        AttemptOutcome::failure(format!("gone after {}ms", delay.as_millis()))
    }
}

#[tokio::test]
async fn test_batch_slow_item_does_not_hold_free_slot() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(DelayedBackend {
        delays: HashMap::from([
            ("https://t/slow".to_string(), Duration::from_millis(500)),
            ("https://t/fast".to_string(), Duration::from_millis(10)),
            ("https://t/third".to_string(), Duration::from_millis(500)),
        ]),
    }));
    let options = BatchOptions {
        concurrency: 2,
        ..no_audio()
    };
    let coordinator =
        BatchCoordinator::new(Arc::new(resolver), HttpClient::new().unwrap(), None, options)
            .unwrap();

    let started = Instant::now();
    let output = coordinator
        .process_batch(&urls(&["https://t/slow", "https://t/fast", "https://t/third"]))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // The third item takes the fast item's slot instead of waiting for the first.
    assert!(elapsed < Duration::from_millis(850), "took {elapsed:?}");
    let order: Vec<&str> = output.manifest.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, vec!["https://t/slow", "https://t/fast", "https://t/third"]);
}

#[tokio::test]
async fn test_batch_label_collision_keeps_later_item() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/first.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"first".to_vec())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
        .mount(&server)
        .await;

    let resolver = resolver_with(vec![
        ("https://t/1", video("1", "Same", format!("{}/first.mp4", server.uri()))),
        ("https://t/2", video("2", "Same", format!("{}/second.mp4", server.uri()))),
    ]);
    let coordinator =
        BatchCoordinator::new(resolver, HttpClient::new().unwrap(), None, no_audio()).unwrap();

    let output = coordinator
        .process_batch(&urls(&["https://t/1", "https://t/2"]))
        .await
        .unwrap();

    // The first item settles last but is applied first.
    let entries = read_entries(&output.archive);
    assert_eq!(entries["videos/Same.mp4"], b"second");
    assert_eq!(output.manifest.success_count(), 2);
}

/// Writes a fixed payload, or fails, without running any external program.
struct StubTranscoder {
    fail: bool,
}

#[async_trait]
impl Transcoder for StubTranscoder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn extract_audio(&self, _input: &Path, output: &Path) -> Result<(), AudioError> {
        if self.fail {
            return Err(AudioError::conversion(Some(1), "Output file does not contain any stream"));
        }
        tokio::fs::write(output, b"ID3-audio").await.unwrap();
        Ok(())
    }
}

async fn run_with_transcoder(server: &MockServer, fail: bool) -> HashMap<String, Vec<u8>> {
    let client = HttpClient::new().unwrap();
    let resolver = resolver_with(vec![(
        "https://t/v",
        video("9", "Clip", format!("{}/v.mp4", server.uri())),
    )]);
    let audio = AudioBridge::new(client.clone(), Arc::new(StubTranscoder { fail }));
    let coordinator =
        BatchCoordinator::new(resolver, client, Some(audio), BatchOptions::default()).unwrap();
    let output = coordinator.process_batch(&urls(&["https://t/v"])).await.unwrap();
    assert_eq!(output.manifest.success_count(), 1);
    read_entries(&output.archive)
}

#[tokio::test]
async fn test_batch_includes_extracted_audio() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/v.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
        .mount(&server)
        .await;

    let entries = run_with_transcoder(&server, false).await;
    assert_eq!(entries["videos/Clip.mp4"], b"mp4");
    assert_eq!(entries["audio/Clip.mp3"], b"ID3-audio");
}

#[tokio::test]
async fn test_batch_audio_failure_becomes_placeholder() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/v.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
        .mount(&server)
        .await;

    let entries = run_with_transcoder(&server, true).await;
    assert!(entries.contains_key("videos/Clip.mp4"));
    assert!(!entries.contains_key("audio/Clip.mp3"));
    let placeholder = String::from_utf8(entries["audio/Clip-FAILED.txt"].clone()).unwrap();
    assert!(placeholder.contains("audio extraction failed"));
}
