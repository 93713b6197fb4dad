//! Integration tests for the resolver chain.
//!
//! Each backend runs against a wiremock stand-in for its upstream service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tikgrab_core::resolver::{SnaptikBackend, SsstikBackend, TiktokHtmlBackend, TikwmBackend};
use tikgrab_core::{
    AttemptOutcome, Backend, BackendHttpConfig, BackendPriority, MediaRecord, ResolveError,
    Resolver, build_default_resolver,
};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const SHARE_URL: &str = "https://www.tiktok.com/@dancer/video/7001";

fn config() -> BackendHttpConfig {
    BackendHttpConfig::new(5, 5)
}

async fn mount_snaptik(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/en"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form><input type="hidden" name="token" value="tok-1"></form>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/abc2.php"))
        .and(body_string_contains("token=tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="video-header"><img src="/thumb/7001.jpg"></div>
               <div class="info"><span>@dancer</span><div class="video-title">Spin move</div></div>
               <a href="/file/7001.mp4" class="button download-file">Download</a>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_snaptik_backend_resolves_form_result() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_snaptik(&server).await;

    let backend = SnaptikBackend::with_base_url(&config(), server.uri()).unwrap();
    let AttemptOutcome::Success(record) = backend.attempt(SHARE_URL).await else {
        panic!("expected snaptik success");
    };

    assert_eq!(record.id, "7001");
    assert_eq!(record.title, "Spin move");
    assert_eq!(record.author, "dancer");
    assert_eq!(record.download_url, format!("{}/file/7001.mp4", server.uri()));
    assert_eq!(record.thumbnail, format!("{}/thumb/7001.jpg", server.uri()));
}

#[tokio::test]
async fn test_snaptik_backend_missing_token_is_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let backend = SnaptikBackend::with_base_url(&config(), server.uri()).unwrap();
    let outcome = backend.attempt(SHARE_URL).await;
    assert!(
        matches!(&outcome, AttemptOutcome::Failure(reason) if reason.contains("token")),
        "unexpected outcome: {outcome:?}"
    );
}

#[tokio::test]
async fn test_ssstik_backend_prefers_hd_link() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/en"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<script>s_tt = 'sess-9';</script>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/abc"))
        .and(query_param("url", "dl"))
        .and(body_string_contains("tt=sess-9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<h2>@dancer</h2><p class="maintext">Spin move</p>
               <a href="https://cdn.test/sd.mp4" class="pure-button without_watermark">SD</a>
               <a href="https://cdn.test/hd.mp4" class="pure-button without_watermark_hd">HD</a>"#,
        ))
        .mount(&server)
        .await;

    let backend = SsstikBackend::with_base_url(&config(), server.uri()).unwrap();
    let AttemptOutcome::Success(record) = backend.attempt(SHARE_URL).await else {
        panic!("expected ssstik success");
    };
    assert_eq!(record.download_url, "https://cdn.test/hd.mp4");
    assert_eq!(record.author, "dancer");
    assert_eq!(record.title, "Spin move");
}

#[tokio::test]
async fn test_tikwm_backend_returns_slideshow_images() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("url", SHARE_URL))
        .and(query_param("hd", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": {
                "id": "7001",
                "title": "Beach day",
                "duration": 0,
                "cover": "https://cdn.test/cover.jpg",
                "play": "https://cdn.test/soundtrack.mp3",
                "images": ["https://cdn.test/1.jpg", "https://cdn.test/2.jpg"],
                "author": { "unique_id": "dancer" }
            }
        })))
        .mount(&server)
        .await;

    let backend = TikwmBackend::with_base_url(&config(), server.uri()).unwrap();
    let AttemptOutcome::Success(record) = backend.attempt(SHARE_URL).await else {
        panic!("expected tikwm success");
    };
    assert!(record.is_slideshow());
    assert_eq!(record.images.len(), 2);
    assert!(record.download_url.is_empty(), "soundtrack must not be the video");
    assert_eq!(record.thumbnail, "https://cdn.test/cover.jpg");
}

#[tokio::test]
async fn test_tikwm_backend_error_code_is_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": -1, "msg": "Url parsing is failed!" })),
        )
        .mount(&server)
        .await;

    let backend = TikwmBackend::with_base_url(&config(), server.uri()).unwrap();
    let outcome = backend.attempt(SHARE_URL).await;
    assert!(
        matches!(&outcome, AttemptOutcome::Failure(reason) if reason == "Url parsing is failed!"),
        "unexpected outcome: {outcome:?}"
    );
}

#[tokio::test]
async fn test_tiktok_html_backend_reads_rehydration_state() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let state = json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {
                "itemInfo": {
                    "itemStruct": {
                        "id": "7002",
                        "desc": "Late night set",
                        "author": { "uniqueId": "dj" },
                        "video": {
                            "playAddr": "https://cdn.test/7002.mp4",
                            "cover": "https://cdn.test/7002.jpg",
                            "duration": 31
                        }
                    }
                }
            }
        }
    });
    let page = format!(
        r#"<html><script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{state}</script></html>"#
    );
    Mock::given(method("GET"))
        .and(path("/@dj/video/7002"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let backend = TiktokHtmlBackend::new(&config()).unwrap();
    let share_url = format!("{}/@dj/video/7002", server.uri());
    let AttemptOutcome::Success(record) = backend.attempt(&share_url).await else {
        panic!("expected html success");
    };
    assert_eq!(record.id, "7002");
    assert_eq!(record.author, "dj");
    assert_eq!(record.duration, 31);
    assert_eq!(record.download_url, "https://cdn.test/7002.mp4");
    assert_eq!(record.description, "Late night set");
}

#[tokio::test]
async fn test_chain_falls_through_failing_services_to_tikwm() {
    let Some(snaptik) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(ssstik) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(tikwm) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&snaptik)
        .await;
    Mock::given(method("GET"))
        .and(path("/en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("s_tt = 'x'"))
        .mount(&ssstik)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<p class="error">Video not found</p>"#),
        )
        .mount(&ssstik)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "id": "7001", "title": "Spin move", "hdplay": "https://cdn.test/hd.mp4" }
        })))
        .mount(&tikwm)
        .await;

    let mut resolver = Resolver::new();
    resolver.register(Box::new(
        TikwmBackend::with_base_url(&config(), tikwm.uri()).unwrap(),
    ));
    resolver.register(Box::new(
        SsstikBackend::with_base_url(&config(), ssstik.uri()).unwrap(),
    ));
    resolver.register(Box::new(
        SnaptikBackend::with_base_url(&config(), snaptik.uri()).unwrap(),
    ));
    assert_eq!(resolver.methods_tried(), vec!["Snaptik", "SSSTik", "Tikwm"]);

    let resolution = resolver.download_video(SHARE_URL).await.unwrap();
    assert_eq!(resolution.backend, "Tikwm");
    assert_eq!(resolution.record.download_url, "https://cdn.test/hd.mp4");
    assert_eq!(resolution.record.description, "Spin move (Tikwm)");
}

/// Scripted backend counting its invocations.
struct ScriptedBackend {
    name: &'static str,
    priority: BackendPriority,
    outcome: AttemptOutcome,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> BackendPriority {
        self.priority
    }

    async fn attempt(&self, _url: &str) -> AttemptOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

#[tokio::test]
async fn test_backend_timeout_is_failure_and_chain_moves_on() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 0, "data": { "id": "1", "play": "https://cdn.test/1.mp4" } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let short = BackendHttpConfig::new(1, 1);
    let slow = TikwmBackend::with_base_url(&short, server.uri()).unwrap();
    let outcome = slow.attempt(SHARE_URL).await;
    assert!(
        matches!(&outcome, AttemptOutcome::Failure(reason) if reason == "request timed out"),
        "unexpected outcome: {outcome:?}"
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let mut resolver = Resolver::new();
    resolver.register(Box::new(slow));
    resolver.register(Box::new(ScriptedBackend {
        name: "after-timeout",
        priority: BackendPriority::LastResort,
        outcome: AttemptOutcome::Success(MediaRecord {
            id: "1".to_string(),
            download_url: "https://cdn.test/fallback.mp4".to_string(),
            ..MediaRecord::default()
        }),
        calls: Arc::clone(&calls),
    }));

    let resolution = resolver.download_video(SHARE_URL).await.unwrap();
    assert_eq!(resolution.backend, "after-timeout");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chain_stops_at_first_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut resolver = Resolver::new();
    resolver.register(Box::new(ScriptedBackend {
        name: "first",
        priority: BackendPriority::Primary,
        outcome: AttemptOutcome::failure("rate limited"),
        calls: Arc::clone(&calls),
    }));
    resolver.register(Box::new(ScriptedBackend {
        name: "second",
        priority: BackendPriority::HdFallback,
        outcome: AttemptOutcome::Success(MediaRecord {
            id: "123".to_string(),
            download_url: "https://cdn.test/123.mp4".to_string(),
            ..MediaRecord::default()
        }),
        calls: Arc::clone(&calls),
    }));
    resolver.register(Box::new(ScriptedBackend {
        name: "third",
        priority: BackendPriority::Slideshow,
        outcome: AttemptOutcome::failure("never reached"),
        calls: Arc::clone(&calls),
    }));

    let resolution = resolver.download_video(SHARE_URL).await.unwrap();

    assert_eq!(resolution.record.id, "123");
    assert_eq!(resolution.backend, "second");
    assert!(resolution.record.description.ends_with("(second)"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_chain_exhaustion_reports_every_reason() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut resolver = Resolver::new();
    for (name, reason) in [("a", "HTTP 403"), ("b", "no link"), ("c", "timed out")] {
        resolver.register(Box::new(ScriptedBackend {
            name,
            priority: BackendPriority::Primary,
            outcome: AttemptOutcome::failure(reason),
            calls: Arc::clone(&calls),
        }));
    }

    let err = resolver.download_video(SHARE_URL).await.unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(matches!(err, ResolveError::ResolutionFailed { .. }));
    let reasons: Vec<&str> = err.failures().iter().map(|f| f.reason.as_str()).collect();
    assert_eq!(reasons, vec!["HTTP 403", "no link", "timed out"]);
}

#[tokio::test]
async fn test_empty_chain_is_error() {
    let err = Resolver::new().download_video(SHARE_URL).await.unwrap_err();
    assert!(matches!(err, ResolveError::NoBackends { .. }));
}

#[test]
fn test_default_chain_order_is_fixed() {
    let resolver = build_default_resolver(&BackendHttpConfig::default());
    assert_eq!(
        resolver.methods_tried(),
        vec!["Snaptik", "SSSTik", "Tikwm", "Direct TikTok HTML"]
    );
}
