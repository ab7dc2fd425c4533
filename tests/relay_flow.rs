use futures_util::future::join_all;
use std::net::TcpListener;
use std::time::Duration;
use stream_relay_bot::relay::{relay, Relay, RelayConfig, UploadOutcome, UploadRequest};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIBRARY: &str = "zone-9";
const API_KEY: &str = "test-key";

/// Generous upper bound for relays that are expected to give up on their own
const TEST_GUARD: Duration = Duration::from_secs(10);

fn relay_for(upload: &MockServer) -> Relay {
    Relay::new(RelayConfig::new(LIBRARY, API_KEY).with_api_base(upload.uri()))
        .expect("client builds")
}

async fn mount_source(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

/// Address nothing listens on, for connection-refused failures
fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn test_successful_relay() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(
        &source,
        "/videos/clip42.mp4",
        ResponseTemplate::new(200).set_body_bytes(b"FAKE-MP4-PAYLOAD".to_vec()),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/library/zone-9/videos/upload"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_string_contains("name=\"file\"; filename=\"clip42.mp4\""))
        .and(body_string_contains("FAKE-MP4-PAYLOAD"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .expect(1)
        .mount(&upload)
        .await;

    let outcome = relay_for(&upload)
        .relay(&format!("{}/videos/clip42.mp4", source.uri()))
        .await;

    assert_eq!(outcome, UploadOutcome::Success);
}

#[tokio::test]
async fn test_download_404_skips_upload() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(&source, "/videos/missing.mp4", ResponseTemplate::new(404)).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upload)
        .await;

    let outcome = relay_for(&upload)
        .relay(&format!("{}/videos/missing.mp4", source.uri()))
        .await;

    assert_eq!(
        outcome,
        UploadOutcome::DownloadFailed {
            status_code: 404,
            reason: "Not Found".to_string(),
        }
    );
    upload.verify().await;
}

#[tokio::test]
async fn test_upload_500_returns_raw_body() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(
        &source,
        "/clip.mp4",
        ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 1024]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/library/zone-9/videos/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .expect(1)
        .mount(&upload)
        .await;

    let outcome = relay_for(&upload)
        .relay(&format!("{}/clip.mp4", source.uri()))
        .await;

    assert_eq!(
        outcome,
        UploadOutcome::UploadFailed {
            status_code: 500,
            response_body: "quota exceeded".to_string(),
        }
    );
}

#[tokio::test]
async fn test_trailing_slash_uploads_with_empty_file_name() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(
        &source,
        "/",
        ResponseTemplate::new(200).set_body_bytes(b"index".to_vec()),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upload)
        .await;

    let outcome = relay_for(&upload).relay(&format!("{}/", source.uri())).await;

    assert_eq!(outcome, UploadOutcome::Success);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let upload = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upload)
        .await;

    let outcome = relay_for(&upload)
        .relay(&format!("{}/clip.mp4", dead_address()))
        .await;

    match outcome {
        UploadOutcome::TransportError { message } => assert!(!message.trim().is_empty()),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_upload_endpoint_is_transport_error() {
    let source = MockServer::start().await;
    mount_source(
        &source,
        "/clip.mp4",
        ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()),
    )
    .await;
    let relay = Relay::new(RelayConfig::new(LIBRARY, API_KEY).with_api_base(dead_address()))
        .expect("client builds");

    let outcome = relay.relay(&format!("{}/clip.mp4", source.uri())).await;

    assert!(matches!(outcome, UploadOutcome::TransportError { .. }));
}

#[tokio::test]
async fn test_unsupported_scheme_is_transport_error() {
    let upload = MockServer::start().await;

    let outcome = relay_for(&upload).relay("ftp://cdn.example.com/clip.mp4").await;

    assert!(matches!(outcome, UploadOutcome::TransportError { .. }));
    assert!(upload
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_request_overrides_destination_and_token() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(
        &source,
        "/a/b/c.webm",
        ResponseTemplate::new(200).set_body_bytes(b"webm".to_vec()),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/library/other-library/videos/upload"))
        .and(header("Authorization", "Bearer other-key"))
        .and(body_string_contains("filename=\"c.webm\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upload)
        .await;

    let request = UploadRequest::new(
        format!("{}/a/b/c.webm", source.uri()),
        "other-library",
        "other-key",
    );
    let outcome = relay_for(&upload).relay_request(&request).await;

    assert_eq!(outcome, UploadOutcome::Success);
}

#[tokio::test]
async fn test_free_function_reports_download_failure() {
    let source = MockServer::start().await;
    mount_source(&source, "/gone.mp4", ResponseTemplate::new(410)).await;

    let outcome = relay(&format!("{}/gone.mp4", source.uri()), LIBRARY, API_KEY).await;

    assert!(matches!(
        outcome,
        UploadOutcome::DownloadFailed {
            status_code: 410,
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_relays_do_not_interfere() {
    const JOBS: usize = 8;
    let client = reqwest::Client::new();
    let mut servers = Vec::with_capacity(JOBS);

    for i in 0..JOBS {
        let source = MockServer::start().await;
        let upload = MockServer::start().await;
        let payload = format!("payload-{i}");
        mount_source(
            &source,
            &format!("/clip{i}.mp4"),
            ResponseTemplate::new(200).set_body_string(payload.clone()),
        )
        .await;

        let response = if i % 2 == 0 {
            ResponseTemplate::new(200)
        } else {
            ResponseTemplate::new(500).set_body_string(format!("fail-{i}"))
        };
        Mock::given(method("POST"))
            .and(body_string_contains(format!("filename=\"clip{i}.mp4\"")))
            .and(body_string_contains(payload))
            .respond_with(response)
            .expect(1)
            .mount(&upload)
            .await;

        servers.push((source, upload));
    }

    let jobs = servers.iter().enumerate().map(|(i, (source, upload))| {
        let relay = Relay::with_client(
            client.clone(),
            RelayConfig::new(LIBRARY, API_KEY).with_api_base(upload.uri()),
        );
        let url = format!("{}/clip{i}.mp4", source.uri());
        async move { relay.relay(&url).await }
    });
    let outcomes = join_all(jobs).await;

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let expected = if i % 2 == 0 {
            UploadOutcome::Success
        } else {
            UploadOutcome::UploadFailed {
                status_code: 500,
                response_body: format!("fail-{i}"),
            }
        };
        assert_eq!(outcome, expected, "job {i}");
    }
}

#[tokio::test]
async fn test_stalled_source_is_transport_error() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/frozen.mp4"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3600)))
        .mount(&source)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upload)
        .await;

    let relay = Relay::new(
        RelayConfig::new(LIBRARY, API_KEY)
            .with_api_base(upload.uri())
            .with_idle_timeout(Duration::from_secs(1)),
    )
    .expect("client builds");
    let outcome = tokio::time::timeout(
        TEST_GUARD,
        relay.relay(&format!("{}/videos/frozen.mp4", source.uri())),
    )
    .await
    .expect("relay gives up once the source goes quiet");

    match outcome {
        UploadOutcome::TransportError { message } => {
            assert!(message.contains("stalled"), "got: {message}");
        }
        other => panic!("expected TransportError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stalled_upload_endpoint_is_transport_error() {
    let source = MockServer::start().await;
    let upload = MockServer::start().await;
    mount_source(
        &source,
        "/videos/clip42.mp4",
        ResponseTemplate::new(200).set_body_bytes(b"FAKE-MP4-PAYLOAD".to_vec()),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/library/zone-9/videos/upload"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3600)))
        .mount(&upload)
        .await;

    let relay = Relay::new(
        RelayConfig::new(LIBRARY, API_KEY)
            .with_api_base(upload.uri())
            .with_idle_timeout(Duration::from_secs(1)),
    )
    .expect("client builds");
    let outcome = tokio::time::timeout(
        TEST_GUARD,
        relay.relay(&format!("{}/videos/clip42.mp4", source.uri())),
    )
    .await
    .expect("relay gives up when the upload never answers");

    assert!(
        matches!(outcome, UploadOutcome::TransportError { .. }),
        "got {outcome:?}"
    );
}
