use std::time::Duration;

use httpmock::prelude::*;
use jobclient::{
    AvatarBatch, HttpJobBackend, JobBackend, JobClient, JobHandle, JobKind, JobRequest, JobState, Outcome,
    PollConfig, PollError, SubmissionError, TextToImage, VideoFilter,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn batch_request() -> JobRequest {
    let urls = (0..15).map(|i| format!("https://cdn.example/{i}.jpg")).collect();
    let mut batch = AvatarBatch::new(urls, "avatar style");
    batch.variants_per_image = 2;
    JobRequest::AvatarBatch(batch)
}

fn fast_poll() -> PollConfig {
    PollConfig::new(Duration::from_millis(20), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_submit_posts_body_and_returns_handle() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/ai/generate/batch")
                .json_body_partial(r#"{"variants_per_image": 2, "aspect_ratio": "1:1", "prompt": "avatar style"}"#);
            then.status(200).json_body(json!({
                "ok": true, "job_id": "job-42", "status_url": "/ai/status?job_id=job-42"
            }));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()));
    let handle = client.submit(&batch_request()).await.unwrap();

    submit.assert_async().await;
    assert_eq!(handle.id, "job-42");
    assert_eq!(handle.kind, JobKind::AvatarBatch);
    assert_eq!(handle.status_url.as_deref(), Some("/ai/status?job_id=job-42"));
}

#[tokio::test]
async fn test_submit_402_is_payment_required() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/ai/generate/text");
            then.status(402).json_body(json!({"ok": false, "error": "insufficient credits"}));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()));
    let err = client.submit(&JobRequest::TextToImage(TextToImage::new("a cat"))).await.unwrap_err();

    assert!(err.is_payment_required(), "{err:?}");
}

#[tokio::test]
async fn test_submit_other_status_is_server_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/media/filter/video");
            then.status(422).body("preset not supported");
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()));
    let req = JobRequest::VideoFilter(VideoFilter::new("https://cdn.example/v.mp4", "sepia"));
    let err = client.submit(&req).await.unwrap_err();

    assert_eq!(err, SubmissionError::ServerRejected { status: 422, body: "preset not supported".into() });
}

#[tokio::test]
async fn test_submit_ok_false_is_server_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/ai/generate/text");
            then.status(200).json_body(json!({"ok": false, "job_id": "job-5"}));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()));
    let err = client.submit(&JobRequest::TextToImage(TextToImage::new("a cat"))).await.unwrap_err();

    match err {
        SubmissionError::ServerRejected { status, body } => {
            assert_eq!(status, 200);
            assert!(body.contains("job-5"), "{body}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_unreachable_backend_is_transport() {
    // nothing listens on port 9 (discard) in the test environment
    let client = JobClient::new(HttpJobBackend::new("http://127.0.0.1:9"));
    let err = client.submit(&JobRequest::TextToImage(TextToImage::new("a cat"))).await.unwrap_err();

    assert!(matches!(err, SubmissionError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn test_fetch_status_queries_by_job_id() {
    let server = MockServer::start_async().await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/media/filter/status").query_param("job_id", "vid-7");
            then.status(200).json_body(json!({
                "ok": true, "job_id": "vid-7", "status": "RUNNING",
                "result": {"progress": 55, "stage": "encoding"}
            }));
        })
        .await;

    let backend = HttpJobBackend::new(server.base_url());
    let handle = JobHandle { id: "vid-7".into(), kind: JobKind::VideoFilter, status_url: None };
    let st = backend.fetch_status(&handle).await.unwrap();

    status.assert_async().await;
    assert_eq!(st.state, JobState::Running);
    assert_eq!(st.progress, Some(55));
}

#[tokio::test]
async fn test_end_to_end_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/ai/generate/batch");
            then.status(200).json_body(json!({"ok": true, "job_id": "job-9", "status_url": "/ai/status?job_id=job-9"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ai/status").query_param("job_id", "job-9");
            then.status(200).json_body(json!({
                "ok": true, "job_id": "job-9", "kind": "avatar_batch", "status": "DONE", "stage": "done",
                "result": {
                    "items": [{"source_image_url": "https://cdn.example/0.jpg",
                               "generated_images": ["https://out.example/0a.png", "https://out.example/0b.png"]}],
                    "summary": {"count_sources": 15, "variants_per_image": 2, "total_generated": 2}
                }
            }));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url())).with_poll_config(fast_poll());
    let outcome = client.run(&batch_request(), CancellationToken::new()).await.unwrap();

    match outcome {
        Outcome::Success { result } => assert_eq!(result.produced_count(), 2),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_status_5xx_until_deadline_times_out() {
    let server = MockServer::start_async().await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/ai/status");
            then.status(500).body("internal error");
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()))
        .with_poll_config(PollConfig::new(Duration::from_millis(20), Duration::from_millis(200)).unwrap());
    let handle = JobHandle { id: "job-1".into(), kind: JobKind::TextToImage, status_url: None };
    let err = client.poll(&handle, CancellationToken::new()).await.unwrap_err();

    match err {
        PollError::TimedOut { last_error, .. } => assert!(last_error.unwrap().contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(status.hits_async().await >= 2);
}

#[tokio::test]
async fn test_unknown_state_is_retried_until_deadline() {
    let server = MockServer::start_async().await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/ai/status");
            then.status(200).json_body(json!({"ok": true, "job_id": "job-1", "status": "CANCELLED"}));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url()))
        .with_poll_config(PollConfig::new(Duration::from_millis(20), Duration::from_millis(200)).unwrap());
    let handle = JobHandle { id: "job-1".into(), kind: JobKind::TextToImage, status_url: None };
    let err = client.poll(&handle, CancellationToken::new()).await.unwrap_err();

    match err {
        PollError::TimedOut { last_error, .. } => {
            let last_error = last_error.unwrap();
            assert!(last_error.starts_with("Decoding error"), "{last_error}");
            assert!(last_error.contains("CANCELLED"), "{last_error}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(status.hits_async().await >= 2);
}

#[tokio::test]
async fn test_credits_check_request() {
    let server = MockServer::start_async().await;
    let credits = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/ai/credits/check")
                .json_body(json!({"operation_type": "avatar_batch", "user_id": "u-1"}));
            then.status(200).json_body(json!({
                "ok": true, "can_proceed": false, "credits_needed": 30, "credits_remaining": 4,
                "daily_limit_reached": true, "reason": null
            }));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url())).with_user_id("u-1");
    let err = client.ensure_credits(&batch_request()).await.unwrap_err();

    credits.assert_async().await;
    assert_eq!(err, SubmissionError::PaymentRequired { body: "daily generation limit reached".into() });
}

#[tokio::test]
async fn test_subscription_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ai/subscription/status").query_param("user_id", "u-1");
            then.status(200).json_body(json!({
                "ok": true, "is_active": true, "plan_type": "monthly", "credits_remaining": 120,
                "daily_credits_used": 10, "daily_limit": 50, "can_generate_avatar_batch": true,
                "expires_at": "2026-12-01T00:00:00Z", "reset_at": "2026-10-20T00:00:00Z"
            }));
        })
        .await;

    let client = JobClient::new(HttpJobBackend::new(server.base_url())).with_user_id("u-1");
    let sub = client.subscription_status().await.unwrap();

    assert!(sub.can_generate_avatar_batch);
    assert_eq!(sub.plan_type.as_deref(), Some("monthly"));
    assert!(sub.expires_at.is_some());
}
