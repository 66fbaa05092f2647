//! Integration tests for partial failures and fatal rate limiting

use std::time::Duration;
use strava_archive::downloader::{BatchJob, DownloadError, ItemOutcome, JobStatus};
use strava_archive::endpoint::Endpoint;
use strava_archive::fetcher::ApiConfig;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{executor, executor_with_config, mount_probe, ok_response, requests_to};

#[tokio::test]
async fn test_partial_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path("/activities/2/kudos"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/activities/\d+/kudos$"))
        .respond_with(ok_response("5"))
        .mount(&server)
        .await;

    let job = BatchJob::new(Endpoint::ActivityKudos.descriptor(server.uri()), [1, 2, 3]);
    let report = executor(&server, &data_dir).execute(&job).await.unwrap();

    assert_eq!(report.status, JobStatus::Done);
    assert_eq!(report.fetched.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, 2);
    assert_eq!(report.failed[0].reason, "404 Not Found");
    assert!(!data_dir
        .path()
        .join("activities/activity_2_kudos.json")
        .exists());
}

#[tokio::test]
async fn test_failed_item_is_retried_on_next_run() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path("/routes/8"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/routes/8"))
        .respond_with(ok_response("2"))
        .mount(&server)
        .await;

    let job = BatchJob::new(Endpoint::Route.descriptor(server.uri()), [8]);
    let first = executor(&server, &data_dir).execute(&job).await.unwrap();
    assert_eq!(first.failed.len(), 1);

    let second = executor(&server, &data_dir).execute(&job).await.unwrap();
    assert_eq!(second.fetched, vec![8]);
    assert!(data_dir.path().join("routes/route_8.json").exists());
}

#[tokio::test]
async fn test_429_halts_batch_after_chunk_settles() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "98", None).await;
    Mock::given(method("GET"))
        .and(path("/clubs/1/activities"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/clubs/\d+/activities$"))
        .respond_with(ok_response("99"))
        .mount(&server)
        .await;

    let job = BatchJob::new(
        Endpoint::ClubActivities.descriptor(server.uri()),
        [1, 2, 3, 4],
    );
    let result = executor(&server, &data_dir).execute(&job).await;

    assert!(matches!(result, Err(DownloadError::RateLimitExceeded)));
    // The sibling unit in the same chunk still completed
    assert!(data_dir.path().join("clubs/club_2_activities.json").exists());
    // No window wait, no re-probe, no second chunk
    assert_eq!(requests_to(&server, "/athlete").await, 1);
    assert_eq!(requests_to(&server, "/clubs/3/activities").await, 0);
    assert_eq!(requests_to(&server, "/clubs/4/activities").await, 0);
}

#[tokio::test]
async fn test_429_on_probe_is_fatal() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/athlete"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let job = BatchJob::new(Endpoint::Club.descriptor(server.uri()), [1]);
    let result = executor(&server, &data_dir).execute(&job).await;

    assert!(matches!(result, Err(DownloadError::RateLimitExceeded)));
    assert_eq!(requests_to(&server, "/clubs/1").await, 0);
}

#[tokio::test]
async fn test_probe_without_usage_header_means_no_budget() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/athlete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let executor = executor(&server, &data_dir).with_config(
        strava_archive::downloader::BatchConfig::default().with_max_window_cycles(Some(1)),
    );
    let job = BatchJob::new(Endpoint::Activity.descriptor(server.uri()), [1]);
    let result = executor.execute(&job).await;

    assert!(matches!(
        result,
        Err(DownloadError::BudgetExhausted {
            cycles: 1,
            remaining: 1
        })
    ));
    assert_eq!(requests_to(&server, "/activities/1").await, 0);
}

#[tokio::test]
async fn test_connection_refused_is_item_failure() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();

    // Nothing listens on port 1
    let descriptor = Endpoint::ActivityLaps.descriptor("http://127.0.0.1:1");
    let outcome = executor(&server, &data_dir)
        .process_item(5, &descriptor)
        .await
        .unwrap();

    match outcome {
        ItemOutcome::Failed { reason } => assert!(reason.starts_with("network error"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!data_dir
        .path()
        .join("activities/activity_5_laps.json")
        .exists());
}

#[tokio::test]
async fn test_request_timeout_is_item_failure() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path("/activities/6/zones"))
        .respond_with(ok_response("1").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/activities/\d+/zones$"))
        .respond_with(ok_response("1"))
        .mount(&server)
        .await;

    let config = ApiConfig::default()
        .with_base_url(server.uri())
        .with_request_timeout(Duration::from_millis(300));
    let job = BatchJob::new(Endpoint::ActivityZones.descriptor(server.uri()), [5, 6, 7]);
    let report = executor_with_config(config, &data_dir)
        .execute(&job)
        .await
        .unwrap();

    assert_eq!(report.status, JobStatus::Done);
    assert_eq!(report.fetched, vec![5, 7]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, 6);
    assert!(report.failed[0].reason.starts_with("network error"));
}

#[tokio::test]
async fn test_malformed_body_is_item_failure() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path("/clubs/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-readratelimit-usage", "1")
                .set_body_string("<html>maintenance</html>"),
        )
        .mount(&server)
        .await;

    let job = BatchJob::new(Endpoint::Club.descriptor(server.uri()), [3]);
    let report = executor(&server, &data_dir).execute(&job).await.unwrap();

    assert_eq!(report.status, JobStatus::Done);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.starts_with("parse error"));
    assert!(!data_dir.path().join("clubs/club_3.json").exists());
}

#[tokio::test]
async fn test_usage_refresh_timeout_waits_for_next_window() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/athlete"))
        .respond_with(ok_response("0").set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/routes/\d+$"))
        .respond_with(ok_response("1"))
        .mount(&server)
        .await;

    let config = ApiConfig::default()
        .with_base_url(server.uri())
        .with_request_timeout(Duration::from_millis(300));
    let job = BatchJob::new(Endpoint::Route.descriptor(server.uri()), [1, 2]);
    let report = executor_with_config(config, &data_dir)
        .execute(&job)
        .await
        .unwrap();

    // The timed-out refresh left no budget, so the batch waited one window
    assert_eq!(report.windows_waited, 1);
    assert_eq!(report.fetched, vec![1, 2]);
    assert_eq!(report.chunks, vec![vec![1, 2]]);
    assert_eq!(requests_to(&server, "/athlete").await, 2);
}
