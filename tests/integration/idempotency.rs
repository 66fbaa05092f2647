//! Integration tests for restartable batches and skip-on-exists

use strava_archive::downloader::{BatchJob, ItemOutcome, JobStatus};
use strava_archive::endpoint::Endpoint;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer};

use super::common::{executor, mount_probe, ok_response, requests_to};

#[tokio::test]
async fn test_second_run_issues_no_requests() {
    let data_dir = TempDir::new().unwrap();

    let first = MockServer::start().await;
    mount_probe(&first, "10", None).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/activities/\d+/zones$"))
        .respond_with(ok_response("11"))
        .mount(&first)
        .await;

    let job = BatchJob::new(Endpoint::ActivityZones.descriptor(first.uri()), [11, 12, 13]);
    let report = executor(&first, &data_dir).execute(&job).await.unwrap();
    assert_eq!(report.fetched.len(), 3);

    // Fresh session, same storage
    let second = MockServer::start().await;
    let job = BatchJob::new(Endpoint::ActivityZones.descriptor(second.uri()), [11, 12, 13]);
    let report = executor(&second, &data_dir).execute(&job).await.unwrap();

    assert_eq!(report.status, JobStatus::Done);
    assert_eq!(report.skipped, vec![11, 12, 13]);
    assert!(report.chunks.is_empty());
    assert!(second.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_artifact_is_left_untouched() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "50", None).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/activities/\d+/comments$"))
        .respond_with(ok_response("51"))
        .mount(&server)
        .await;

    let existing = data_dir.path().join("activities/activity_2_comments.json");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "not even json").unwrap();

    let job = BatchJob::new(Endpoint::ActivityComments.descriptor(server.uri()), [1, 2, 3]);
    let report = executor(&server, &data_dir).execute(&job).await.unwrap();

    assert_eq!(report.skipped, vec![2]);
    assert_eq!(report.fetched, vec![1, 3]);
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "not even json");
    assert_eq!(requests_to(&server, "/activities/2/comments").await, 0);
}

#[tokio::test]
async fn test_unit_skips_without_request() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/clubs/4/members"))
        .respond_with(ok_response("1"))
        .expect(0)
        .mount(&server)
        .await;

    let existing = data_dir.path().join("clubs/club_4_members.json");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "[]").unwrap();

    let descriptor = Endpoint::ClubMembers.descriptor(server.uri());
    let outcome = executor(&server, &data_dir)
        .process_item(4, &descriptor)
        .await
        .unwrap();
    assert_eq!(outcome, ItemOutcome::Skipped);
}

#[tokio::test]
async fn test_artifact_is_pretty_printed_response_body() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    mount_probe(&server, "0", None).await;
    Mock::given(method("GET"))
        .and(path("/routes/77"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .insert_header("x-readratelimit-usage", "1")
                .set_body_json(serde_json::json!({"id": 77, "name": "Hill loop"})),
        )
        .mount(&server)
        .await;

    let job = BatchJob::new(Endpoint::Route.descriptor(server.uri()), [77]);
    executor(&server, &data_dir).execute(&job).await.unwrap();

    let written = std::fs::read_to_string(data_dir.path().join("routes/route_77.json")).unwrap();
    assert!(written.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["name"], "Hill loop");
}

#[tokio::test]
async fn test_fetched_artifact_lands_at_its_relative_path() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/clubs/21/members"))
        .respond_with(ok_response("3"))
        .mount(&server)
        .await;

    let descriptor = Endpoint::ClubMembers.descriptor(server.uri());
    let outcome = executor(&server, &data_dir)
        .process_item(21, &descriptor)
        .await
        .unwrap();

    let artifact = match outcome {
        ItemOutcome::Fetched(artifact) => artifact,
        other => panic!("expected a fetched artifact, got {other:?}"),
    };
    assert_eq!(artifact.id, 21);
    let on_disk = std::fs::read_to_string(data_dir.path().join(artifact.relative_path())).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert_eq!(parsed, artifact.body);
}
