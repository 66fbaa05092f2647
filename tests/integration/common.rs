//! Shared fixtures: a mock API server and an executor wired to it

use std::sync::Arc;
use std::time::Duration;
use strava_archive::downloader::{BatchExecutor, WindowSchedule};
use strava_archive::fetcher::{ApiClient, ApiConfig, Credential};
use strava_archive::output::ArtifactStore;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USAGE_HEADER: &str = "x-readratelimit-usage";

/// Window schedule that only waits a few milliseconds
pub struct InstantWindows;

impl WindowSchedule for InstantWindows {
    fn until_next_window(&self) -> Duration {
        Duration::from_millis(5)
    }
}

/// Window schedule that waits a fixed, long time
pub struct LongWindows;

impl WindowSchedule for LongWindows {
    fn until_next_window(&self) -> Duration {
        Duration::from_secs(600)
    }
}

pub fn executor(server: &MockServer, data_dir: &TempDir) -> BatchExecutor {
    executor_with_config(ApiConfig::default().with_base_url(server.uri()), data_dir)
}

/// Executor on a custom connection config, with instant window waits
pub fn executor_with_config(config: ApiConfig, data_dir: &TempDir) -> BatchExecutor {
    let api = Arc::new(ApiClient::new(config, Credential::new("test-token")).unwrap());
    BatchExecutor::new(api, ArtifactStore::new(data_dir.path()))
        .with_schedule(Arc::new(InstantWindows))
}

/// 200 response carrying `usage` percent used and a small JSON body
pub fn ok_response(usage: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(USAGE_HEADER, usage)
        .set_body_json(serde_json::json!({"resource_state": 3}))
}

/// Probe endpoint that reports `usage` on its next `times` calls
pub async fn mount_probe(server: &MockServer, usage: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/athlete"))
        .respond_with(ok_response(usage));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Number of requests the server saw on `request_path`
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
