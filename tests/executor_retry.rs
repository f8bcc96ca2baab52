//! Search executor retry behavior: transient failures back off and retry,
//! maintenance and page-shape failures surface immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use tez_harvest::crawling::executor::{SearchExecutor, SearchGateway};
use tez_harvest::crawling::retry::RetryPolicy;
use tez_harvest::domain::dimensions::DimensionValue;
use tez_harvest::domain::partition::PartitionKey;
use tez_harvest::error::{HarvestError, Result};
use tez_harvest::infrastructure::page_parser::KayitBannerParser;

/// Fails the first `failures` submissions with a transient error, then
/// serves the given page.
struct FlakyGateway {
    failures: usize,
    page: String,
    calls: AtomicUsize,
}

impl FlakyGateway {
    fn new(failures: usize, page: impl Into<String>) -> Self {
        Self {
            failures,
            page: page.into(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchGateway for FlakyGateway {
    async fn submit(&self, _filter: &PartitionKey) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(HarvestError::Navigation {
                reason: "connection reset".to_string(),
            });
        }
        Ok(self.page.clone())
    }
}

fn executor(gateway: Arc<FlakyGateway>, max_attempts: u32) -> SearchExecutor {
    SearchExecutor::new(
        gateway,
        RetryPolicy::immediate(max_attempts),
        Arc::new(KayitBannerParser),
        vec!["BAKIM CALISMASI".to_string()],
        "getData()".to_string(),
    )
}

fn key() -> PartitionKey {
    PartitionKey::new(DimensionValue::new("10", "Example University"), "2020")
}

fn good_page(count: u64) -> String {
    format!(
        "<html><body>{count} kayıt<script>function getData() {{}}</script></body></html>"
    )
}

#[tokio::test]
async fn transient_failure_retries_once_then_succeeds() {
    let gateway = Arc::new(FlakyGateway::new(1, good_page(42)));
    let executor = executor(gateway.clone(), 3);

    let outcome = executor.search(&key()).await.unwrap();
    assert_eq!(outcome.record_count, 42);
    // Attempt 1 failed, attempt 2 succeeded: exactly one retry.
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn retries_exhaust_and_propagate_the_transient_error() {
    let gateway = Arc::new(FlakyGateway::new(usize::MAX, good_page(1)));
    let executor = executor(gateway.clone(), 3);

    let err = executor.search(&key()).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(gateway.calls(), 3);
}

#[tokio::test]
async fn maintenance_page_is_never_retried_locally() {
    let gateway = Arc::new(FlakyGateway::new(
        0,
        "<html><body>Sistem BAKIM CALISMASI nedeniyle kapali</body></html>",
    ));
    let executor = executor(gateway.clone(), 3);

    let err = executor.search(&key()).await.unwrap_err();
    assert!(err.is_maintenance());
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn missing_record_banner_is_a_hard_failure_not_zero() {
    let gateway = Arc::new(FlakyGateway::new(
        0,
        "<html><body><script>function getData() {}</script></body></html>",
    ));
    let executor = executor(gateway.clone(), 3);

    let err = executor.search(&key()).await.unwrap_err();
    assert!(matches!(err, HarvestError::RecordCountNotFound { .. }));
    assert!(err.is_partition_local());
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn missing_embedded_data_marker_fails_the_partition() {
    let gateway = Arc::new(FlakyGateway::new(
        0,
        "<html><body>77 kayıt bulundu</body></html>",
    ));
    let executor = executor(gateway.clone(), 3);

    let err = executor.search(&key()).await.unwrap_err();
    assert!(matches!(err, HarvestError::UnexpectedPageShape { .. }));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn flaky_then_maintenance_stops_at_the_maintenance_attempt() {
    // First attempt transient, second attempt lands in the maintenance
    // window: one retry happened, then the maintenance error surfaced.
    let gateway = Arc::new(FlakyGateway::new(
        1,
        "<html><body>undergoing maintenance</body></html>",
    ));
    let executor = SearchExecutor::new(
        gateway.clone(),
        RetryPolicy::immediate(3),
        Arc::new(KayitBannerParser),
        vec!["undergoing maintenance".to_string()],
        "getData()".to_string(),
    );

    let err = executor.search(&key()).await.unwrap_err();
    assert!(err.is_maintenance());
    assert_eq!(gateway.calls(), 2);
}
