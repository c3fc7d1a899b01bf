use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use metacat::core::catalog::Catalog;
use metacat::core::config::Config;
use metacat::core::error::{Error, ErrorKind, Result};
use metacat::core::request::{ResponseRecord, SearchRequest};
use metacat::core::types::{MaterializedRecord, Record, RecordId};
use metacat::distributed::harvester::{Harvester, RemoteBatch, RemoteEndpoint};
use metacat::distributed::pagination::PaginationWindow;
use metacat::query::ast::FilterChain;
use metacat::schema::schema::Schema;
use metacat::storage::metadata::InMemoryMetadataStore;

/// Remote catalog of `total` records; remembers every slice it was asked for
struct FakeCatalog {
    total: usize,
    delay: Duration,
    fail: bool,
    calls: Mutex<Vec<(String, usize, usize)>>,
}

impl FakeCatalog {
    fn new(total: usize) -> Self {
        FakeCatalog { total, delay: Duration::ZERO, fail: false, calls: Mutex::new(Vec::new()) }
    }
}

/// Routes each endpoint to its own fake
struct Federation {
    members: Vec<(String, Arc<FakeCatalog>)>,
}

#[async_trait]
impl Harvester for Federation {
    async fn fetch_remote(
        &self,
        endpoint: &RemoteEndpoint,
        _chain: &FilterChain,
        start: usize,
        max: usize,
    ) -> Result<RemoteBatch> {
        let member = self
            .members
            .iter()
            .find(|(id, _)| *id == endpoint.id)
            .map(|(_, member)| member.clone())
            .ok_or_else(|| Error::remote_endpoint(&endpoint.id, "unknown endpoint"))?;

        member.calls.lock().push((endpoint.id.clone(), start, max));
        if !member.delay.is_zero() {
            tokio::time::sleep(member.delay).await;
        }
        if member.fail {
            return Err(Error::remote_endpoint(&endpoint.id, "HTTP 500"));
        }

        let records = (start..=member.total)
            .take(max)
            .map(|i| MaterializedRecord::new(format!("{}:{}", endpoint.id, i), "<csw:Record/>"))
            .collect();
        Ok(RemoteBatch { matched_count: member.total, records })
    }
}

fn endpoint(id: &str) -> RemoteEndpoint {
    RemoteEndpoint::new(id, format!("https://{}.example.org/csw", id))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn local_catalog(count: usize, federation: Federation) -> Catalog {
    init_tracing();
    let config = Config { remote_timeout_ms: 200, ..Config::default() };
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let catalog = Catalog::open(Schema::catalog_default(), config)
        .unwrap()
        .with_metadata_store(metadata.clone())
        .with_harvester(Arc::new(federation));

    for i in 1..=count {
        let id = format!("local-{:02}", i);
        catalog.add_or_replace(&Record::new(id.as_str()).with_text("type", "dataset")).unwrap();
        metadata.insert(&id, format!("<record>{}</record>", id));
    }
    catalog.refresh().unwrap();
    catalog
}

fn local_ids(count: usize) -> Vec<RecordId> {
    (1..=count).map(|i| RecordId::new(format!("local-{:02}", i))).collect()
}

#[tokio::test]
async fn test_local_only_tail_page() {
    let catalog = local_catalog(0, Federation { members: Vec::new() });
    let window = PaginationWindow::new(8, 5).unwrap();
    let page = catalog
        .paginate(&window, &local_ids(10), false, &[], &FilterChain::match_all())
        .await;

    assert_eq!(page.returned(), 3);
    assert_eq!(page.total_matched, 10);
    assert_eq!(page.next_record, 0);
}

#[tokio::test]
async fn test_window_beyond_local_results_moves_to_remote() {
    let remote = Arc::new(FakeCatalog::new(10));
    let federation = Federation { members: vec![("r1".to_string(), remote.clone())] };
    let catalog = local_catalog(3, federation);

    let request = SearchRequest::new(catalog.parse("type:dataset").unwrap())
        .with_window(5, 4)
        .unwrap()
        .with_endpoints(vec![endpoint("r1")]);
    let response = catalog.search(&request).await.unwrap();

    assert_eq!(remote.calls.lock().clone(), vec![("r1".to_string(), 2, 4)]);
    assert_eq!(response.total_matched, 13);
    assert_eq!(response.returned, 4);
    assert_eq!(response.next_record, 9);
    assert_eq!(response.identifiers(), vec!["r1:2", "r1:3", "r1:4", "r1:5"]);
    assert!(response.failures.is_empty());
}

#[tokio::test]
async fn test_page_straddles_local_and_remote() {
    let remote = Arc::new(FakeCatalog::new(6));
    let federation = Federation { members: vec![("r1".to_string(), remote.clone())] };
    let catalog = local_catalog(3, federation);

    let request = SearchRequest::new(FilterChain::match_all())
        .with_window(2, 4)
        .unwrap()
        .with_endpoints(vec![endpoint("r1")]);
    let response = catalog.search(&request).await.unwrap();

    assert_eq!(remote.calls.lock().clone(), vec![("r1".to_string(), 1, 2)]);
    assert_eq!(response.identifiers(), vec!["local-02", "local-03", "r1:1", "r1:2"]);
    assert!(matches!(response.records[0], ResponseRecord::Local(_)));
    assert!(matches!(&response.records[2], ResponseRecord::Remote { endpoint, .. } if endpoint == "r1"));
    assert_eq!(response.total_matched, 9);
    assert_eq!(response.next_record, 6);
}

#[tokio::test]
async fn test_local_window_skips_remote_calls() {
    let remote = Arc::new(FakeCatalog::new(50));
    let federation = Federation { members: vec![("r1".to_string(), remote.clone())] };
    let catalog = local_catalog(10, federation);

    let request = SearchRequest::new(FilterChain::match_all())
        .with_window(1, 5)
        .unwrap()
        .with_endpoints(vec![endpoint("r1")]);
    let response = catalog.search(&request).await.unwrap();

    assert!(remote.calls.lock().is_empty());
    assert_eq!(response.total_matched, 10);
    assert_eq!(response.returned, 5);
    assert_eq!(response.next_record, 6);
}

#[tokio::test]
async fn test_failing_and_slow_endpoints_contribute_nothing() {
    let healthy = Arc::new(FakeCatalog::new(4));
    let broken = Arc::new(FakeCatalog { fail: true, ..FakeCatalog::new(100) });
    let slow = Arc::new(FakeCatalog { delay: Duration::from_secs(5), ..FakeCatalog::new(100) });
    let federation = Federation {
        members: vec![
            ("broken".to_string(), broken),
            ("slow".to_string(), slow),
            ("healthy".to_string(), healthy),
        ],
    };
    let catalog = local_catalog(2, federation);

    let request = SearchRequest::new(FilterChain::match_all())
        .with_window(1, 10)
        .unwrap()
        .with_endpoints(vec![endpoint("broken"), endpoint("slow"), endpoint("healthy"), endpoint("ghost")]);
    let response = catalog.search(&request).await.unwrap();

    assert_eq!(response.total_matched, 6);
    assert_eq!(
        response.identifiers(),
        vec!["local-01", "local-02", "healthy:1", "healthy:2", "healthy:3", "healthy:4"]
    );
    assert_eq!(response.next_record, 0);

    let failed: Vec<&str> = response.failures.iter().map(|f| f.endpoint.as_str()).collect();
    assert_eq!(failed, vec!["broken", "slow", "ghost"]);
    assert!(response.failures.iter().all(|f| f.error.kind == ErrorKind::RemoteEndpointFailure));
}

#[tokio::test]
async fn test_remote_records_follow_endpoint_order() {
    let federation = Federation {
        members: vec![
            ("second".to_string(), Arc::new(FakeCatalog::new(3))),
            ("first".to_string(), Arc::new(FakeCatalog::new(3))),
        ],
    };
    let catalog = local_catalog(0, federation);

    let request = SearchRequest::new(FilterChain::match_all())
        .with_window(1, 5)
        .unwrap()
        .with_endpoints(vec![endpoint("first"), endpoint("second")]);
    let response = catalog.search(&request).await.unwrap();

    assert_eq!(
        response.identifiers(),
        vec!["first:1", "first:2", "first:3", "second:1", "second:2"]
    );
    assert_eq!(response.total_matched, 6);
    assert_eq!(response.next_record, 6);
}

#[tokio::test]
async fn test_zero_max_records_still_counts() {
    let remote = Arc::new(FakeCatalog::new(7));
    let federation = Federation { members: vec![("r1".to_string(), remote.clone())] };
    let catalog = local_catalog(3, federation);

    let request = SearchRequest::new(FilterChain::match_all())
        .with_window(1, 0)
        .unwrap()
        .with_endpoints(vec![endpoint("r1")]);
    let response = catalog.search(&request).await.unwrap();

    // nothing left to fill, so the total stays local
    assert!(remote.calls.lock().is_empty());
    assert_eq!(response.returned, 0);
    assert_eq!(response.total_matched, 3);
    assert_eq!(response.next_record, 1);
}
