use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use crate::core::error::{Error, Result};
use crate::core::types::RecordId;
use crate::distributed::harvester::{Harvester, RemoteBatch, RemoteEndpoint};
use crate::distributed::pagination::{
    DistributedPlan, DistributedResult, EndpointFailure, Page, PageEntry, PaginationWindow,
};
use crate::query::ast::FilterChain;

/// Merges the local result list with federated catalogs into one window.
///
/// Local results always come first, then remote records in endpoint order.
/// Every endpoint is asked for the same slice; one that errors, panics or
/// exceeds the timeout contributes zero matches and is reported in
/// [`Page::failures`].
pub struct DistributedOrchestrator {
    harvester: Option<Arc<dyn Harvester>>,
    timeout: Duration,
}

impl DistributedOrchestrator {
    pub fn new(harvester: Option<Arc<dyn Harvester>>, timeout: Duration) -> Self {
        DistributedOrchestrator { harvester, timeout }
    }

    pub async fn paginate(
        &self,
        window: &PaginationWindow,
        local: &[RecordId],
        distributed: bool,
        endpoints: &[RemoteEndpoint],
        chain: &FilterChain,
    ) -> Page {
        let mut page = Page::local(window, local);
        if !distributed || endpoints.is_empty() {
            return page;
        }

        let plan = window.remote_plan(local.len());
        page.plan = Some(plan);
        if plan.max == 0 {
            debug!(local = local.len(), "window filled locally, remote endpoints skipped");
            return page;
        }

        let (results, failures) = self.fan_out(endpoints, chain, plan).await;

        let mut budget = plan.max;
        let mut total = local.len();
        for result in &results {
            total += result.matched_count;
            for record in result.records.iter().take(budget) {
                page.entries.push(PageEntry::Remote {
                    endpoint: result.endpoint.clone(),
                    record: record.clone(),
                });
            }
            budget = budget.saturating_sub(result.records.len());
        }

        page.total_matched = total;
        page.next_record = window.next_record(total);
        page.remote = results;
        page.failures = failures;

        info!(
            local = local.len(),
            total = page.total_matched,
            returned = page.returned(),
            failed = page.failures.len(),
            "distributed page assembled"
        );
        page
    }

    /// Query every endpoint concurrently; results and failures both come back
    /// in endpoint order, whatever order the calls finish in
    async fn fan_out(
        &self,
        endpoints: &[RemoteEndpoint],
        chain: &FilterChain,
        plan: DistributedPlan,
    ) -> (Vec<DistributedResult>, Vec<EndpointFailure>) {
        let harvester = match &self.harvester {
            Some(harvester) => harvester.clone(),
            None => {
                let mut failures = Vec::new();
                for endpoint in endpoints {
                    warn!(endpoint = %endpoint.id, "no harvester configured");
                    failures.push(EndpointFailure {
                        endpoint: endpoint.id.clone(),
                        error: Error::remote_endpoint(&endpoint.id, "no harvester configured"),
                    });
                }
                return (Vec::new(), failures);
            }
        };

        let chain = Arc::new(chain.clone());
        let mut tasks = JoinSet::new();
        for (position, endpoint) in endpoints.iter().cloned().enumerate() {
            let harvester = harvester.clone();
            let chain = chain.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let outcome = fetch_one(harvester, &endpoint, chain, plan, timeout).await;
                (position, endpoint, outcome)
            });
        }

        let mut slots: Vec<Option<DistributedResult>> = vec![None; endpoints.len()];
        let mut failed: Vec<Option<EndpointFailure>> = endpoints.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, endpoint, Ok(batch))) => {
                    debug!(
                        endpoint = %endpoint.id,
                        matched = batch.matched_count,
                        fetched = batch.records.len(),
                        "remote endpoint answered"
                    );
                    slots[position] = Some(DistributedResult {
                        endpoint: endpoint.id,
                        matched_count: batch.matched_count,
                        records: batch.records,
                    });
                }
                Ok((position, endpoint, Err(error))) => {
                    warn!(endpoint = %endpoint.id, error = %error, "remote endpoint failed");
                    failed[position] = Some(EndpointFailure { endpoint: endpoint.id, error });
                }
                Err(join_error) => {
                    warn!(error = %join_error, "remote fan-out task aborted");
                }
            }
        }

        (
            slots.into_iter().flatten().collect(),
            failed.into_iter().flatten().collect(),
        )
    }
}

/// One endpoint call, isolated in its own task so a panic stays attributable
async fn fetch_one(
    harvester: Arc<dyn Harvester>,
    endpoint: &RemoteEndpoint,
    chain: Arc<FilterChain>,
    plan: DistributedPlan,
    timeout: Duration,
) -> Result<RemoteBatch> {
    let target = endpoint.clone();
    let mut call = tokio::spawn(async move {
        harvester.fetch_remote(&target, &chain, plan.start, plan.max).await
    });

    match tokio::time::timeout(timeout, &mut call).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(Error::remote_endpoint(
            &endpoint.id,
            format!("harvester task failed: {}", join_error),
        )),
        Err(_) => {
            call.abort();
            Err(Error::remote_endpoint(
                &endpoint.id,
                format!("timed out after {} ms", timeout.as_millis()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use crate::core::error::ErrorKind;
    use crate::core::types::MaterializedRecord;

    enum Behaviour {
        Answer(usize),
        Fail,
        Hang,
        Panic,
    }

    struct ScriptedHarvester {
        behaviours: HashMap<String, Behaviour>,
    }

    #[async_trait]
    impl Harvester for ScriptedHarvester {
        async fn fetch_remote(
            &self,
            endpoint: &RemoteEndpoint,
            _chain: &FilterChain,
            start: usize,
            max: usize,
        ) -> Result<RemoteBatch> {
            match self.behaviours.get(&endpoint.id) {
                Some(Behaviour::Answer(total)) => {
                    let records = (start..=*total)
                        .take(max)
                        .map(|i| MaterializedRecord::new(format!("{}-{}", endpoint.id, i), "<remote/>"))
                        .collect();
                    Ok(RemoteBatch { matched_count: *total, records })
                }
                Some(Behaviour::Fail) | None => Err(Error::remote_endpoint(&endpoint.id, "503")),
                Some(Behaviour::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(RemoteBatch::default())
                }
                Some(Behaviour::Panic) => panic!("harvester bug"),
            }
        }
    }

    fn orchestrator(behaviours: Vec<(&str, Behaviour)>) -> DistributedOrchestrator {
        let behaviours = behaviours.into_iter().map(|(id, b)| (id.to_string(), b)).collect();
        DistributedOrchestrator::new(
            Some(Arc::new(ScriptedHarvester { behaviours })),
            Duration::from_millis(100),
        )
    }

    fn endpoints(ids: &[&str]) -> Vec<RemoteEndpoint> {
        ids.iter().map(|id| RemoteEndpoint::new(*id, format!("http://{}/csw", id))).collect()
    }

    fn local(n: usize) -> Vec<RecordId> {
        (1..=n).map(|i| RecordId::new(format!("l{}", i))).collect()
    }

    fn remote_ids(page: &Page) -> Vec<String> {
        page.entries
            .iter()
            .filter_map(|entry| match entry {
                PageEntry::Remote { record, .. } => Some(record.identifier.clone()),
                PageEntry::Local(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_local_page_then_remote_fill() {
        let orchestrator = orchestrator(vec![("east", Behaviour::Answer(10))]);
        let window = PaginationWindow::new(2, 5).unwrap();
        let page = orchestrator
            .paginate(&window, &local(3), true, &endpoints(&["east"]), &FilterChain::match_all())
            .await;

        assert_eq!(page.plan, Some(DistributedPlan { start: 1, max: 3 }));
        assert_eq!(page.local_ids().len(), 2);
        assert_eq!(remote_ids(&page), vec!["east-1", "east-2", "east-3"]);
        assert_eq!(page.total_matched, 13);
        assert_eq!(page.next_record, 7);
    }

    #[tokio::test]
    async fn test_remote_records_keep_endpoint_order_and_budget() {
        let orchestrator = orchestrator(vec![
            ("a", Behaviour::Answer(2)),
            ("b", Behaviour::Answer(5)),
        ]);
        let window = PaginationWindow::new(1, 4).unwrap();
        let page = orchestrator
            .paginate(&window, &[], true, &endpoints(&["a", "b"]), &FilterChain::match_all())
            .await;

        assert_eq!(remote_ids(&page), vec!["a-1", "a-2", "b-1", "b-2"]);
        assert_eq!(page.total_matched, 7);
        assert_eq!(page.remote.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_count_as_zero() {
        let orchestrator = orchestrator(vec![
            ("ok", Behaviour::Answer(4)),
            ("down", Behaviour::Fail),
            ("slow", Behaviour::Hang),
            ("buggy", Behaviour::Panic),
        ]);
        let window = PaginationWindow::new(1, 10).unwrap();
        let page = orchestrator
            .paginate(
                &window,
                &local(2),
                true,
                &endpoints(&["down", "slow", "ok", "buggy"]),
                &FilterChain::match_all(),
            )
            .await;

        assert_eq!(page.total_matched, 6);
        assert_eq!(page.returned(), 6);
        let failed: Vec<&str> = page.failures.iter().map(|f| f.endpoint.as_str()).collect();
        assert_eq!(failed, vec!["down", "slow", "buggy"]);
        assert!(page.failures.iter().all(|f| f.error.kind == ErrorKind::RemoteEndpointFailure));
        let slow = page.failures.iter().find(|f| f.endpoint == "slow").unwrap();
        assert!(slow.error.context.contains("timed out"));
    }

    #[tokio::test]
    async fn test_short_circuit_when_local_fills_window() {
        let orchestrator = orchestrator(vec![("east", Behaviour::Fail)]);
        let window = PaginationWindow::new(1, 5).unwrap();
        let page = orchestrator
            .paginate(&window, &local(10), true, &endpoints(&["east"]), &FilterChain::match_all())
            .await;

        assert_eq!(page.total_matched, 10);
        assert_eq!(page.next_record, 6);
        assert!(page.failures.is_empty());
    }

    #[tokio::test]
    async fn test_missing_harvester_reports_every_endpoint() {
        let orchestrator = DistributedOrchestrator::new(None, Duration::from_millis(50));
        let window = PaginationWindow::new(1, 5).unwrap();
        let page = orchestrator
            .paginate(&window, &local(1), true, &endpoints(&["a", "b"]), &FilterChain::match_all())
            .await;

        assert_eq!(page.total_matched, 1);
        assert_eq!(page.failures.len(), 2);
    }
}
