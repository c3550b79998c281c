//! Collection scheduler and executor
//!
//! Schedules one unit of work per (service, region) pair, runs units on a
//! bounded worker pool, and drives each classified-safe operation through
//! pagination, retry, and exactly one raw-store write per terminal task.
//!
//! Task lifecycle: PENDING -> RUNNING -> {SUCCESS, RETRY -> RUNNING,
//! SKIPPED, FAILED}. Within a unit operations run sequentially (follow-ups
//! need the list results collected earlier in the same unit); across units
//! there is no ordering guarantee.

use crate::api::{ApiError, ApiPage, ApiRequest, CloudApi, RunContext};
use crate::config::CollectorConfig;
use crate::limiter::RateLimiter;
use crate::resolver::{extract_items, resolve_params, ListResultCache};
use chrono::Utc;
use cloudsweep_catalog::{Catalog, OperationDescriptor, SafetyClassification, SafetyClassifier};
use cloudsweep_common::records::{
    CollectionStats, ErrorKind, RawRecord, RecordError, RecordMetadata,
};
use cloudsweep_common::{RawStore, Result};
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Terminal state of one collection task
#[derive(Debug)]
enum TaskOutcome {
    Success { data: Value, truncated: bool },
    Failed { kind: ErrorKind, message: String },
    Skipped { kind: ErrorKind, message: String },
}

impl From<ApiError> for TaskOutcome {
    fn from(err: ApiError) -> Self {
        if err.is_skip() {
            TaskOutcome::Skipped {
                kind: err.kind(),
                message: err.to_string(),
            }
        } else {
            TaskOutcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    }
}

/// Classified work for one service, shared across its region units
#[derive(Debug)]
struct ServicePlan {
    service: String,
    /// SafeNoParams operations, executed first to seed the list cache
    safe_ops: Vec<OperationDescriptor>,
    /// SafeWithInferredParams operations with their producer and identifier
    followup_ops: Vec<(OperationDescriptor, String, String)>,
}

fn build_plan(
    catalog: &Catalog,
    classifier: &SafetyClassifier,
    service: &str,
) -> ServicePlan {
    let mut safe_ops = Vec::new();
    let mut followup_ops = Vec::new();
    for op in catalog.service_operations(service) {
        match classifier.classify(op, catalog) {
            SafetyClassification::SafeNoParams => safe_ops.push(op.clone()),
            SafetyClassification::SafeWithInferredParams {
                producer,
                identifier,
            } => followup_ops.push((op.clone(), producer, identifier)),
            SafetyClassification::UnsafeRequiresUnknownParams
            | SafetyClassification::Excluded => {}
        }
    }
    ServicePlan {
        service: service.to_string(),
        safe_ops,
        followup_ops,
    }
}

/// The collection executor
pub struct Collector {
    api: Arc<dyn CloudApi>,
    store: Arc<RawStore>,
    config: Arc<CollectorConfig>,
    limiter: Option<Arc<RateLimiter>>,
}

impl Collector {
    pub fn new(api: Arc<dyn CloudApi>, store: RawStore, config: CollectorConfig) -> Self {
        let limiter = config.rate_limit.map(|rate| Arc::new(RateLimiter::new(rate)));
        Self {
            api,
            store: Arc::new(store),
            config: Arc::new(config),
            limiter,
        }
    }

    /// Run a full collection pass over every in-scope (service, region)
    /// pair. Individual task failures are recorded, never propagated; only
    /// an unwritable store is fatal.
    pub async fn run(
        &self,
        catalog: &Catalog,
        classifier: &SafetyClassifier,
        ctx: &RunContext,
        shutdown: watch::Receiver<bool>,
    ) -> Result<CollectionStats> {
        let started = Instant::now();

        let plans: Vec<Arc<ServicePlan>> = catalog
            .services()
            .filter(|service| self.config.should_collect(service))
            .map(|service| Arc::new(build_plan(catalog, classifier, service)))
            .filter(|plan| !plan.safe_ops.is_empty() || !plan.followup_ops.is_empty())
            .collect();

        info!(
            services = plans.len(),
            regions = ctx.regions.len(),
            workers = self.config.max_workers,
            "starting collection"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut join_set: JoinSet<Result<CollectionStats>> = JoinSet::new();

        'submit: for plan in &plans {
            for region in &ctx.regions {
                if *shutdown.borrow() {
                    info!("shutdown signalled, stopping task submission");
                    break 'submit;
                }
                let worker = UnitWorker {
                    api: Arc::clone(&self.api),
                    store: Arc::clone(&self.store),
                    config: Arc::clone(&self.config),
                    limiter: self.limiter.clone(),
                    plan: Arc::clone(plan),
                    region: region.clone(),
                    account: ctx.account_id.clone(),
                    shutdown: shutdown.clone(),
                };
                let semaphore = Arc::clone(&semaphore);
                join_set.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| cloudsweep_common::SweepError::Store(e.to_string()))?;
                    if *worker.shutdown.borrow() {
                        // Submitted but never started; terminal without work
                        return Ok(CollectionStats::default());
                    }
                    worker.run().await
                });
            }
        }

        let mut stats = CollectionStats {
            services_discovered: plans.len(),
            ..Default::default()
        };
        let mut fatal: Option<cloudsweep_common::SweepError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(unit_stats)) => stats.absorb(&unit_stats),
                Ok(Err(e)) => {
                    warn!(error = %e, "collection unit failed");
                    fatal.get_or_insert(e);
                }
                Err(e) => warn!(error = %e, "collection unit panicked"),
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        stats.elapsed_seconds = started.elapsed().as_secs_f64();
        stats.timestamp = Some(Utc::now());
        info!(
            executed = stats.operations_executed,
            successful = stats.operations_successful,
            failed = stats.operations_failed,
            skipped = stats.operations_skipped,
            "collection finished"
        );
        Ok(stats)
    }
}

/// Sequential worker for one (service, region) pair
struct UnitWorker {
    api: Arc<dyn CloudApi>,
    store: Arc<RawStore>,
    config: Arc<CollectorConfig>,
    limiter: Option<Arc<RateLimiter>>,
    plan: Arc<ServicePlan>,
    region: String,
    account: Option<String>,
    shutdown: watch::Receiver<bool>,
}

impl UnitWorker {
    async fn run(&self) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut cache = ListResultCache::default();

        for op in &self.plan.safe_ops {
            if *self.shutdown.borrow() {
                break;
            }
            let outcome = self.fetch_operation(op, serde_json::Map::new()).await;
            self.finish_task(op, outcome, &mut cache, &mut stats)?;
        }

        for (op, producer, identifier) in &self.plan.followup_ops {
            if *self.shutdown.borrow() {
                break;
            }
            let Some(items) = cache.items(producer) else {
                // Producer never ran or failed; a no-op, not an error
                debug!(
                    service = %self.plan.service,
                    region = %self.region,
                    operation = %op.name,
                    producer = %producer,
                    "no producer results, skipping follow-up"
                );
                continue;
            };
            let param_sets = resolve_params(items, identifier, self.config.max_followups);
            if param_sets.is_empty() {
                // Zero items discovered: zero tasks, zero statistics impact
                continue;
            }
            let outcome = self.fetch_followups(op, param_sets).await;
            self.finish_task(op, outcome, &mut cache, &mut stats)?;
        }

        Ok(stats)
    }

    /// Execute one operation through its pages
    async fn fetch_operation(
        &self,
        op: &OperationDescriptor,
        params: serde_json::Map<String, Value>,
    ) -> TaskOutcome {
        let mut pages: Vec<Value> = Vec::new();
        let mut token: Option<String> = None;
        let mut truncated = false;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }
            let page = match self.call_with_retry(op, &params, token.as_deref()).await {
                Ok(page) => page,
                Err(err) => {
                    debug!(
                        service = %self.plan.service,
                        region = %self.region,
                        operation = %op.name,
                        error = %err,
                        "operation terminal error"
                    );
                    return TaskOutcome::from(err);
                }
            };
            pages.push(page.body);
            token = page.next_token;
            if token.is_none() {
                break;
            }
            if pages.len() >= self.config.max_pages {
                // Cap reached: successful result, flagged as truncated
                warn!(
                    service = %self.plan.service,
                    region = %self.region,
                    operation = %op.name,
                    pages = pages.len(),
                    "pagination cap reached"
                );
                truncated = true;
                break;
            }
        }

        let data = if op.paginated {
            serde_json::json!({"pages": pages.len(), "data": pages})
        } else {
            pages.into_iter().next().unwrap_or(Value::Null)
        };
        TaskOutcome::Success { data, truncated }
    }

    /// Execute a follow-up operation once per inferred parameter set,
    /// aggregating the results into a single record.
    async fn fetch_followups(
        &self,
        op: &OperationDescriptor,
        param_sets: Vec<serde_json::Map<String, Value>>,
    ) -> TaskOutcome {
        let mut results = Vec::new();
        let mut truncated = false;
        let mut first_failure: Option<TaskOutcome> = None;

        for params in param_sets {
            match self.fetch_operation(op, params.clone()).await {
                TaskOutcome::Success {
                    data,
                    truncated: page_truncated,
                } => {
                    truncated |= page_truncated;
                    results.push(serde_json::json!({
                        "params": Value::Object(params),
                        "result": data,
                    }));
                }
                failure => {
                    debug!(
                        operation = %op.name,
                        "follow-up call failed for one parameter set"
                    );
                    first_failure.get_or_insert(failure);
                }
            }
        }

        if !results.is_empty() {
            TaskOutcome::Success {
                data: Value::Array(results),
                truncated,
            }
        } else if let Some(failure) = first_failure {
            failure
        } else {
            TaskOutcome::Skipped {
                kind: ErrorKind::Other,
                message: "no follow-up calls produced a result".to_string(),
            }
        }
    }

    /// One page fetch with bounded retries. Transient failures back off
    /// exponentially with full jitter; anything else is terminal at once.
    async fn call_with_retry(
        &self,
        op: &OperationDescriptor,
        params: &serde_json::Map<String, Value>,
        page_token: Option<&str>,
    ) -> std::result::Result<ApiPage, ApiError> {
        let request = ApiRequest {
            service: self.plan.service.clone(),
            region: self.region.clone(),
            operation: op.name.clone(),
            params: params.clone(),
            page_token: page_token.map(str::to_string),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result =
                match tokio::time::timeout(self.config.call_timeout, self.api.invoke(&request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::Timeout(format!(
                        "no response within {:?}",
                        self.config.call_timeout
                    ))),
                };
            let err = match result {
                Ok(page) => return Ok(page),
                Err(err) => err,
            };
            if !err.is_transient() || attempt >= self.config.max_attempts {
                return Err(err);
            }
            let delay = backoff_delay(self.config.base_backoff, attempt);
            debug!(
                operation = %op.name,
                attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Persist the terminal record for a task and fold it into statistics.
    /// Exactly one write per terminal task; a write failure is fatal.
    fn finish_task(
        &self,
        op: &OperationDescriptor,
        outcome: TaskOutcome,
        cache: &mut ListResultCache,
        stats: &mut CollectionStats,
    ) -> Result<()> {
        stats.operations_executed += 1;
        let metadata = RecordMetadata {
            service: self.plan.service.clone(),
            region: self.region.clone(),
            operation: op.name.clone(),
            timestamp: Utc::now(),
            account: self.account.clone(),
            paginated: op.paginated,
            truncated: false,
            success: true,
        };
        let record = match outcome {
            TaskOutcome::Success { data, truncated } => {
                stats.operations_successful += 1;
                if op.is_list_like() {
                    cache.record(&op.name, extract_items(&data, op.list_member.as_deref()));
                }
                let mut metadata = metadata;
                metadata.truncated = truncated;
                RawRecord::success(metadata, data)
            }
            TaskOutcome::Failed { kind, message } => {
                stats.operations_failed += 1;
                RawRecord::failure(metadata, RecordError { kind, message })
            }
            TaskOutcome::Skipped { kind, message } => {
                stats.operations_skipped += 1;
                RawRecord::failure(metadata, RecordError { kind, message })
            }
        };
        self.store.put(&record)?;
        Ok(())
    }
}

/// Full-jitter exponential backoff: uniform between the base delay and
/// `base * 2^(attempt-1) * 4`, so concurrent retries spread out instead of
/// stampeding together.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let floor = base.as_secs_f64();
    let cap = floor * 2f64.powi(attempt.saturating_sub(1) as i32) * 4.0;
    let secs = rand::rng().random_range(floor..=cap.max(floor));
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_with_attempt_and_jitters() {
        let base = Duration::from_millis(100);
        for attempt in 1..=4 {
            let cap = Duration::from_secs_f64(
                base.as_secs_f64() * 2f64.powi(attempt as i32 - 1) * 4.0,
            );
            for _ in 0..50 {
                let delay = backoff_delay(base, attempt);
                assert!(delay >= base, "delay below base at attempt {attempt}");
                assert!(delay <= cap, "delay above cap at attempt {attempt}");
            }
        }
    }

    #[tokio::test]
    async fn test_single_success_writes_exactly_one_record() {
        let mut mock = crate::api::MockCloudApi::new();
        mock.expect_invoke().times(1).returning(|_| {
            Ok(ApiPage {
                body: serde_json::json!({"Vpcs": [{"VpcId": "vpc-1"}]}),
                next_token: None,
            })
        });

        let catalog = cloudsweep_catalog::CatalogParser::from_json(
            r#"{
                "version": 1,
                "services": {
                    "ec2": {
                        "operations": {
                            "DescribeVpcs": {"output": {"list_member": "Vpcs"}}
                        }
                    }
                }
            }"#,
        )
        .unwrap()
        .parse()
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = cloudsweep_common::RawStore::create(dir.path()).unwrap();
        let collector = Collector::new(Arc::new(mock), store, CollectorConfig::default());
        let (_tx, rx) = watch::channel(false);

        let stats = collector
            .run(
                &catalog,
                &SafetyClassifier::new(),
                &RunContext::new(vec!["us-east-1".to_string()]),
                rx,
            )
            .await
            .unwrap();

        assert_eq!(stats.operations_executed, 1);
        assert_eq!(stats.operations_successful, 1);

        let store = cloudsweep_common::RawStore::open(dir.path()).unwrap();
        let records: Vec<_> = store.iter(None).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].metadata.success);
    }

    #[test]
    fn test_outcome_from_api_error() {
        let skipped = TaskOutcome::from(ApiError::AccessDenied("denied".into()));
        assert!(matches!(
            skipped,
            TaskOutcome::Skipped {
                kind: ErrorKind::AccessDenied,
                ..
            }
        ));

        let failed = TaskOutcome::from(ApiError::Throttled("slow down".into()));
        assert!(matches!(
            failed,
            TaskOutcome::Failed {
                kind: ErrorKind::Throttled,
                ..
            }
        ));
    }
}
