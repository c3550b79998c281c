//! Integration tests for the collection executor
//!
//! A scripted CloudApi double stands in for the remote system so retry,
//! pagination, fan-out, and concurrency behavior can be asserted exactly.

use async_trait::async_trait;
use cloudsweep_catalog::{CatalogParser, Catalog, SafetyClassifier};
use cloudsweep_collector::{
    ApiError, ApiPage, ApiRequest, CloudApi, Collector, CollectorConfig, RunContext,
};
use cloudsweep_common::records::ErrorKind;
use cloudsweep_common::RawStore;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

type Handler =
    Box<dyn Fn(&ApiRequest, u32) -> Result<ApiPage, ApiError> + Send + Sync + 'static>;

/// Scripted remote API: a handler decides each response, call counts and
/// peak concurrency are tracked.
struct ScriptedApi {
    handler: Handler,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedApi {
    fn new(handler: Handler) -> Self {
        Self {
            handler,
            delay: None,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn call_count(&self, operation: &str) -> u32 {
        *self.calls.lock().unwrap().get(operation).unwrap_or(&0)
    }

    fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloudApi for ScriptedApi {
    async fn invoke(&self, request: &ApiRequest) -> Result<ApiPage, ApiError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(request.operation.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(request, call_number);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn single_op_catalog() -> Catalog {
    CatalogParser::from_json(
        r#"{
            "version": 1,
            "services": {
                "cloudtrail": {
                    "operations": {
                        "ListTrails": {
                            "output": {"pagination_token": "NextToken", "list_member": "Trails"}
                        }
                    }
                }
            }
        }"#,
    )
    .unwrap()
    .parse()
    .unwrap()
}

fn followup_catalog() -> Catalog {
    CatalogParser::from_json(
        r#"{
            "version": 1,
            "services": {
                "route53": {
                    "operations": {
                        "ListHostedZones": {"output": {"list_member": "HostedZones"}},
                        "GetHostedZone": {
                            "input": {
                                "members": {"HostedZoneId": {"type": "string"}},
                                "required": ["HostedZoneId"]
                            }
                        },
                        "GetChange": {
                            "input": {
                                "members": {"ChangeId": {"type": "string"}},
                                "required": ["ChangeId"]
                            }
                        },
                        "CreateHostedZone": {
                            "input": {
                                "members": {"Name": {"type": "string"}},
                                "required": ["Name"]
                            }
                        }
                    }
                }
            }
        }"#,
    )
    .unwrap()
    .parse()
    .unwrap()
}

fn context(regions: &[&str]) -> RunContext {
    RunContext::new(regions.iter().map(|r| r.to_string()).collect())
}

fn no_shutdown() -> watch::Receiver<bool> {
    // The receiver keeps the last value after the sender drops
    watch::channel(false).1
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_retries_exactly_max_attempts() {
    let api = Arc::new(ScriptedApi::new(Box::new(|_, _| {
        Err(ApiError::Throttled("slow down".into()))
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();
    let config = CollectorConfig::default()
        .with_max_attempts(3)
        .with_base_backoff(Duration::from_millis(10));

    let collector = Collector::new(api.clone(), store, config);
    let catalog = single_op_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            no_shutdown(),
        )
        .await
        .unwrap();

    assert_eq!(api.call_count("ListTrails"), 3);
    assert_eq!(stats.operations_executed, 1);
    assert_eq!(stats.operations_failed, 1);
    assert_eq!(stats.operations_successful, 0);

    let record = RawStore::open(dir.path())
        .unwrap()
        .get("cloudtrail", "us-east-1", "ListTrails")
        .unwrap()
        .unwrap();
    assert!(!record.metadata.success);
    assert_eq!(record.error.unwrap().kind, ErrorKind::Throttled);
}

#[tokio::test]
async fn test_access_denied_is_skipped_without_retry() {
    let api = Arc::new(ScriptedApi::new(Box::new(|_, _| {
        Err(ApiError::AccessDenied("not authorized".into()))
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();

    let collector = Collector::new(api.clone(), store, CollectorConfig::default());
    let catalog = single_op_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            no_shutdown(),
        )
        .await
        .unwrap();

    assert_eq!(api.call_count("ListTrails"), 1);
    assert_eq!(stats.operations_skipped, 1);
    assert_eq!(stats.operations_failed, 0);

    let record = RawStore::open(dir.path())
        .unwrap()
        .get("cloudtrail", "us-east-1", "ListTrails")
        .unwrap()
        .unwrap();
    assert_eq!(record.error.unwrap().kind, ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_pagination_cap_truncates_successfully() {
    // Every page points at another page; only the cap stops the loop
    let api = Arc::new(ScriptedApi::new(Box::new(|_, call| {
        Ok(ApiPage {
            body: json!({"Trails": [{"Name": format!("t-{call}")}]}),
            next_token: Some(format!("token-{call}")),
        })
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();
    let config = CollectorConfig::default().with_max_pages(3);

    let collector = Collector::new(api.clone(), store, config);
    let catalog = single_op_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            no_shutdown(),
        )
        .await
        .unwrap();

    assert_eq!(api.call_count("ListTrails"), 3);
    assert_eq!(stats.operations_successful, 1);

    let record = RawStore::open(dir.path())
        .unwrap()
        .get("cloudtrail", "us-east-1", "ListTrails")
        .unwrap()
        .unwrap();
    assert!(record.metadata.success);
    assert!(record.metadata.truncated);
    let data = record.data.unwrap();
    assert_eq!(data["pages"], 3);
    assert_eq!(data["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_zero_item_producer_generates_no_followup_tasks() {
    let api = Arc::new(ScriptedApi::new(Box::new(|request, _| {
        match request.operation.as_str() {
            "ListHostedZones" => Ok(ApiPage {
                body: json!({"HostedZones": []}),
                next_token: None,
            }),
            other => panic!("unexpected call to {other}"),
        }
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();

    let collector = Collector::new(api.clone(), store, CollectorConfig::default());
    let catalog = followup_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            no_shutdown(),
        )
        .await
        .unwrap();

    // The follow-up appears nowhere: not executed, not failed, not skipped
    assert_eq!(api.call_count("GetHostedZone"), 0);
    // Unresolvable and mutating operations are never scheduled at all
    assert_eq!(api.call_count("GetChange"), 0);
    assert_eq!(api.call_count("CreateHostedZone"), 0);
    assert_eq!(stats.operations_executed, 1);
    assert_eq!(stats.operations_successful, 1);
    assert_eq!(stats.operations_skipped, 0);
    assert!(RawStore::open(dir.path())
        .unwrap()
        .get("route53", "us-east-1", "GetHostedZone")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_followup_fanout_is_capped_and_aggregated() {
    let api = Arc::new(ScriptedApi::new(Box::new(|request, _| {
        match request.operation.as_str() {
            "ListHostedZones" => Ok(ApiPage {
                body: json!({"HostedZones": [
                    {"Id": "Z1"}, {"Id": "Z2"}, {"Id": "Z3"}, {"Id": "Z4"}
                ]}),
                next_token: None,
            }),
            "GetHostedZone" => {
                let id = request.params["HostedZoneId"].as_str().unwrap().to_string();
                Ok(ApiPage {
                    body: json!({"HostedZone": {"Id": id}}),
                    next_token: None,
                })
            }
            other => panic!("unexpected call to {other}"),
        }
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();
    let config = CollectorConfig::default().with_max_followups(2);

    let collector = Collector::new(api.clone(), store, config);
    let catalog = followup_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            no_shutdown(),
        )
        .await
        .unwrap();

    assert_eq!(api.call_count("GetHostedZone"), 2);
    assert_eq!(stats.operations_executed, 2);
    assert_eq!(stats.operations_successful, 2);

    let record = RawStore::open(dir.path())
        .unwrap()
        .get("route53", "us-east-1", "GetHostedZone")
        .unwrap()
        .unwrap();
    let results = record.data.unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["params"]["HostedZoneId"], "Z1");
    assert_eq!(results[1]["params"]["HostedZoneId"], "Z2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_worker_count() {
    let api = Arc::new(
        ScriptedApi::new(Box::new(|_, _| {
            Ok(ApiPage {
                body: json!({"Trails": []}),
                next_token: None,
            })
        }))
        .with_delay(Duration::from_millis(20)),
    );
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();
    let config = CollectorConfig::default().with_max_workers(2);

    // Eight (service, region) units compete for two workers
    let catalog = single_op_catalog();
    let regions = [
        "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8",
    ];
    let collector = Collector::new(api.clone(), store, config);
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&regions),
            no_shutdown(),
        )
        .await
        .unwrap();

    assert_eq!(stats.operations_executed, 8);
    assert!(
        api.peak() <= 2,
        "peak concurrency {} exceeded worker bound",
        api.peak()
    );
}

#[tokio::test]
async fn test_shutdown_before_start_executes_nothing() {
    let api = Arc::new(ScriptedApi::new(Box::new(|_, _| {
        panic!("no call should be made after shutdown")
    })));
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();

    let (tx, rx) = watch::channel(true);
    let collector = Collector::new(api.clone(), store, CollectorConfig::default());
    let catalog = single_op_catalog();
    let stats = collector
        .run(
            &catalog,
            &SafetyClassifier::new(),
            &context(&["us-east-1"]),
            rx,
        )
        .await
        .unwrap();
    drop(tx);

    assert_eq!(stats.operations_executed, 0);
    assert_eq!(api.call_count("ListTrails"), 0);
}

#[tokio::test]
async fn test_recollection_overwrites_records_idempotently() {
    let api = Arc::new(ScriptedApi::new(Box::new(|_, _| {
        Ok(ApiPage {
            body: json!({"Trails": [{"Name": "main"}]}),
            next_token: None,
        })
    })));
    let dir = tempfile::tempdir().unwrap();
    let catalog = single_op_catalog();

    for _ in 0..2 {
        let store = RawStore::create(dir.path()).unwrap();
        let collector = Collector::new(api.clone(), store, CollectorConfig::default());
        collector
            .run(
                &catalog,
                &SafetyClassifier::new(),
                &context(&["us-east-1"]),
                no_shutdown(),
            )
            .await
            .unwrap();
    }

    // Still exactly one record for the key, with the same content
    let store = RawStore::open(dir.path()).unwrap();
    let records: Vec<_> = store
        .iter(None)
        .collect::<cloudsweep_common::Result<_>>()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].data.as_ref().unwrap()["data"][0]["Trails"][0]["Name"],
        "main"
    );
}
