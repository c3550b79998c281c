//! Collection scheduler/executor for Cloudsweep
//!
//! Drives every classified-safe operation of the capability catalog against
//! a rate-limited, failure-prone remote API: a bounded worker pool runs one
//! unit per (service, region), paginating and retrying inside each unit and
//! persisting exactly one raw record per terminal task.
//!
//! The remote transport is the [`CloudApi`] trait; session establishment
//! and credentials stay outside this crate.

mod api;
mod config;
mod executor;
mod limiter;
mod outputs;
mod replay;
mod resolver;

pub use api::{ApiError, ApiPage, ApiRequest, CloudApi, RunContext};
pub use config::CollectorConfig;
pub use executor::Collector;
pub use limiter::RateLimiter;
pub use outputs::{write_account_metadata, write_stats};
pub use replay::ReplayApi;
pub use resolver::{extract_items, resolve_params, ListResultCache};

#[cfg(test)]
pub use api::MockCloudApi;
