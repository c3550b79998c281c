//! Analysis output documents
//!
//! The analyzer leaves its results as JSON files in the run directory:
//! `index/index.json`, `outputs/findings.json`, `outputs/scores.json`, and
//! `outputs/summary.json`. These schemas are the stable interface the
//! report-rendering layer consumes.

use crate::findings::FindingsReport;
use crate::index::Index;
use crate::scoring::ScoreReport;
use cloudsweep_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Executive summary of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub services_count: usize,
    pub regions_count: usize,
    pub total_resources: u64,
    pub total_findings: usize,
    pub findings_by_severity: BTreeMap<String, usize>,
    pub top_services: Vec<RankEntry>,
    pub top_regions: Vec<RankEntry>,
    pub overall_score: f64,
}

/// One row of a ranking table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub name: String,
    pub resource_count: u64,
}

/// Derive the summary from the other outputs
pub fn build_summary(
    index: &Index,
    findings: &FindingsReport,
    scores: &ScoreReport,
) -> RunSummary {
    let rank = |entries: Vec<(String, u64)>| {
        entries
            .into_iter()
            .map(|(name, resource_count)| RankEntry {
                name,
                resource_count,
            })
            .collect()
    };
    RunSummary {
        services_count: index.services.len(),
        regions_count: index.region_count(),
        total_resources: index.total_resources,
        total_findings: findings.total_findings,
        findings_by_severity: findings.findings_by_severity.clone(),
        top_services: rank(index.top_services(10)),
        top_regions: rank(index.top_regions(10)),
        overall_score: scores.overall,
    }
}

/// Write all analysis documents into the run directory
pub fn write_outputs(
    run_dir: &Path,
    index: &Index,
    findings: &FindingsReport,
    scores: &ScoreReport,
    summary: &RunSummary,
) -> Result<()> {
    let index_dir = run_dir.join("index");
    let outputs_dir = run_dir.join("outputs");
    fs::create_dir_all(&index_dir)?;
    fs::create_dir_all(&outputs_dir)?;

    fs::write(
        index_dir.join("index.json"),
        serde_json::to_string_pretty(index)?,
    )?;
    fs::write(
        outputs_dir.join("findings.json"),
        serde_json::to_string_pretty(findings)?,
    )?;
    fs::write(
        outputs_dir.join("scores.json"),
        serde_json::to_string_pretty(scores)?,
    )?;
    fs::write(
        outputs_dir.join("summary.json"),
        serde_json::to_string_pretty(summary)?,
    )?;
    Ok(())
}
