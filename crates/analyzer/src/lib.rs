//! Offline analysis for Cloudsweep
//!
//! Indexes a collected run directory into a normalized inventory, evaluates
//! the declarative rule set into findings, and derives per-domain maturity
//! scores. Fully offline: nothing here touches the remote system.
//!
//! # Examples
//!
//! ```no_run
//! use cloudsweep_analyzer::Analyzer;
//! use std::path::PathBuf;
//!
//! let analyzer = Analyzer::new(PathBuf::from("./runs/2026-08-08"));
//! let report = analyzer.analyze().expect("analysis failed");
//!
//! println!("Overall score: {:.1}", report.scores.overall);
//! ```

mod extraction;
mod findings;
mod index;
mod output;
mod rules;
mod scoring;

pub use extraction::ExtractionMap;
pub use findings::{build_report, evaluate, Finding, FindingsReport};
pub use index::{build_index, Index, OperationEntry, RegionIndex, ServiceIndex};
pub use output::{build_summary, write_outputs, RankEntry, RunSummary};
pub use rules::{default_rules, Domain, Predicate, Rule, Severity};
pub use scoring::{score_all, score_domain, DomainScore, ScoreReport};

use cloudsweep_common::{RawStore, Result};
use std::path::PathBuf;
use tracing::info;

/// Complete result of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub index: Index,
    pub findings: FindingsReport,
    pub scores: ScoreReport,
    pub summary: RunSummary,
}

/// Analyzer - main entry point
pub struct Analyzer {
    run_dir: PathBuf,
    extraction: ExtractionMap,
    rules: Vec<Rule>,
}

impl Analyzer {
    /// Analyzer over a collected run directory, with the built-in
    /// extraction table and rule set
    pub fn new(run_dir: PathBuf) -> Self {
        Self {
            run_dir,
            extraction: ExtractionMap::defaults(),
            rules: default_rules(),
        }
    }

    /// Replace the resource-count extraction table
    pub fn with_extraction(mut self, extraction: ExtractionMap) -> Self {
        self.extraction = extraction;
        self
    }

    /// Replace the rule set
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Run the full pipeline: index, findings, scores, summary.
    /// Everything is recomputed from the raw store; outputs are written
    /// into the run directory and also returned.
    pub fn analyze(&self) -> Result<AnalysisReport> {
        let store = RawStore::open(&self.run_dir)?;

        info!(run_dir = %self.run_dir.display(), "indexing raw records");
        let index = build_index(&store, &self.extraction)?;
        info!(
            services = index.services.len(),
            regions = index.region_count(),
            operations = index.total_operations,
            "index built"
        );

        let findings = build_report(evaluate(&index, &self.rules));
        info!(findings = findings.total_findings, "rules evaluated");

        let scores = score_all(&findings.findings);
        let summary = build_summary(&index, &findings, &scores);
        write_outputs(&self.run_dir, &index, &findings, &scores, &summary)?;

        Ok(AnalysisReport {
            index,
            findings,
            scores,
            summary,
        })
    }
}
