//! Rule evaluation into ordered findings

use crate::index::Index;
use crate::rules::{Domain, Rule, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One detected condition with evidence and remediation guidance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub domain: Domain,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub effort: String,
    pub recommendation: String,
    /// Index entry references or explicit absence conditions
    pub evidence: Vec<String>,
}

/// Findings plus the domain -> severity count summary table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsReport {
    pub findings: Vec<Finding>,
    pub findings_by_severity: BTreeMap<String, usize>,
    pub summary_by_domain: BTreeMap<String, BTreeMap<String, usize>>,
    pub total_findings: usize,
}

/// Evaluate every rule against the index.
///
/// Total and side-effect-free: a rule either fires or it does not, and the
/// same index always yields the same ordered finding list, sorted by
/// (domain, severity descending, rule id ascending).
pub fn evaluate(index: &Index, rules: &[Rule]) -> Vec<Finding> {
    let mut findings: Vec<Finding> = rules
        .iter()
        .filter_map(|rule| {
            rule.predicate.evaluate(index).map(|evidence| Finding {
                id: rule.id.to_string(),
                domain: rule.domain,
                severity: rule.severity,
                title: rule.title.to_string(),
                description: rule.description.to_string(),
                impact: rule.impact.to_string(),
                effort: rule.effort.to_string(),
                recommendation: rule.recommendation.to_string(),
                evidence,
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        a.domain
            .cmp(&b.domain)
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.id.cmp(&b.id))
    });
    findings
}

/// Build the report wrapper around an evaluated finding list
pub fn build_report(findings: Vec<Finding>) -> FindingsReport {
    let mut findings_by_severity: BTreeMap<String, usize> = BTreeMap::new();
    let mut summary_by_domain: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for finding in &findings {
        *findings_by_severity
            .entry(finding.severity.to_string())
            .or_insert(0) += 1;
        *summary_by_domain
            .entry(finding.domain.to_string())
            .or_default()
            .entry(finding.severity.to_string())
            .or_insert(0) += 1;
    }
    FindingsReport {
        total_findings: findings.len(),
        findings_by_severity,
        summary_by_domain,
        findings,
    }
}
