//! Domain maturity scoring
//!
//! A fixed decision table maps each domain's finding set to a 1-5 score.
//! Scores are a pure function of the findings; the overall score is the
//! mean across domains, rounded to one decimal.

use crate::findings::Finding;
use crate::rules::{Domain, Severity};
use serde::{Deserialize, Serialize};

/// Maturity score for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: Domain,
    /// 1 (weakest) to 5 (no findings)
    pub score: u8,
    /// Ids of the findings that drove the score
    pub rationale: Vec<String>,
}

/// All domain scores plus the overall average
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub domains: Vec<DomainScore>,
    pub overall: f64,
}

/// Score one domain from its findings.
///
/// Decision table, first match wins:
/// 1. two or more high-severity findings        -> 1
/// 2. one high, or two or more medium           -> 2
/// 3. one medium, or two or more low            -> 3
/// 4. exactly one low                           -> 4
/// 5. only info, or nothing                     -> 5
pub fn score_domain(domain: Domain, findings: &[Finding]) -> DomainScore {
    let domain_findings: Vec<&Finding> =
        findings.iter().filter(|f| f.domain == domain).collect();
    let count =
        |sev: Severity| domain_findings.iter().filter(|f| f.severity == sev).count();

    let high = count(Severity::High);
    let medium = count(Severity::Medium);
    let low = count(Severity::Low);

    let score = if high >= 2 {
        1
    } else if high == 1 || medium >= 2 {
        2
    } else if medium == 1 || low >= 2 {
        3
    } else if low == 1 {
        4
    } else {
        5
    };

    DomainScore {
        domain,
        score,
        rationale: domain_findings.iter().map(|f| f.id.clone()).collect(),
    }
}

/// Score every domain and compute the overall mean
pub fn score_all(findings: &[Finding]) -> ScoreReport {
    let domains: Vec<DomainScore> = Domain::ALL
        .iter()
        .map(|domain| score_domain(*domain, findings))
        .collect();
    let overall = round_one_decimal(
        domains.iter().map(|d| d.score as f64).sum::<f64>() / domains.len() as f64,
    );
    ScoreReport { domains, overall }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
