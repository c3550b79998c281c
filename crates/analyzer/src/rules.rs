//! Declarative finding rules
//!
//! A rule is data: a predicate over the index plus the severity and text of
//! the finding it emits. Evaluation is total; every rule is checked on
//! every run and either fires or does not.

use crate::index::Index;
use serde::{Deserialize, Serialize};

/// Finding severity, ordered weakest to strongest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Evaluation domains findings and scores are grouped under
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Domain {
    Security,
    Reliability,
    #[serde(rename = "Cost Optimization")]
    CostOptimization,
    #[serde(rename = "Operational Excellence")]
    OperationalExcellence,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Security,
        Domain::Reliability,
        Domain::CostOptimization,
        Domain::OperationalExcellence,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Domain::Security => "Security",
            Domain::Reliability => "Reliability",
            Domain::CostOptimization => "Cost Optimization",
            Domain::OperationalExcellence => "Operational Excellence",
        };
        write!(f, "{s}")
    }
}

/// Predicate over the index; firing yields the evidence references
#[derive(Debug, Clone)]
pub enum Predicate {
    /// No successful operation for the service anywhere
    ServiceAbsent { service: &'static str },
    /// None of the listed services is present
    AllAbsent { services: &'static [&'static str] },
    /// At least one successful operation for the service
    ServicePresent { service: &'static str },
    /// `service` is in use but `companion` is not
    PresentWithoutCompanion {
        service: &'static str,
        companion: &'static str,
    },
    /// More active regions than the threshold
    RegionCountAbove { threshold: usize },
}

impl Predicate {
    /// Returns the evidence list when the predicate fires
    pub fn evaluate(&self, index: &Index) -> Option<Vec<String>> {
        match self {
            Predicate::ServiceAbsent { service } => {
                if index.service_present(service) {
                    return None;
                }
                Some(vec![absence_evidence(index, service)])
            }
            Predicate::AllAbsent { services } => {
                if services.iter().any(|s| index.service_present(s)) {
                    return None;
                }
                Some(
                    services
                        .iter()
                        .map(|s| absence_evidence(index, s))
                        .collect(),
                )
            }
            Predicate::ServicePresent { service } => {
                if !index.service_present(service) {
                    return None;
                }
                Some(index.presence_refs(service, 5))
            }
            Predicate::PresentWithoutCompanion { service, companion } => {
                if !index.service_present(service) || index.service_present(companion) {
                    return None;
                }
                let mut evidence = index.presence_refs(service, 5);
                evidence.push(absence_evidence(index, companion));
                Some(evidence)
            }
            Predicate::RegionCountAbove { threshold } => {
                let count = index.region_count();
                if count <= *threshold {
                    return None;
                }
                let regions: Vec<&str> = index.regions.iter().map(String::as_str).collect();
                Some(vec![format!(
                    "{count} active regions: {}",
                    regions.join(", ")
                )])
            }
        }
    }
}

fn absence_evidence(index: &Index, service: &str) -> String {
    match index.absence_kind(service) {
        Some(kind) => format!("service '{service}' absent ({kind})"),
        None => format!("service '{service}' not present in inventory"),
    }
}

/// One declarative rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub domain: Domain,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub effort: &'static str,
    pub recommendation: &'static str,
    pub predicate: Predicate,
}

/// The built-in rule set
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "SEC-001",
            domain: Domain::Security,
            severity: Severity::Medium,
            title: "Security Hub not detected",
            description: "Security Hub is not enabled or could not be reached. It provides a centralized view of the account's security posture.",
            impact: "Low visibility into the account's security state",
            effort: "Low",
            recommendation: "Enable Security Hub for centralized security posture visibility.",
            predicate: Predicate::ServiceAbsent {
                service: "securityhub",
            },
        },
        Rule {
            id: "SEC-002",
            domain: Domain::Security,
            severity: Severity::Medium,
            title: "Config service not detected",
            description: "The configuration-audit service is not enabled or could not be reached. It enables continuous configuration auditing and compliance.",
            impact: "No visibility into configuration changes",
            effort: "Medium",
            recommendation: "Enable the configuration-audit service for continuous compliance tracking.",
            predicate: Predicate::ServiceAbsent { service: "config" },
        },
        Rule {
            id: "SEC-003",
            domain: Domain::Security,
            severity: Severity::High,
            title: "CloudTrail not detected",
            description: "API activity logging is not enabled or could not be reached. An audit trail is essential for security analysis and compliance.",
            impact: "No audit trail of API activity",
            effort: "Low",
            recommendation: "Enable API activity logging in all regions.",
            predicate: Predicate::ServiceAbsent {
                service: "cloudtrail",
            },
        },
        Rule {
            id: "REL-001",
            domain: Domain::Reliability,
            severity: Severity::Info,
            title: "Managed databases detected - verify multi-AZ configuration",
            description: "Managed database instances are in use. Critical instances should run with multi-AZ failover enabled.",
            impact: "Possible lack of high availability for databases",
            effort: "Medium",
            recommendation: "Review database instances and enable multi-AZ for critical workloads.",
            predicate: Predicate::ServicePresent { service: "rds" },
        },
        Rule {
            id: "REL-002",
            domain: Domain::Reliability,
            severity: Severity::Info,
            title: "Auto scaling detected",
            description: "Auto scaling groups are in use. Health checks and scaling policies should be reviewed periodically.",
            impact: "Potential reliability improvement available",
            effort: "Low",
            recommendation: "Review auto scaling group health checks and scaling policies.",
            predicate: Predicate::ServicePresent {
                service: "autoscaling",
            },
        },
        Rule {
            id: "REL-003",
            domain: Domain::Reliability,
            severity: Severity::Medium,
            title: "Compute instances without auto scaling",
            description: "Compute instances are in use but no auto scaling groups were detected, suggesting capacity is managed by hand.",
            impact: "No automatic scaling or instance recovery",
            effort: "Medium",
            recommendation: "Place instances that need availability behind auto scaling groups.",
            predicate: Predicate::PresentWithoutCompanion {
                service: "ec2",
                companion: "autoscaling",
            },
        },
        Rule {
            id: "COST-001",
            domain: Domain::CostOptimization,
            severity: Severity::Low,
            title: "Cost analysis service not accessible",
            description: "The cost analysis API could not be reached, limiting spend visibility.",
            impact: "Limited cost visibility",
            effort: "Low",
            recommendation: "Grant access to the cost analysis service for detailed spend reporting.",
            predicate: Predicate::AllAbsent {
                services: &["ce", "cost-explorer"],
            },
        },
        Rule {
            id: "COST-002",
            domain: Domain::CostOptimization,
            severity: Severity::Info,
            title: "Many active regions detected",
            description: "Resources are spread across many regions, which can increase inter-region data transfer costs.",
            impact: "Possible inter-region data transfer costs",
            effort: "High",
            recommendation: "Review region usage and consolidate where practical.",
            predicate: Predicate::RegionCountAbove { threshold: 5 },
        },
        Rule {
            id: "OPS-001",
            domain: Domain::OperationalExcellence,
            severity: Severity::Medium,
            title: "Monitoring services not detected",
            description: "Neither the metrics nor the log aggregation service was detected, limiting observability.",
            impact: "No monitoring or observability",
            effort: "Medium",
            recommendation: "Enable metrics and log aggregation for the workloads in use.",
            predicate: Predicate::AllAbsent {
                services: &["cloudwatch", "logs"],
            },
        },
        Rule {
            id: "OPS-002",
            domain: Domain::OperationalExcellence,
            severity: Severity::Low,
            title: "Systems management service not detected",
            description: "The instance management service is not enabled or could not be reached.",
            impact: "No centralized instance management",
            effort: "Medium",
            recommendation: "Consider the systems management service for centralized instance operations.",
            predicate: Predicate::ServiceAbsent { service: "ssm" },
        },
    ]
}
