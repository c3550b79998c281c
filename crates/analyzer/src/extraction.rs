//! Resource-count extraction rules
//!
//! Which response member holds "the list of resources" is service-specific
//! knowledge, kept in an explicit table rather than guessed from field
//! names. Operations without a mapping count zero resources. The built-in
//! table can be extended or overridden from a YAML file.

use cloudsweep_common::{Result, SweepError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Identifier members used to deduplicate items across pages
const DEDUP_KEYS: &[&str] = &[
    "InstanceId",
    "VpcId",
    "VolumeId",
    "GroupId",
    "SubnetId",
    "NetworkInterfaceId",
    "DBInstanceIdentifier",
    "DBClusterIdentifier",
    "AutoScalingGroupName",
    "LoadBalancerArn",
    "StackId",
    "KeyId",
    "TrailARN",
    "Id",
    "Arn",
    "Name",
];

/// Explicit {service -> operation -> list member} table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionMap {
    #[serde(default)]
    rules: BTreeMap<String, BTreeMap<String, String>>,
}

impl ExtractionMap {
    /// The built-in table covering the commonly inventoried services
    pub fn defaults() -> Self {
        let mut rules: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut add = |service: &str, operation: &str, member: &str| {
            rules
                .entry(service.to_string())
                .or_default()
                .insert(operation.to_string(), member.to_string());
        };

        add("s3", "ListBuckets", "Buckets");
        add("ec2", "DescribeInstances", "Reservations");
        add("ec2", "DescribeVpcs", "Vpcs");
        add("ec2", "DescribeSubnets", "Subnets");
        add("ec2", "DescribeSecurityGroups", "SecurityGroups");
        add("ec2", "DescribeVolumes", "Volumes");
        add("ec2", "DescribeNetworkAcls", "NetworkAcls");
        add("ec2", "DescribeFlowLogs", "FlowLogs");
        add("ec2", "DescribeAddresses", "Addresses");
        add("iam", "ListUsers", "Users");
        add("iam", "ListRoles", "Roles");
        add("iam", "ListGroups", "Groups");
        add("iam", "ListPolicies", "Policies");
        add("rds", "DescribeDBInstances", "DBInstances");
        add("rds", "DescribeDBClusters", "DBClusters");
        add("lambda", "ListFunctions", "Functions");
        add("dynamodb", "ListTables", "TableNames");
        add("sqs", "ListQueues", "QueueUrls");
        add("sns", "ListTopics", "Topics");
        add("kinesis", "ListStreams", "StreamNames");
        add("cloudtrail", "ListTrails", "Trails");
        add("cloudwatch", "DescribeAlarms", "MetricAlarms");
        add("logs", "DescribeLogGroups", "logGroups");
        add("autoscaling", "DescribeAutoScalingGroups", "AutoScalingGroups");
        add("kms", "ListKeys", "Keys");
        add("elbv2", "DescribeLoadBalancers", "LoadBalancers");
        add("elbv2", "DescribeTargetGroups", "TargetGroups");
        add("cloudformation", "ListStacks", "StackSummaries");
        add("route53", "ListHostedZones", "HostedZones");
        add("cloudfront", "ListDistributions", "DistributionList");
        add("eks", "ListClusters", "clusters");
        add("ecs", "ListClusters", "clusterArns");
        add("ecr", "DescribeRepositories", "repositories");
        add("securityhub", "GetFindings", "Findings");
        add("config", "DescribeConfigurationRecorders", "ConfigurationRecorders");
        add("guardduty", "ListDetectors", "DetectorIds");
        add("backup", "ListBackupPlans", "BackupPlansList");
        add("secretsmanager", "ListSecrets", "SecretList");
        add("events", "ListRules", "Rules");
        add("ssm", "DescribeInstanceInformation", "InstanceInformationList");

        Self { rules }
    }

    /// Load a YAML table and merge it over the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SweepError::Catalog(format!(
                "Failed to read extraction map {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let overlay: ExtractionMap = serde_yaml::from_str(&content).map_err(|e| {
            SweepError::Catalog(format!(
                "Failed to parse extraction map {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let mut merged = Self::defaults();
        for (service, ops) in overlay.rules {
            merged.rules.entry(service).or_default().extend(ops);
        }
        Ok(merged)
    }

    /// The mapped list member for one operation, if any
    pub fn list_member(&self, service: &str, operation: &str) -> Option<&str> {
        self.rules.get(service)?.get(operation).map(String::as_str)
    }

    /// Count the resources in one record payload.
    ///
    /// Handles both payload shapes the collector writes (the paged wrapper
    /// and a bare response), deduplicates across pages by common identifier
    /// members, and returns 0 for unmapped operations.
    pub fn count_resources(&self, service: &str, operation: &str, data: &Value) -> u64 {
        let Some(member) = self.list_member(service, operation) else {
            return 0;
        };

        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut anonymous: u64 = 0;
        for page in pages_of(data) {
            let Some(Value::Array(items)) = page.get(member) else {
                continue;
            };
            // EC2 reservations nest the actual instances one level down
            if service == "ec2" && operation == "DescribeInstances" {
                for reservation in items {
                    if let Some(Value::Array(instances)) = reservation.get("Instances") {
                        for instance in instances {
                            tally(instance, &mut seen, &mut anonymous);
                        }
                    }
                }
                continue;
            }
            for item in items {
                tally(item, &mut seen, &mut anonymous);
            }
        }
        seen.len() as u64 + anonymous
    }
}

impl Default for ExtractionMap {
    fn default() -> Self {
        Self::defaults()
    }
}

fn tally(item: &Value, seen: &mut BTreeSet<String>, anonymous: &mut u64) {
    match item {
        Value::String(s) => {
            seen.insert(s.clone());
        }
        Value::Object(map) => {
            for key in DEDUP_KEYS {
                match map.get(*key) {
                    Some(Value::String(id)) => {
                        seen.insert(format!("{key}:{id}"));
                        return;
                    }
                    Some(Value::Number(id)) => {
                        seen.insert(format!("{key}:{id}"));
                        return;
                    }
                    _ => {}
                }
            }
            *anonymous += 1;
        }
        _ => *anonymous += 1,
    }
}

/// Iterate the pages of a payload: either the `{"pages": N, "data": [...]}`
/// wrapper or the payload itself as a single page.
fn pages_of(data: &Value) -> Vec<&Value> {
    if let Value::Object(map) = data {
        if map.contains_key("pages") {
            if let Some(Value::Array(pages)) = map.get("data") {
                return pages.iter().collect();
            }
        }
    }
    vec![data]
}
