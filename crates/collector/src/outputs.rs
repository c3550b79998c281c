//! Run-level collaborator outputs
//!
//! The collection phase leaves two small JSON documents next to the raw
//! store: account metadata and the final statistics summary.

use cloudsweep_common::records::{AccountMetadata, CollectionStats};
use cloudsweep_common::Result;
use std::fs;
use std::path::Path;

/// Write `metadata.json` into the run directory
pub fn write_account_metadata(run_dir: &Path, metadata: &AccountMetadata) -> Result<()> {
    let path = run_dir.join("metadata.json");
    fs::write(&path, serde_json::to_string_pretty(metadata)?)?;
    Ok(())
}

/// Write `collection_stats.json` into the run directory
pub fn write_stats(run_dir: &Path, stats: &CollectionStats) -> Result<()> {
    let path = run_dir.join("collection_stats.json");
    fs::write(&path, serde_json::to_string_pretty(stats)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_are_written() {
        let dir = tempfile::tempdir().unwrap();
        write_account_metadata(
            dir.path(),
            &AccountMetadata {
                account_id: Some("123456789012".to_string()),
                regions: vec!["us-east-1".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        write_stats(
            dir.path(),
            &CollectionStats {
                operations_executed: 4,
                operations_successful: 3,
                operations_skipped: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("metadata.json")).unwrap())
                .unwrap();
        assert_eq!(metadata["account_id"], "123456789012");

        let stats: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("collection_stats.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stats["operations_executed"], 4);
    }
}
