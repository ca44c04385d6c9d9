//! Process snapshots handed over by an external collector
//!
//! The document layout is:
//!
//! ```json
//! {
//!   "ancestry": [{"pid": 1, "command": "bash"}, {"pid": 42, "command": "myapp"}],
//!   "related": [{"pid": 43, "command": "myapp"}]
//! }
//! ```
//!
//! `ancestry` runs from the outermost ancestor to the target process, which is
//! the last element. `related` is optional and holds siblings or other
//! instances that should be checked for warnings too.

use crate::error::{WitrError, WitrResult};
use crate::models::Process;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// A materialized set of processes to analyze
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Lineage of the target, outermost ancestor first
    pub ancestry: Vec<Process>,
    /// Additional processes to include in warning checks
    pub related: Vec<Process>,
}

impl Snapshot {
    /// Create a snapshot from an ancestry chain
    pub fn new(ancestry: Vec<Process>) -> Self {
        Self {
            ancestry,
            related: Vec::new(),
        }
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json_str(json: &str) -> WitrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a snapshot from any reader
    pub fn from_reader(reader: impl Read) -> WitrResult<Self> {
        Ok(serde_json::from_reader(io::BufReader::new(reader))?)
    }

    /// Load a snapshot from a file
    pub fn from_path(path: impl AsRef<Path>) -> WitrResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                WitrError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                WitrError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let snapshot = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            ancestry = snapshot.ancestry.len(),
            related = snapshot.related.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// The process being explained (last ancestry element)
    pub fn target(&self) -> Option<&Process> {
        self.ancestry.last()
    }

    /// Every process the warning engine should look at
    pub fn evaluated_processes(&self) -> Vec<Process> {
        self.ancestry
            .iter()
            .chain(self.related.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_is_optional() {
        let snapshot =
            Snapshot::from_json_str(r#"{"ancestry":[{"command":"bash"},{"command":"myapp"}]}"#)
                .unwrap();
        assert!(snapshot.related.is_empty());
        assert_eq!(snapshot.target().map(|p| p.command.as_str()), Some("myapp"));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let snapshot = Snapshot::from_json_str("{}").unwrap();
        assert!(snapshot.target().is_none());
        assert!(snapshot.evaluated_processes().is_empty());
    }

    #[test]
    fn test_evaluated_processes_keeps_order() {
        let snapshot = Snapshot {
            ancestry: vec![Process::new(1, "bash"), Process::new(2, "app")],
            related: vec![Process::new(3, "app")],
        };
        let pids: Vec<_> = snapshot.evaluated_processes().iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Snapshot::from_json_str(r#"{"ancestry": 5}"#).unwrap_err();
        assert!(matches!(err, WitrError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Snapshot::from_path("/nonexistent/witr/snapshot.json").unwrap_err();
        assert!(matches!(err, WitrError::NotFound { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_from_reader() {
        let json = br#"{"ancestry":[{"pid":7,"command":"cron"}]}"#;
        let snapshot = Snapshot::from_reader(&json[..]).unwrap();
        assert_eq!(snapshot.ancestry[0].pid, 7);
    }
}
