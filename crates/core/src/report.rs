//! Report structure for launch-origin and risk analysis results

use crate::models::{Finding, Process, SourceInfo, SourceKind};
use crate::snapshot::Snapshot;
use crate::source::detect;
use crate::warnings::WarningEngine;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// The process being explained (if the ancestry was non-empty)
    pub target: Option<Process>,
    /// Lineage of the target, outermost ancestor first
    pub ancestry: Vec<Process>,
    /// Processes checked for warnings besides the ancestry
    pub related: Vec<Process>,
    /// Detected launch origin
    pub source: SourceInfo,
    /// Warnings raised over ancestry and related processes
    pub warnings: Vec<Finding>,
    /// Time the warnings were evaluated at
    #[serde(with = "time::serde::rfc3339")]
    pub evaluated_at: OffsetDateTime,
}

impl Report {
    /// Create an empty report
    pub fn new(evaluated_at: OffsetDateTime) -> Self {
        Self {
            target: None,
            ancestry: Vec::new(),
            related: Vec::new(),
            source: SourceInfo::unknown(),
            warnings: Vec::new(),
            evaluated_at,
        }
    }

    /// Run source detection and the warning engine over a snapshot
    pub fn analyze(snapshot: &Snapshot, engine: &WarningEngine, now: OffsetDateTime) -> Self {
        Self {
            target: snapshot.target().cloned(),
            ancestry: snapshot.ancestry.clone(),
            related: snapshot.related.clone(),
            source: detect(&snapshot.ancestry),
            warnings: engine.evaluate(&snapshot.evaluated_processes(), now),
            evaluated_at: now,
        }
    }

    /// Check if a target process was present
    pub fn target_found(&self) -> bool {
        self.target.is_some()
    }

    /// Check if any warnings were raised
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Ancestors of the target, excluding the target itself
    pub fn ancestors(&self) -> &[Process] {
        match self.ancestry.split_last() {
            Some((_, ancestors)) => ancestors,
            None => &[],
        }
    }

    /// Warnings raised for a specific PID
    pub fn warnings_for(&self, pid: u32) -> impl Iterator<Item = &Finding> {
        self.warnings.iter().filter(move |w| w.pid == Some(pid))
    }

    /// Check if the process was started from an interactive shell
    pub fn is_interactive(&self) -> bool {
        self.source.kind == SourceKind::Shell
    }

    /// Check if the process is kept alive by a supervisor
    pub fn is_supervised(&self) -> bool {
        self.source.kind == SourceKind::Supervisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskKind;
    use time::macros::datetime;

    #[test]
    fn test_analyze_combines_both_engines() {
        let snapshot = Snapshot {
            ancestry: vec![
                Process::new(1, "bash"),
                Process::new(10, "supervisord"),
                Process {
                    user: Some("root".to_string()),
                    ..Process::new(20, "myapp")
                },
            ],
            related: vec![],
        };
        let now = datetime!(2025-01-01 00:00 UTC);
        let report = Report::analyze(&snapshot, &WarningEngine::default(), now);

        assert!(report.is_supervised());
        assert_eq!(report.source.name, "supervisord");
        assert_eq!(report.target.as_ref().map(|p| p.pid), Some(20));
        assert_eq!(report.ancestors().len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings_for(20).next().map(|w| w.kind), Some(RiskKind::Privileged));
        assert_eq!(report.evaluated_at, now);
    }

    #[test]
    fn test_related_processes_feed_restart_check() {
        let snapshot = Snapshot {
            ancestry: vec![Process::new(1, "pm2"), Process::new(2, "node")],
            related: (3..7).map(|pid| Process::new(pid, "node")).collect(),
        };
        let report = Report::analyze(
            &snapshot,
            &WarningEngine::default(),
            datetime!(2025-01-01 00:00 UTC),
        );
        assert!(report.has_warnings());
        assert_eq!(report.warnings[0].kind, RiskKind::RestartLoop);
        assert!(report.warnings_for(2).next().is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        let report = Report::analyze(
            &Snapshot::default(),
            &WarningEngine::default(),
            datetime!(2025-01-01 00:00 UTC),
        );
        assert!(!report.target_found());
        assert!(!report.has_warnings());
        assert!(report.ancestors().is_empty());
        assert_eq!(report.source, SourceInfo::unknown());
    }
}
