//! Core domain models for witr
//!
//! These types describe a point-in-time snapshot of processes. Nothing in this
//! crate mutates them once they have been collected.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// A snapshot of one OS process at observation time
///
/// Every field is optional on the wire; absent values fall back to the
/// zero value, which no rule treats as significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    /// Process ID
    pub pid: u32,
    /// Parent process ID, if the collector knew it
    pub ppid: Option<u32>,
    /// Executable or command name (e.g. "bash", "/usr/bin/node")
    pub command: String,
    /// Health status computed by the collector
    pub health: Health,
    /// User the process runs as
    pub user: Option<String>,
    /// Addresses the process is listening on
    pub bind_addresses: Vec<String>,
    /// Current working directory
    pub working_dir: Option<String>,
    /// Process start time
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Container ID, if the process is containerized
    pub container: Option<String>,
    /// Healthcheck status reported for the container
    pub healthcheck: Option<String>,
    /// Declared service name (unit, program name, ...)
    pub service: Option<String>,
}

impl Process {
    /// Create a process record with only a PID and command set
    pub fn new(pid: u32, command: impl Into<String>) -> Self {
        Self {
            pid,
            command: command.into(),
            ..Self::default()
        }
    }

    /// Get the process name (final path component of the command)
    pub fn name(&self) -> &str {
        base_name(&self.command)
    }

    /// Container ID, treating an empty string as "not containerized"
    pub fn container_id(&self) -> Option<&str> {
        non_empty(self.container.as_deref())
    }

    /// Declared service name, treating an empty string as unset
    pub fn declared_service(&self) -> Option<&str> {
        non_empty(self.service.as_deref())
    }

    /// Container healthcheck status, treating an empty string as unset
    pub fn healthcheck_status(&self) -> Option<&str> {
        non_empty(self.healthcheck.as_deref())
    }

    /// How long the process has been running at `now`
    ///
    /// `None` when the start time is unknown or lies in the future. Start
    /// times at or before the Unix epoch are zero values written by
    /// collectors that could not read the real one, and count as unknown.
    pub fn age(&self, now: OffsetDateTime) -> Option<Duration> {
        let started = self
            .started_at
            .filter(|t| *t > OffsetDateTime::UNIX_EPOCH)?;
        let age = now - started;
        (!age.is_negative()).then_some(age)
    }

    /// Check if the process runs as root
    pub fn is_root(&self) -> bool {
        self.user.as_deref() == Some("root")
    }
}

/// Final path component of a command, tolerating both separators
pub(crate) fn base_name(command: &str) -> &str {
    command.rsplit(['/', '\\']).next().unwrap_or(command)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Health classification of a process
///
/// Serialized as the collector's status strings: `""`, `"zombie"`,
/// `"stopped"`, `"high-cpu"` and `"high-mem"`. Other strings are kept
/// verbatim as [`Health::Unrecognized`] and never trigger a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Health {
    /// No known issue
    #[default]
    Healthy,
    /// Exited but not yet reaped by its parent
    Zombie,
    /// Suspended (SIGSTOP / SIGTSTP)
    Stopped,
    /// Sustained high CPU usage
    HighCpu,
    /// High resident memory
    HighMem,
    /// A status string this crate does not know about
    Unrecognized(String),
}

impl Health {
    /// The wire representation of this status
    pub fn as_str(&self) -> &str {
        match self {
            Health::Healthy => "",
            Health::Zombie => "zombie",
            Health::Stopped => "stopped",
            Health::HighCpu => "high-cpu",
            Health::HighMem => "high-mem",
            Health::Unrecognized(s) => s,
        }
    }
}

impl From<&str> for Health {
    fn from(s: &str) -> Self {
        match s {
            "" => Health::Healthy,
            "zombie" => Health::Zombie,
            "stopped" => Health::Stopped,
            "high-cpu" => Health::HighCpu,
            "high-mem" => Health::HighMem,
            other => Health::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for Health {
    fn from(s: String) -> Self {
        Health::from(s.as_str())
    }
}

impl From<Health> for String {
    fn from(health: Health) -> Self {
        health.as_str().to_string()
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Healthy => write!(f, "healthy"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Classification of what launched a process
///
/// Variants are declared in ascending priority, so the derived ordering is
/// the detection priority: `Supervisor > Cron > Shell > Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// No known launcher in the ancestry
    Unknown,
    /// Interactive shell session
    Shell,
    /// Scheduled job (cron and friends)
    Cron,
    /// Process manager / supervisor daemon
    Supervisor,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Supervisor => write!(f, "Process Supervisor"),
            SourceKind::Cron => write!(f, "Scheduled Job"),
            SourceKind::Shell => write!(f, "Interactive Shell"),
            SourceKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of launch-origin detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// The detected launcher category
    pub kind: SourceKind,
    /// The literal command that matched; empty when `kind` is `Unknown`
    pub name: String,
    /// Index of the matching entry in the ancestry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl SourceInfo {
    /// Create an unknown classification
    pub fn unknown() -> Self {
        Self {
            kind: SourceKind::Unknown,
            name: String::new(),
            position: None,
        }
    }

    /// Check if a launcher was identified
    pub fn is_known(&self) -> bool {
        self.kind != SourceKind::Unknown
    }

    /// Check if the ancestry entry at `index` is the detected launcher
    pub fn is_launcher_at(&self, index: usize) -> bool {
        self.is_known() && self.position == Some(index)
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_known() {
            write!(f, "{} ({})", self.kind, self.name)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// The risk condition behind a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    Zombie,
    Privileged,
    PublicBind,
    SuspiciousLocation,
    Stopped,
    HighCpu,
    HighMemory,
    MissingHealthcheck,
    IdentityMismatch,
    Stale,
    RestartLoop,
}

impl std::fmt::Display for RiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RiskKind::Zombie => "zombie",
            RiskKind::Privileged => "privileged",
            RiskKind::PublicBind => "public bind",
            RiskKind::SuspiciousLocation => "suspicious location",
            RiskKind::Stopped => "stopped",
            RiskKind::HighCpu => "high cpu",
            RiskKind::HighMemory => "high memory",
            RiskKind::MissingHealthcheck => "no healthcheck",
            RiskKind::IdentityMismatch => "identity mismatch",
            RiskKind::Stale => "stale",
            RiskKind::RestartLoop => "restart loop",
        };
        write!(f, "{}", label)
    }
}

/// One warning produced by the warning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Which rule fired
    pub kind: RiskKind,
    /// PID of the offending process; `None` for findings about a group
    pub pid: Option<u32>,
    /// Command of the offending process or group
    pub command: String,
    /// Human-readable warning text
    pub message: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_health_parses_known_statuses() {
        assert_eq!(Health::from(""), Health::Healthy);
        assert_eq!(Health::from("zombie"), Health::Zombie);
        assert_eq!(Health::from("high-cpu"), Health::HighCpu);
        assert_eq!(
            Health::from("sleeping"),
            Health::Unrecognized("sleeping".to_string())
        );
    }

    #[test]
    fn test_process_deserializes_sparse_json() {
        let json = r#"{"command":"nginx","health":"high-mem","started_at":"2024-01-02T03:04:05Z"}"#;
        let process: Process = serde_json::from_str(json).unwrap();
        assert_eq!(process.command, "nginx");
        assert_eq!(process.health, Health::HighMem);
        assert_eq!(process.pid, 0);
        assert!(process.bind_addresses.is_empty());
        assert_eq!(process.started_at, Some(datetime!(2024-01-02 03:04:05 UTC)));
    }

    #[test]
    fn test_process_name_strips_path() {
        assert_eq!(Process::new(1, "/usr/bin/node").name(), "node");
        assert_eq!(Process::new(1, "C:\\tools\\app.exe").name(), "app.exe");
        assert_eq!(Process::new(1, "bash").name(), "bash");
    }

    #[test]
    fn test_empty_optional_strings_are_absent() {
        let process = Process {
            container: Some(String::new()),
            service: Some(String::new()),
            ..Process::new(1, "app")
        };
        assert_eq!(process.container_id(), None);
        assert_eq!(process.declared_service(), None);
    }

    #[test]
    fn test_age_ignores_future_start() {
        let now = datetime!(2025-06-01 00:00 UTC);
        let process = Process {
            started_at: Some(datetime!(2025-07-01 00:00 UTC)),
            ..Process::new(1, "app")
        };
        assert_eq!(process.age(now), None);
    }

    #[test]
    fn test_age_ignores_zero_start() {
        let now = datetime!(2025-06-01 00:00 UTC);
        let zero: Process =
            serde_json::from_str(r#"{"command":"app","started_at":"0001-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(zero.started_at.is_some());
        assert_eq!(zero.age(now), None);

        let epoch = Process {
            started_at: Some(OffsetDateTime::UNIX_EPOCH),
            ..Process::new(1, "app")
        };
        assert_eq!(epoch.age(now), None);
    }

    #[test]
    fn test_source_kind_priority_order() {
        assert!(SourceKind::Supervisor > SourceKind::Cron);
        assert!(SourceKind::Cron > SourceKind::Shell);
        assert!(SourceKind::Shell > SourceKind::Unknown);
    }
}
