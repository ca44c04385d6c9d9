//! Risk warnings for a set of processes
//!
//! Per-process checks are a static table of [`Rule`] records evaluated
//! uniformly over the input. The restart check is the only one that looks
//! across processes: it groups the input by command in a separate pass and
//! its findings are appended after the per-process ones.
//!
//! Output order is deterministic: rule table order, then input order.

use crate::bind::{is_public_bind, public_binds};
use crate::models::{base_name, Finding, Health, Process, RiskKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use time::{Duration, OffsetDateTime};
use tracing::debug;

/// Processes older than this many days are reported as stale
pub const DEFAULT_STALE_AFTER_DAYS: u32 = 90;

/// A command seen at least this many times is reported as restarting
pub const DEFAULT_RESTART_THRESHOLD: usize = 5;

/// Transient or world-writable directories nothing long-lived should run from
pub const DEFAULT_SUSPICIOUS_DIRS: &[&str] = &["/tmp", "/var/tmp", "/dev/shm", "/private/tmp"];

/// Shortest name that fuzzy identity matching accepts as a substring
pub const MIN_FUZZY_NAME_LEN: usize = 3;

/// How a declared service name is compared with the process command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMatch {
    /// The command (or its final path component) must equal the service name
    Exact,
    /// Case-insensitive; a `.service` suffix is ignored and either name may
    /// contain the other if the contained one has at least
    /// [`MIN_FUZZY_NAME_LEN`] characters
    #[default]
    Fuzzy,
}

/// Tunable thresholds for the warning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningPolicy {
    /// Age in days after which a process is stale
    pub stale_after_days: u32,
    /// Occurrences of one command that count as a restart loop
    pub restart_threshold: usize,
    /// Service identity comparison mode
    pub identity_match: IdentityMatch,
    /// Directory prefixes that make a working directory suspicious
    pub suspicious_dirs: Vec<String>,
}

impl Default for WarningPolicy {
    fn default() -> Self {
        Self {
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            restart_threshold: DEFAULT_RESTART_THRESHOLD,
            identity_match: IdentityMatch::default(),
            suspicious_dirs: DEFAULT_SUSPICIOUS_DIRS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl WarningPolicy {
    fn stale_after(&self) -> Duration {
        Duration::days(i64::from(self.stale_after_days))
    }

    /// Check if `dir` lies at or below one of the suspicious directories
    ///
    /// Comparison is per path component, so `/tmpfoo` is not under `/tmp`.
    pub fn is_suspicious_dir(&self, dir: &str) -> bool {
        let path = Path::new(dir);
        self.suspicious_dirs.iter().any(|d| path.starts_with(d))
    }

    /// Check if a declared service name matches a command
    pub fn identity_matches(&self, command: &str, service: &str) -> bool {
        let name = base_name(command);
        match self.identity_match {
            IdentityMatch::Exact => command == service || name == service,
            IdentityMatch::Fuzzy => {
                let name = name.to_ascii_lowercase();
                let service = service.to_ascii_lowercase();
                let service = service.strip_suffix(".service").unwrap_or(&service);
                if name.is_empty() || service.is_empty() {
                    return false;
                }
                name == service || contains_name(&name, service) || contains_name(service, &name)
            }
        }
    }
}

/// `needle` occurs in `haystack` and is long enough to be meaningful
fn contains_name(haystack: &str, needle: &str) -> bool {
    needle.len() >= MIN_FUZZY_NAME_LEN && haystack.contains(needle)
}

/// Evaluation state shared by every rule in one pass
struct RuleContext<'a> {
    policy: &'a WarningPolicy,
    now: OffsetDateTime,
}

/// A per-process check and the text it produces when it fires
struct Rule {
    kind: RiskKind,
    applies: fn(&Process, &RuleContext<'_>) -> bool,
    describe: fn(&Process, &RuleContext<'_>) -> String,
}

impl Rule {
    fn finding(&self, process: &Process, ctx: &RuleContext<'_>) -> Finding {
        Finding {
            kind: self.kind,
            pid: Some(process.pid),
            command: process.command.clone(),
            message: (self.describe)(process, ctx),
        }
    }
}

/// Per-process rules, in output order
const RULES: &[Rule] = &[
    Rule {
        kind: RiskKind::Zombie,
        applies: is_zombie,
        describe: describe_zombie,
    },
    Rule {
        kind: RiskKind::Privileged,
        applies: is_privileged,
        describe: describe_privileged,
    },
    Rule {
        kind: RiskKind::PublicBind,
        applies: is_publicly_bound,
        describe: describe_public_bind,
    },
    Rule {
        kind: RiskKind::SuspiciousLocation,
        applies: is_in_suspicious_dir,
        describe: describe_suspicious_dir,
    },
    Rule {
        kind: RiskKind::Stopped,
        applies: is_stopped,
        describe: describe_stopped,
    },
    Rule {
        kind: RiskKind::HighCpu,
        applies: is_high_cpu,
        describe: describe_high_cpu,
    },
    Rule {
        kind: RiskKind::HighMemory,
        applies: is_high_mem,
        describe: describe_high_mem,
    },
    Rule {
        kind: RiskKind::MissingHealthcheck,
        applies: lacks_healthcheck,
        describe: describe_missing_healthcheck,
    },
    Rule {
        kind: RiskKind::IdentityMismatch,
        applies: mismatches_service,
        describe: describe_identity_mismatch,
    },
    Rule {
        kind: RiskKind::Stale,
        applies: is_stale,
        describe: describe_stale,
    },
];

fn subject(p: &Process) -> String {
    format!("{} (PID {})", p.command, p.pid)
}

fn is_zombie(p: &Process, _: &RuleContext<'_>) -> bool {
    p.health == Health::Zombie
}

fn describe_zombie(p: &Process, _: &RuleContext<'_>) -> String {
    format!(
        "{} is a zombie process; its parent has not reaped it",
        subject(p)
    )
}

fn is_privileged(p: &Process, _: &RuleContext<'_>) -> bool {
    p.is_root()
}

fn describe_privileged(p: &Process, _: &RuleContext<'_>) -> String {
    format!("{} is running as root", subject(p))
}

fn is_publicly_bound(p: &Process, _: &RuleContext<'_>) -> bool {
    is_public_bind(&p.bind_addresses)
}

fn describe_public_bind(p: &Process, _: &RuleContext<'_>) -> String {
    format!(
        "{} is listening on a public address ({})",
        subject(p),
        public_binds(&p.bind_addresses).join(", ")
    )
}

fn is_in_suspicious_dir(p: &Process, ctx: &RuleContext<'_>) -> bool {
    p.working_dir
        .as_deref()
        .is_some_and(|dir| ctx.policy.is_suspicious_dir(dir))
}

fn describe_suspicious_dir(p: &Process, _: &RuleContext<'_>) -> String {
    format!(
        "{} is running from a suspicious location ({})",
        subject(p),
        p.working_dir.as_deref().unwrap_or_default()
    )
}

fn is_stopped(p: &Process, _: &RuleContext<'_>) -> bool {
    p.health == Health::Stopped
}

fn describe_stopped(p: &Process, _: &RuleContext<'_>) -> String {
    format!("{} is stopped", subject(p))
}

fn is_high_cpu(p: &Process, _: &RuleContext<'_>) -> bool {
    p.health == Health::HighCpu
}

fn describe_high_cpu(p: &Process, _: &RuleContext<'_>) -> String {
    format!("{} is using high CPU", subject(p))
}

fn is_high_mem(p: &Process, _: &RuleContext<'_>) -> bool {
    p.health == Health::HighMem
}

fn describe_high_mem(p: &Process, _: &RuleContext<'_>) -> String {
    format!("{} is using a large amount of memory", subject(p))
}

fn lacks_healthcheck(p: &Process, _: &RuleContext<'_>) -> bool {
    p.container_id().is_some() && p.healthcheck_status().is_none()
}

fn describe_missing_healthcheck(p: &Process, _: &RuleContext<'_>) -> String {
    format!(
        "{} runs in container {} with no healthcheck",
        subject(p),
        p.container_id().unwrap_or_default()
    )
}

fn mismatches_service(p: &Process, ctx: &RuleContext<'_>) -> bool {
    p.declared_service()
        .is_some_and(|service| !ctx.policy.identity_matches(&p.command, service))
}

fn describe_identity_mismatch(p: &Process, _: &RuleContext<'_>) -> String {
    format!(
        "{} does not match its declared service \"{}\"",
        subject(p),
        p.declared_service().unwrap_or_default()
    )
}

fn is_stale(p: &Process, ctx: &RuleContext<'_>) -> bool {
    p.age(ctx.now)
        .is_some_and(|age| age > ctx.policy.stale_after())
}

fn describe_stale(p: &Process, ctx: &RuleContext<'_>) -> String {
    let days = p.age(ctx.now).map(|age| age.whole_days()).unwrap_or_default();
    format!(
        "{} has been running for {} days (longer than {} days)",
        subject(p),
        days,
        ctx.policy.stale_after_days
    )
}

/// Commands repeated at least `threshold` times, in first-seen order
///
/// Empty commands are never grouped.
fn repeated_commands(processes: &[Process], threshold: usize) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for process in processes.iter().filter(|p| !p.command.is_empty()) {
        *counts.entry(process.command.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    processes
        .iter()
        .map(|p| p.command.as_str())
        .filter(|cmd| counts.get(cmd).is_some_and(|&n| n >= threshold))
        .filter(|cmd| seen.insert(*cmd))
        .map(|cmd| (cmd, counts[cmd]))
        .collect()
}

fn restart_finding(command: &str, count: usize) -> Finding {
    Finding {
        kind: RiskKind::RestartLoop,
        pid: None,
        command: command.to_string(),
        message: format!(
            "{} appears {} times; it may be restarting repeatedly",
            command, count
        ),
    }
}

/// Rule-based warning generator
#[derive(Debug, Clone, Default)]
pub struct WarningEngine {
    policy: WarningPolicy,
}

impl WarningEngine {
    /// Create an engine with the given policy
    pub fn new(policy: WarningPolicy) -> Self {
        Self { policy }
    }

    /// The policy this engine evaluates with
    pub fn policy(&self) -> &WarningPolicy {
        &self.policy
    }

    /// Evaluate every rule against `processes` as of `now`
    pub fn evaluate(&self, processes: &[Process], now: OffsetDateTime) -> Vec<Finding> {
        let repeated = repeated_commands(processes, self.policy.restart_threshold.max(1));

        let ctx = RuleContext {
            policy: &self.policy,
            now,
        };

        let mut findings: Vec<Finding> = RULES
            .iter()
            .flat_map(|rule| {
                processes
                    .iter()
                    .filter(|p| (rule.applies)(p, &ctx))
                    .map(|p| rule.finding(p, &ctx))
                    .collect::<Vec<_>>()
            })
            .collect();

        findings.extend(
            repeated
                .into_iter()
                .map(|(command, count)| restart_finding(command, count)),
        );

        for finding in &findings {
            debug!(
                kind = %finding.kind,
                pid = ?finding.pid,
                command = %finding.command,
                "warning raised"
            );
        }

        findings
    }
}

/// Warning messages for `processes` under the default policy, evaluated now
pub fn warnings(processes: &[Process]) -> Vec<String> {
    WarningEngine::default()
        .evaluate(processes, OffsetDateTime::now_utc())
        .into_iter()
        .map(|finding| finding.message)
        .collect()
}
