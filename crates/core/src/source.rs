//! Launch-origin detection
//!
//! Scans a process ancestry for well-known launchers and reports the most
//! specific one found. Launcher names are data, grouped by category in a
//! [`LauncherTable`]; categories are ranked by [`SourceKind`]'s ordering, so
//! a supervisor anywhere in the chain beats a shell that happens to sit
//! closer to the target (typically the shell that started the supervisor).

use crate::models::{base_name, Process, SourceInfo, SourceKind};
use tracing::debug;

/// Process managers that keep services alive
pub const SUPERVISORS: &[&str] = &[
    "pm2",
    "supervisord",
    "supervisor",
    "circusd",
    "runsv",
    "runsvdir",
    "s6-supervise",
    "s6-svscan",
    "forever",
    "nodemon",
    "monit",
    "god",
    "supervise",
];

/// Job schedulers
pub const SCHEDULERS: &[&str] = &["cron", "crond", "anacron", "atd", "fcron", "cronie"];

/// Interactive shells
pub const SHELLS: &[&str] = &[
    "bash", "sh", "zsh", "fish", "dash", "ksh", "mksh", "tcsh", "csh", "ash", "nu", "pwsh",
    "elvish", "xonsh",
];

/// Launcher table used by [`detect`]
///
/// Init systems (systemd, init, launchd) are not listed: every process
/// descends from one, so they would shadow every other category.
pub const DEFAULT_LAUNCHERS: LauncherTable = LauncherTable::new(&[
    (SourceKind::Supervisor, SUPERVISORS),
    (SourceKind::Cron, SCHEDULERS),
    (SourceKind::Shell, SHELLS),
]);

/// Launcher names grouped by category
#[derive(Debug, Clone, Copy)]
pub struct LauncherTable {
    rows: &'static [(SourceKind, &'static [&'static str])],
}

impl LauncherTable {
    /// Build a table from `(category, names)` rows
    ///
    /// Row order does not matter; priority comes from [`SourceKind`].
    pub const fn new(rows: &'static [(SourceKind, &'static [&'static str])]) -> Self {
        Self { rows }
    }

    /// Category of a single command, if it is a known launcher
    ///
    /// The command is reduced to its final path component, a login-shell
    /// `-` prefix is dropped and the comparison ignores ASCII case.
    pub fn classify(&self, command: &str) -> Option<SourceKind> {
        let name = normalize(command);
        if name.is_empty() {
            return None;
        }

        self.rows
            .iter()
            .filter(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|(kind, _)| *kind)
            .max()
    }

    /// Classify an ancestry
    ///
    /// The whole chain is considered; the highest-priority category wins and
    /// ties go to the first occurrence in the given order.
    pub fn detect(&self, ancestry: &[Process]) -> SourceInfo {
        let mut best: Option<(SourceKind, usize, &Process)> = None;

        for (position, process) in ancestry.iter().enumerate() {
            let Some(kind) = self.classify(&process.command) else {
                continue;
            };

            debug!(
                pid = process.pid,
                command = %process.command,
                %kind,
                "launcher candidate"
            );

            if best.map_or(true, |(current, _, _)| kind > current) {
                best = Some((kind, position, process));
            }
        }

        match best {
            Some((kind, position, process)) => SourceInfo {
                kind,
                name: process.command.clone(),
                position: Some(position),
            },
            None => SourceInfo::unknown(),
        }
    }
}

impl Default for LauncherTable {
    fn default() -> Self {
        DEFAULT_LAUNCHERS
    }
}

/// Classify an ancestry with the built-in launcher table
pub fn detect(ancestry: &[Process]) -> SourceInfo {
    DEFAULT_LAUNCHERS.detect(ancestry)
}

fn normalize(command: &str) -> &str {
    let name = base_name(command.trim());
    name.strip_prefix('-').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(commands: &[&str]) -> Vec<Process> {
        commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| Process::new(100 + i as u32, *cmd))
            .collect()
    }

    #[test]
    fn test_detect_shell() {
        let info = detect(&chain(&["bash", "myapp"]));
        assert_eq!(info.kind, SourceKind::Shell);
        assert_eq!(info.name, "bash");
    }

    #[test]
    fn test_detect_supervisor() {
        let info = detect(&chain(&["pm2", "node"]));
        assert_eq!(info.kind, SourceKind::Supervisor);
        assert_eq!(info.name, "pm2");
    }

    #[test]
    fn test_detect_cron() {
        let info = detect(&chain(&["cron", "backup.sh"]));
        assert_eq!(info.kind, SourceKind::Cron);
        assert_eq!(info.name, "cron");
    }

    #[test]
    fn test_detect_empty_is_unknown() {
        assert_eq!(detect(&[]), SourceInfo::unknown());
    }

    #[test]
    fn test_detect_no_match_is_unknown() {
        let info = detect(&chain(&["unknown_process"]));
        assert_eq!(info.kind, SourceKind::Unknown);
        assert!(info.name.is_empty());
    }

    #[test]
    fn test_supervisor_beats_earlier_shell() {
        let info = detect(&chain(&["bash", "supervisord", "myapp"]));
        assert_eq!(info.kind, SourceKind::Supervisor);
        assert_eq!(info.name, "supervisord");
    }

    #[test]
    fn test_supervisor_beats_later_shell() {
        let info = detect(&chain(&["supervisord", "sh", "worker"]));
        assert_eq!(info.kind, SourceKind::Supervisor);
        assert_eq!(info.name, "supervisord");
    }

    #[test]
    fn test_cron_beats_shell() {
        let info = detect(&chain(&["crond", "sh", "backup.sh"]));
        assert_eq!(info.kind, SourceKind::Cron);
        assert_eq!(info.name, "crond");
    }

    #[test]
    fn test_tie_goes_to_first_occurrence() {
        let info = detect(&chain(&["zsh", "bash", "myapp"]));
        assert_eq!(info.name, "zsh");
        assert_eq!(info.position, Some(0));
    }

    #[test]
    fn test_nested_shells_pick_first_position() {
        let info = detect(&chain(&["bash", "bash", "make"]));
        assert_eq!(info.position, Some(0));
        assert!(info.is_launcher_at(0));
        assert!(!info.is_launcher_at(1));
    }

    #[test]
    fn test_name_is_literal_command() {
        let info = detect(&chain(&["/usr/sbin/CRON", "backup.sh"]));
        assert_eq!(info.kind, SourceKind::Cron);
        assert_eq!(info.name, "/usr/sbin/CRON");

        let info = detect(&chain(&["-zsh", "vim"]));
        assert_eq!(info.kind, SourceKind::Shell);
        assert_eq!(info.name, "-zsh");
    }

    #[test]
    fn test_init_systems_are_not_launchers() {
        let info = detect(&chain(&["systemd", "sshd", "bash", "top"]));
        assert_eq!(info.kind, SourceKind::Shell);
        assert_eq!(info.name, "bash");
    }

    #[test]
    fn test_script_suffix_is_not_a_shell() {
        assert_eq!(DEFAULT_LAUNCHERS.classify("backup.sh"), None);
        assert_eq!(DEFAULT_LAUNCHERS.classify(""), None);
    }

    #[test]
    fn test_custom_table() {
        const MINE: &[&str] = &["my-supervisor"];
        const TABLE: LauncherTable = LauncherTable::new(&[(SourceKind::Supervisor, MINE)]);
        let info = TABLE.detect(&chain(&["bash", "my-supervisor", "job"]));
        assert_eq!(info.kind, SourceKind::Supervisor);
        assert_eq!(info.name, "my-supervisor");
    }
}
