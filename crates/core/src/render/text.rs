//! Text-based rendering for reports

use crate::models::{Health, Process};
use crate::report::Report;
use time::format_description::well_known::Rfc3339;

fn relation_label(depth: usize) -> &'static str {
    match depth {
        0 => "parent",
        1 => "grandparent",
        _ => "ancestor",
    }
}

/// Render a human-readable narrative report
pub fn render_human(report: &Report) -> String {
    let mut out = String::new();

    match &report.target {
        Some(proc) => {
            out.push_str(&format!(
                "─── Target: {} (PID {}) ───\n\n",
                proc.name(),
                proc.pid
            ));
            push_process_details(&mut out, proc);
        }
        None => out.push_str("─── Target: none ───\n\nProcess: Not found\n"),
    }

    // Launch origin
    out.push_str(&format!("\nSource: {}\n", report.source.kind));
    if report.source.is_known() {
        out.push_str(&format!("  Launched via {}\n", report.source.name));
    } else {
        out.push_str("  No known shell, scheduler or supervisor in the ancestry\n");
    }

    // Ancestry, nearest first
    let ancestors = report.ancestors();
    if !ancestors.is_empty() {
        out.push_str("\nAncestry:\n");
        for (depth, (index, node)) in ancestors.iter().enumerate().rev().enumerate() {
            let indent = "   ".repeat(depth);
            out.push_str(&format!(
                "  {}└─ {}: {} (PID {})\n",
                indent,
                relation_label(depth),
                node.name(),
                node.pid
            ));
            if report.source.is_launcher_at(index) {
                out.push_str(&format!("  {}      ↳ {}\n", indent, report.source.kind));
            }
        }
    }

    if !report.related.is_empty() {
        out.push_str(&format!(
            "\nAlso checked: {} related process(es)\n",
            report.related.len()
        ));
    }

    // Warnings
    if !report.warnings.is_empty() {
        out.push('\n');
        for warning in &report.warnings {
            out.push_str(&format!("⚠ {}\n", warning));
        }
    }

    out
}

fn push_process_details(out: &mut String, proc: &Process) {
    if proc.command != proc.name() {
        out.push_str(&format!("  Command: {}\n", proc.command));
    }

    if let Some(user) = &proc.user {
        out.push_str(&format!("  User: {}\n", user));
    }

    if let Some(start) = &proc.started_at {
        if let Ok(formatted) = start.format(&Rfc3339) {
            out.push_str(&format!("  Started: {}\n", formatted));
        }
    }

    if let Some(dir) = &proc.working_dir {
        out.push_str(&format!("  Working dir: {}\n", dir));
    }

    if !proc.bind_addresses.is_empty() {
        out.push_str(&format!(
            "  Listening: {}\n",
            proc.bind_addresses.join(", ")
        ));
    }

    if let Some(container) = proc.container_id() {
        out.push_str(&format!("  Container: {}\n", container));
    }

    if let Some(service) = proc.declared_service() {
        out.push_str(&format!("  Service: {}\n", service));
    }

    if proc.health != Health::Healthy {
        out.push_str(&format!("  Health: {}\n", proc.health));
    }
}

/// Render a process ancestry tree view
pub fn render_tree(report: &Report) -> String {
    let mut out = String::new();

    if report.ancestry.is_empty() {
        return "No process tree available\n".to_string();
    }

    let last = report.ancestry.len() - 1;
    out.push_str("Process tree:\n\n");

    for (i, node) in report.ancestry.iter().enumerate() {
        let indent = "  ".repeat(i);
        let connector = if i == 0 { "" } else { "└─ " };
        let marker = if i == last { "▶ " } else { "" };
        let launcher = if report.source.is_launcher_at(i) {
            " [launcher]"
        } else {
            ""
        };

        out.push_str(&format!(
            "{}{}{}{} (PID {}){}\n",
            indent,
            connector,
            marker,
            node.name(),
            node.pid,
            launcher
        ));
    }

    out.push_str(&format!("\n  Source: {}\n", report.source));

    for warning in &report.warnings {
        out.push_str(&format!("  ⚠ {}\n", warning));
    }

    out
}

/// Render a single-line causal chain summary
pub fn render_short(report: &Report) -> String {
    let proc_name = report
        .target
        .as_ref()
        .map(|p| p.name())
        .unwrap_or("<none>");

    let pid = report
        .target
        .as_ref()
        .map(|p| p.pid.to_string())
        .unwrap_or_else(|| "?".to_string());

    let ancestors = report.ancestors();
    let ancestry_str = if ancestors.is_empty() {
        String::new()
    } else {
        let chain: Vec<_> = ancestors.iter().rev().map(|p| p.name()).collect();
        format!(" ← {}", chain.join(" ← "))
    };

    let warn_indicator = if report.has_warnings() {
        format!(" [{}⚠]", report.warnings.len())
    } else {
        String::new()
    };

    format!(
        "{} (PID {}){} → {}{}",
        proc_name, pid, ancestry_str, report.source, warn_indicator
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, RiskKind, SourceInfo, SourceKind};
    use time::macros::datetime;

    fn sample_report() -> Report {
        let mut report = Report::new(datetime!(2025-01-01 00:00 UTC));
        report.ancestry = vec![
            Process::new(1, "/usr/lib/systemd/systemd"),
            Process::new(300, "bash"),
            Process {
                user: Some("root".to_string()),
                working_dir: Some("/tmp".to_string()),
                ..Process::new(400, "/opt/app/myapp")
            },
        ];
        report.target = report.ancestry.last().cloned();
        report.source = SourceInfo {
            kind: SourceKind::Shell,
            name: "bash".to_string(),
            position: Some(1),
        };
        report.warnings = vec![Finding {
            kind: RiskKind::Privileged,
            pid: Some(400),
            command: "/opt/app/myapp".to_string(),
            message: "/opt/app/myapp (PID 400) is running as root".to_string(),
        }];
        report
    }

    #[test]
    fn test_render_short() {
        let output = render_short(&sample_report());
        assert!(output.starts_with("myapp (PID 400) ← bash ← systemd"));
        assert!(output.contains("Interactive Shell (bash)"));
        assert!(output.ends_with("[1⚠]"));
    }

    #[test]
    fn test_render_human_contains_process() {
        let output = render_human(&sample_report());
        assert!(output.contains("myapp (PID 400)"));
        assert!(output.contains("Command: /opt/app/myapp"));
        assert!(output.contains("Working dir: /tmp"));
        assert!(output.contains("parent: bash (PID 300)"));
        assert!(output.contains("grandparent: systemd (PID 1)"));
        assert!(output.contains("⚠ /opt/app/myapp (PID 400) is running as root"));
    }

    #[test]
    fn test_render_human_unknown_source() {
        let report = Report::new(datetime!(2025-01-01 00:00 UTC));
        let output = render_human(&report);
        assert!(output.contains("Not found"));
        assert!(output.contains("Source: Unknown"));
    }

    #[test]
    fn test_render_tree_contains_hierarchy() {
        let output = render_tree(&sample_report());
        assert!(output.contains("systemd (PID 1)"));
        assert!(output.contains("└─ bash (PID 300) [launcher]"));
        assert!(output.contains("▶ myapp (PID 400)"));
    }

    #[test]
    fn test_render_tree_marks_only_detected_launcher() {
        let mut report = Report::new(datetime!(2025-01-01 00:00 UTC));
        report.ancestry = vec![
            Process::new(10, "bash"),
            Process::new(11, "bash"),
            Process::new(12, "make"),
        ];
        report.source = crate::source::detect(&report.ancestry);

        let output = render_tree(&report);
        assert_eq!(output.matches("[launcher]").count(), 1);
        assert!(output.contains("bash (PID 10) [launcher]"));
        assert!(output.contains("└─ bash (PID 11)\n"));

        let human = render_human(&report);
        assert_eq!(human.matches("↳ Interactive Shell").count(), 1);
    }

    #[test]
    fn test_render_tree_empty() {
        let report = Report::new(datetime!(2025-01-01 00:00 UTC));
        assert_eq!(render_tree(&report), "No process tree available\n");
    }
}
