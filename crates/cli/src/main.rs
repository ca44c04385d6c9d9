//! witr: explains why a process is running and flags anything suspicious
//!
//! Usage:
//!   witr snapshot.json         # Analyze a snapshot produced by a collector
//!   collector | witr -         # Read the snapshot from stdin
//!
//! Output formats:
//!   --json     Machine-readable JSON
//!   --short    Single-line summary
//!   --tree     Process ancestry tree
//!   (default)  Human-readable narrative

use clap::Parser;
use owo_colors::{OwoColorize, Style};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, style::Style as TableStyle, Alignment, Modify},
    Table, Tabled,
};
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use witr_core::{
    render, Health, IdentityMatch, Process, Report, RiskKind, Snapshot, SourceKind,
    WarningEngine, WarningPolicy, WitrError,
};

mod config;

/// Label width for aligned output
const LABEL_WIDTH: usize = 12;

/// Environment variable that overrides the log filter
const LOG_ENV: &str = "WITR_LOG";

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ERROR_GENERAL: i32 = 1;
    pub const ERROR_NOT_FOUND: i32 = 2;
    pub const ERROR_ACCESS_DENIED: i32 = 3;
    pub const ERROR_INVALID_INPUT: i32 = 4;
}

#[derive(Parser)]
#[command(name = "witr")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  witr snapshot.json               Explain the target process in snapshot.json
  collector --pid 1234 | witr -    Read the snapshot from stdin
  witr snapshot.json --json        Output as JSON for scripting
  witr snapshot.json --tree        Show the ancestry tree
  witr snapshot.json -l            List every checked process with its warnings
  witr snapshot.json --stale-days 30")]
struct Cli {
    /// Snapshot file to analyze ("-" or omitted reads stdin)
    #[arg(value_name = "SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Output as JSON (for scripting and automation)
    #[arg(long, short = 'j', conflicts_with_all = ["short", "tree"])]
    json: bool,

    /// Output single-line summary
    #[arg(long, short = 's', conflicts_with_all = ["json", "tree"])]
    short: bool,

    /// Show process ancestry tree
    #[arg(long, short = 't', conflicts_with_all = ["json", "short"])]
    tree: bool,

    /// List every checked process with its warning count
    #[arg(long, short = 'l')]
    processes: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Warn about processes running longer than this many days
    #[arg(long, value_name = "DAYS")]
    stale_days: Option<u32>,

    /// Warn when one command appears at least this many times
    #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u64).range(1..))]
    restart_threshold: Option<u64>,

    /// Require declared service names to equal the command exactly
    #[arg(long)]
    exact_identity: bool,

    /// Generate a sample config file at ~/.witr/config.toml
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    /// Fold config-file defaults into flags that were not given
    fn apply_config(&mut self, cfg: &config::Config) {
        if !self.no_color && cfg.output.no_color {
            self.no_color = true;
        }

        // Only one output format may be active; explicit flags win
        if !self.json && !self.short && !self.tree {
            self.json = cfg.output.json;
            self.short = !self.json && cfg.output.short;
            self.tree = !self.json && !self.short && cfg.output.tree;
        }
    }

    /// Warning policy from the config file with flag overrides applied
    fn policy(&self, cfg: &config::Config) -> WarningPolicy {
        let mut policy = cfg.policy.clone();
        if let Some(days) = self.stale_days {
            policy.stale_after_days = days;
        }
        if let Some(count) = self.restart_threshold {
            policy.restart_threshold = usize::try_from(count).unwrap_or(usize::MAX);
        }
        if self.exact_identity {
            policy.identity_match = IdentityMatch::Exact;
        }
        policy
    }

    /// Whether the snapshot should be read from stdin
    fn reads_stdin(&self) -> bool {
        match &self.snapshot {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}

/// Color configuration for output
struct Colors {
    header: Style,
    success: Style,
    warning: Style,
    error: Style,
    info: Style,
    dim: Style,
    highlight: Style,
}

impl Colors {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                header: Style::new().bold().cyan(),
                success: Style::new().green(),
                warning: Style::new().yellow(),
                error: Style::new().red().bold(),
                info: Style::new().cyan(),
                dim: Style::new().dimmed(),
                highlight: Style::new().bold().white(),
            }
        } else {
            Self {
                header: Style::new(),
                success: Style::new(),
                warning: Style::new(),
                error: Style::new(),
                info: Style::new(),
                dim: Style::new(),
                highlight: Style::new(),
            }
        }
    }
}

fn main() {
    let mut cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    // Load configuration file (CLI flags override config)
    let cfg = config::load_config();
    cli.apply_config(&cfg);

    let colors = Colors::new(!cli.no_color && supports_color());

    if cli.init_config {
        handle_init_config(&colors);
        return;
    }

    if cli.reads_stdin() && io::stdin().is_terminal() {
        print_error(&colors, "No snapshot specified");
        eprintln!();
        eprintln!("Usage: witr [OPTIONS] [SNAPSHOT]");
        eprintln!();
        eprintln!("Pass a snapshot file produced by a process collector, or pipe one in:");
        eprintln!("  witr snapshot.json");
        eprintln!("  collector --pid 1234 | witr -");
        eprintln!();
        eprintln!("Run 'witr --help' for more information.");
        std::process::exit(exit_codes::ERROR_INVALID_INPUT);
    }

    let snapshot = match load_snapshot(&cli) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            print_error(&colors, &e.to_string());
            std::process::exit(exit_code_for(&e));
        }
    };

    let engine = WarningEngine::new(cli.policy(&cfg));
    debug!(policy = ?engine.policy(), "evaluating snapshot");

    let report = Report::analyze(&snapshot, &engine, OffsetDateTime::now_utc());
    info!(
        source = %report.source,
        warnings = report.warnings.len(),
        "analysis complete"
    );

    if let Err(e) = render_report(&report, &cli, &colors) {
        print_error(&colors, &e);
        std::process::exit(exit_codes::ERROR_GENERAL);
    }

    std::process::exit(exit_codes::SUCCESS);
}

/// Install the stderr log subscriber
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_snapshot(cli: &Cli) -> Result<Snapshot, WitrError> {
    match &cli.snapshot {
        Some(path) if !cli.reads_stdin() => Snapshot::from_path(path),
        _ => {
            debug!("reading snapshot from stdin");
            Snapshot::from_reader(io::stdin().lock())
        }
    }
}

/// Exit code for a command-line parsing outcome
///
/// Help and version requests succeed; every other parse error is invalid
/// input, so it cannot be confused with a missing snapshot.
fn usage_exit_code(error: &clap::Error) -> i32 {
    use clap::error::ErrorKind;

    match error.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => exit_codes::SUCCESS,
        _ => exit_codes::ERROR_INVALID_INPUT,
    }
}

fn exit_code_for(error: &WitrError) -> i32 {
    match error {
        WitrError::NotFound { .. } => exit_codes::ERROR_NOT_FOUND,
        WitrError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            exit_codes::ERROR_ACCESS_DENIED
        }
        WitrError::Io { .. } => exit_codes::ERROR_GENERAL,
        WitrError::Parse(_) => exit_codes::ERROR_INVALID_INPUT,
    }
}

/// Handle --init-config flag
fn handle_init_config(colors: &Colors) {
    use std::fs;

    let Some(config_path) = config::config_path() else {
        print_error(colors, "Could not determine home directory");
        std::process::exit(exit_codes::ERROR_GENERAL);
    };

    // Create directory if it doesn't exist
    if let Some(parent) = config_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            print_error(colors, &format!("Failed to create config directory: {}", e));
            std::process::exit(exit_codes::ERROR_GENERAL);
        }
    }

    if config_path.exists() {
        eprintln!(
            "{} Config file already exists at: {}",
            "warning:".style(colors.warning),
            config_path.display()
        );
        eprintln!("Use a text editor to modify it, or delete it first to regenerate.");
        return;
    }

    match fs::write(&config_path, config::sample_config()) {
        Ok(()) => {
            eprintln!(
                "{} Created config file at: {}",
                "success:".style(colors.success),
                config_path.display()
            );
            eprintln!();
            eprintln!("Edit this file to tune output defaults and warning thresholds.");
        }
        Err(e) => {
            print_error(colors, &format!("Failed to write config file: {}", e));
            std::process::exit(exit_codes::ERROR_GENERAL);
        }
    }
}

fn render_report(report: &Report, cli: &Cli, colors: &Colors) -> Result<(), String> {
    if cli.json {
        let json = render::json::render_json_string(report)
            .map_err(|e| format!("Failed to render JSON: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    if cli.short {
        println!("{}", render::render_short(report));
    } else if cli.tree {
        print_colored_tree(report, colors);
    } else {
        print_colored_report(report, colors);
    }

    if cli.processes {
        print_process_table(report, colors);
    }

    Ok(())
}

/// Row for the --processes table
#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "PID")]
    pid: u32,
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Role")]
    role: &'static str,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Warnings")]
    warnings: usize,
}

fn process_rows(report: &Report) -> Vec<ProcessRow> {
    let last = report.ancestry.len().saturating_sub(1);
    let roles = report
        .ancestry
        .iter()
        .enumerate()
        .map(|(i, p)| (p, if i == last { "target" } else { "ancestor" }))
        .chain(report.related.iter().map(|p| (p, "related")));

    roles
        .map(|(proc, role)| ProcessRow {
            pid: proc.pid,
            command: proc.command.clone(),
            role,
            user: proc.user.clone().unwrap_or_else(|| "-".to_string()),
            health: proc.health.to_string(),
            warnings: report.warnings_for(proc.pid).count(),
        })
        .collect()
}

fn print_process_table(report: &Report, colors: &Colors) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let rows = process_rows(report);
    if rows.is_empty() {
        return;
    }

    writeln!(
        out,
        "\n{} {} process(es) checked:\n",
        "→".style(colors.info),
        rows.len()
    )
    .ok();

    let table = Table::new(&rows)
        .with(TableStyle::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .with(Modify::new(Columns::single(5)).with(Alignment::right()))
        .to_string();

    for line in table.lines() {
        writeln!(out, "  {}", line).ok();
    }
}

/// Format relative time for display
fn format_relative_time(dt: &OffsetDateTime) -> String {
    let duration = OffsetDateTime::now_utc() - *dt;

    let days = duration.whole_days();
    let hours = duration.whole_hours();
    let minutes = duration.whole_minutes();
    let seconds = duration.whole_seconds();

    if days > 0 {
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if minutes > 0 {
        format!(
            "{} minute{} ago",
            minutes,
            if minutes == 1 { "" } else { "s" }
        )
    } else {
        format!(
            "{} second{} ago",
            seconds.max(0),
            if seconds == 1 { "" } else { "s" }
        )
    }
}

/// Format absolute time for display
fn format_absolute_time(dt: &OffsetDateTime) -> String {
    dt.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| dt.to_string())
}

/// Print an aligned label with styled value
fn print_row(
    out: &mut impl Write,
    label: &str,
    value: &str,
    label_style: Style,
    value_style: Style,
) {
    writeln!(
        out,
        "{:>width$} : {}",
        label.style(label_style),
        value.style(value_style),
        width = LABEL_WIDTH
    )
    .ok();
}

/// Print an aligned label with styled value (already styled)
fn print_row_raw(out: &mut impl Write, label: &str, value: String, label_style: Style) {
    writeln!(
        out,
        "{:>width$} : {}",
        label.style(label_style),
        value,
        width = LABEL_WIDTH
    )
    .ok();
}

/// Print an aligned section header
fn print_section(out: &mut impl Write, label: &str, label_style: Style) {
    writeln!(out).ok();
    writeln!(
        out,
        "{:>width$} :",
        label.style(label_style),
        width = LABEL_WIDTH
    )
    .ok();
}

/// Print sub-items with proper indentation
fn print_sub_item(out: &mut impl Write, value: &str, value_style: Style) {
    writeln!(
        out,
        "{:>width$}   {}",
        "",
        value.style(value_style),
        width = LABEL_WIDTH
    )
    .ok();
}

/// Short flag shown next to the process name
fn health_flag(health: &Health) -> Option<&str> {
    match health {
        Health::Healthy | Health::Unrecognized(_) => None,
        other => Some(other.as_str()),
    }
}

fn print_colored_report(report: &Report, colors: &Colors) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &report.target {
        Some(proc) => print_process_rows(&mut out, proc, colors),
        None => print_row(
            &mut out,
            "Process",
            "(none in snapshot)",
            colors.header,
            colors.dim,
        ),
    }

    // Why It Exists section
    print_section(&mut out, "Why It Exists", colors.header);

    if report.ancestry.is_empty() {
        print_sub_item(&mut out, "(no ancestry)", colors.dim);
    } else {
        let chain: Vec<String> = report
            .ancestry
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let name = if report.source.is_launcher_at(index) {
                    node.name().style(colors.highlight).to_string()
                } else {
                    node.name().style(colors.info).to_string()
                };
                format!(
                    "{} (pid {})",
                    name,
                    node.pid.to_string().style(colors.dim)
                )
            })
            .collect();
        print_sub_item(&mut out, &chain.join(" → "), Style::new());
    }

    let source_style = match report.source.kind {
        SourceKind::Unknown => colors.dim,
        _ => colors.success,
    };
    writeln!(out).ok();
    print_row(
        &mut out,
        "Source",
        &report.source.to_string(),
        colors.header,
        source_style,
    );

    if !report.related.is_empty() {
        print_row(
            &mut out,
            "Related",
            &format!("{} process(es) also checked", report.related.len()),
            colors.header,
            colors.dim,
        );
    }

    // Warnings section
    if report.has_warnings() {
        print_section(&mut out, "Warnings", colors.warning);
        for warning in &report.warnings {
            let style = match warning.kind {
                RiskKind::Zombie | RiskKind::PublicBind | RiskKind::SuspiciousLocation => {
                    colors.error
                }
                _ => colors.warning,
            };
            print_sub_item(&mut out, &format!("⚠ {}", warning), style);
        }
    }

    writeln!(out).ok();
}

fn print_process_rows(out: &mut impl Write, proc: &Process, colors: &Colors) {
    let flags_str = match health_flag(&proc.health) {
        Some(flag) => format!(" {}", format!("[{}]", flag).style(colors.warning)),
        None => String::new(),
    };

    let process_value = format!(
        "{} (pid {}){}",
        proc.name().style(colors.highlight),
        proc.pid.to_string().style(colors.info),
        flags_str
    );
    print_row_raw(out, "Process", process_value, colors.header);

    if let Some(user) = &proc.user {
        print_row(out, "User", user, colors.header, colors.info);
    }

    if proc.command != proc.name() {
        print_row(out, "Command", &proc.command, colors.header, colors.dim);
    }

    if let Some(start_time) = &proc.started_at {
        let time_value = format!(
            "{} ({})",
            format_relative_time(start_time).style(colors.dim),
            format_absolute_time(start_time).style(colors.dim)
        );
        print_row_raw(out, "Started", time_value, colors.header);
    }

    if let Some(dir) = &proc.working_dir {
        print_row(out, "Working Dir", dir, colors.header, colors.dim);
    }

    if !proc.bind_addresses.is_empty() {
        print_row(
            out,
            "Listening",
            &proc.bind_addresses.join(", "),
            colors.header,
            colors.info,
        );
    }

    if let Some(container) = proc.container_id() {
        print_row(out, "Container", container, colors.header, colors.info);
    }

    if let Some(service) = proc.declared_service() {
        print_row(out, "Service", service, colors.header, colors.info);
    }
}

/// Print a colored ancestry tree
fn print_colored_tree(report: &Report, colors: &Colors) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if report.ancestry.is_empty() {
        writeln!(out, "{}", "No process tree available".style(colors.dim)).ok();
        return;
    }

    let last = report.ancestry.len() - 1;
    for (i, node) in report.ancestry.iter().enumerate() {
        let indent = "    ".repeat(i.saturating_sub(1));
        let prefix = if i == 0 { "" } else { "└── " };
        let (bullet, name_style) = if i == last {
            ("● ", colors.highlight)
        } else {
            ("", colors.info)
        };

        writeln!(
            out,
            "{}{}{}{} {}",
            indent.style(colors.dim),
            prefix.style(colors.dim),
            bullet.style(colors.success),
            node.name().style(name_style),
            format!("(PID {})", node.pid).style(colors.dim)
        )
        .ok();
    }

    writeln!(out).ok();

    writeln!(
        out,
        "{}: {}",
        "Source".style(colors.header),
        report.source.style(colors.highlight)
    )
    .ok();

    for warning in &report.warnings {
        writeln!(out, "{} {}", "⚠".style(colors.warning), warning).ok();
    }
}

/// Print an error message
fn print_error(colors: &Colors, message: &str) {
    eprintln!("{} {}", "error:".style(colors.error), message);
}

/// Check if the terminal supports color
fn supports_color() -> bool {
    // Check for common NO_COLOR convention
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    io::stdout().is_terminal()
}
